use crc::{CRC_8_SMBUS, Crc};
use tracing::{debug, error, info, warn};

use crate::eeprom::Eeprom;
use crate::error::StoreError;
use crate::layout::{FieldSpec, Field, Layout, LOCATION_MASS_UNITS, LOCATION_SENTINEL, MAX_FIELD_WIDTH};
use crate::settings::Settings;
use crate::value::Value;

const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// Typed, bounds-checked access to the settings record on an [`Eeprom`].
///
/// Every write is validated before any byte reaches the medium, goes out as
/// one block and is followed by a checksum update. Full-record writes
/// ([`save`](Self::save), [`reset_to_defaults`](Self::reset_to_defaults))
/// write the sentinel last. On a blank medium an interrupted reset therefore
/// still reads as uninitialized; on an initialized one the old sentinel stays
/// in place and the torn record fails the checksum as `Corrupt`.
///
/// The store is not synchronized. Callers sharing it between tasks must hold
/// a lock for the duration of each write.
#[derive(Debug)]
pub struct SettingsStore<E> {
    eeprom: E,
    layout: Layout,
}

impl<E: Eeprom> SettingsStore<E> {
    /// Wraps `eeprom` without looking at its content.
    pub fn new(eeprom: E, layout: Layout) -> Result<Self, StoreError> {
        check_capacity(&eeprom, layout)?;
        Ok(Self { eeprom, layout })
    }

    /// Like [`new`](Self::new), but when the medium holds a valid record of the
    /// other layout, its settings are rewritten in `layout`.
    ///
    /// Fields the old layout lacks get their factory default.
    pub fn open(eeprom: E, layout: Layout) -> Result<Self, StoreError> {
        let mut store = Self::new(eeprom, layout)?;

        let stored = Layout::from_version(store.eeprom.read_byte(LOCATION_SENTINEL));
        if let Some(previous) = stored.filter(|previous| *previous != layout) {
            match store.load_as(previous) {
                Ok(settings) => {
                    info!(from = %previous, to = %layout, "converting stored settings");
                    store.save(&settings)?;
                }
                Err(err) => {
                    warn!(layout = %previous, error = %err, "stored settings unusable, not converting")
                }
            }
        }

        Ok(store)
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn eeprom(&self) -> &E {
        &self.eeprom
    }

    pub fn into_inner(self) -> E {
        self.eeprom
    }

    /// Whether the sentinel byte names this store's layout.
    pub fn is_initialized(&self) -> bool {
        self.eeprom.read_byte(LOCATION_SENTINEL) == self.layout.version()
    }

    /// Checks the sentinel and the record checksum.
    pub fn verify(&self) -> Result<(), StoreError> {
        self.verify_as(self.layout)
    }

    /// Reads one field, MSB first.
    ///
    /// The bytes are decoded as they are; run [`verify`](Self::verify) or
    /// [`load`](Self::load) to find out whether they can be trusted. Fails only
    /// for a field outside this store's layout.
    pub fn read_field(&self, field: Field) -> Result<Value, StoreError> {
        let spec = self.layout.spec(field)?;
        Ok(self.read_spec(spec))
    }

    /// Validates `value` and writes all bytes of the field in one block.
    ///
    /// On error nothing is written.
    pub fn write_field(&mut self, field: Field, value: Value) -> Result<(), StoreError> {
        let spec = self.layout.spec(field)?;
        let bytes = spec.kind.encode(field, value)?;

        self.eeprom.write(spec.address(), &bytes[..spec.width()]);
        self.write_checksum();

        debug!(%field, %value, address = spec.address(), "setting written");
        Ok(())
    }

    /// Writes the factory defaults to every field of the layout.
    pub fn reset_to_defaults(&mut self) {
        info!(layout = %self.layout, "writing factory default settings");
        match self.encode_record(&Settings::default()) {
            Ok(record) => self.write_record(&record),
            Err(err) => error!(error = %err, "factory defaults rejected by the layout"),
        }
    }

    /// Verifies the store and decodes every field, re-checking its domain.
    pub fn load(&self) -> Result<Settings, StoreError> {
        self.load_as(self.layout)
    }

    /// Boot path: [`load`](Self::load), falling back to factory defaults when
    /// the store is blank or fails validation.
    pub fn load_or_reset(&mut self) -> Settings {
        match self.load() {
            Ok(settings) => settings,
            Err(StoreError::Uninitialized) => {
                info!("settings store is blank");
                self.reset_to_defaults();
                Settings::default()
            }
            Err(err) => {
                warn!(error = %err, "stored settings are invalid, restoring factory defaults");
                self.reset_to_defaults();
                Settings::default()
            }
        }
    }

    /// Validates every field of `settings`, then writes the whole record.
    pub fn save(&mut self, settings: &Settings) -> Result<(), StoreError> {
        settings.validate(self.layout)?;
        let record = self.encode_record(settings)?;
        self.write_record(&record);

        debug!(layout = %self.layout, "settings saved");
        Ok(())
    }

    /// Raw bytes from the sentinel through the checksum.
    pub fn image(&self) -> Vec<u8> {
        let mut image = vec![0u8; self.layout.image_len()];
        self.eeprom.read(LOCATION_SENTINEL, &mut image);
        image
    }

    /// Writes back an [`image`](Self::image) taken earlier, undoing every
    /// write made since.
    ///
    /// Rejects an image of the wrong length without touching the medium.
    pub fn restore(&mut self, image: &[u8]) -> Result<(), StoreError> {
        let needed = self.layout.image_len();
        if image.len() != needed {
            return Err(StoreError::ImageLength {
                layout: self.layout,
                expected: needed,
                actual: image.len(),
            });
        }

        self.eeprom.write(LOCATION_SENTINEL, image);
        debug!(layout = %self.layout, "settings image restored");
        Ok(())
    }

    fn verify_as(&self, layout: Layout) -> Result<(), StoreError> {
        check_capacity(&self.eeprom, layout)?;

        if self.eeprom.read_byte(LOCATION_SENTINEL) != layout.version() {
            return Err(StoreError::Uninitialized);
        }

        let stored = self.eeprom.read_byte(layout.checksum_address());
        let computed = self.checksum(layout);
        if stored != computed {
            return Err(StoreError::Corrupt { stored, computed });
        }

        Ok(())
    }

    fn load_as(&self, layout: Layout) -> Result<Settings, StoreError> {
        self.verify_as(layout)?;

        let mut settings = Settings::default();
        for spec in layout.fields() {
            settings.set(spec.field, self.read_spec(spec))?;
        }

        Ok(settings)
    }

    fn read_spec(&self, spec: &FieldSpec) -> Value {
        let mut buf = [0u8; MAX_FIELD_WIDTH];
        let bytes = &mut buf[..spec.width()];
        self.eeprom.read(spec.address(), bytes);
        spec.kind.decode(bytes)
    }

    fn encode_record(&self, settings: &Settings) -> Result<Vec<u8>, StoreError> {
        let mut record = vec![0u8; self.layout.record_len()];
        for spec in self.layout.fields() {
            let bytes = spec.kind.encode(spec.field, settings.get(spec.field))?;
            record[spec.offset..spec.offset + spec.width()].copy_from_slice(&bytes[..spec.width()]);
        }
        Ok(record)
    }

    fn write_record(&mut self, record: &[u8]) {
        self.eeprom.write(LOCATION_MASS_UNITS, record);
        self.eeprom
            .write_byte(self.layout.checksum_address(), CRC8.checksum(record));
        self.eeprom.write_byte(LOCATION_SENTINEL, self.layout.version());
    }

    fn checksum(&self, layout: Layout) -> u8 {
        let mut record = vec![0u8; layout.record_len()];
        self.eeprom.read(LOCATION_MASS_UNITS, &mut record);
        CRC8.checksum(&record)
    }

    fn write_checksum(&mut self) {
        let checksum = self.checksum(self.layout);
        self.eeprom
            .write_byte(self.layout.checksum_address(), checksum);
    }
}

fn check_capacity<E: Eeprom>(eeprom: &E, layout: Layout) -> Result<(), StoreError> {
    let needed = layout.image_len();
    let capacity = eeprom.capacity();
    if capacity < needed {
        return Err(StoreError::Capacity {
            layout,
            needed,
            capacity,
        });
    }
    Ok(())
}
