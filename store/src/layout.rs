//! EEPROM layout of the settings record.
//!
//! Every field is described once in [`FIELDS`]: its offset from
//! [`LOCATION_MASS_UNITS`] and its [`FieldKind`], which fixes both the width
//! and the valid domain. Multi-byte fields are stored most significant byte
//! first.
//!
//! | Address            | Content                                   |
//! |--------------------|-------------------------------------------|
//! | `0x00`             | sentinel, names the layout version        |
//! | `0x01 ..`          | settings record (18 or 21 bytes)          |
//! | after the record   | CRC-8 of the record                       |

use core::fmt;
use core::ops::Range;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::value::{MassUnit, Value};

/// Address of the sentinel / layout version byte.
pub const LOCATION_SENTINEL: usize = 0x00;
/// Base address of the settings record; the mass unit is its first field.
pub const LOCATION_MASS_UNITS: usize = 0x01;

// Arduino doesn't properly handle bauds lower than 500bps
pub const BAUD_MIN: u32 = 2400;
pub const BAUD_MAX: u32 = 1_000_000;

pub const DECIMAL_PLACES_MAX: u8 = 4;
pub const AVERAGE_AMOUNT_MIN: u8 = 1;
pub const AVERAGE_AMOUNT_MAX: u8 = 64;

pub const MAX_FIELD_WIDTH: usize = 4;

/// Identifies one setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    MassUnit,
    ReportRate,
    CalibrationFactor,
    BaudRate,
    TarePoint,
    Timestamp,
    DecimalPlaces,
    AverageAmount,
    LocalTempEnable,
    RemoteTempEnable,
    StatusEnable,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::MassUnit,
        Field::ReportRate,
        Field::CalibrationFactor,
        Field::BaudRate,
        Field::TarePoint,
        Field::Timestamp,
        Field::DecimalPlaces,
        Field::AverageAmount,
        Field::LocalTempEnable,
        Field::RemoteTempEnable,
        Field::StatusEnable,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::MassUnit => "mass_unit",
            Field::ReportRate => "report_rate",
            Field::CalibrationFactor => "calibration_factor",
            Field::BaudRate => "baud_rate",
            Field::TarePoint => "tare_point",
            Field::Timestamp => "timestamp",
            Field::DecimalPlaces => "decimal_places",
            Field::AverageAmount => "average_amount",
            Field::LocalTempEnable => "local_temp_enable",
            Field::RemoteTempEnable => "remote_temp_enable",
            Field::StatusEnable => "status_enable",
        }
    }

    /// Layout-independent description of the field.
    pub fn spec(self) -> &'static FieldSpec {
        // FIELDS is declared in enum order
        &FIELDS[self as usize]
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| StoreError::UnknownField(s.to_string()))
    }
}

/// Storage encoding and valid domain of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// One byte, [`MassUnit`] raw value.
    MassUnit,
    /// One byte, 0 or 1.
    Flag,
    /// One unsigned byte within `min..=max`.
    Byte { min: u8, max: u8 },
    /// Two bytes, unsigned.
    Word,
    /// Four bytes, unsigned, within `min..=max`.
    Long { min: u32, max: u32 },
    /// Four bytes, two's complement.
    SignedLong,
}

impl FieldKind {
    pub const fn width(self) -> usize {
        match self {
            FieldKind::MassUnit | FieldKind::Flag | FieldKind::Byte { .. } => 1,
            FieldKind::Word => 2,
            FieldKind::Long { .. } | FieldKind::SignedLong => 4,
        }
    }

    /// Validates `value` and encodes it MSB-first.
    ///
    /// Only the first [`width`](Self::width) bytes of the result are meaningful.
    pub fn encode(self, field: Field, value: Value) -> Result<[u8; MAX_FIELD_WIDTH], StoreError> {
        let out_of_range = || StoreError::OutOfRange { field, value };
        let mismatch = || StoreError::TypeMismatch { field, value };
        let unsigned = || {
            if !value.is_integer() {
                return Err(mismatch());
            }
            value.as_unsigned().ok_or_else(out_of_range)
        };

        let mut out = [0u8; MAX_FIELD_WIDTH];
        match self {
            FieldKind::MassUnit => {
                let unit = match value {
                    Value::Unit(unit) => unit,
                    _ => u8::try_from(unsigned()?)
                        .ok()
                        .and_then(MassUnit::from_raw)
                        .ok_or_else(out_of_range)?,
                };
                out[0] = unit.raw();
            }
            FieldKind::Flag => {
                let flag = match value {
                    Value::Flag(flag) => flag,
                    _ => match unsigned()? {
                        0 => false,
                        1 => true,
                        _ => return Err(out_of_range()),
                    },
                };
                out[0] = u8::from(flag);
            }
            FieldKind::Byte { min, max } => {
                out[0] = u8::try_from(unsigned()?)
                    .ok()
                    .filter(|v| (min..=max).contains(v))
                    .ok_or_else(out_of_range)?;
            }
            FieldKind::Word => {
                let v = u16::try_from(unsigned()?).map_err(|_| out_of_range())?;
                out[..2].copy_from_slice(&v.to_be_bytes());
            }
            FieldKind::Long { min, max } => {
                let v = unsigned()?;
                if !(min..=max).contains(&v) {
                    return Err(out_of_range());
                }
                out.copy_from_slice(&v.to_be_bytes());
            }
            FieldKind::SignedLong => {
                if !value.is_integer() {
                    return Err(mismatch());
                }
                let v = value.as_signed().ok_or_else(out_of_range)?;
                out.copy_from_slice(&v.to_be_bytes());
            }
        }

        Ok(out)
    }

    /// Rebuilds a value from its MSB-first bytes.
    ///
    /// No range checks happen here; a raw byte that is not a valid mass unit
    /// or flag comes back as [`Value::Unsigned`].
    pub fn decode(self, bytes: &[u8]) -> Value {
        match self {
            FieldKind::MassUnit => MassUnit::from_raw(bytes[0])
                .map(Value::Unit)
                .unwrap_or(Value::Unsigned(bytes[0].into())),
            FieldKind::Flag => match bytes[0] {
                0 => Value::Flag(false),
                1 => Value::Flag(true),
                raw => Value::Unsigned(raw.into()),
            },
            FieldKind::Byte { .. } => Value::Unsigned(bytes[0].into()),
            FieldKind::Word => Value::Unsigned(u16::from_be_bytes([bytes[0], bytes[1]]).into()),
            FieldKind::Long { .. } => {
                Value::Unsigned(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            FieldKind::SignedLong => {
                Value::Signed(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
        }
    }

    /// Validates `value` and returns it in the variant a read would produce.
    pub fn canonical(self, field: Field, value: Value) -> Result<Value, StoreError> {
        let bytes = self.encode(field, value)?;
        Ok(self.decode(&bytes[..self.width()]))
    }
}

/// Position and encoding of one field inside the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    /// Offset from [`LOCATION_MASS_UNITS`].
    pub offset: usize,
    pub kind: FieldKind,
}

impl FieldSpec {
    const fn new(field: Field, offset: usize, kind: FieldKind) -> Self {
        Self { field, offset, kind }
    }

    pub const fn width(&self) -> usize {
        self.kind.width()
    }

    /// Absolute EEPROM address of the most significant byte.
    pub const fn address(&self) -> usize {
        LOCATION_MASS_UNITS + self.offset
    }

    /// Absolute EEPROM addresses covered by the field.
    pub const fn addresses(&self) -> Range<usize> {
        self.address()..self.address() + self.width()
    }
}

pub const FIELDS: [FieldSpec; 11] = [
    FieldSpec::new(Field::MassUnit, 0, FieldKind::MassUnit),
    FieldSpec::new(Field::ReportRate, 1, FieldKind::Word),
    FieldSpec::new(Field::CalibrationFactor, 3, FieldKind::SignedLong),
    FieldSpec::new(
        Field::BaudRate,
        7,
        FieldKind::Long {
            min: BAUD_MIN,
            max: BAUD_MAX,
        },
    ),
    FieldSpec::new(Field::TarePoint, 11, FieldKind::SignedLong),
    FieldSpec::new(Field::Timestamp, 15, FieldKind::Flag),
    FieldSpec::new(
        Field::DecimalPlaces,
        16,
        FieldKind::Byte {
            min: 0,
            max: DECIMAL_PLACES_MAX,
        },
    ),
    FieldSpec::new(
        Field::AverageAmount,
        17,
        FieldKind::Byte {
            min: AVERAGE_AMOUNT_MIN,
            max: AVERAGE_AMOUNT_MAX,
        },
    ),
    // power-reduction board only
    FieldSpec::new(Field::LocalTempEnable, 18, FieldKind::Flag),
    FieldSpec::new(Field::RemoteTempEnable, 19, FieldKind::Flag),
    FieldSpec::new(Field::StatusEnable, 20, FieldKind::Flag),
];

const STANDARD_FIELD_COUNT: usize = 8;

/// Which variant of the record the store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// OpenScale
    Standard,
    /// Power-reduction board, adds the temperature and status flags.
    Extended,
}

impl Layout {
    /// Value of the sentinel byte for an initialized store of this layout.
    pub const fn version(self) -> u8 {
        match self {
            Layout::Standard => 0xA1,
            Layout::Extended => 0xA2,
        }
    }

    pub fn from_version(version: u8) -> Option<Self> {
        [Layout::Standard, Layout::Extended]
            .into_iter()
            .find(|layout| layout.version() == version)
    }

    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            Layout::Standard => &FIELDS[..STANDARD_FIELD_COUNT],
            Layout::Extended => &FIELDS,
        }
    }

    pub fn spec(self, field: Field) -> Result<&'static FieldSpec, StoreError> {
        self.fields()
            .iter()
            .find(|spec| spec.field == field)
            .ok_or(StoreError::UnsupportedField { field, layout: self })
    }

    /// Length of the settings record in bytes.
    pub fn record_len(self) -> usize {
        self.fields()
            .iter()
            .map(|spec| spec.offset + spec.width())
            .max()
            .unwrap_or(0)
    }

    /// Absolute EEPROM addresses of the settings record.
    pub fn record(self) -> Range<usize> {
        LOCATION_MASS_UNITS..LOCATION_MASS_UNITS + self.record_len()
    }

    pub fn checksum_address(self) -> usize {
        self.record().end
    }

    /// Bytes from the sentinel through the checksum.
    pub fn image_len(self) -> usize {
        self.checksum_address() + 1
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Standard => f.write_str("standard"),
            Layout::Extended => f.write_str("extended"),
        }
    }
}

impl FromStr for Layout {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" | "openscale" => Ok(Layout::Standard),
            "extended" | "power-reduction" => Ok(Layout::Extended),
            _ => Err(StoreError::UnknownLayout(s.to_string())),
        }
    }
}
