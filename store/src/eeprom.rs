//! Byte-addressed non-volatile medium backing the settings store.

/// Content of a cell that has never been written.
pub const ERASED: u8 = 0xFF;

/// EEPROM size of the ATmega328P on the OpenScale board.
pub const ATMEGA328P_EEPROM_SIZE: usize = 1024;

/// A byte-addressed EEPROM.
///
/// Reads cannot fail. `write` stores the whole slice as one block; a medium
/// that can make the block atomic should do so. Addresses past
/// [`capacity`](Eeprom::capacity) are a caller bug and may panic.
pub trait Eeprom {
    fn capacity(&self) -> usize;

    fn read(&self, address: usize, buf: &mut [u8]);

    fn write(&mut self, address: usize, data: &[u8]);

    fn read_byte(&self, address: usize) -> u8 {
        let mut buf = [0u8; 1];
        self.read(address, &mut buf);
        buf[0]
    }

    fn write_byte(&mut self, address: usize, value: u8) {
        self.write(address, &[value]);
    }
}

impl<E: Eeprom + ?Sized> Eeprom for &mut E {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn read(&self, address: usize, buf: &mut [u8]) {
        (**self).read(address, buf)
    }

    fn write(&mut self, address: usize, data: &[u8]) {
        (**self).write(address, data)
    }
}

/// RAM-backed EEPROM image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEeprom {
    cells: Vec<u8>,
}

impl MemoryEeprom {
    /// An erased medium of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: vec![ERASED; capacity],
        }
    }

    /// A medium of `capacity` bytes starting with `image`.
    ///
    /// Cells not covered by `image` are erased; bytes past `capacity` are dropped.
    pub fn from_image(image: &[u8], capacity: usize) -> Self {
        let mut eeprom = Self::new(capacity);
        let len = image.len().min(capacity);
        eeprom.cells[..len].copy_from_slice(&image[..len]);
        eeprom
    }
}

impl Default for MemoryEeprom {
    fn default() -> Self {
        Self::new(ATMEGA328P_EEPROM_SIZE)
    }
}

impl Eeprom for MemoryEeprom {
    fn capacity(&self) -> usize {
        self.cells.len()
    }

    fn read(&self, address: usize, buf: &mut [u8]) {
        buf.copy_from_slice(&self.cells[address..address + buf.len()]);
    }

    fn write(&mut self, address: usize, data: &[u8]) {
        self.cells[address..address + data.len()].copy_from_slice(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dump(eeprom: &MemoryEeprom) -> Vec<u8> {
        let mut buf = vec![0u8; eeprom.capacity()];
        eeprom.read(0, &mut buf);
        buf
    }

    #[test]
    fn starts_erased() {
        let eeprom = MemoryEeprom::new(16);
        assert_eq!(16, eeprom.capacity());
        assert!(dump(&eeprom).iter().all(|b| *b == ERASED));
    }

    #[test]
    fn block_write_and_read() {
        let mut eeprom = MemoryEeprom::default();
        eeprom.write(10, &[1, 2, 3]);

        let mut buf = [0u8; 3];
        eeprom.read(10, &mut buf);
        assert_eq!([1u8, 2, 3], buf);
        assert_eq!(ERASED, eeprom.read_byte(13));
    }

    #[test]
    fn from_image_pads_and_truncates() {
        let eeprom = MemoryEeprom::from_image(&[7, 8], 4);
        assert_eq!(vec![7u8, 8, ERASED, ERASED], dump(&eeprom));

        let eeprom = MemoryEeprom::from_image(&[1, 2, 3, 4, 5], 3);
        assert_eq!(vec![1u8, 2, 3], dump(&eeprom));
    }

    #[test]
    fn borrowed_medium() {
        fn poke<E: Eeprom>(mut eeprom: E) {
            eeprom.write_byte(2, 0x42);
        }

        let mut eeprom = MemoryEeprom::new(4);
        poke(&mut eeprom);
        assert_eq!(0x42, eeprom.read_byte(2));
    }
}
