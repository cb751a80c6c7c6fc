//! Persistent settings for the OpenScale load-cell board.
//!
//! The board keeps its user settings in the microcontroller EEPROM at fixed
//! byte offsets. This crate models that region as an explicit
//! [`SettingsStore`] owning an [`Eeprom`] medium, with a declarative field
//! table, MSB-first encoding and bounds-checked writes.
//!
//! Two layouts share one schema: [`Layout::Standard`] (OpenScale) and
//! [`Layout::Extended`] (the power-reduction board, which adds three
//! temperature/status flags). The layout is recorded in the sentinel byte.

pub mod board;
pub mod eeprom;
pub mod error;
pub mod layout;
pub mod settings;
pub mod store;
pub mod value;

pub use board::{Board, Pin};
pub use eeprom::{Eeprom, MemoryEeprom};
pub use error::StoreError;
pub use layout::{Field, FieldKind, FieldSpec, Layout, BAUD_MAX, BAUD_MIN};
pub use settings::Settings;
pub use store::SettingsStore;
pub use value::{MassUnit, Value};
