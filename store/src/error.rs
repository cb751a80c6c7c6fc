//! Errors reported by the settings store.

use crate::layout::{Field, Layout};
use crate::value::Value;

/// Everything that can go wrong while reading, writing or validating settings.
///
/// None of these are fatal for the device: a store that fails validation is
/// reset to factory defaults by [`SettingsStore::load_or_reset`].
///
/// [`SettingsStore::load_or_reset`]: crate::SettingsStore::load_or_reset
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The value violates the declared domain of the field.
    #[error("{value} is out of range for {field}")]
    OutOfRange { field: Field, value: Value },

    /// The value has the wrong type for the field, e.g. a flag for the baud rate.
    #[error("{field} does not accept {value}")]
    TypeMismatch { field: Field, value: Value },

    /// The sentinel byte does not name the expected layout.
    ///
    /// Not a hard failure: the caller should run a reset to factory defaults.
    #[error("settings store is not initialized")]
    Uninitialized,

    /// The record checksum does not match its content, most likely a write
    /// interrupted by power loss.
    #[error("settings checksum mismatch (stored {stored:#04x}, computed {computed:#04x})")]
    Corrupt { stored: u8, computed: u8 },

    /// The field only exists in another layout.
    #[error("{field} is not part of the {layout} layout")]
    UnsupportedField { field: Field, layout: Layout },

    #[error("unknown setting `{0}`")]
    UnknownField(String),

    #[error("unknown layout `{0}`")]
    UnknownLayout(String),

    /// The medium is too small to hold the layout image.
    #[error("the {layout} layout needs {needed} bytes but the medium holds {capacity}")]
    Capacity {
        layout: Layout,
        needed: usize,
        capacity: usize,
    },

    #[error("a {layout} image is {expected} bytes, got {actual}")]
    ImageLength {
        layout: Layout,
        expected: usize,
        actual: usize,
    },
}
