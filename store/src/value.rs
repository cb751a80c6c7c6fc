use core::fmt;

use serde::{Deserialize, Serialize};

pub const UNITS_KG: u8 = 0;
pub const UNITS_LBS: u8 = 1;

/// Unit the scale reports mass in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MassUnit {
    Kg,
    Lbs,
}

impl MassUnit {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            UNITS_KG => Some(MassUnit::Kg),
            UNITS_LBS => Some(MassUnit::Lbs),
            _ => None,
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            MassUnit::Kg => UNITS_KG,
            MassUnit::Lbs => UNITS_LBS,
        }
    }
}

impl fmt::Display for MassUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MassUnit::Kg => f.write_str("kg"),
            MassUnit::Lbs => f.write_str("lbs"),
        }
    }
}

/// A setting value as read from or written to the store.
///
/// Writes accept any variant that can represent a valid value for the field
/// (a flag may be given as `Unsigned(0)`, a calibration factor as
/// `Unsigned(7050)`). Reads always return the canonical variant for the field.
/// A mass unit or flag byte holding an undefined raw value reads back as
/// `Unsigned` so that validation can reject it.
///
/// The untagged serde representation maps booleans to `Flag`, `"kg"`/`"lbs"`
/// to `Unit` and integers to `Unsigned` or, when negative, `Signed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Flag(bool),
    Unit(MassUnit),
    Unsigned(u32),
    Signed(i32),
}

impl Value {
    /// The value as a non-negative integer, if it is one.
    pub(crate) fn as_unsigned(self) -> Option<u32> {
        match self {
            Value::Unsigned(v) => Some(v),
            Value::Signed(v) => u32::try_from(v).ok(),
            Value::Flag(_) | Value::Unit(_) => None,
        }
    }

    /// The value as a signed 32-bit integer, if it fits.
    pub(crate) fn as_signed(self) -> Option<i32> {
        match self {
            Value::Signed(v) => Some(v),
            Value::Unsigned(v) => i32::try_from(v).ok(),
            Value::Flag(_) | Value::Unit(_) => None,
        }
    }

    pub(crate) fn is_integer(self) -> bool {
        matches!(self, Value::Unsigned(_) | Value::Signed(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Flag(v) => write!(f, "{v}"),
            Value::Unit(v) => write!(f, "{v}"),
            Value::Unsigned(v) => write!(f, "{v}"),
            Value::Signed(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Flag(v)
    }
}

impl From<MassUnit> for Value {
    fn from(v: MassUnit) -> Self {
        Value::Unit(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Unsigned(v.into())
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Unsigned(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Unsigned(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Signed(v)
    }
}
