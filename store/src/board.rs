//! Hardware assignments of the supported boards.
//!
//! These are not part of the store contract, but a firmware image targeting
//! the same board needs them next to the layout it uses.

use core::fmt;

use serde::Serialize;

use crate::layout::Layout;

/// 7-bit address of the TMP102. On OpenScale it has ADR0 tied to VCC.
pub const TMP102_ADDRESS: u8 = 0x49;

/// An Arduino header pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "number", rename_all = "lowercase")]
pub enum Pin {
    Digital(u8),
    Analog(u8),
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pin::Digital(n) => write!(f, "D{n}"),
            Pin::Analog(n) => write!(f, "A{n}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Board {
    pub name: &'static str,
    /// HX711 DAT line.
    pub dat: Pin,
    /// HX711 CLK line.
    pub clk: Pin,
    /// Enable line of the 5V regulator feeding the HX711.
    pub amp_en: Option<Pin>,
    pub tmp102_address: Option<u8>,
}

pub const OPENSCALE: Board = Board {
    name: "openscale",
    dat: Pin::Digital(3),
    clk: Pin::Digital(2),
    amp_en: None,
    tmp102_address: None,
};

pub const POWER_REDUCTION: Board = Board {
    name: "power-reduction",
    dat: Pin::Digital(2),
    clk: Pin::Digital(3),
    amp_en: Some(Pin::Analog(2)),
    tmp102_address: Some(TMP102_ADDRESS),
};

impl Board {
    pub fn for_layout(layout: Layout) -> &'static Board {
        match layout {
            Layout::Standard => &OPENSCALE,
            Layout::Extended => &POWER_REDUCTION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boards_swap_data_and_clock() {
        assert_eq!(OPENSCALE.dat, POWER_REDUCTION.clk);
        assert_eq!(OPENSCALE.clk, POWER_REDUCTION.dat);
        assert_eq!("A2", POWER_REDUCTION.amp_en.unwrap().to_string());
    }

    #[test]
    fn serialized_pins() {
        let json = serde_json::to_value(Board::for_layout(Layout::Extended)).unwrap();
        assert_eq!(serde_json::json!({ "kind": "digital", "number": 2 }), json["dat"]);
        assert_eq!(serde_json::json!(0x49), json["tmp102_address"]);
        assert!(serde_json::to_value(&OPENSCALE).unwrap()["amp_en"].is_null());
    }
}
