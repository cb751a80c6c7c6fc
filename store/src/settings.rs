use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::layout::{Field, Layout};
use crate::value::{MassUnit, Value};

/// Decoded settings record.
///
/// The temperature and status flags only exist in [`Layout::Extended`]; a
/// standard store ignores them on save and reports their defaults on load.
///
/// Missing keys deserialize to their factory default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mass_unit: MassUnit,
    /// Milliseconds between reports.
    pub report_rate: u16,
    pub calibration_factor: i32,
    pub baud_rate: u32,
    /// Raw ADC reading at zero load.
    pub tare_point: i32,
    pub timestamp: bool,
    pub decimal_places: u8,
    /// Number of readings averaged per report.
    pub average_amount: u8,
    pub local_temp_enable: bool,
    pub remote_temp_enable: bool,
    pub status_enable: bool,
}

impl Default for Settings {
    /// Factory defaults.
    fn default() -> Self {
        Self {
            mass_unit: MassUnit::Lbs,
            report_rate: 200,
            calibration_factor: -7050,
            baud_rate: 9600,
            tare_point: 0,
            timestamp: true,
            decimal_places: 2,
            average_amount: 4,
            local_temp_enable: true,
            remote_temp_enable: false,
            status_enable: true,
        }
    }
}

impl Settings {
    pub fn get(&self, field: Field) -> Value {
        match field {
            Field::MassUnit => self.mass_unit.into(),
            Field::ReportRate => self.report_rate.into(),
            Field::CalibrationFactor => self.calibration_factor.into(),
            Field::BaudRate => self.baud_rate.into(),
            Field::TarePoint => self.tare_point.into(),
            Field::Timestamp => self.timestamp.into(),
            Field::DecimalPlaces => self.decimal_places.into(),
            Field::AverageAmount => self.average_amount.into(),
            Field::LocalTempEnable => self.local_temp_enable.into(),
            Field::RemoteTempEnable => self.remote_temp_enable.into(),
            Field::StatusEnable => self.status_enable.into(),
        }
    }

    /// Validates `value` against the field domain and stores it.
    ///
    /// On error `self` is left untouched.
    pub fn set(&mut self, field: Field, value: Value) -> Result<(), StoreError> {
        let value = field.spec().kind.canonical(field, value)?;
        let mismatch = StoreError::TypeMismatch { field, value };

        match (field, value) {
            (Field::MassUnit, Value::Unit(v)) => self.mass_unit = v,
            (Field::ReportRate, Value::Unsigned(v)) => {
                self.report_rate = u16::try_from(v).map_err(|_| mismatch)?
            }
            (Field::CalibrationFactor, Value::Signed(v)) => self.calibration_factor = v,
            (Field::BaudRate, Value::Unsigned(v)) => self.baud_rate = v,
            (Field::TarePoint, Value::Signed(v)) => self.tare_point = v,
            (Field::Timestamp, Value::Flag(v)) => self.timestamp = v,
            (Field::DecimalPlaces, Value::Unsigned(v)) => {
                self.decimal_places = u8::try_from(v).map_err(|_| mismatch)?
            }
            (Field::AverageAmount, Value::Unsigned(v)) => {
                self.average_amount = u8::try_from(v).map_err(|_| mismatch)?
            }
            (Field::LocalTempEnable, Value::Flag(v)) => self.local_temp_enable = v,
            (Field::RemoteTempEnable, Value::Flag(v)) => self.remote_temp_enable = v,
            (Field::StatusEnable, Value::Flag(v)) => self.status_enable = v,
            _ => return Err(mismatch),
        }

        Ok(())
    }

    /// Checks every field of `layout` against its domain.
    pub fn validate(&self, layout: Layout) -> Result<(), StoreError> {
        for spec in layout.fields() {
            spec.kind.encode(spec.field, self.get(spec.field))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert_eq!(Ok(()), settings.validate(Layout::Standard));
        assert_eq!(Ok(()), settings.validate(Layout::Extended));
    }

    #[test]
    fn set_and_get() {
        let mut settings = Settings::default();
        settings.set(Field::BaudRate, Value::Unsigned(115_200)).unwrap();
        settings.set(Field::MassUnit, Value::Unsigned(0)).unwrap();
        settings.set(Field::Timestamp, Value::Flag(false)).unwrap();

        assert_eq!(Value::Unsigned(115_200), settings.get(Field::BaudRate));
        assert_eq!(MassUnit::Kg, settings.mass_unit);
        assert!(!settings.timestamp);
    }

    #[test]
    fn set_rejects_invalid_values() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.set(Field::DecimalPlaces, Value::Unsigned(5)),
            Err(StoreError::OutOfRange { .. })
        ));
        assert!(matches!(
            settings.set(Field::AverageAmount, Value::Unsigned(0)),
            Err(StoreError::OutOfRange { .. })
        ));
        assert_eq!(Settings::default(), settings);
    }

    #[test]
    fn validate_reports_bad_baud() {
        let settings = Settings {
            baud_rate: 300,
            ..Settings::default()
        };
        assert_eq!(
            Err(StoreError::OutOfRange {
                field: Field::BaudRate,
                value: Value::Unsigned(300)
            }),
            settings.validate(Layout::Standard)
        );
    }

    #[test]
    fn partial_json_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "mass_unit": "kg", "baud_rate": 57600 }"#).unwrap();
        assert_eq!(MassUnit::Kg, settings.mass_unit);
        assert_eq!(57_600, settings.baud_rate);
        assert_eq!(200, settings.report_rate);
    }
}
