//! Canonical per-timestamp record shape shared by all vendor dumps.

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

use chrono::{DateTime, Local, SecondsFormat};

/// Epoch-seconds column, always first.
pub const TIMESTAMP: &str = "ts";

/// ISO-local column, always second.
pub const TIME: &str = "time";

pub const FROM_PV: &str = "from-pv(Wh)";
pub const TO_GRID: &str = "to-grid(Wh)";
pub const FROM_GRID: &str = "from-grid(Wh)";
pub const HOUSE_LOAD: &str = "house-load(Wh)";
pub const TO_BATTERY: &str = "to-battery(Wh)";
pub const FROM_BATTERY: &str = "from-battery(Wh)";
pub const BATTERY_CHARGE: &str = "battery-charge(%)";
pub const TO_GRID_JOULES: &str = "to-grid(J)";
pub const FROM_GRID_JOULES: &str = "from-grid(J)";
pub const VOLTAGE: &str = "voltage(V)";
pub const FREQUENCY: &str = "frequency(Hz)";

/// One normalized time-sample: the local timestamp plus the vendor's mapped
/// values under canonical field names.
///
/// The timestamp pair (`ts`, `time`) is derived from [`Record::time`] at
/// serialization, so every record carries it implicitly.
#[derive(Debug)]
pub struct Record {
    time: DateTime<Local>,
    values: BTreeMap<&'static str, Value>,
}

impl Record {
    #[must_use]
    pub fn at(time: DateTime<Local>) -> Self {
        Self { time, values: BTreeMap::new() }
    }

    #[must_use]
    pub fn with(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.values.insert(field, value.into());
        self
    }

    #[must_use]
    pub const fn time(&self) -> DateTime<Local> {
        self.time
    }

    /// Every field this record carries, the implicit timestamp pair included.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        [TIMESTAMP, TIME].into_iter().chain(self.values.keys().copied())
    }

    /// Render one field. The rendering is deterministic: re-serializing the
    /// same record always yields the same bytes.
    #[must_use]
    pub fn render(&self, field: &str) -> Option<String> {
        match field {
            TIMESTAMP => Some(self.time.timestamp().to_string()),
            TIME => Some(self.time.to_rfc3339_opts(SecondsFormat::Secs, false)),
            _ => self.values.get(field).map(Value::to_string),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn test_timestamp_pair_ok() {
        let record = Record::at(Utc.with_ymd_and_hms(2025, 7, 1, 10, 30, 0).unwrap().into());
        assert_eq!(record.render(TIMESTAMP).unwrap(), "1751365800");
        let time = DateTime::parse_from_rfc3339(&record.render(TIME).unwrap()).unwrap();
        assert_eq!(time, record.time());
    }

    #[test]
    fn test_render_values_ok() {
        let record = Record::at(Local::now())
            .with(FROM_PV, 510.0)
            .with(BATTERY_CHARGE, 9.5)
            .with(FROM_GRID_JOULES, 73_620_i64);
        assert_eq!(record.render(FROM_PV).unwrap(), "510");
        assert_eq!(record.render(BATTERY_CHARGE).unwrap(), "9.5");
        assert_eq!(record.render(FROM_GRID_JOULES).unwrap(), "73620");
        assert_eq!(record.render(VOLTAGE), None);
    }

    #[test]
    fn test_fields_include_timestamp_pair() {
        let record = Record::at(Local::now()).with(VOLTAGE, 241.2);
        let fields: Vec<_> = record.fields().collect();
        assert_eq!(fields, [TIMESTAMP, TIME, VOLTAGE]);
    }
}
