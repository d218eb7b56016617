use chrono::{Local, NaiveDate, NaiveDateTime};
use itertools::Itertools;
use serde::Deserialize;

use crate::{
    prelude::*,
    record::{self, Record},
};

#[derive(Deserialize)]
pub struct System {
    #[serde(rename = "sysSn")]
    pub serial_number: String,
}

/// One intraday sample from the daily-power endpoint. Unmapped vendor fields
/// are dropped at deserialization.
#[derive(Deserialize)]
pub struct PowerSample {
    /// Naive local wall-clock time, `2025-07-01 10:30:00`.
    #[serde(rename = "uploadTime")]
    pub upload_time: String,

    #[serde(rename = "ppv")]
    pub from_pv: f64,

    #[serde(rename = "feedIn")]
    pub to_grid: f64,

    #[serde(rename = "gridCharge")]
    pub from_grid: f64,

    #[serde(rename = "load")]
    pub house_load: f64,

    #[serde(rename = "cbat")]
    pub battery_charge: f64,
}

impl PowerSample {
    /// Map the sample onto the canonical fields and derive the battery flows
    /// from the generation/consumption balance.
    pub fn normalize(&self) -> Result<Record> {
        let time = NaiveDateTime::parse_from_str(&self.upload_time, "%Y-%m-%d %H:%M:%S")
            .with_context(|| format!("failed to parse the sample time `{}`", self.upload_time))?
            .and_local_timezone(Local)
            .single()
            .with_context(|| {
                format!("the sample time `{}` is not a valid local time", self.upload_time)
            })?;
        let generated = self.from_pv + self.from_grid;
        let consumed = self.to_grid + self.house_load;
        Ok(Record::at(time)
            .with(record::FROM_PV, self.from_pv)
            .with(record::TO_GRID, self.to_grid)
            .with(record::FROM_GRID, self.from_grid)
            .with(record::HOUSE_LOAD, self.house_load)
            .with(record::TO_BATTERY, (generated - consumed).max(0.0))
            .with(record::FROM_BATTERY, (consumed - generated).max(0.0))
            .with(record::BATTERY_CHARGE, self.battery_charge))
    }
}

/// Day-total aggregates from the daily-energy endpoint.
#[derive(Deserialize)]
pub struct DailyEnergy {
    #[serde(rename = "epv")]
    pub from_pv: f64,

    #[serde(rename = "eOutput")]
    pub to_grid: f64,

    #[serde(rename = "eInput")]
    pub from_grid: f64,

    #[serde(rename = "eCharge")]
    pub to_battery: f64,

    #[serde(rename = "eDischarge")]
    pub from_battery: f64,
}

impl DailyEnergy {
    /// Comment line placed above the column header.
    pub fn summarize(&self, on: NaiveDate) -> String {
        format!(
            "# {on} from-pv={} to-grid={} from-grid={} to-battery={} from-battery={}",
            self.from_pv, self.to_grid, self.from_grid, self.to_battery, self.from_battery,
        )
    }
}

/// Everything fetched for one day: intraday samples plus the day totals.
pub struct DailyReport {
    pub on: NaiveDate,
    pub power: Vec<PowerSample>,
    pub energy: DailyEnergy,
}

impl DailyReport {
    pub fn normalize(&self) -> Result<Vec<Record>> {
        Ok(self
            .power
            .iter()
            .map(PowerSample::normalize)
            .collect::<Result<Vec<Record>>>()?
            .into_iter()
            .sorted_by_key(Record::time)
            .collect())
    }
}
