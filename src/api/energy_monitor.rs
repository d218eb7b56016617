//! EnergyMonitor client: per-minute charger telemetry behind Digest auth.

use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use chrono::{Local, NaiveDate, TimeZone, Utc};
use itertools::Itertools;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    api::{
        client::{self, Auth},
        source::Source,
    },
    prelude::*,
    record::{self, Record},
    tsv::{self, OutputFile},
    vendor::Vendor,
};

const COLUMNS: &[&str] = &[
    record::TIMESTAMP,
    record::TIME,
    record::TO_GRID_JOULES,
    record::FROM_GRID_JOULES,
    record::VOLTAGE,
    record::FREQUENCY,
];

/// One sample per minute, plus one boundary sample.
const MAX_SAMPLES: usize = 1441;

#[derive(Debug)]
pub struct Api {
    client: Client,
    auth: Auth,
    serial: String,
}

impl Api {
    pub fn try_new(serial: String, api_key: &str) -> Result<Self> {
        let auth = Auth::Digest { username: serial.clone(), password: api_key.to_owned() };
        Ok(Self { client: client::try_new()?, auth, serial })
    }
}

#[async_trait]
impl Source for Api {
    type Payload = DailyReadings;

    #[instrument(skip_all, fields(serial = self.serial.as_str(), on = ?on))]
    async fn fetch(&self, on: NaiveDate) -> Result<DailyReadings> {
        info!("Fetching…");
        let key = format!("U{}", self.serial);
        let url = format!("https://director.energymonitor.net/cgi-jday-{key}-{on}");
        let mut response: HashMap<String, Vec<MinuteSample>> =
            client::get_json(&self.client, &url, client::NO_QUERY, Some(&self.auth))
                .await
                .context("failed to fetch the daily readings")?;
        let samples = response
            .remove(&key)
            .with_context(|| format!("the response is missing the `{key}` key"))?;
        info!(n_samples = samples.len(), "Fetched");
        DailyReadings::try_new(on, samples)
    }

    fn normalize_and_write(&self, base_dir: &Path, readings: &DailyReadings) -> Result<OutputFile> {
        let path = Vendor::EnergyMonitor.output_path(base_dir, readings.on);
        tsv::write(&path, None, COLUMNS, &readings.normalize()?)
    }
}

/// One minute of the device counters. The device omits zero fields, hence the
/// defaults.
#[derive(Deserialize)]
pub struct MinuteSample {
    #[serde(rename = "yr")]
    pub year: i32,

    #[serde(rename = "mon")]
    pub month: u32,

    #[serde(rename = "dom")]
    pub day_of_month: u32,

    #[serde(rename = "hr", default)]
    pub hour: u32,

    #[serde(rename = "min", default)]
    pub minute: u32,

    #[serde(rename = "imp", default)]
    pub imported: i64,

    #[serde(rename = "exp", default)]
    pub exported: i64,

    #[serde(rename = "v1")]
    pub voltage: f64,

    #[serde(rename = "frq")]
    pub frequency: f64,
}

impl MinuteSample {
    pub fn normalize(&self) -> Result<Record> {
        let time = Utc
            .with_ymd_and_hms(self.year, self.month, self.day_of_month, self.hour, self.minute, 0)
            .single()
            .with_context(|| {
                format!(
                    "invalid sample time: {}-{}-{} {}:{}",
                    self.year, self.month, self.day_of_month, self.hour, self.minute,
                )
            })?;
        Ok(Record::at(time.with_timezone(&Local))
            .with(record::TO_GRID_JOULES, self.exported)
            .with(record::FROM_GRID_JOULES, self.imported)
            .with(record::VOLTAGE, self.voltage)
            .with(record::FREQUENCY, self.frequency))
    }
}

pub struct DailyReadings {
    pub on: NaiveDate,
    pub samples: Vec<MinuteSample>,
}

impl DailyReadings {
    /// Sanity bound on the minute resolution.
    fn try_new(on: NaiveDate, samples: Vec<MinuteSample>) -> Result<Self> {
        ensure!(
            samples.len() <= MAX_SAMPLES,
            "expected at most {MAX_SAMPLES} samples per day, got {}",
            samples.len(),
        );
        Ok(Self { on, samples })
    }

    pub fn normalize(&self) -> Result<Vec<Record>> {
        Ok(self
            .samples
            .iter()
            .map(MinuteSample::normalize)
            .collect::<Result<Vec<Record>>>()?
            .into_iter()
            .sorted_by_key(Record::time)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(minute: u32) -> MinuteSample {
        MinuteSample {
            year: 2025,
            month: 7,
            day_of_month: 1,
            hour: 10,
            minute,
            imported: 0,
            exported: 0,
            voltage: 230.0,
            frequency: 50.0,
        }
    }

    #[test]
    fn test_minute_resolution_bound() -> Result {
        let on = NaiveDate::from_ymd_opt(2025, 7, 1).context("bad date")?;
        assert!(
            DailyReadings::try_new(on, (0..=1440).map(|i| sample(i % 60)).collect()).is_ok()
        );
        assert!(
            DailyReadings::try_new(on, (0..=1441).map(|i| sample(i % 60)).collect()).is_err()
        );
        Ok(())
    }

    #[test]
    fn test_omitted_fields_default_to_zero() -> Result {
        // language=JSON
        let sample: MinuteSample = serde_json::from_str(
            r#"{"yr": 2025, "mon": 7, "dom": 1, "v1": 233.1, "frq": 49.97}"#,
        )?;
        assert_eq!(sample.hour, 0);
        assert_eq!(sample.minute, 0);
        assert_eq!(sample.imported, 0);
        assert_eq!(sample.exported, 0);
        let record = sample.normalize()?;
        assert_eq!(record.render(record::TO_GRID_JOULES).context("no to-grid")?, "0");
        assert_eq!(record.render(record::FROM_GRID_JOULES).context("no from-grid")?, "0");
        Ok(())
    }

    #[test]
    fn test_normalize_sorts_and_maps() -> Result {
        // language=JSON
        let samples: Vec<MinuteSample> = serde_json::from_str(
            r#"[
                {"yr": 2025, "mon": 7, "dom": 1, "hr": 10, "min": 31, "imp": 73620, "exp": 120, "v1": 233.1, "frq": 49.97},
                {"yr": 2025, "mon": 7, "dom": 1, "hr": 10, "min": 30, "imp": 73500, "exp": 0, "v1": 232.8, "frq": 50.02}
            ]"#,
        )?;
        let on = NaiveDate::from_ymd_opt(2025, 7, 1).context("bad date")?;
        let records = DailyReadings::try_new(on, samples)?.normalize()?;
        assert!(records.iter().is_sorted_by_key(Record::time));
        assert_eq!(records[0].render(record::FROM_GRID_JOULES).context("no from-grid")?, "73500");
        assert_eq!(records[1].render(record::TO_GRID_JOULES).context("no to-grid")?, "120");
        assert_eq!(records[0].render(record::VOLTAGE).context("no voltage")?, "232.8");
        assert_eq!(records[1].render(record::FREQUENCY).context("no frequency")?, "49.97");
        Ok(())
    }

    #[test]
    fn test_utc_components_become_local() -> Result {
        let record = sample(30).normalize()?;
        let expected = Utc.with_ymd_and_hms(2025, 7, 1, 10, 30, 0).single().context("bad time")?;
        assert_eq!(record.time(), expected);
        Ok(())
    }
}
