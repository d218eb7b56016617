//! SolarCloud client: signed-header inverter cloud API.

mod models;
mod response;

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha512};

pub use self::models::{DailyEnergy, DailyReport, PowerSample, System};
use self::response::Response;
use crate::{
    api::{client, source::Source},
    prelude::*,
    record,
    tsv::{self, OutputFile},
    vendor::Vendor,
};

const COLUMNS: &[&str] = &[
    record::TIMESTAMP,
    record::TIME,
    record::FROM_PV,
    record::TO_GRID,
    record::FROM_GRID,
    record::HOUSE_LOAD,
    record::TO_BATTERY,
    record::FROM_BATTERY,
    record::BATTERY_CHARGE,
];

#[derive(Debug)]
pub struct Api {
    client: Client,
}

impl Api {
    /// The signature covers the whole run: `timestamp` is captured once at
    /// startup, so every request of one invocation shares its validity window.
    pub fn try_new(app_id: &str, secret: &str, timestamp: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("appId", HeaderValue::from_str(app_id)?);
        headers.insert("timeStamp", HeaderValue::from_str(timestamp)?);
        headers.insert("sign", HeaderValue::from_str(&sign(app_id, secret, timestamp))?);
        let client = Client::builder()
            .user_agent("magpie")
            .default_headers(headers)
            .timeout(client::TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    #[instrument(skip_all)]
    pub async fn get_systems(&self) -> Result<Vec<System>> {
        self.call("getSystemList", client::NO_QUERY).await.context("failed to list the systems")
    }

    #[instrument(skip_all, fields(serial_number = serial_number))]
    pub async fn get_daily_power(
        &self,
        serial_number: &str,
        on: NaiveDate,
    ) -> Result<Vec<PowerSample>> {
        self.call("getOneDayPowerBySn", &DailyQuery { serial_number, date: on })
            .await
            .context("failed to fetch the daily power samples")
    }

    #[instrument(skip_all, fields(serial_number = serial_number))]
    pub async fn get_daily_energy(
        &self,
        serial_number: &str,
        on: NaiveDate,
    ) -> Result<DailyEnergy> {
        self.call("getOneDayEnergyBySn", &DailyQuery { serial_number, date: on })
            .await
            .context("failed to fetch the daily energy totals")
    }

    #[instrument(skip_all, level = Level::DEBUG, fields(path = path))]
    async fn call<Q, R>(&self, path: &str, query: &Q) -> Result<R>
    where
        Q: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("https://openapi.solarcloud.com/api/{path}");
        let response: Response<R> = client::get_json(&self.client, &url, query, None).await?;
        Result::from(response)
    }
}

#[async_trait]
impl Source for Api {
    type Payload = DailyReport;

    #[instrument(skip_all, fields(on = ?on))]
    async fn fetch(&self, on: NaiveDate) -> Result<DailyReport> {
        info!("Fetching…");
        let system = sole_system(self.get_systems().await?)?;
        let power = self.get_daily_power(&system.serial_number, on).await?;
        let energy = self.get_daily_energy(&system.serial_number, on).await?;
        info!(n_samples = power.len(), "Fetched");
        Ok(DailyReport { on, power, energy })
    }

    fn normalize_and_write(&self, base_dir: &Path, report: &DailyReport) -> Result<OutputFile> {
        tsv::write(
            &Vendor::SolarCloud.output_path(base_dir, report.on),
            Some(&report.energy.summarize(report.on)),
            COLUMNS,
            &report.normalize()?,
        )
    }
}

/// The dump layout has no place for a second serial, so a multi-system
/// account is refused before any per-system call is made.
fn sole_system(mut systems: Vec<System>) -> Result<System> {
    ensure!(
        systems.len() == 1,
        "expected exactly one system on the account, got {}",
        systems.len(),
    );
    Ok(systems.remove(0))
}

fn sign(app_id: &str, secret: &str, timestamp: &str) -> String {
    Sha512::digest(format!("{app_id}{secret}{timestamp}"))
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[derive(Serialize)]
struct DailyQuery<'a> {
    #[serde(rename = "sysSn")]
    serial_number: &'a str,

    #[serde(rename = "queryDate")]
    date: NaiveDate,
}
