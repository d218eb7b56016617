//! UtilityMeter client: half-hourly smart-meter consumption.

use std::path::Path;

use async_trait::async_trait;
use base64::prelude::{BASE64_STANDARD, Engine};
use chrono::{DateTime, Local, NaiveDate};
use itertools::Itertools;
use reqwest::Client;
use serde::{Deserialize, Serialize};

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

const COLUMNS: &[&str] = &[record::TIMESTAMP, record::TIME, record::FROM_GRID];

/// A day has at most 48 half-hour intervals.
const MAX_HALF_HOURS: usize = 48;

/// Anything larger than a day's worth of intervals, so a single page always
/// suffices.
const PAGE_SIZE: usize = 100;

#[derive(Debug)]
pub struct Api {
    client: Client,
    auth: Auth,
    account: String,
    mpan: String,
    meter: String,
}

impl Api {
    /// The Basic token is the base64 of `{api_key}:` (empty password),
    /// computed here rather than delegated to the transport.
    pub fn try_new(account: String, api_key: &str, mpan: String, meter: String) -> Result<Self> {
        let auth = Auth::Basic(BASE64_STANDARD.encode(format!("{api_key}:")));
        Ok(Self { client: client::try_new()?, auth, account, mpan, meter })
    }
}

#[async_trait]
impl Source for Api {
    type Payload = DailyConsumption;

    #[instrument(skip_all, fields(account = self.account.as_str(), on = ?on))]
    async fn fetch(&self, on: NaiveDate) -> Result<DailyConsumption> {
        info!("Fetching…");
        let url = format!(
            "https://api.utilitymeter.com/v1/electricity-meter-points/{}/meters/{}/consumption/",
            self.mpan, self.meter,
        );
        let query = ConsumptionQuery {
            period_from: format!("{on}T00:00:00Z"),
            period_to: format!("{on}T23:59:59Z"),
            page_size: PAGE_SIZE,
        };
        let page: ConsumptionPage = client::get_json(&self.client, &url, &query, Some(&self.auth))
            .await
            .context("failed to fetch the half-hourly consumption")?;
        info!(n_half_hours = page.results.len(), "Fetched");
        page.into_day(on)
    }

    fn normalize_and_write(&self, base_dir: &Path, day: &DailyConsumption) -> Result<OutputFile> {
        let path = Vendor::UtilityMeter.output_path(base_dir, day.on);
        tsv::write(&path, None, COLUMNS, &day.normalize())
    }
}

#[derive(Serialize)]
struct ConsumptionQuery {
    period_from: String,
    period_to: String,
    page_size: usize,
}

#[derive(Deserialize)]
pub struct ConsumptionPage {
    results: Vec<HalfHour>,
}

impl ConsumptionPage {
    /// Guards against unexpected pagination: one page must cover the whole
    /// day.
    fn into_day(self, on: NaiveDate) -> Result<DailyConsumption> {
        ensure!(
            self.results.len() <= MAX_HALF_HOURS,
            "expected at most {MAX_HALF_HOURS} half-hours per day, got {}",
            self.results.len(),
        );
        Ok(DailyConsumption { on, half_hours: self.results })
    }
}

#[derive(Deserialize)]
pub struct HalfHour {
    pub interval_start: DateTime<Local>,
    pub consumption: f64,
}

pub struct DailyConsumption {
    pub on: NaiveDate,
    pub half_hours: Vec<HalfHour>,
}

impl DailyConsumption {
    pub fn normalize(&self) -> Vec<Record> {
        self.half_hours
            .iter()
            .map(|half_hour| {
                Record::at(half_hour.interval_start).with(record::FROM_GRID, half_hour.consumption)
            })
            .sorted_by_key(Record::time)
            .collect()
    }
}
