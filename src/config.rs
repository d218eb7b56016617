//! TOML credentials file: one `basedir` plus one optional section per vendor.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::prelude::*;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Path prefix for all dump files.
    #[serde(rename = "basedir")]
    pub base_dir: PathBuf,

    #[serde(rename = "solarcloud")]
    pub solar_cloud: Option<SolarCloudCredentials>,

    #[serde(rename = "utilitymeter")]
    pub utility_meter: Option<UtilityMeterCredentials>,

    #[serde(rename = "energymonitor")]
    pub energy_monitor: Option<EnergyMonitorCredentials>,
}

impl Config {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("failed to parse `{}`", path.display()))
    }
}

#[derive(Debug, Deserialize)]
pub struct SolarCloudCredentials {
    #[serde(rename = "appid")]
    pub app_id: String,

    pub secret: String,
}

#[derive(Debug, Deserialize)]
pub struct UtilityMeterCredentials {
    pub account: String,

    #[serde(rename = "apikey")]
    pub api_key: String,

    /// Metering point administration number.
    pub mpan: String,

    /// Meter serial number.
    pub meter: String,
}

#[derive(Debug, Deserialize)]
pub struct EnergyMonitorCredentials {
    pub serial: String,

    #[serde(rename = "apikey")]
    pub api_key: String,
}
