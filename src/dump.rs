//! Sequential per-vendor orchestration: construct, fetch, write, next.

use std::path::Path;

use chrono::{NaiveDate, Utc};
use enumset::EnumSet;

use crate::{
    api::{EnergyMonitor, SolarCloud, Source, UtilityMeter},
    config::Config,
    prelude::*,
    tsv::OutputFile,
    vendor::Vendor,
};

pub struct Report {
    pub vendor: Vendor,
    pub file: OutputFile,
}

/// Dump each selected vendor in turn. The first failure aborts the whole run:
/// there is no partial-success mode, callers wanting per-vendor isolation
/// invoke the tool once per vendor instead.
#[instrument(skip_all, fields(on = ?on))]
pub async fn run(config: &Config, on: NaiveDate, vendors: EnumSet<Vendor>) -> Result<Vec<Report>> {
    // One timestamp for the whole run: every signed SolarCloud request shares
    // the same validity window.
    let timestamp = Utc::now().timestamp().to_string();
    let adapters = vendors
        .iter()
        .map(|vendor| Ok((vendor, Adapter::try_new(config, vendor, &timestamp)?)))
        .collect::<Result<Vec<_>>>()?;

    let mut reports = Vec::with_capacity(adapters.len());
    for (vendor, adapter) in adapters {
        info!(%vendor, "dumping…");
        let file = adapter.dump(&config.base_dir, on).await?;
        info!(%vendor, n_records = file.n_records, "dumped");
        reports.push(Report { vendor, file });
    }
    Ok(reports)
}

#[derive(Debug)]
enum Adapter {
    SolarCloud(SolarCloud),
    UtilityMeter(UtilityMeter),
    EnergyMonitor(EnergyMonitor),
}

impl Adapter {
    /// Resolves the vendor's credentials, so that a missing config section
    /// fails the run before any network activity.
    fn try_new(config: &Config, vendor: Vendor, timestamp: &str) -> Result<Self> {
        match vendor {
            Vendor::SolarCloud => {
                let credentials = config
                    .solar_cloud
                    .as_ref()
                    .context("missing `solarcloud` section in the config")?;
                Ok(Self::SolarCloud(SolarCloud::try_new(
                    &credentials.app_id,
                    &credentials.secret,
                    timestamp,
                )?))
            }

            Vendor::UtilityMeter => {
                let credentials = config
                    .utility_meter
                    .as_ref()
                    .context("missing `utilitymeter` section in the config")?;
                Ok(Self::UtilityMeter(UtilityMeter::try_new(
                    credentials.account.clone(),
                    &credentials.api_key,
                    credentials.mpan.clone(),
                    credentials.meter.clone(),
                )?))
            }

            Vendor::EnergyMonitor => {
                let credentials = config
                    .energy_monitor
                    .as_ref()
                    .context("missing `energymonitor` section in the config")?;
                Ok(Self::EnergyMonitor(EnergyMonitor::try_new(
                    credentials.serial.clone(),
                    &credentials.api_key,
                )?))
            }
        }
    }

    async fn dump(&self, base_dir: &Path, on: NaiveDate) -> Result<OutputFile> {
        match self {
            Self::SolarCloud(api) => api.dump(base_dir, on).await,
            Self::UtilityMeter(api) => api.dump(base_dir, on).await,
            Self::EnergyMonitor(api) => api.dump(base_dir, on).await,
        }
    }
}
