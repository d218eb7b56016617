use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// The platforms this tool knows how to dump.
///
/// The lowercase identifier doubles as the CLI value, the config section name,
/// and the per-vendor output directory name.
#[derive(Debug, derive_more::Display, clap::ValueEnum, enumset::EnumSetType)]
#[clap(rename_all = "lower")]
pub enum Vendor {
    /// Solar-inverter cloud platform (signed REST API).
    #[display("solarcloud")]
    SolarCloud,

    /// Utility smart-meter platform (half-hourly consumption).
    #[display("utilitymeter")]
    UtilityMeter,

    /// EV-charger/energy-monitor platform (minute-resolution samples).
    #[display("energymonitor")]
    EnergyMonitor,
}

impl Vendor {
    /// Output file path for one day: `{base_dir}/{vendor}/{date}.tsv`.
    #[must_use]
    pub fn output_path(self, base_dir: &Path, on: NaiveDate) -> PathBuf {
        base_dir.join(self.to_string()).join(format!("{on}.tsv"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_ok() {
        let on = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        assert_eq!(
            Vendor::SolarCloud.output_path(Path::new("dumps"), on),
            Path::new("dumps/solarcloud/2025-07-01.tsv"),
        );
    }
}
