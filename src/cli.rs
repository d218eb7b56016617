use std::path::PathBuf;

use chrono::{Days, Local, NaiveDate};
use clap::Parser;
use enumset::EnumSet;

use crate::{prelude::*, vendor::Vendor};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    /// Target day: `YYYY-MM-DD`, or the literal `yesterday` for the previous
    /// local date.
    #[clap(value_parser = parse_date)]
    pub date: NaiveDate,

    /// Vendors to dump, repeatable.
    #[clap(
        long = "source",
        env = "MAGPIE_SOURCES",
        value_delimiter = ',',
        num_args = 1..,
        default_value = "solarcloud,utilitymeter,energymonitor",
    )]
    pub sources: Vec<Vendor>,

    /// Credentials file.
    #[clap(long, env = "MAGPIE_CONFIG", default_value = "magpie.toml")]
    pub config: PathBuf,

    #[clap(long = "log-level", env = "MAGPIE_LOG_LEVEL", default_value = "info")]
    pub log_level: Level,
}

impl Args {
    #[must_use]
    pub fn sources(&self) -> EnumSet<Vendor> {
        self.sources.iter().copied().collect()
    }
}

/// Resolve `yesterday` before validating, so the resolved date goes through
/// the same `YYYY-MM-DD` contract as an explicit one.
fn parse_date(input: &str) -> Result<NaiveDate, String> {
    if input == "yesterday" {
        return Local::now()
            .date_naive()
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| "there is no yesterday at the dawn of time".to_owned());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|error| format!("`{input}` is not a `YYYY-MM-DD` date: {error}"))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_command() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_explicit_date() -> Result {
        let args = Args::try_parse_from(["magpie", "2025-07-01"])?;
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2025, 7, 1).context("bad date")?);
        Ok(())
    }

    #[test]
    fn test_yesterday_resolves_to_local_yesterday() -> Result {
        // Capture the bounds around the call, in case this runs at midnight.
        let before = Local::now().date_naive();
        let resolved = parse_date("yesterday").map_err(Error::msg)?;
        let after = Local::now().date_naive();
        let low = before.checked_sub_days(Days::new(1)).context("dawn of time")?;
        let high = after.checked_sub_days(Days::new(1)).context("dawn of time")?;
        assert!(resolved == low || resolved == high);
        Ok(())
    }

    #[test]
    fn test_invalid_dates() {
        assert!(parse_date("2025-13-01").is_err());
        assert!(parse_date("01-07-2025").is_err());
        assert!(parse_date("tomorrow").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn test_default_sources() -> Result {
        let args = Args::try_parse_from(["magpie", "yesterday"])?;
        assert_eq!(args.sources(), EnumSet::all());
        Ok(())
    }

    #[test]
    fn test_sources_deduplicate() -> Result {
        let args = Args::try_parse_from([
            "magpie",
            "2025-07-01",
            "--source",
            "solarcloud",
            "--source",
            "solarcloud",
        ])?;
        assert_eq!(args.sources().len(), 1);
        assert!(args.sources().contains(Vendor::SolarCloud));
        Ok(())
    }
}
