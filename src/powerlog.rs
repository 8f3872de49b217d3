// Power-monitor log parser
//
// Reads the text output of a sampling power monitor. Each sample block opens
// with a "*** Sampled system activity (<timestamp>) ***" banner; the
// "CPU Power: <n> mW" lines that follow belong to that timestamp.
//
// Timestamps look like "Sun Nov  2 14:30:05 2025 -0700". Single-digit days
// are padded with an extra space, so runs of whitespace are collapsed before
// a second parse attempt. A weekday that disagrees with the date is ignored.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::loader::ensure_exists;

const TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S %Y %z";
const WITHOUT_WEEKDAY: &str = "%b %d %H:%M:%S %Y %z";

/// One CPU power reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerSample {
    pub timestamp: DateTime<FixedOffset>,
    pub cpu_power_mw: f64,
}

impl PowerSample {
    /// Wall-clock time at the monitored machine
    pub fn local_time(&self) -> NaiveDateTime {
        self.timestamp.naive_local()
    }
}

/// Parse a sample banner timestamp, tolerating irregular spacing
pub fn parse_timestamp(raw: &str, whitespace: &Regex) -> Option<DateTime<FixedOffset>> {
    let trimmed = raw.trim();
    if let Ok(ts) = DateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT) {
        return Some(ts);
    }
    let collapsed = whitespace.replace_all(trimmed, " ");
    if let Ok(ts) = DateTime::parse_from_str(&collapsed, TIMESTAMP_FORMAT) {
        return Some(ts);
    }
    let (_, rest) = collapsed.split_once(' ')?;
    DateTime::parse_from_str(rest, WITHOUT_WEEKDAY).ok()
}

/// Compiled line patterns
pub struct PowerLogParser {
    banner: Regex,
    power: Regex,
    whitespace: Regex,
}

impl PowerLogParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            banner: Regex::new(r"\*\*\* Sampled system activity \(([^)]+)\)")
                .context("Failed to compile sample banner pattern")?,
            power: Regex::new(r"CPU Power:\s+(\d+)\s+mW")
                .context("Failed to compile CPU power pattern")?,
            whitespace: Regex::new(r"\s+").context("Failed to compile whitespace pattern")?,
        })
    }

    /// Extract samples from log text
    ///
    /// Power lines before the first valid timestamp are ignored. An
    /// unparsable banner is warned about and leaves the current timestamp
    /// unchanged.
    pub fn parse(&self, text: &str) -> Vec<PowerSample> {
        let mut samples = Vec::new();
        let mut current: Option<DateTime<FixedOffset>> = None;

        for line in text.lines() {
            if let Some(caps) = self.banner.captures(line) {
                let raw = &caps[1];
                match parse_timestamp(raw, &self.whitespace) {
                    Some(ts) => current = Some(ts),
                    None => {
                        warn!(timestamp = raw, "Could not parse power log timestamp");
                        continue;
                    }
                }
            }

            if let (Some(caps), Some(ts)) = (self.power.captures(line), current) {
                if let Ok(mw) = caps[1].parse::<f64>() {
                    samples.push(PowerSample {
                        timestamp: ts,
                        cpu_power_mw: mw,
                    });
                }
            }
        }

        debug!(samples = samples.len(), "parsed power log");
        samples
    }
}

/// Read and parse a power-monitor log file
pub fn load_log(path: &Path) -> Result<Vec<PowerSample>> {
    ensure_exists(path)?;
    let text = fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;
    Ok(PowerLogParser::new()?.parse(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate, Timelike};

    const LOG: &str = "\
CPU Power: 999 mW
*** Sampled system activity (Sun Nov  2 14:30:05 2025 -0700) ***
**** Processor usage ****
CPU Power: 12450 mW
*** Sampled system activity (Wed Nov 12 14:30:06 2025 -0700) ***
CPU Power: 8000 mW
*** Sampled system activity (not a date) ***
CPU Power: 7000 mW
";

    #[test]
    fn test_parse_samples() {
        let samples = PowerLogParser::new().unwrap().parse(LOG);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].cpu_power_mw, 12450.0);
        assert_eq!(samples[0].local_time().second(), 5);
        assert_eq!(
            samples[0].local_time().date(),
            NaiveDate::from_ymd_opt(2025, 11, 2).unwrap()
        );
        assert_eq!(samples[1].local_time().date().day0(), 11);
    }

    #[test]
    fn test_unparsable_banner_keeps_previous_timestamp() {
        let samples = PowerLogParser::new().unwrap().parse(LOG);
        assert_eq!(samples[2].cpu_power_mw, 7000.0);
        assert_eq!(samples[2].timestamp, samples[1].timestamp);
    }

    #[test]
    fn test_power_before_timestamp_ignored() {
        let samples = PowerLogParser::new().unwrap().parse("CPU Power: 10 mW\n");
        assert!(samples.is_empty());
    }

    #[test]
    fn test_offset_preserved_in_local_time() {
        let ws = Regex::new(r"\s+").unwrap();
        let ts = parse_timestamp("Sun Nov 02 09:00:00 2025 +0000", &ws).unwrap();
        assert_eq!(ts.naive_local().hour(), 9);
        let ts = parse_timestamp("Sun Nov 02 09:00:00 2025 -0700", &ws).unwrap();
        assert_eq!(ts.naive_local().hour(), 9);
        assert_eq!(ts.naive_utc().hour(), 16);
    }

    #[test]
    fn test_wrong_weekday_tolerated() {
        let ws = Regex::new(r"\s+").unwrap();
        let ts = parse_timestamp("Sat Nov  2 14:30:05 2025 -0700", &ws).unwrap();
        assert_eq!(ts.naive_local().minute(), 30);
        assert!(parse_timestamp("Sat Nov 2 25:30:05 2025 -0700", &ws).is_none());
    }

    #[test]
    fn test_missing_log_file() {
        let err = load_log(Path::new("/no/such/power.txt")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
