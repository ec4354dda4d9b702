//! Daily and hourly measure rows.

use std::fmt;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::{parse_daily_dataset, parse_hourly_dataset};
use crate::error::Result;


/// Date format used by the portal for daily categories.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format of the `iso_date` field (local time, no offset).
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Separator used when hourly flags are stored as a single column.
pub const FLAG_DELIMITER: &str = "|";


/// Granularity of a consumption dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Daily,
    Hourly,
}


impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Daily => "daily",
            Metric::Hourly => "hourly",
        }
    }
}


impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


/// A row type that can be parsed from a portal payload.
pub trait Measure: Sized {
    const METRIC: Metric;

    /// Epoch seconds; the natural key of the row.
    fn timestamp(&self) -> i64;

    /// Turn a raw endpoint payload into rows, preserving input order.
    fn parse_dataset(raw: &Value) -> Result<Vec<Self>>;
}


/// One day of consumption with the weather the portal reports for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMeasure {
    pub ts: i64,
    pub iso_date: String,
    /// The `YYYY-MM-DD` category label.
    pub category: String,
    pub consumption: f64,
    pub temperature: Option<f64>,
    pub precipitation: Option<f64>,
}


impl DailyMeasure {
    /// Rebuild a row from stored columns, deriving the date fields from `ts`.
    pub fn from_stored(
        ts: i64,
        consumption: f64,
        temperature: Option<f64>,
        precipitation: Option<f64>,
    ) -> Option<Self> {
        let dt = local_datetime(ts)?;
        Some(Self {
            ts,
            iso_date: dt.format(ISO_FORMAT).to_string(),
            category: dt.format(DATE_FORMAT).to_string(),
            consumption,
            temperature,
            precipitation,
        })
    }
}


impl Measure for DailyMeasure {
    const METRIC: Metric = Metric::Daily;

    fn timestamp(&self) -> i64 {
        self.ts
    }

    fn parse_dataset(raw: &Value) -> Result<Vec<Self>> {
        parse_daily_dataset(raw)
    }
}


/// One hourly meter reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyMeasure {
    pub ts: i64,
    pub iso_date: String,
    pub gallons: f64,
    pub leak_gallons: Option<f64>,
    /// `None` when the portal sent no flags; `Some(vec![])` for an empty list.
    pub flags: Option<Vec<String>>,
}


impl HourlyMeasure {
    pub fn from_stored(
        ts: i64,
        gallons: f64,
        leak_gallons: Option<f64>,
        flags: Option<String>,
    ) -> Option<Self> {
        let dt = local_datetime(ts)?;
        Some(Self {
            ts,
            iso_date: dt.format(ISO_FORMAT).to_string(),
            gallons,
            leak_gallons,
            flags: decode_flags(flags),
        })
    }
}


impl Measure for HourlyMeasure {
    const METRIC: Metric = Metric::Hourly;

    fn timestamp(&self) -> i64 {
        self.ts
    }

    fn parse_dataset(raw: &Value) -> Result<Vec<Self>> {
        parse_hourly_dataset(raw)
    }
}


/// Local wall-clock time for an epoch timestamp.
pub fn local_datetime(ts: i64) -> Option<NaiveDateTime> {
    Local
        .timestamp_opt(ts, 0)
        .earliest()
        .map(|dt| dt.naive_local())
}


/// Epoch seconds of local midnight on `date`.
///
/// When a DST jump skips midnight, the first hour that exists is used.
pub fn local_midnight(date: NaiveDate) -> Option<i64> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    (0..=2)
        .find_map(|h| {
            (midnight + Duration::hours(h))
                .and_local_timezone(Local)
                .earliest()
        })
        .map(|dt| dt.timestamp())
}


/// Join flags into their stored form. An empty list is stored as `""`.
pub fn encode_flags(flags: Option<&[String]>) -> Option<String> {
    flags.map(|f| f.join(FLAG_DELIMITER))
}


/// Inverse of [`encode_flags`].
pub fn decode_flags(stored: Option<String>) -> Option<Vec<String>> {
    stored.map(|s| {
        if s.is_empty() {
            Vec::new()
        } else {
            s.split(FLAG_DELIMITER).map(String::from).collect()
        }
    })
}
