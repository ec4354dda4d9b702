//! Parsers for the weather-consumption and real-time chart payloads.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{
    local_datetime, local_midnight, DailyMeasure, HourlyMeasure, DATE_FORMAT, ISO_FORMAT,
};


#[derive(Debug, Deserialize)]
struct DailyPayload {
    data: DailyData,
}

#[derive(Debug, Deserialize)]
struct DailyData {
    #[serde(rename = "chartData")]
    chart_data: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(rename = "dailyData")]
    daily_data: DailySeries,
}

/// Parallel arrays, all indexed by day.
#[derive(Debug, Deserialize)]
struct DailySeries {
    categories: Vec<String>,
    consumption: Vec<f64>,
    temperature: Vec<Option<f64>>,
    precipitation: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct HourlyPayload {
    data: HourlyData,
}

#[derive(Debug, Deserialize)]
struct HourlyData {
    series: Vec<HourlyReading>,
}

#[derive(Debug, Deserialize)]
struct HourlyReading {
    read_datetime: i64,
    gallons: f64,
    leak_gallons: Option<f64>,
    #[serde(default)]
    flags: Option<Vec<String>>,
}


/// Parse the `weatherConsumptionChart` payload into one row per day.
pub fn parse_daily_dataset(raw: &Value) -> Result<Vec<DailyMeasure>> {
    let series = DailyPayload::deserialize(raw)?.data.chart_data.daily_data;

    let days = series.categories.len();
    for (name, len) in [
        ("consumption", series.consumption.len()),
        ("temperature", series.temperature.len()),
        ("precipitation", series.precipitation.len()),
    ] {
        if len != days {
            return Err(Error::MalformedPayload(format!(
                "dailyData.{name} has {len} entries, expected {days}"
            )));
        }
    }

    series
        .categories
        .into_iter()
        .zip(series.consumption)
        .zip(series.temperature)
        .zip(series.precipitation)
        .map(|(((category, consumption), temperature), precipitation)| {
            let date = NaiveDate::parse_from_str(&category, DATE_FORMAT).map_err(|e| {
                Error::MalformedPayload(format!("invalid category date {category:?}: {e}"))
            })?;
            let ts = local_midnight(date).ok_or_else(|| {
                Error::MalformedPayload(format!("no local midnight for {category}"))
            })?;
            // Read back from ts so a shifted midnight matches the stored row.
            let iso_date = local_datetime(ts)
                .map(|dt| dt.format(ISO_FORMAT).to_string())
                .ok_or_else(|| Error::MalformedPayload(format!("ts out of range: {ts}")))?;

            Ok(DailyMeasure {
                ts,
                iso_date,
                category,
                consumption,
                temperature,
                precipitation,
            })
        })
        .collect()
}


/// Parse the `RealTimeChart` payload into one row per reading.
pub fn parse_hourly_dataset(raw: &Value) -> Result<Vec<HourlyMeasure>> {
    let payload = HourlyPayload::deserialize(raw)?;

    payload
        .data
        .series
        .into_iter()
        .map(|reading| {
            let dt = local_datetime(reading.read_datetime).ok_or_else(|| {
                Error::MalformedPayload(format!(
                    "read_datetime out of range: {}",
                    reading.read_datetime
                ))
            })?;

            Ok(HourlyMeasure {
                ts: reading.read_datetime,
                iso_date: dt.format(ISO_FORMAT).to_string(),
                gallons: reading.gallons,
                leak_gallons: reading.leak_gallons,
                flags: reading.flags,
            })
        })
        .collect()
}
