//! Consumption measures as parsed from the portal and read back from storage.

mod measure;

pub use measure::{
    decode_flags,
    encode_flags,
    local_datetime,
    local_midnight,
    DailyMeasure,
    HourlyMeasure,
    Measure,
    Metric,
    DATE_FORMAT,
    FLAG_DELIMITER,
    ISO_FORMAT,
};
