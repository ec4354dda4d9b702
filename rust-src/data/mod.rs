//! Parsing of portal chart payloads into measure rows.

mod response_parser;

pub use response_parser::{parse_daily_dataset, parse_hourly_dataset};
