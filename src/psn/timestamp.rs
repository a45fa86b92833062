use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::game::UnixTimestamp;

const WITH_FRACTION: &str = "%Y-%m-%dT%H:%M:%S%.fZ";
const WITHOUT_FRACTION: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Error, PartialEq)]
#[error("Unrecognised timestamp: {0:?}")]
pub struct FormatError(pub String);

/// Parse a PSN UTC timestamp, e.g. `2021-03-06T16:29:22.490Z`, dropping any fraction of a second.
pub fn parse_timestamp(raw: &str) -> Result<UnixTimestamp, FormatError> {
    let format = if raw.contains('.') { WITH_FRACTION } else { WITHOUT_FRACTION };

    NaiveDateTime::parse_from_str(raw, format)
        .map(|dt| dt.and_utc().timestamp())
        .map_err(|_| FormatError(raw.to_string()))
}
