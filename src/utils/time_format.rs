use chrono::{NaiveDate, NaiveTime};

/// Wall-clock times travel as `HH:MM`; `HH:MM:SS` is accepted on input.
pub const TIME_FORMAT: &str = "%H:%M";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_time(value: &str) -> Result<NaiveTime, chrono::ParseError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
}

pub fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
}

pub fn format_time(time: &NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// serde adapter for `Option<NaiveTime>` fields; blank strings read as `None`.
///
/// Use together with `#[serde(default)]` so absent fields also map to `None`.
pub mod hhmm_option {
    use super::{format_time, parse_time};
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_str(&format_time(time)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.trim().is_empty() => parse_time(&raw)
                .map(Some)
                .map_err(|e| D::Error::custom(format!("invalid time '{raw}', expected HH:MM: {e}"))),
            _ => Ok(None),
        }
    }
}
