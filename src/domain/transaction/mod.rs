use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// Format of the `Timestamp` column, always expressed in UTC.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Seconds west of UTC for the reporting offset (UTC-6, no daylight saving).
const LOCAL_OFFSET_WEST: i32 = 6 * 3600;

fn local_offset() -> FixedOffset {
    FixedOffset::west_opt(LOCAL_OFFSET_WEST).expect("UTC-6 is a valid offset")
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
pub struct Transaction {
    #[serde(rename = "Venta")]
    pub amount: Decimal,
    #[serde(rename = "Timestamp", deserialize_with = "deserialize_utc")]
    pub recorded_at: DateTime<Utc>,
    #[serde(rename = "Ticket")]
    pub ticket: i64,
    #[serde(rename = "Estado/Provincia")]
    pub region: String,
}

impl Transaction {
    /// Timestamp shifted by a constant -6h, as wall-clock time.
    pub fn local_time(&self) -> NaiveDateTime {
        self.recorded_at.with_timezone(&local_offset()).naive_local()
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            ticket: self.ticket,
            local_time: self.local_time(),
            region: self.region.clone(),
        }
    }
}

/// Identity of a sale across duplicate submissions.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct DedupKey {
    pub ticket: i64,
    pub local_time: NaiveDateTime,
    pub region: String,
}

impl DedupKey {
    pub fn date(&self) -> NaiveDate {
        self.local_time.date()
    }
}

pub fn parse_timestamp(raw: &str) -> chrono::ParseResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).map(|naive| naive.and_utc())
}

fn deserialize_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(|err| {
        serde::de::Error::custom(format!("invalid timestamp {raw:?}: {err}"))
    })
}
