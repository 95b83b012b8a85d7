use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_with::{serde_as, DeserializeAs};
use sqlx::FromRow;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Trip {
    pub id: i64,
    pub car_id: i64,
    #[sqlx(rename = "start_at")]
    pub start: DateTime<Utc>,
    #[sqlx(rename = "end_at")]
    pub end: DateTime<Utc>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Trip end before start")]
pub struct InvalidTrip;

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct TripInput {
    #[serde_as(as = "FlexibleTimestamp")]
    pub start: DateTime<Utc>,
    #[serde_as(as = "FlexibleTimestamp")]
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
}

impl TripInput {
    pub fn check_range(&self) -> Result<(), InvalidTrip> {
        if self.end < self.start {
            return Err(InvalidTrip);
        }
        Ok(())
    }

    /// Builds the stored trip, rejecting inverted time ranges.
    pub fn into_trip(self, car_id: i64, id: i64) -> Result<Trip, InvalidTrip> {
        self.check_range()?;
        Ok(Trip {
            id,
            car_id,
            start: self.start,
            end: self.end,
            description: self.description,
        })
    }
}

/// Accepts RFC 3339, naive date-times and bare dates. Naive values are UTC.
pub struct FlexibleTimestamp;

impl<'de> DeserializeAs<'de, DateTime<Utc>> for FlexibleTimestamp {
    fn deserialize_as<D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid timestamp `{raw}`"))
        })
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
