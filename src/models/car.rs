use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::trip::Trip;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
pub enum CarSize {
    #[serde(rename = "s", alias = "small")]
    #[sqlx(rename = "s")]
    Small,
    #[serde(rename = "m", alias = "medium")]
    #[sqlx(rename = "m")]
    Medium,
    #[serde(rename = "l", alias = "large")]
    #[sqlx(rename = "l")]
    Large,
}

impl CarSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarSize::Small => "s",
            CarSize::Medium => "m",
            CarSize::Large => "l",
        }
    }
}

impl FromStr for CarSize {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "s" | "small" => Ok(CarSize::Small),
            "m" | "medium" => Ok(CarSize::Medium),
            "l" | "large" => Ok(CarSize::Large),
            other => Err(format!("unknown car size `{other}`")),
        }
    }
}

impl fmt::Display for CarSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Fuel {
    Gasoline,
    Electric,
    Hybrid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Transmission {
    Manual,
    Automatic,
}

/// Body of car creation and replacement requests.
///
/// Replacement bodies may carry an `id`; it is ignored, the path id wins.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CarInput {
    pub size: CarSize,
    #[validate(range(min = 1, message = "a car needs at least one door"))]
    pub doors: u32,
    pub fuel: Fuel,
    pub transmission: Transmission,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Car {
    pub id: i64,
    pub size: CarSize,
    pub doors: u32,
    pub fuel: Fuel,
    pub transmission: Transmission,
    #[serde(default)]
    #[sqlx(skip)]
    pub trips: Vec<Trip>,
}

impl Car {
    pub fn new(id: i64, input: CarInput) -> Self {
        Self {
            id,
            size: input.size,
            doors: input.doors,
            fuel: input.fuel,
            transmission: input.transmission,
            trips: Vec::new(),
        }
    }

    /// Overwrites the mutable attributes; `id` and `trips` stay as they are.
    pub fn replace_with(&mut self, input: CarInput) {
        self.size = input.size;
        self.doors = input.doors;
        self.fuel = input.fuel;
        self.transmission = input.transmission;
    }

    pub fn next_trip_id(&self) -> i64 {
        self.trips.iter().map(|trip| trip.id).max().unwrap_or(0) + 1
    }
}

/// Size part of a listing filter. Sizes the fleet does not know select no car.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeFilter {
    Is(CarSize),
    Unknown,
}

impl From<CarSize> for SizeFilter {
    fn from(size: CarSize) -> Self {
        SizeFilter::Is(size)
    }
}

/// Optional listing filters, each applied only when present.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub struct CarFilter {
    #[serde(default, deserialize_with = "lenient_size")]
    pub size: Option<SizeFilter>,
    pub doors: Option<u32>,
}

impl CarFilter {
    pub fn matches(&self, car: &Car) -> bool {
        let size_ok = match self.size {
            None => true,
            Some(SizeFilter::Is(size)) => car.size == size,
            Some(SizeFilter::Unknown) => false,
        };
        size_ok && self.doors.map_or(true, |doors| car.doors >= doors)
    }
}

fn lenient_size<'de, D>(deserializer: D) -> Result<Option<SizeFilter>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .filter(|value| !value.trim().is_empty())
        .map(|value| {
            value
                .parse::<CarSize>()
                .map_or(SizeFilter::Unknown, SizeFilter::Is)
        }))
}
