use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use serde::Serialize;

pub const CANONICAL_COLUMNS: [&str; 8] = [
    "time",
    "latitude",
    "longitude",
    "depth",
    "magnitude",
    "place",
    "source",
    "region",
];

pub const MIN_MAGNITUDE: f64 = -3.0;
pub const MAX_MAGNITUDE: f64 = 10.0;

const NAIVE_TIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// One row from an agency file after renaming, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub time: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub depth: Option<f64>,
    pub magnitude: Option<f64>,
    pub place: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeismicEvent {
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub depth: Option<f64>,
    pub magnitude: f64,
    pub place: Option<String>,
    pub source: String,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    time: DateTime<Utc>,
    latitude_bits: u64,
    longitude_bits: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingTime,
    MissingCoordinates,
    MissingMagnitude,
    OutOfRange,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingTime => "missing_time",
            Self::MissingCoordinates => "missing_coordinates",
            Self::MissingMagnitude => "missing_magnitude",
            Self::OutOfRange => "out_of_range",
        }
    }
}

impl NormalizedRecord {
    pub fn empty(source: &str) -> Self {
        Self {
            time: None,
            latitude: None,
            longitude: None,
            depth: None,
            magnitude: None,
            place: None,
            source: source.to_string(),
        }
    }

    pub fn validate(self) -> Result<SeismicEvent, RejectReason> {
        let time = self.time.ok_or(RejectReason::MissingTime)?;
        let (latitude, longitude) = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) if !latitude.is_nan() && !longitude.is_nan() => {
                (latitude, longitude)
            }
            _ => return Err(RejectReason::MissingCoordinates),
        };
        let magnitude = match self.magnitude {
            Some(value) if !value.is_nan() => value,
            _ => return Err(RejectReason::MissingMagnitude),
        };

        if !valid_coordinates(latitude, longitude)
            || !(MIN_MAGNITUDE..=MAX_MAGNITUDE).contains(&magnitude)
            || self.depth.is_some_and(|depth| !depth.is_finite())
        {
            return Err(RejectReason::OutOfRange);
        }

        Ok(SeismicEvent {
            time,
            latitude,
            longitude,
            depth: self.depth,
            magnitude,
            place: self.place,
            source: self.source,
            region: None,
        })
    }
}

impl SeismicEvent {
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            time: self.time,
            latitude_bits: coordinate_bits(self.latitude),
            longitude_bits: coordinate_bits(self.longitude),
        }
    }

    pub fn canonical_row(&self) -> CanonicalRow<'_> {
        CanonicalRow {
            time: format_time(self.time),
            latitude: self.latitude,
            longitude: self.longitude,
            depth: self.depth,
            magnitude: self.magnitude,
            place: self.place.as_deref(),
            source: &self.source,
            region: self.region.as_deref().unwrap_or(crate::region::UNCLASSIFIED),
        }
    }
}

/// Serialized shape of the canonical file; field order is the column order.
#[derive(Debug, Serialize)]
pub struct CanonicalRow<'a> {
    pub time: String,
    pub latitude: f64,
    pub longitude: f64,
    pub depth: Option<f64>,
    pub magnitude: f64,
    pub place: Option<&'a str>,
    pub source: &'a str,
    pub region: &'a str,
}

pub fn valid_coordinates(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

fn coordinate_bits(value: f64) -> u64 {
    // -0.0 and 0.0 describe the same place
    if value == 0.0 { 0.0_f64.to_bits() } else { value.to_bits() }
}

/// Parses an agency timestamp as UTC, truncated to the millisecond
/// precision the canonical output carries.
pub fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    parse_time_exact(raw).map(|ts| ts.trunc_subsecs(3))
}

fn parse_time_exact(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    let without_zulu = trimmed
        .strip_suffix('Z')
        .or_else(|| trimmed.strip_suffix(" UTC"))
        .unwrap_or(trimmed);

    for format in NAIVE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(without_zulu, format) {
            return Some(parsed.and_utc());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(without_zulu, format) {
            return date.and_hms_opt(0, 0, 0).map(|value| value.and_utc());
        }
    }

    None
}

pub fn format_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
