use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, StringRecord, Trim};

use crate::event::{NormalizedRecord, parse_time};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CanonicalField {
    Latitude,
    Longitude,
    Depth,
    Magnitude,
    Place,
}

impl CanonicalField {
    const ALL: [CanonicalField; 5] = [
        CanonicalField::Latitude,
        CanonicalField::Longitude,
        CanonicalField::Depth,
        CanonicalField::Magnitude,
        CanonicalField::Place,
    ];
}

/// Fixed rename table and time layout for one agency.
#[derive(Debug)]
pub struct AgencySchema {
    pub name: &'static str,
    renames: &'static [(&'static str, CanonicalField)],
    time_fields: &'static [&'static str],
    splits_date_time: bool,
}

const USGS_SCHEMA: AgencySchema = AgencySchema {
    name: "usgs",
    renames: &[
        ("latitude", CanonicalField::Latitude),
        ("longitude", CanonicalField::Longitude),
        ("depth", CanonicalField::Depth),
        ("mag", CanonicalField::Magnitude),
        ("magnitude", CanonicalField::Magnitude),
        ("place", CanonicalField::Place),
    ],
    time_fields: &["time"],
    splits_date_time: false,
};

const EMSC_SCHEMA: AgencySchema = AgencySchema {
    name: "emsc",
    renames: &[
        ("lat", CanonicalField::Latitude),
        ("latitude", CanonicalField::Latitude),
        ("lon", CanonicalField::Longitude),
        ("longitude", CanonicalField::Longitude),
        ("depth", CanonicalField::Depth),
        ("mag", CanonicalField::Magnitude),
        ("magnitude", CanonicalField::Magnitude),
        ("region", CanonicalField::Place),
        ("location", CanonicalField::Place),
    ],
    time_fields: &["datetime", "time"],
    splits_date_time: true,
};

const GENERIC_SCHEMA: AgencySchema = AgencySchema {
    name: "generic",
    renames: &[
        ("latitude", CanonicalField::Latitude),
        ("lat", CanonicalField::Latitude),
        ("longitude", CanonicalField::Longitude),
        ("lon", CanonicalField::Longitude),
        ("lng", CanonicalField::Longitude),
        ("depth", CanonicalField::Depth),
        ("magnitude", CanonicalField::Magnitude),
        ("mag", CanonicalField::Magnitude),
        ("place", CanonicalField::Place),
        ("region", CanonicalField::Place),
        ("location", CanonicalField::Place),
    ],
    time_fields: &["time", "datetime"],
    splits_date_time: true,
};

/// `AGENCY=DIR` as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub agency: String,
    pub dir: PathBuf,
}

impl SourceSpec {
    pub fn schema(&self) -> &'static AgencySchema {
        match self.agency.as_str() {
            "usgs" => &USGS_SCHEMA,
            "emsc" => &EMSC_SCHEMA,
            _ => &GENERIC_SCHEMA,
        }
    }

    pub fn tag(&self) -> String {
        self.agency.to_ascii_uppercase()
    }
}

impl FromStr for SourceSpec {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let (agency, dir) = raw
            .split_once('=')
            .with_context(|| format!("expected AGENCY=DIR, got {raw:?}"))?;
        let agency = agency.trim().to_ascii_lowercase();

        if agency.is_empty()
            || !agency
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
        {
            bail!("invalid agency name in {raw:?}");
        }
        if dir.trim().is_empty() {
            bail!("missing directory for agency {agency}");
        }

        Ok(Self {
            agency,
            dir: PathBuf::from(dir.trim()),
        })
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.agency, self.dir.display())
    }
}

#[derive(Debug, Clone, Copy)]
enum TimeColumns {
    Split { date: usize, time: usize },
    Combined(usize),
    Absent,
}

#[derive(Debug)]
struct ColumnMap {
    time: TimeColumns,
    fields: HashMap<&'static str, usize>,
}

impl ColumnMap {
    fn resolve(headers: &StringRecord, schema: &AgencySchema) -> Self {
        let mut by_name = HashMap::<String, usize>::new();
        for (idx, header) in headers.iter().enumerate() {
            let key = header.trim_start_matches('\u{feff}').trim().to_lowercase();
            by_name.entry(key).or_insert(idx);
        }

        let split = if schema.splits_date_time {
            by_name
                .get("date")
                .zip(by_name.get("time"))
                .map(|(&date, &time)| TimeColumns::Split { date, time })
        } else {
            None
        };
        let time = split.unwrap_or_else(|| {
            schema
                .time_fields
                .iter()
                .find_map(|name| by_name.get(*name))
                .map(|&idx| TimeColumns::Combined(idx))
                .unwrap_or(TimeColumns::Absent)
        });

        let mut fields = HashMap::new();
        for field in CanonicalField::ALL {
            let found = schema
                .renames
                .iter()
                .filter(|(_, target)| *target == field)
                .find_map(|(raw, _)| by_name.get(*raw));
            if let Some(&idx) = found {
                fields.insert(field_name(field), idx);
            }
        }

        Self { time, fields }
    }

    fn index(&self, field: CanonicalField) -> Option<usize> {
        self.fields.get(field_name(field)).copied()
    }

    fn missing_columns(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if matches!(self.time, TimeColumns::Absent) {
            missing.push("time");
        }
        for field in CanonicalField::ALL {
            if self.index(field).is_none() {
                missing.push(field_name(field));
            }
        }
        missing
    }
}

fn field_name(field: CanonicalField) -> &'static str {
    match field {
        CanonicalField::Latitude => "latitude",
        CanonicalField::Longitude => "longitude",
        CanonicalField::Depth => "depth",
        CanonicalField::Magnitude => "magnitude",
        CanonicalField::Place => "place",
    }
}

/// Records from one source file plus the canonical columns it lacked.
#[derive(Debug)]
pub struct SourceBatch {
    pub records: Vec<NormalizedRecord>,
    pub missing_columns: Vec<&'static str>,
}

pub fn normalize_file(path: &Path, spec: &SourceSpec) -> Result<SourceBatch> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open source file: {}", path.display()))?;
    normalize_reader(file, spec.schema(), &spec.tag())
        .with_context(|| format!("failed to parse source file: {}", path.display()))
}

pub fn normalize_reader<R: Read>(
    reader: R,
    schema: &AgencySchema,
    source_tag: &str,
) -> Result<SourceBatch> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = reader.headers().context("failed to read CSV header")?.clone();
    let columns = ColumnMap::resolve(&headers, schema);

    let mut records = Vec::new();
    for (row_idx, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("failed to read CSV row {}", row_idx + 1))?;
        records.push(normalize_row(&row, &columns, source_tag));
    }

    Ok(SourceBatch {
        records,
        missing_columns: columns.missing_columns(),
    })
}

fn normalize_row(row: &StringRecord, columns: &ColumnMap, source_tag: &str) -> NormalizedRecord {
    let mut record = NormalizedRecord::empty(source_tag);

    record.time = match columns.time {
        TimeColumns::Split { date, time } => match (cell(row, Some(date)), cell(row, Some(time))) {
            (Some(date), Some(time)) => parse_time(&format!("{date} {time}")),
            _ => None,
        },
        TimeColumns::Combined(idx) => cell(row, Some(idx)).and_then(parse_time),
        TimeColumns::Absent => None,
    };
    record.latitude = number(row, columns.index(CanonicalField::Latitude));
    record.longitude = number(row, columns.index(CanonicalField::Longitude));
    record.depth = number(row, columns.index(CanonicalField::Depth));
    record.magnitude = number(row, columns.index(CanonicalField::Magnitude));
    record.place = cell(row, columns.index(CanonicalField::Place)).map(ToOwned::to_owned);

    record
}

fn cell(row: &StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|idx| row.get(idx))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn number(row: &StringRecord, idx: Option<usize>) -> Option<f64> {
    cell(row, idx)
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| !value.is_nan())
}
