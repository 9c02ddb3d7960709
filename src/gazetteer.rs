use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;

const NAME_COLUMNS: [&str; 3] = ["name", "city_ascii", "city"];
const COUNTRY_COLUMNS: [&str; 1] = ["country"];
const ADMIN_COLUMNS: [&str; 4] = ["admin_region", "admin_name", "region", "province"];
const LATITUDE_COLUMNS: [&str; 2] = ["lat", "latitude"];
const LONGITUDE_COLUMNS: [&str; 3] = ["lon", "lng", "longitude"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferencePoint {
    pub name: String,
    pub country: String,
    pub admin_region: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone)]
pub struct Gazetteer {
    pub points: Vec<ReferencePoint>,
    pub rows_read: usize,
    pub rows_outside_country: usize,
}

pub fn load_gazetteer(path: &Path, country: Option<&str>) -> Result<Gazetteer> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open gazetteer: {}", path.display()))?;
    read_gazetteer(file, country)
        .with_context(|| format!("failed to parse gazetteer: {}", path.display()))
}

/// Reads reference points, keeping only rows whose country matches
/// (case-insensitive) when a country filter is given. Unparseable
/// coordinates become NaN and are left for the index to exclude.
pub fn read_gazetteer<R: Read>(reader: R, country: Option<&str>) -> Result<Gazetteer> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = reader.headers().context("failed to read gazetteer header")?.clone();
    let columns = GazetteerColumns::resolve(&headers)?;
    let wanted_country = country.map(|value| value.trim().to_lowercase());

    let mut gazetteer = Gazetteer {
        points: Vec::new(),
        rows_read: 0,
        rows_outside_country: 0,
    };

    for (row_idx, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("failed to read gazetteer row {}", row_idx + 1))?;
        gazetteer.rows_read += 1;

        let row_country = text(&row, columns.country);
        if let Some(wanted) = &wanted_country {
            if row_country.to_lowercase() != *wanted {
                gazetteer.rows_outside_country += 1;
                continue;
            }
        }

        gazetteer.points.push(ReferencePoint {
            name: text(&row, Some(columns.name)),
            country: row_country,
            admin_region: text(&row, columns.admin_region),
            latitude: coordinate(&row, columns.latitude),
            longitude: coordinate(&row, columns.longitude),
        });
    }

    Ok(gazetteer)
}

#[derive(Debug)]
struct GazetteerColumns {
    name: usize,
    country: Option<usize>,
    admin_region: Option<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
}

impl GazetteerColumns {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let mut by_name = HashMap::<String, usize>::new();
        for (idx, header) in headers.iter().enumerate() {
            let key = header.trim_start_matches('\u{feff}').trim().to_lowercase();
            by_name.entry(key).or_insert(idx);
        }

        let find = |aliases: &[&str]| aliases.iter().find_map(|alias| by_name.get(*alias).copied());

        let Some(name) = find(&NAME_COLUMNS) else {
            bail!("gazetteer has no name column (expected one of {NAME_COLUMNS:?})");
        };

        Ok(Self {
            name,
            country: find(&COUNTRY_COLUMNS),
            admin_region: find(&ADMIN_COLUMNS),
            latitude: find(&LATITUDE_COLUMNS),
            longitude: find(&LONGITUDE_COLUMNS),
        })
    }
}

fn text(row: &StringRecord, idx: Option<usize>) -> String {
    idx.and_then(|idx| row.get(idx))
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

fn coordinate(row: &StringRecord, idx: Option<usize>) -> f64 {
    idx.and_then(|idx| row.get(idx))
        .and_then(|value| value.trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}
