use std::collections::HashMap;

use anyhow::{Context, Result};
use regex::Regex;

use crate::event::SeismicEvent;
use crate::gazetteer::ReferencePoint;
use crate::spatial::SpatialIndex;

/// Label for events no strategy could attribute.
pub const UNCLASSIFIED: &str = "Unclassified";

pub const DEFAULT_THRESHOLD_KM: f64 = 150.0;

pub const DEFAULT_SUFFIX_TOKENS: [&str; 2] = ["Province", "Provinsi"];

/// Removes trailing decorative tokens (case-insensitive, repeatedly) and
/// collapses whitespace. `"Bali Province"` becomes `"Bali"`.
pub fn strip_suffix_tokens(raw: &str, suffixes: &[String]) -> String {
    let mut tokens: Vec<&str> = raw.split_whitespace().collect();
    while let Some(last) = tokens.last() {
        if suffixes.iter().any(|suffix| suffix.eq_ignore_ascii_case(last)) {
            tokens.pop();
        } else {
            break;
        }
    }
    tokens.join(" ")
}

pub fn default_suffixes() -> Vec<String> {
    DEFAULT_SUFFIX_TOKENS.iter().map(|token| token.to_string()).collect()
}

/// Whole-word place-name table scanned against free-text `place` fields.
///
/// Names and place strings are split into lowercase word tokens; a name
/// matches when its tokens occur as a contiguous run in the place string.
#[derive(Debug)]
pub struct PlaceLookup {
    words: Regex,
    names: HashMap<String, usize>,
    regions: Vec<String>,
    max_name_words: usize,
}

impl PlaceLookup {
    /// Rows without an admin region are skipped. Later duplicates of a name
    /// are ignored; table order decides which entry wins when several names
    /// occur in one place string.
    pub fn from_points(points: &[ReferencePoint]) -> Result<Self> {
        let words = Regex::new(r"\w+").context("failed to compile place-name tokenizer")?;
        let mut names = HashMap::new();
        let mut regions = Vec::new();
        let mut max_name_words = 0;

        for point in points {
            let region = point.admin_region.trim();
            if region.is_empty() {
                continue;
            }
            let tokens = tokenize(&words, &point.name);
            if tokens.is_empty() {
                continue;
            }
            let key = tokens.join(" ");
            if names.contains_key(&key) {
                continue;
            }
            max_name_words = max_name_words.max(tokens.len());
            names.insert(key, regions.len());
            regions.push(region.to_string());
        }

        Ok(Self {
            words,
            names,
            regions,
            max_name_words,
        })
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn lookup(&self, place: &str) -> Option<&str> {
        let tokens = tokenize(&self.words, place);
        let mut best: Option<usize> = None;

        for start in 0..tokens.len() {
            let longest = self.max_name_words.min(tokens.len() - start);
            for width in 1..=longest {
                let key = tokens[start..start + width].join(" ");
                if let Some(&idx) = self.names.get(&key) {
                    best = Some(best.map_or(idx, |current| current.min(idx)));
                }
            }
        }

        best.map(|idx| self.regions[idx].as_str())
    }
}

fn tokenize(words: &Regex, text: &str) -> Vec<String> {
    words
        .find_iter(text)
        .map(|word| word.as_str().to_lowercase())
        .collect()
}

/// One coarse band rule; every bound is strict and optional.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBoxRule {
    pub label: String,
    pub lat_below: Option<f64>,
    pub lat_above: Option<f64>,
    pub lon_below: Option<f64>,
    pub lon_above: Option<f64>,
}

impl BoundingBoxRule {
    fn contains(&self, latitude: f64, longitude: f64) -> bool {
        self.lat_below.is_none_or(|bound| latitude < bound)
            && self.lat_above.is_none_or(|bound| latitude > bound)
            && self.lon_below.is_none_or(|bound| longitude < bound)
            && self.lon_above.is_none_or(|bound| longitude > bound)
    }
}

pub fn default_bounding_boxes() -> Vec<BoundingBoxRule> {
    vec![
        BoundingBoxRule {
            label: "Sumatera/Jawa Barat".to_string(),
            lat_below: Some(-5.0),
            lat_above: None,
            lon_below: Some(110.0),
            lon_above: None,
        },
        BoundingBoxRule {
            label: "Sulawesi/Maluku".to_string(),
            lat_below: None,
            lat_above: Some(-1.0),
            lon_below: None,
            lon_above: Some(120.0),
        },
    ]
}

/// How events get their region label. `SubstringMatch` and `BoundingBox`
/// are coarse stand-ins for when no gazetteer coordinates exist: the first
/// trusts free text written by an agency, the second only knows a few
/// hand-drawn bands. `Disabled` labels everything as unclassified.
#[derive(Debug)]
pub enum RegionStrategy {
    NearestPoint {
        index: SpatialIndex,
        threshold_km: f64,
    },
    SubstringMatch(PlaceLookup),
    BoundingBox(Vec<BoundingBoxRule>),
    Disabled,
}

impl RegionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NearestPoint { .. } => "nearest-point",
            Self::SubstringMatch(_) => "substring-match",
            Self::BoundingBox(_) => "bounding-box",
            Self::Disabled => "disabled",
        }
    }
}

#[derive(Debug)]
pub struct RegionAttributor {
    strategy: RegionStrategy,
    suffixes: Vec<String>,
}

impl RegionAttributor {
    pub fn new(strategy: RegionStrategy, suffixes: Vec<String>) -> Self {
        Self { strategy, suffixes }
    }

    pub fn strategy(&self) -> &RegionStrategy {
        &self.strategy
    }

    pub fn attribute(&self, event: &SeismicEvent) -> String {
        self.label_for(event.latitude, event.longitude, event.place.as_deref())
    }

    pub fn label_for(&self, latitude: f64, longitude: f64, place: Option<&str>) -> String {
        let raw = match &self.strategy {
            RegionStrategy::NearestPoint {
                index,
                threshold_km,
            } => index
                .nearest(latitude, longitude)
                .filter(|found| found.distance_km < *threshold_km)
                .map(|found| found.point.admin_region.as_str()),
            RegionStrategy::SubstringMatch(lookup) => place.and_then(|place| lookup.lookup(place)),
            RegionStrategy::BoundingBox(rules) => rules
                .iter()
                .find(|rule| rule.contains(latitude, longitude))
                .map(|rule| rule.label.as_str()),
            RegionStrategy::Disabled => None,
        };

        raw.map(|label| strip_suffix_tokens(label, &self.suffixes))
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| UNCLASSIFIED.to_string())
    }
}
