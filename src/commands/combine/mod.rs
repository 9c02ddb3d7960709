use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::cli::{CombineArgs, FallbackStrategy};
use crate::commands::inventory;
use crate::dedup::dedup_and_sort;
use crate::error::PipelineError;
use crate::event::{CANONICAL_COLUMNS, NormalizedRecord, SeismicEvent};
use crate::gazetteer::load_gazetteer;
use crate::model::{
    AttributionSettings, CombinePaths, CombineRunManifest, FailedSource, SourceCounts,
    SourceFileEntry, StageCounts,
};
use crate::region::{
    PlaceLookup, RegionAttributor, RegionStrategy, default_bounding_boxes, default_suffixes,
};
use crate::sources::{SourceSpec, normalize_file};
use crate::spatial::SpatialIndex;
use crate::util::{
    ensure_parent_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty,
};

const MIN_SOURCE_COUNT: usize = 2;

mod attribution;
mod normalize_stage;
mod output;
mod run;

pub use output::render_summary;
pub use run::run;

use attribution::*;
use normalize_stage::*;
use output::*;
