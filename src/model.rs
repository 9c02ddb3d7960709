use serde::{Deserialize, Serialize};

use crate::dedup::DedupCounts;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFileEntry {
    pub agency: String,
    pub path: String,
    pub size_bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub sources: Vec<String>,
    pub file_count: usize,
    pub files: Vec<SourceFileEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedSource {
    pub agency: String,
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceCounts {
    pub agency: String,
    pub files_discovered: usize,
    pub files_failed: usize,
    pub records_read: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageCounts {
    pub files_discovered: usize,
    pub files_normalized: usize,
    pub files_failed: usize,
    pub records_read: usize,
    pub dropped_missing_time: usize,
    pub dropped_missing_coordinates: usize,
    pub dropped_missing_magnitude: usize,
    pub dropped_out_of_range: usize,
    pub dropped_duplicate: usize,
    pub retained: usize,
    pub classified: usize,
    pub unclassified: usize,
    pub gazetteer_rows_read: usize,
    pub gazetteer_points_loaded: usize,
    pub gazetteer_points_indexed: usize,
    pub gazetteer_points_excluded: usize,
}

impl StageCounts {
    pub fn apply_dedup(&mut self, dedup: &DedupCounts) {
        self.dropped_missing_time = dedup.dropped_missing_time;
        self.dropped_missing_coordinates = dedup.dropped_missing_coordinates;
        self.dropped_missing_magnitude = dedup.dropped_missing_magnitude;
        self.dropped_out_of_range = dedup.dropped_out_of_range;
        self.dropped_duplicate = dedup.dropped_duplicate;
        self.retained = dedup.retained;
    }

    pub fn dropped_total(&self) -> usize {
        self.dropped_missing_time
            + self.dropped_missing_coordinates
            + self.dropped_missing_magnitude
            + self.dropped_out_of_range
            + self.dropped_duplicate
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinePaths {
    pub output_path: String,
    pub manifest_path: String,
    pub gazetteer_path: Option<String>,
    pub place_table_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionSettings {
    pub strategy: String,
    pub fallback: String,
    pub threshold_km: f64,
    pub country: Option<String>,
    pub suffix_tokens: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombineRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub failure_reason: Option<String>,
    pub command: String,
    pub paths: CombinePaths,
    pub attribution: AttributionSettings,
    pub counts: StageCounts,
    pub per_source: Vec<SourceCounts>,
    pub failed_sources: Vec<FailedSource>,
    pub source_hashes: Vec<SourceFileEntry>,
    pub output_sha256: Option<String>,
    pub warnings: Vec<String>,
}
