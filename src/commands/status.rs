use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::combine::render_summary;
use crate::model::CombineRunManifest;
use crate::util::read_json;

pub fn run(args: StatusArgs) -> Result<()> {
    let Some(summary) = load_summary(&args.manifest_path)? else {
        return Ok(());
    };

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "{summary}")?;
    output.flush()?;

    Ok(())
}

fn load_summary(manifest_path: &Path) -> Result<Option<String>> {
    if !manifest_path.exists() {
        warn!(path = %manifest_path.display(), "combine run manifest missing");
        return Ok(None);
    }

    let manifest: CombineRunManifest = read_json(manifest_path)?;

    info!(
        run_id = %manifest.run_id,
        status = %manifest.status,
        started_at = %manifest.started_at,
        updated_at = %manifest.updated_at,
        strategy = %manifest.attribution.strategy,
        retained = manifest.counts.retained,
        unclassified = manifest.counts.unclassified,
        failed_sources = manifest.failed_sources.len(),
        output_sha256 = %manifest.output_sha256.as_deref().unwrap_or_default(),
        failure_reason = %manifest.failure_reason.as_deref().unwrap_or_default(),
        "loaded combine run manifest"
    );

    let output_path = Path::new(&manifest.paths.output_path);
    if manifest.status == "completed" && !output_path.exists() {
        warn!(path = %output_path.display(), "canonical output missing");
    }

    Ok(Some(render_summary(&manifest)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributionSettings, CombinePaths, FailedSource, StageCounts};
    use crate::util::write_json_pretty;

    fn manifest(output_path: &Path) -> CombineRunManifest {
        CombineRunManifest {
            manifest_version: 1,
            run_id: "combine-20260101T000000Z".to_string(),
            status: "completed".to_string(),
            started_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:05Z".to_string(),
            failure_reason: None,
            command: "quakecat combine".to_string(),
            paths: CombinePaths {
                output_path: output_path.display().to_string(),
                manifest_path: "manifest.json".to_string(),
                gazetteer_path: None,
                place_table_path: None,
            },
            attribution: AttributionSettings {
                strategy: "bounding-box".to_string(),
                fallback: "bounding-box".to_string(),
                threshold_km: 150.0,
                country: None,
                suffix_tokens: vec!["Province".to_string()],
            },
            counts: StageCounts {
                records_read: 5,
                retained: 3,
                dropped_duplicate: 2,
                classified: 2,
                unclassified: 1,
                ..StageCounts::default()
            },
            per_source: Vec::new(),
            failed_sources: vec![FailedSource {
                agency: "bmkg".to_string(),
                path: "bmkg/broken.csv".to_string(),
                reason: "bad header".to_string(),
            }],
            source_hashes: Vec::new(),
            output_sha256: Some("abc".to_string()),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn missing_manifest_is_not_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let summary = load_summary(&temp.path().join("absent.json")).expect("status");
        assert!(summary.is_none());
    }

    #[test]
    fn summary_reflects_persisted_manifest() {
        let temp = tempfile::tempdir().expect("tempdir");
        let manifest_path = temp.path().join("manifests/run.json");
        let output_path = temp.path().join("events.csv");
        write_json_pretty(&manifest_path, &manifest(&output_path)).expect("write manifest");

        let summary = load_summary(&manifest_path)
            .expect("status")
            .expect("summary present");
        assert!(summary.starts_with("Run: combine-20260101T000000Z (completed)"));
        assert!(summary.contains("Records: read=5 retained=3 dropped=2"));
        assert!(summary.contains("strategy=bounding-box"));
        assert!(summary.contains("[bmkg] bmkg/broken.csv: bad header"));
    }

    #[test]
    fn corrupt_manifest_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let manifest_path = temp.path().join("run.json");
        std::fs::write(&manifest_path, "{not json").expect("write");
        assert!(load_summary(&manifest_path).is_err());
    }
}
