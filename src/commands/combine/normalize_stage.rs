use super::*;

#[derive(Debug, Clone)]
pub(super) struct DiscoveredFile {
    pub source_idx: usize,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
pub(super) struct NormalizeStage {
    pub records: Vec<NormalizedRecord>,
    pub per_source: Vec<SourceCounts>,
    pub failed_sources: Vec<FailedSource>,
    pub source_hashes: Vec<SourceFileEntry>,
    pub files_discovered: usize,
    pub files_normalized: usize,
    pub warnings: Vec<String>,
}

struct FileOutcome {
    source_idx: usize,
    path: PathBuf,
    result: Result<(Vec<NormalizedRecord>, Vec<&'static str>, SourceFileEntry)>,
}

/// Lists every source directory in command-line order. A directory that
/// cannot be listed is recorded as failed and the rest carry on.
pub(super) fn discover_sources(
    sources: &[SourceSpec],
    stage: &mut NormalizeStage,
) -> Vec<DiscoveredFile> {
    let mut discovered = Vec::new();

    for (source_idx, spec) in sources.iter().enumerate() {
        stage.per_source.push(SourceCounts {
            agency: spec.agency.clone(),
            ..SourceCounts::default()
        });

        match inventory::discover_csv_files(&spec.dir) {
            Ok(paths) => {
                if paths.is_empty() {
                    warn!(agency = %spec.agency, dir = %spec.dir.display(), "no CSV files found");
                    stage.warnings.push(format!("no CSV files found for {spec}"));
                }
                stage.per_source[source_idx].files_discovered = paths.len();
                discovered.extend(paths.into_iter().map(|path| DiscoveredFile { source_idx, path }));
            }
            Err(err) => {
                let failure = PipelineError::SourceRead {
                    path: spec.dir.clone(),
                    reason: format!("{err:#}"),
                };
                warn!(agency = %spec.agency, error = %failure, "skipping source directory");
                stage.failed_sources.push(FailedSource {
                    agency: spec.agency.clone(),
                    path: spec.dir.display().to_string(),
                    reason: format!("{err:#}"),
                });
            }
        }
    }

    stage.files_discovered = discovered.len();
    discovered
}

/// Normalizes files on the pool; output keeps the enumeration order.
pub(super) fn normalize_sources(
    pool: &rayon::ThreadPool,
    sources: &[SourceSpec],
    files: &[DiscoveredFile],
    stage: &mut NormalizeStage,
) {
    let outcomes: Vec<FileOutcome> = pool.install(|| {
        files
            .par_iter()
            .map(|file| {
                let spec = &sources[file.source_idx];
                let result = normalize_file(&file.path, spec).and_then(|batch| {
                    let entry = inventory::file_entry(spec, &file.path)?;
                    Ok((batch.records, batch.missing_columns, entry))
                });
                FileOutcome {
                    source_idx: file.source_idx,
                    path: file.path.clone(),
                    result,
                }
            })
            .collect()
    });

    for outcome in outcomes {
        let spec = &sources[outcome.source_idx];
        match outcome.result {
            Ok((records, missing_columns, entry)) => {
                if missing_columns
                    .iter()
                    .any(|column| matches!(*column, "time" | "latitude" | "longitude"))
                {
                    warn!(
                        path = %outcome.path.display(),
                        missing = %missing_columns.join(","),
                        "source file lacks required columns; its records will be rejected"
                    );
                    stage.warnings.push(format!(
                        "{} lacks columns: {}",
                        outcome.path.display(),
                        missing_columns.join(",")
                    ));
                }

                info!(
                    agency = %spec.agency,
                    schema = spec.schema().name,
                    path = %outcome.path.display(),
                    records = records.len(),
                    "normalized source file"
                );
                stage.per_source[outcome.source_idx].records_read += records.len();
                stage.files_normalized += 1;
                stage.records.extend(records);
                stage.source_hashes.push(entry);
            }
            Err(err) => {
                let failure = PipelineError::SourceRead {
                    path: outcome.path.clone(),
                    reason: format!("{err:#}"),
                };
                warn!(agency = %spec.agency, error = %failure, "skipping source file");
                stage.per_source[outcome.source_idx].files_failed += 1;
                stage.failed_sources.push(FailedSource {
                    agency: spec.agency.clone(),
                    path: outcome.path.display().to_string(),
                    reason: format!("{err:#}"),
                });
            }
        }
    }
}
