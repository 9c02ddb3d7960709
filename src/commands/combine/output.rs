use super::*;

pub(super) fn default_manifest_path(output: &Path, started_ts: DateTime<Utc>) -> PathBuf {
    let dir = output
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    dir.join("manifests").join(format!(
        "combine_run_{}.json",
        utc_compact_string(started_ts)
    ))
}

/// Writes to a hidden sibling first and renames it over `path`, so readers
/// only ever see a complete file.
pub(super) fn write_canonical_csv(path: &Path, events: &[SeismicEvent]) -> Result<()> {
    ensure_parent_directory(path)?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("invalid output path: {}", path.display()))?;
    let partial_path = path.with_file_name(format!(".{file_name}.partial"));

    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&partial_path)
            .with_context(|| format!("failed to create {}", partial_path.display()))?;
        writer
            .write_record(CANONICAL_COLUMNS)
            .with_context(|| format!("failed to write {}", partial_path.display()))?;
        for event in events {
            writer
                .serialize(event.canonical_row())
                .with_context(|| format!("failed to write {}", partial_path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("failed to flush {}", partial_path.display()))?;
    }

    fs::rename(&partial_path, path).with_context(|| {
        format!(
            "failed to move {} into place at {}",
            partial_path.display(),
            path.display()
        )
    })?;

    Ok(())
}

pub fn render_summary(manifest: &CombineRunManifest) -> String {
    let counts = &manifest.counts;
    let mut lines = vec![
        format!("Run: {} ({})", manifest.run_id, manifest.status),
        format!(
            "Files: discovered={} normalized={} failed={}",
            counts.files_discovered, counts.files_normalized, counts.files_failed
        ),
    ];

    for source in &manifest.per_source {
        lines.push(format!(
            "  {}: files={} failed={} records={}",
            source.agency, source.files_discovered, source.files_failed, source.records_read
        ));
    }

    lines.push(format!(
        "Records: read={} retained={} dropped={}",
        counts.records_read,
        counts.retained,
        counts.dropped_total()
    ));
    lines.push(format!(
        "Dropped: missing_time={} missing_coordinates={} missing_magnitude={} out_of_range={} duplicate={}",
        counts.dropped_missing_time,
        counts.dropped_missing_coordinates,
        counts.dropped_missing_magnitude,
        counts.dropped_out_of_range,
        counts.dropped_duplicate
    ));
    lines.push(format!(
        "Regions: strategy={} threshold_km={} classified={} unclassified={}",
        manifest.attribution.strategy,
        manifest.attribution.threshold_km,
        counts.classified,
        counts.unclassified
    ));
    if manifest.paths.gazetteer_path.is_some() {
        lines.push(format!(
            "Gazetteer: rows={} loaded={} indexed={} excluded={}",
            counts.gazetteer_rows_read,
            counts.gazetteer_points_loaded,
            counts.gazetteer_points_indexed,
            counts.gazetteer_points_excluded
        ));
    }

    if !manifest.failed_sources.is_empty() {
        lines.push("Skipped sources:".to_string());
        for failed in &manifest.failed_sources {
            lines.push(format!("  [{}] {}: {}", failed.agency, failed.path, failed.reason));
        }
    }

    match &manifest.failure_reason {
        Some(reason) => lines.push(format!("Failed: {reason}")),
        None => lines.push(format!("Output: {}", manifest.paths.output_path)),
    }

    lines.join("\n")
}

pub(super) fn print_summary(manifest: &CombineRunManifest) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "{}", render_summary(manifest))?;
    output.flush()?;
    Ok(())
}

pub(super) fn render_combine_command(args: &CombineArgs) -> String {
    let mut command = vec!["quakecat".to_string(), "combine".to_string()];

    for source in &args.sources {
        command.push("--source".to_string());
        command.push(source.to_string());
    }
    command.push("--output".to_string());
    command.push(args.output.display().to_string());

    if let Some(path) = &args.gazetteer {
        command.push("--gazetteer".to_string());
        command.push(path.display().to_string());
    }
    if let Some(country) = &args.country {
        command.push("--country".to_string());
        command.push(country.clone());
    }
    command.push("--threshold-km".to_string());
    command.push(args.threshold_km.to_string());
    if args.fallback != FallbackStrategy::None {
        command.push("--fallback".to_string());
        command.push(args.fallback.as_str().to_string());
    }
    if let Some(path) = &args.place_table {
        command.push("--place-table".to_string());
        command.push(path.display().to_string());
    }
    for suffix in &args.strip_suffixes {
        command.push("--strip-suffix".to_string());
        command.push(suffix.clone());
    }
    if let Some(path) = &args.manifest_path {
        command.push("--manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(threads) = args.threads {
        command.push("--threads".to_string());
        command.push(threads.to_string());
    }

    command.join(" ")
}
