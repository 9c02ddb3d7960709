use super::*;

pub fn run(args: CombineArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("combine-{}", utc_compact_string(started_ts));

    validate_args(&args)?;

    let manifest_path = args
        .manifest_path
        .clone()
        .unwrap_or_else(|| default_manifest_path(&args.output, started_ts));
    let suffixes = if args.strip_suffixes.is_empty() {
        default_suffixes()
    } else {
        args.strip_suffixes.clone()
    };
    let place_lookup = load_place_lookup(&args)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads.unwrap_or(0))
        .build()
        .context("failed to build worker pool")?;

    info!(
        run_id = %run_id,
        sources = args.sources.len(),
        output = %args.output.display(),
        "starting combine"
    );

    let mut stage = NormalizeStage::default();
    let files = discover_sources(&args.sources, &mut stage);
    normalize_sources(&pool, &args.sources, &files, &mut stage);

    let mut counts = StageCounts {
        files_discovered: stage.files_discovered,
        files_normalized: stage.files_normalized,
        files_failed: stage.failed_sources.len(),
        records_read: stage.records.len(),
        ..StageCounts::default()
    };

    let (mut events, dedup_counts) = dedup_and_sort(std::mem::take(&mut stage.records));
    counts.apply_dedup(&dedup_counts);
    info!(
        read = dedup_counts.records_in,
        retained = dedup_counts.retained,
        duplicates = dedup_counts.dropped_duplicate,
        "deduplicated records"
    );

    let mut manifest = CombineRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        status: "running".to_string(),
        started_at,
        updated_at: now_utc_string(),
        failure_reason: None,
        command: render_combine_command(&args),
        paths: CombinePaths {
            output_path: args.output.display().to_string(),
            manifest_path: manifest_path.display().to_string(),
            gazetteer_path: args.gazetteer.as_ref().map(|path| path.display().to_string()),
            place_table_path: args.place_table.as_ref().map(|path| path.display().to_string()),
        },
        attribution: AttributionSettings {
            strategy: "none".to_string(),
            fallback: args.fallback.as_str().to_string(),
            threshold_km: args.threshold_km,
            country: args.country.clone(),
            suffix_tokens: suffixes.clone(),
        },
        counts: counts.clone(),
        per_source: stage.per_source,
        failed_sources: stage.failed_sources,
        source_hashes: stage.source_hashes,
        output_sha256: None,
        warnings: stage.warnings,
    };

    if events.is_empty() {
        let failure = PipelineError::EmptyResult {
            records_read: counts.records_read,
            dropped: counts.dropped_total(),
        };
        manifest.status = "failed".to_string();
        manifest.failure_reason = Some(failure.to_string());
        manifest.updated_at = now_utc_string();

        write_json_pretty(&manifest_path, &manifest)?;
        print_summary(&manifest)?;
        info!(path = %manifest_path.display(), "wrote combine run manifest");

        return Err(failure.into());
    }

    let strategy = select_strategy(&args, place_lookup, &mut counts, &mut manifest.warnings)?;
    manifest.attribution.strategy = strategy.as_str().to_string();
    let attributor = RegionAttributor::new(strategy, suffixes);

    counts.classified = attribute_events(&pool, &attributor, &mut events);
    counts.unclassified = events.len() - counts.classified;
    info!(
        strategy = attributor.strategy().as_str(),
        classified = counts.classified,
        unclassified = counts.unclassified,
        "attributed regions"
    );

    write_canonical_csv(&args.output, &events)?;
    info!(path = %args.output.display(), events = events.len(), "wrote canonical dataset");

    manifest.output_sha256 = Some(sha256_file(&args.output)?);
    manifest.counts = counts;
    manifest.status = "completed".to_string();
    manifest.updated_at = now_utc_string();

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote combine run manifest");

    print_summary(&manifest)?;
    info!(run_id = %run_id, retained = manifest.counts.retained, "combine completed");

    Ok(())
}

pub(super) fn validate_args(args: &CombineArgs) -> Result<()> {
    if args.sources.len() < MIN_SOURCE_COUNT {
        bail!(
            "combine needs at least {MIN_SOURCE_COUNT} --source entries, got {}",
            args.sources.len()
        );
    }
    if !args.threshold_km.is_finite() || args.threshold_km <= 0.0 {
        bail!("--threshold-km must be a positive number, got {}", args.threshold_km);
    }
    if args.fallback == FallbackStrategy::SubstringMatch && args.place_table.is_none() {
        bail!("--fallback substring-match requires --place-table");
    }
    if args.threads == Some(0) {
        bail!("--threads must be at least 1");
    }
    Ok(())
}
