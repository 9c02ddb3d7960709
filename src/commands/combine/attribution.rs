use super::*;

/// Loads the place table up front so a bad fallback configuration fails
/// before any source is read.
pub(super) fn load_place_lookup(args: &CombineArgs) -> Result<Option<PlaceLookup>> {
    if args.fallback != FallbackStrategy::SubstringMatch {
        return Ok(None);
    }

    let Some(path) = &args.place_table else {
        bail!("--fallback substring-match requires --place-table");
    };

    let table = load_gazetteer(path, args.country.as_deref())
        .with_context(|| format!("failed to load place table: {}", path.display()))?;
    let lookup = PlaceLookup::from_points(&table.points)?;
    info!(path = %path.display(), names = lookup.len(), "loaded place table");

    Ok(Some(lookup))
}

/// Builds the spatial index when a usable gazetteer exists, otherwise falls
/// back to the configured strategy (or fails closed).
pub(super) fn select_strategy(
    args: &CombineArgs,
    place_lookup: Option<PlaceLookup>,
    counts: &mut StageCounts,
    warnings: &mut Vec<String>,
) -> Result<RegionStrategy> {
    let unavailable = match &args.gazetteer {
        Some(path) => match load_gazetteer(path, args.country.as_deref()) {
            Ok(gazetteer) => {
                counts.gazetteer_rows_read = gazetteer.rows_read;
                counts.gazetteer_points_loaded = gazetteer.points.len();

                let index = SpatialIndex::build(&gazetteer.points);
                counts.gazetteer_points_indexed = index.len();
                counts.gazetteer_points_excluded = index.excluded_count();

                if !index.is_empty() {
                    info!(
                        path = %path.display(),
                        indexed = index.len(),
                        excluded = index.excluded_count(),
                        outside_country = gazetteer.rows_outside_country,
                        "built spatial index"
                    );
                    return Ok(RegionStrategy::NearestPoint {
                        index,
                        threshold_km: args.threshold_km,
                    });
                }

                PipelineError::GazetteerUnavailable {
                    path: path.display().to_string(),
                    reason: "no reference points with valid coordinates".to_string(),
                }
            }
            Err(err) => PipelineError::GazetteerUnavailable {
                path: path.display().to_string(),
                reason: format!("{err:#}"),
            },
        },
        None => PipelineError::GazetteerUnavailable {
            path: "<none>".to_string(),
            reason: "no gazetteer supplied".to_string(),
        },
    };

    warn!(
        error = %unavailable,
        fallback = args.fallback.as_str(),
        "attributing without gazetteer"
    );
    warnings.push(unavailable.to_string());

    let strategy = match args.fallback {
        FallbackStrategy::None => RegionStrategy::Disabled,
        FallbackStrategy::SubstringMatch => RegionStrategy::SubstringMatch(
            place_lookup.context("substring-match fallback selected without a place table")?,
        ),
        FallbackStrategy::BoundingBox => RegionStrategy::BoundingBox(default_bounding_boxes()),
    };
    Ok(strategy)
}

/// Assigns `region` on every event; returns the classified count.
pub(super) fn attribute_events(
    pool: &rayon::ThreadPool,
    attributor: &RegionAttributor,
    events: &mut [SeismicEvent],
) -> usize {
    pool.install(|| {
        events.par_iter_mut().for_each(|event| {
            let label = attributor.attribute(event);
            event.region = Some(label);
        });
    });

    events
        .iter()
        .filter(|event| event.region.as_deref() != Some(crate::region::UNCLASSIFIED))
        .count()
}
