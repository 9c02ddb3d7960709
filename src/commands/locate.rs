use std::io::{self, Write};

use anyhow::{Result, bail};
use serde::Serialize;
use tracing::info;

use crate::cli::LocateArgs;
use crate::gazetteer::{ReferencePoint, load_gazetteer};
use crate::region::{RegionAttributor, RegionStrategy, default_suffixes};
use crate::spatial::SpatialIndex;

#[derive(Debug, Clone, Serialize)]
pub struct LocateReport {
    pub latitude: f64,
    pub longitude: f64,
    pub threshold_km: f64,
    pub region: String,
    pub nearest: Option<ReferencePoint>,
    pub distance_km: Option<f64>,
}

pub fn run(args: LocateArgs) -> Result<()> {
    let report = locate(&args)?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &report)?;
        writeln!(output)?;
    } else {
        writeln!(output, "{}", render_report(&report))?;
    }
    output.flush()?;

    Ok(())
}

pub(crate) fn locate(args: &LocateArgs) -> Result<LocateReport> {
    if !args.threshold_km.is_finite() || args.threshold_km <= 0.0 {
        bail!("--threshold-km must be a positive number, got {}", args.threshold_km);
    }

    let gazetteer = load_gazetteer(&args.gazetteer, args.country.as_deref())?;
    let index = SpatialIndex::build(&gazetteer.points);
    if index.is_empty() {
        bail!(
            "gazetteer {} has no reference points with valid coordinates",
            args.gazetteer.display()
        );
    }
    info!(
        path = %args.gazetteer.display(),
        indexed = index.len(),
        excluded = index.excluded_count(),
        "built spatial index"
    );

    let suffixes = if args.strip_suffixes.is_empty() {
        default_suffixes()
    } else {
        args.strip_suffixes.clone()
    };

    // NearestMatch borrows the index, which the attributor takes by value
    let (nearest, distance_km) = match index.nearest(args.lat, args.lon) {
        Some(found) => (Some(found.point.clone()), Some(found.distance_km)),
        None => (None, None),
    };

    let attributor = RegionAttributor::new(
        RegionStrategy::NearestPoint {
            index,
            threshold_km: args.threshold_km,
        },
        suffixes,
    );

    Ok(LocateReport {
        latitude: args.lat,
        longitude: args.lon,
        threshold_km: args.threshold_km,
        region: attributor.label_for(args.lat, args.lon, None),
        nearest,
        distance_km,
    })
}

pub(crate) fn render_report(report: &LocateReport) -> String {
    let nearest = match (&report.nearest, report.distance_km) {
        (Some(point), Some(distance)) => format!(
            "Nearest: {} ({}, {}) at {:.1} km",
            point.name, point.admin_region, point.country, distance
        ),
        _ => "Nearest: none (coordinates out of range)".to_string(),
    };
    format!("Region: {}\n{nearest}", report.region)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::region::UNCLASSIFIED;

    const GAZETTEER: &str = "name,country,admin_name,lat,lng\n\
        Padang,Indonesia,Sumatera Barat Province,-0.95,100.35\n\
        Manado,Indonesia,Sulawesi Utara,1.49,124.84\n\
        Davao,Philippines,Davao Region,7.07,125.61\n";

    fn args(gazetteer: &Path, lat: f64, lon: f64) -> LocateArgs {
        LocateArgs {
            lat,
            lon,
            gazetteer: gazetteer.to_path_buf(),
            country: None,
            threshold_km: 150.0,
            strip_suffixes: Vec::new(),
            json: false,
        }
    }

    fn write_gazetteer(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("cities.csv");
        fs::write(&path, GAZETTEER).expect("write gazetteer");
        path
    }

    #[test]
    fn nearby_point_resolves_to_stripped_admin_region() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_gazetteer(temp.path());

        let report = locate(&args(&path, -1.0, 100.4)).expect("locate");
        assert_eq!(report.region, "Sumatera Barat");
        assert_eq!(report.nearest.as_ref().map(|p| p.name.as_str()), Some("Padang"));
        assert!(report.distance_km.expect("distance") < 10.0);
    }

    #[test]
    fn distant_point_is_unclassified_but_reports_nearest() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_gazetteer(temp.path());

        let report = locate(&args(&path, -10.0, 90.0)).expect("locate");
        assert_eq!(report.region, UNCLASSIFIED);
        assert_eq!(report.nearest.as_ref().map(|p| p.name.as_str()), Some("Padang"));
        assert!(report.distance_km.expect("distance") > 150.0);
    }

    #[test]
    fn country_filter_limits_candidates() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_gazetteer(temp.path());

        let mut request = args(&path, 7.0, 125.6);
        request.country = Some("indonesia".to_string());
        let report = locate(&request).expect("locate");
        assert_eq!(report.nearest.as_ref().map(|p| p.name.as_str()), Some("Manado"));
        assert_eq!(report.region, UNCLASSIFIED);
    }

    #[test]
    fn out_of_range_query_has_no_nearest() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_gazetteer(temp.path());

        let report = locate(&args(&path, 95.0, 100.0)).expect("locate");
        assert_eq!(report.region, UNCLASSIFIED);
        assert!(report.nearest.is_none());
        assert!(render_report(&report).contains("Nearest: none"));
    }

    #[test]
    fn rejects_bad_threshold_and_empty_gazetteer() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_gazetteer(temp.path());
        let mut request = args(&path, 0.0, 0.0);
        request.threshold_km = 0.0;
        assert!(locate(&request).is_err());

        let empty = temp.path().join("empty.csv");
        fs::write(&empty, "name,country,admin_name,lat,lng\n").expect("write empty");
        assert!(locate(&args(&empty, 0.0, 0.0)).is_err());
    }
}
