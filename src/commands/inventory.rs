use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::InventoryArgs;
use crate::model::{SourceFileEntry, SourceInventoryManifest};
use crate::sources::SourceSpec;
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

pub fn run(args: InventoryArgs) -> Result<()> {
    let manifest = build_manifest(&args.sources)?;

    if args.dry_run {
        info!(
            file_count = manifest.file_count,
            sources = %manifest.sources.join(","),
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| PathBuf::from("manifests").join("source_inventory.json"));

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote source inventory manifest");
    info!(file_count = manifest.file_count, "inventory completed");

    Ok(())
}

pub fn build_manifest(sources: &[SourceSpec]) -> Result<SourceInventoryManifest> {
    let mut files = Vec::new();

    for spec in sources {
        let paths = discover_csv_files(&spec.dir)?;
        if paths.is_empty() {
            info!(agency = %spec.agency, dir = %spec.dir.display(), "no CSV files found");
        }

        for path in paths {
            files.push(file_entry(spec, &path)?);
        }
    }

    if files.is_empty() {
        bail!("no CSV files found in any source directory");
    }

    Ok(SourceInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        sources: sources.iter().map(ToString::to_string).collect(),
        file_count: files.len(),
        files,
    })
}

pub fn file_entry(spec: &SourceSpec, path: &Path) -> Result<SourceFileEntry> {
    let size_bytes = fs::metadata(path)
        .with_context(|| format!("failed to inspect {}", path.display()))?
        .len();

    Ok(SourceFileEntry {
        agency: spec.agency.clone(),
        path: path.display().to_string(),
        size_bytes,
        sha256: sha256_file(path)?,
    })
}

/// CSV files directly inside `dir`, sorted by file name.
pub fn discover_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);

        if is_csv {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_csv_files_filters_and_sorts() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.csv", "a.CSV", "notes.txt", "c.csv.bak"] {
            fs::write(dir.path().join(name), "time\n").expect("write fixture");
        }
        fs::create_dir(dir.path().join("nested.csv")).expect("mkdir");

        let files = discover_csv_files(dir.path()).expect("discover");
        let names: Vec<_> = files
            .iter()
            .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
            .collect();
        assert_eq!(names, vec!["a.CSV", "b.csv"]);
    }

    #[test]
    fn build_manifest_hashes_every_file() {
        let usgs = tempfile::tempdir().expect("tempdir");
        let emsc = tempfile::tempdir().expect("tempdir");
        fs::write(usgs.path().join("2024.csv"), "time,latitude\n").expect("write");
        fs::write(emsc.path().join("2024.csv"), "date,time\n").expect("write");

        let sources = vec![
            SourceSpec {
                agency: "usgs".to_string(),
                dir: usgs.path().to_path_buf(),
            },
            SourceSpec {
                agency: "emsc".to_string(),
                dir: emsc.path().to_path_buf(),
            },
        ];

        let manifest = build_manifest(&sources).expect("manifest");
        assert_eq!(manifest.file_count, 2);
        assert_eq!(manifest.files[0].agency, "usgs");
        assert_eq!(manifest.files[1].agency, "emsc");
        assert_eq!(manifest.files[0].size_bytes, 14);
        assert_eq!(manifest.files[0].sha256.len(), 64);
        assert_ne!(manifest.files[0].sha256, manifest.files[1].sha256);
    }

    #[test]
    fn build_manifest_fails_without_files() {
        let empty = tempfile::tempdir().expect("tempdir");
        let sources = vec![SourceSpec {
            agency: "usgs".to_string(),
            dir: empty.path().to_path_buf(),
        }];
        assert!(build_manifest(&sources).is_err());
    }
}
