//! Catalog loader — local record files and remote index snapshots

use serde::Serialize;
use std::path::{Path, PathBuf};
use teamdb_core::{ConfigNormalizer, IndexEntry, Record, Result};
use teamdb_engine::archive::{self, archive_path};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A catalog entry that could not be read.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Records loaded from the catalog, plus the entries that failed to load.
#[derive(Debug, Default)]
pub struct CatalogLoad {
    pub records: Vec<Record>,
    pub failures: Vec<LoadFailure>,
}

pub fn is_record_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn record_files(root: &Path) -> impl Iterator<Item = walkdir::Result<walkdir::DirEntry>> {
    WalkDir::new(root).sort_by_file_name().into_iter()
}

/// Load every record file under `root`. A malformed file is reported in
/// [`CatalogLoad::failures`] and does not stop the walk.
pub fn load_catalog(root: &Path) -> CatalogLoad {
    let mut load = CatalogLoad::default();
    if !root.exists() {
        info!("catalog root {} does not exist, starting empty", root.display());
        return load;
    }

    for entry in record_files(root) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                warn!("cannot read {}: {}", path.display(), e);
                load.failures.push(LoadFailure { path, message: e.to_string() });
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_record_file(entry.path()) {
            continue;
        }
        match read_record(entry.path()) {
            Ok(record) => load.records.push(record),
            Err(e) => {
                warn!("skipping {}: {}", entry.path().display(), e);
                load.failures.push(LoadFailure {
                    path: entry.path().to_path_buf(),
                    message: e.to_string(),
                });
            }
        }
    }

    info!(
        "loaded {} records from {} ({} failed)",
        load.records.len(),
        root.display(),
        load.failures.len()
    );
    load
}

/// Read one record file, tagging it with its location and any archive next to it.
pub fn read_record(path: &Path) -> Result<Record> {
    let text = std::fs::read_to_string(path)?;
    let mut record = Record::from_yaml(&text)?.with_location(path);
    let archive = archive_path(path);
    if archive.is_file() {
        record.archive = Some(archive);
    }
    Ok(record)
}

/// Records for a remote index snapshot.
///
/// Configurations are normalized and get `suffix` appended; the cached fields
/// start empty so every record is pending. `viewer_key` is kept.
pub fn from_index(
    entries: Vec<IndexEntry>,
    normalizer: &ConfigNormalizer,
    suffix: Option<&str>,
) -> Vec<Record> {
    entries
        .into_iter()
        .map(|entry| {
            let mut config = normalizer.normalize(&entry.config);
            if let Some(suffix) = suffix {
                config.push_str(suffix);
            }
            let mut record = Record::new(config, entry.author, entry.description);
            record.viewer_key = entry.viewer_key;
            record
        })
        .collect()
}

/// First record file under `root` whose name contains `name`, in sorted walk order.
pub fn find_location(root: &Path, name: &str) -> Option<PathBuf> {
    record_files(root)
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_record_file(e.path()))
        .find(|e| e.file_name().to_string_lossy().contains(name))
        .map(|e| e.into_path())
}

/// Serialize `record` into the staging file next to `path` and return its path.
async fn stage_record(record: &Record, path: &Path) -> Result<PathBuf> {
    let yaml = record.to_yaml()?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("yaml.tmp");
    if let Err(e) = tokio::fs::write(&tmp, yaml).await {
        archive::discard(&tmp).await;
        return Err(e.into());
    }
    Ok(tmp)
}

/// Write `record` as YAML to `path`, replacing any previous file.
pub async fn write_record(record: &Record, path: &Path) -> Result<()> {
    let tmp = stage_record(record, path).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        archive::discard(&tmp).await;
        return Err(e.into());
    }
    debug!("wrote {}", path.display());
    Ok(())
}

/// Write `record` to `path` together with its archive of `raw`.
///
/// Both files are staged first and only then moved into place. If anything
/// fails, the previous record and archive are restored and no staging file
/// is left behind. Returns the archive path.
pub async fn write_record_with_archive(record: &Record, path: &Path, raw: &[u8]) -> Result<PathBuf> {
    let dest = archive_path(path);
    let staged_archive = archive::stage_archive(raw, &dest).await?;
    let staged_record = match stage_record(record, path).await {
        Ok(tmp) => tmp,
        Err(e) => {
            archive::discard(&staged_archive).await;
            return Err(e);
        }
    };

    let backup = dest.with_extension("gz.bak");
    let had_archive = dest.is_file();
    if had_archive {
        if let Err(e) = tokio::fs::rename(&dest, &backup).await {
            archive::discard(&staged_archive).await;
            archive::discard(&staged_record).await;
            return Err(e.into());
        }
    }

    let committed = match tokio::fs::rename(&staged_archive, &dest).await {
        Ok(()) => tokio::fs::rename(&staged_record, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = committed {
        warn!("rolling back {}: {}", path.display(), e);
        archive::discard(&staged_archive).await;
        archive::discard(&staged_record).await;
        if had_archive {
            if let Err(restore) = tokio::fs::rename(&backup, &dest).await {
                warn!("could not restore {}: {}", dest.display(), restore);
            }
        } else {
            archive::discard(&dest).await;
        }
        return Err(e.into());
    }

    if had_archive {
        archive::discard(&backup).await;
    }
    debug!("wrote {} with archive {}", path.display(), dest.display());
    Ok(dest)
}
