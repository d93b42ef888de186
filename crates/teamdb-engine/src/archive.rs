//! Archival packager — gzip the raw engine output next to its record

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use teamdb_core::Result;
use tracing::debug;

/// Archive location for a record stored at `location`.
pub fn archive_path(location: &Path) -> PathBuf {
    location.with_extension("gz")
}

pub fn compress(raw: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    encoder.finish()
}

pub fn decompress(gz: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(gz).read_to_end(&mut out)?;
    Ok(out)
}

/// Temporary sibling an archive is staged in before it replaces `dest`.
pub fn staging_path(dest: &Path) -> PathBuf {
    dest.with_extension("gz.tmp")
}

/// Compress `raw` into the staging file next to `dest` and return its path.
///
/// `dest` itself is untouched; the caller renames the staged file into place.
/// Nothing is left behind if the write fails.
pub async fn stage_archive(raw: &[u8], dest: &Path) -> Result<PathBuf> {
    let gz = compress(raw)?;
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = staging_path(dest);
    if let Err(e) = tokio::fs::write(&tmp, &gz).await {
        discard(&tmp).await;
        return Err(e.into());
    }
    debug!("staged {} bytes -> {} ({} bytes)", raw.len(), tmp.display(), gz.len());
    Ok(tmp)
}

/// Best-effort removal of a staging file.
pub async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!("could not remove {}: {}", path.display(), e);
        }
    }
}

/// Read an archive back in its compressed form.
pub async fn read_archive(path: &Path) -> Result<Vec<u8>> {
    Ok(tokio::fs::read(path).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_path_replaces_extension() {
        assert_eq!(
            archive_path(Path::new("db/Hu Tao/htxqzlym.yaml")),
            PathBuf::from("db/Hu Tao/htxqzlym.gz")
        );
    }

    #[tokio::test]
    async fn staged_archive_leaves_destination_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("Bennett").join("bnpmpmxl.gz");
        let raw = br#"{"dps":{"mean":1.0}}"#;

        let staged = stage_archive(raw, &dest).await.unwrap();
        assert_eq!(staged, staging_path(&dest));
        assert!(!dest.exists());

        let gz = read_archive(&staged).await.unwrap();
        assert_eq!(&gz[..2], &[0x1f, 0x8b]);
        assert_eq!(decompress(&gz).unwrap(), raw);

        discard(&staged).await;
        assert!(!staged.exists());
    }

    #[tokio::test]
    async fn failed_stage_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("bnpmpmxl.gz");
        std::fs::create_dir_all(staging_path(&dest).join("occupied")).unwrap();

        assert!(stage_archive(b"{}", &dest).await.is_err());
        assert!(!dest.exists());
    }
}
