//! Scratch workspace for engine inputs and outputs.
//!
//! Cleared and recreated once per processing pass; removed again when the
//! guard is dropped, including on early return.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

pub struct ScratchDir {
    root: PathBuf,
    seq: AtomicU64,
}

impl ScratchDir {
    /// Remove anything at `root` and create an empty directory there.
    pub fn create(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        if root.exists() {
            debug!("scratch dir {} already exists, clearing", root.display());
            std::fs::remove_dir_all(&root)?;
        }
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            seq: AtomicU64::new(0),
        })
    }

    /// A fresh, extension-less file stem inside the scratch directory.
    ///
    /// Stems combine a timestamp with a per-directory counter, so two calls
    /// within the same clock tick never collide.
    pub fn next_stem(&self) -> PathBuf {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.root.join(format!("{}-{}", nanos, seq))
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            warn!("failed to remove scratch dir {}: {}", self.root.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_clears_previous_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("scratch");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("stale.json"), b"{}").unwrap();

        let scratch = ScratchDir::create(&root).unwrap();
        assert!(scratch.root.is_dir());
        assert!(!root.join("stale.json").exists());
    }

    #[test]
    fn stems_are_unique() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(tmp.path().join("s")).unwrap();
        let a = scratch.next_stem();
        let b = scratch.next_stem();
        assert_ne!(a, b);
        assert_eq!(a.parent(), Some(scratch.root.as_path()));
    }

    #[test]
    fn drop_removes_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("s");
        {
            let scratch = ScratchDir::create(&root).unwrap();
            std::fs::write(scratch.next_stem().with_extension("txt"), b"cfg").unwrap();
        }
        assert!(!root.exists());
    }
}
