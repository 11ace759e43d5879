//! Per-request scratch directories.
//!
//! Every request gets its own pair of directories (upload, download) under
//! a common root. They are removed when the request finishes, on every exit
//! path. [`ScratchSpace::reap_stale`] removes any that outlive the maximum
//! scratch lifetime, e.g. after the service itself was killed mid-request.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

/// Name prefix of upload scratch directories.
pub const UPLOAD_PREFIX: &str = "pdfrelay-upload";

/// Name prefix of download scratch directories.
pub const DOWNLOAD_PREFIX: &str = "pdfrelay-download";

/// Root under which scratch directories are allocated.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if it does not exist yet.
    pub async fn ensure_root(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Allocate a fresh upload/download pair owned by one request.
    pub fn allocate(&self) -> io::Result<JobScratch> {
        let upload = tempfile::Builder::new()
            .prefix(UPLOAD_PREFIX)
            .tempdir_in(&self.root)?;
        let download = tempfile::Builder::new()
            .prefix(DOWNLOAD_PREFIX)
            .tempdir_in(&self.root)?;
        Ok(JobScratch { upload, download })
    }

    /// Delete scratch directories last modified at least `max_age` ago.
    ///
    /// Only entries carrying one of the scratch prefixes are considered.
    /// Returns the number of directories removed. Blocking; run it via
    /// `spawn_blocking` from async code.
    pub fn reap_stale(&self, max_age: Duration) -> io::Result<usize> {
        let mut removed = 0;

        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with(UPLOAD_PREFIX) && !name.starts_with(DOWNLOAD_PREFIX) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) if m.is_dir() => m,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "Cannot stat scratch entry");
                    continue;
                }
            };

            let age = metadata
                .modified()
                .ok()
                .and_then(|t| t.elapsed().ok())
                .unwrap_or_default();
            if age < max_age {
                continue;
            }

            match std::fs::remove_dir_all(entry.path()) {
                Ok(()) => {
                    tracing::info!(path = %entry.path().display(), age_secs = age.as_secs(), "Removed stale scratch directory");
                    removed += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "Failed to remove stale scratch directory");
                }
            }
        }

        Ok(removed)
    }
}

/// The scratch directories of one request. Removed on [`release`] or drop.
///
/// [`release`]: JobScratch::release
#[derive(Debug)]
pub struct JobScratch {
    upload: TempDir,
    download: TempDir,
}

impl JobScratch {
    pub fn upload_dir(&self) -> &Path {
        self.upload.path()
    }

    pub fn download_dir(&self) -> &Path {
        self.download.path()
    }

    /// Remove both directories now, logging rather than returning failures.
    pub fn release(self) {
        for dir in [self.upload, self.download] {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove scratch directory");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(root: &Path) -> usize {
        std::fs::read_dir(root).unwrap().count()
    }

    #[test]
    fn allocate_creates_two_distinct_dirs_under_root() {
        let root = tempfile::tempdir().unwrap();
        let space = ScratchSpace::new(root.path());

        let scratch = space.allocate().unwrap();

        assert!(scratch.upload_dir().is_dir());
        assert!(scratch.download_dir().is_dir());
        assert_ne!(scratch.upload_dir(), scratch.download_dir());
        assert!(scratch.upload_dir().starts_with(root.path()));
        assert_eq!(entries(root.path()), 2);
    }

    #[test]
    fn release_removes_both_dirs_with_contents() {
        let root = tempfile::tempdir().unwrap();
        let space = ScratchSpace::new(root.path());
        let scratch = space.allocate().unwrap();
        std::fs::write(scratch.upload_dir().join("a.pdf"), b"%PDF").unwrap();

        scratch.release();

        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn drop_removes_dirs() {
        let root = tempfile::tempdir().unwrap();
        let space = ScratchSpace::new(root.path());
        drop(space.allocate().unwrap());
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn reap_removes_only_stale_scratch_dirs() {
        let root = tempfile::tempdir().unwrap();
        let space = ScratchSpace::new(root.path());
        let leaked = space.allocate().unwrap();
        std::fs::create_dir(root.path().join("unrelated")).unwrap();

        // Simulate a crashed request: keep the directories on disk.
        let upload = leaked.upload.keep();
        let download = leaked.download.keep();

        assert_eq!(space.reap_stale(Duration::from_secs(3600)).unwrap(), 0);
        assert_eq!(space.reap_stale(Duration::ZERO).unwrap(), 2);

        assert!(!upload.exists());
        assert!(!download.exists());
        assert!(root.path().join("unrelated").exists());
    }

    #[tokio::test]
    async fn ensure_root_creates_missing_root() {
        let parent = tempfile::tempdir().unwrap();
        let space = ScratchSpace::new(parent.path().join("nested/scratch"));
        space.ensure_root().await.unwrap();
        assert!(space.root().is_dir());
    }
}
