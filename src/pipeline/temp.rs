//! Temporary artifacts: collision-free names and ownership-scoped cleanup.
//!
//! Every intermediate (HTML page, rendered PDF, pdftk output) is reserved
//! through [`TempArtifacts`], which creates the file with the filesystem's
//! exclusive-create primitive (via [`tempfile::Builder`]) rather than
//! checking for existence and then writing. Two threads, or two processes
//! sharing the temp root, can therefore never be handed the same path.
//!
//! The returned [`TempArtifact`] is a guard: dropping it deletes the file.
//! Call [`TempArtifact::keep`] to disarm it once the artifact is handed to
//! the caller. Deletion is best-effort; failures are logged, never returned.

use crate::error::{PdfComposeError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Random characters in every generated name.
const RAND_CHARS: usize = 16;

/// Factory for temp paths under one root directory.
#[derive(Debug, Clone)]
pub struct TempArtifacts {
    root: PathBuf,
    prefix: String,
}

impl TempArtifacts {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve a fresh `<root>/<prefix><random>.<extension>` file.
    ///
    /// The file exists (empty) when this returns; the name is never reused
    /// while it exists.
    pub fn new_temp_path(&self, extension: &str) -> Result<TempArtifact> {
        let suffix = format!(".{}", extension.trim_start_matches('.'));
        let file = tempfile::Builder::new()
            .prefix(&self.prefix)
            .suffix(&suffix)
            .rand_bytes(RAND_CHARS)
            .tempfile_in(&self.root)
            .map_err(|e| PdfComposeError::io(&self.root, e))?;
        let path = file
            .into_temp_path()
            .keep()
            .map_err(|e| PdfComposeError::io(&self.root, e.error))?;
        debug!("Reserved temp file {}", path.display());
        Ok(TempArtifact::file(path))
    }

    /// Reserve a fresh, empty directory under the root.
    pub fn new_temp_dir(&self) -> Result<TempArtifact> {
        let dir = tempfile::Builder::new()
            .prefix(&self.prefix)
            .rand_bytes(RAND_CHARS)
            .tempdir_in(&self.root)
            .map_err(|e| PdfComposeError::io(&self.root, e))?;
        let path = dir.keep();
        debug!("Reserved temp dir {}", path.display());
        Ok(TempArtifact {
            path,
            kind: Kind::Dir,
            armed: true,
        })
    }
}

/// Delete `path` if present. Idempotent; failures are only logged.
pub fn release(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Deleted {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Could not delete temp file {}: {}", path.display(), e),
    }
}

fn release_dir(path: &Path) {
    match std::fs::remove_dir_all(path) {
        Ok(()) => debug!("Deleted {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Could not delete temp dir {}: {}", path.display(), e),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    File,
    Dir,
}

/// A pipeline-owned file or directory, deleted on drop unless kept.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    kind: Kind,
    armed: bool,
}

impl TempArtifact {
    /// Take ownership of an existing pipeline-owned file.
    pub(crate) fn file(path: PathBuf) -> Self {
        Self {
            path,
            kind: Kind::File,
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Disarm the guard and return the path; the artifact outlives the guard.
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }

    /// Delete now rather than at end of scope.
    pub fn release(self) {
        drop(self)
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.kind {
            Kind::File => release(&self.path),
            Kind::Dir => release_dir(&self.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn paths_are_distinct_and_carry_extension() {
        let dir = tempfile::tempdir().unwrap();
        let temps = TempArtifacts::new(dir.path(), "t-");
        let mut seen = HashSet::new();
        let mut guards = Vec::new();
        for _ in 0..10_000 {
            let a = temps.new_temp_path("pdf").unwrap();
            assert!(a.path().extension().is_some_and(|e| e == "pdf"));
            assert!(seen.insert(a.path().to_path_buf()), "duplicate path");
            guards.push(a);
        }
        drop(guards);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn drop_deletes_and_keep_preserves() {
        let dir = tempfile::tempdir().unwrap();
        let temps = TempArtifacts::new(dir.path(), "t-");

        let dropped = temps.new_temp_path(".html").unwrap();
        let dropped_path = dropped.path().to_path_buf();
        assert!(dropped_path.to_string_lossy().ends_with(".html"));
        assert!(dropped_path.exists());
        drop(dropped);
        assert!(!dropped_path.exists());

        let kept = temps.new_temp_path("pdf").unwrap().keep();
        assert!(kept.exists());
        assert!(kept.file_name().unwrap().to_string_lossy().starts_with("t-"));
    }

    #[test]
    fn release_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = TempArtifacts::new(dir.path(), "t-")
            .new_temp_path("tmp")
            .unwrap()
            .keep();
        release(&path);
        release(&path);
        assert!(!path.exists());
    }

    #[test]
    fn temp_dir_removed_with_contents() {
        let dir = tempfile::tempdir().unwrap();
        let d = TempArtifacts::new(dir.path(), "t-").new_temp_dir().unwrap();
        std::fs::write(d.path().join("page_0001.pdf"), b"%PDF").unwrap();
        let p = d.path().to_path_buf();
        d.release();
        assert!(!p.exists());
    }

    #[test]
    fn missing_root_is_io_error() {
        let temps = TempArtifacts::new("/definitely/not/a/dir", "t-");
        assert!(matches!(
            temps.new_temp_path("pdf"),
            Err(PdfComposeError::Io { .. })
        ));
    }
}
