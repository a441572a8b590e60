//! Artifact store: flat directory of generated PNG files.
//!
//! Writers only ever create new, uniquely named files. Bytes land in a
//! `.partial` sibling first and are renamed into place, so every `.png`
//! visible in the directory is complete. Two writes that land on the same
//! name (same digits, tier, and microsecond) both succeed; the last rename
//! wins.

mod retention;

use std::fs;
use std::path::{Path, PathBuf};

use digits_common::constants::artifact;
use digits_common::{ArtifactName, DigitsError};

/// Directory-backed artifact storage
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the artifact directory if it does not exist yet
    pub fn ensure_dir(&self) -> Result<(), DigitsError> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Write `bytes` under `filename`, creating the directory on first use
    pub fn persist(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, DigitsError> {
        self.ensure_dir()?;

        let path = self.dir.join(filename);
        // Unique per write so concurrent writers never share a partial file;
        // the `.{:016x}` tag is `artifact::PARTIAL_TAG_LEN` bytes
        let partial = self.dir.join(format!(
            "{}.{:016x}{}",
            filename,
            rand::random::<u64>(),
            artifact::PARTIAL_SUFFIX
        ));

        let written = fs::write(&partial, bytes).and_then(|()| fs::rename(&partial, &path));
        if let Err(e) = written {
            let _ = fs::remove_file(&partial);
            tracing::warn!(path = ?path, error = %e, "Failed to persist artifact");
            return Err(e.into());
        }

        Ok(path)
    }

    /// Filesystem path of a well-formed artifact name
    pub fn path_of(&self, filename: &str) -> Result<PathBuf, DigitsError> {
        ArtifactName::parse(filename)?;
        Ok(self.dir.join(filename))
    }

    /// True if `filename` is an artifact name and the file is present
    pub fn exists(&self, filename: &str) -> bool {
        self.path_of(filename).is_ok_and(|path| path.is_file())
    }

    /// Read back an artifact's encoded bytes
    pub fn read(&self, filename: &str) -> Result<Vec<u8>, DigitsError> {
        let path = self.path_of(filename)?;
        fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DigitsError::NotFound(filename.to_string()),
            _ => DigitsError::Storage(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: &str = "digits_42_easy_20260101_120000_000001.png";

    #[test]
    fn test_persist_creates_directory() {
        let root = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(root.path().join("nested").join("generated"));

        let path = store.persist(NAME, b"png bytes").unwrap();
        assert!(path.is_file());
        assert!(store.exists(NAME));
        assert_eq!(store.read(NAME).unwrap(), b"png bytes");

        // No partial file left behind
        let leftovers: Vec<_> = fs::read_dir(store.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(artifact::PARTIAL_SUFFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_path_of_rejects_foreign_names() {
        let store = ArtifactStore::new("/tmp/unused");
        assert!(store.path_of("../../etc/passwd").is_err());
        assert!(store.path_of("notes.txt").is_err());
        assert!(!store.exists("notes.txt"));
    }

    #[test]
    fn test_read_missing_artifact() {
        let root = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(root.path());
        assert!(matches!(store.read(NAME), Err(DigitsError::NotFound(_))));
    }

    #[test]
    fn test_persist_into_unwritable_location_fails() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("blocker");
        fs::write(&blocker, b"a file, not a directory").unwrap();

        let store = ArtifactStore::new(blocker.join("generated"));
        assert!(matches!(store.persist(NAME, b"x"), Err(DigitsError::Storage(_))));
    }
}
