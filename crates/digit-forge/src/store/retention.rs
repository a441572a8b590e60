//! Age-based purging of generated artifacts.
//!
//! Cleanup is opportunistic maintenance: failures are logged and counted in
//! the report, never returned to the caller.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, SystemTime};

use digits_common::CleanupReport;
use digits_common::constants::artifact;

use super::ArtifactStore;

impl ArtifactStore {
    /// Delete artifacts older than `max_age_minutes`
    pub fn cleanup(&self, max_age_minutes: u64) -> CleanupReport {
        self.cleanup_older_than(Duration::from_secs(max_age_minutes.saturating_mul(60)))
    }

    /// Scan the directory once and delete marker-prefixed files whose age exceeds `max_age`.
    ///
    /// Age is measured from the file's modification time; artifacts are
    /// written once and never touched again.
    pub fn cleanup_older_than(&self, max_age: Duration) -> CleanupReport {
        let mut report = CleanupReport::default();

        let entries = match fs::read_dir(self.dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return report,
            Err(e) => {
                tracing::warn!(dir = ?self.dir(), error = %e, "Artifact cleanup scan failed");
                report.failed += 1;
                return report;
            }
        };

        let now = SystemTime::now();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Unreadable directory entry");
                    report.failed += 1;
                    continue;
                }
            };

            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(artifact::PREFIX) {
                continue;
            }
            report.scanned += 1;

            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) => modified,
                // Removed by someone else since the listing
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    tracing::warn!(file = ?name, error = %e, "Cannot read artifact age");
                    report.failed += 1;
                    continue;
                }
            };

            // Clock skew into the future counts as brand new
            let age = now.duration_since(modified).unwrap_or_default();
            if age <= max_age {
                continue;
            }

            match purge(&entry.path()) {
                Ok(true) => report.removed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(file = ?name, error = %e, "Failed to delete expired artifact");
                    report.failed += 1;
                }
            }
        }

        if report.removed > 0 || report.failed > 0 {
            tracing::info!(
                scanned = report.scanned,
                removed = report.removed,
                failed = report.failed,
                "Artifact cleanup finished"
            );
        }

        report
    }
}

/// Remove one file; `Ok(false)` if it was already gone
fn purge(path: &Path) -> std::io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = ?path, "Expired artifact already removed");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn touch(dir: &Path, name: &str, age: Duration) {
        let path = dir.join(name);
        fs::write(&path, b"png").unwrap();
        let file = File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_cleanup_removes_only_expired_artifacts() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path();
        touch(dir, "digits_1_easy_20260101_000000_000001.png", 120 * MINUTE);
        touch(dir, "digits_2_hard_20260101_000000_000002.png", 61 * MINUTE);
        touch(dir, "digits_3_hard_20260101_000000_000003.png", 59 * MINUTE);
        touch(dir, "digits_4_insane_20260101_000000_000004.png", Duration::ZERO);
        touch(dir, "favicon.png", 500 * MINUTE);

        let store = ArtifactStore::new(dir);
        let report = store.cleanup(60);

        assert_eq!(report.scanned, 4);
        assert_eq!(report.removed, 2);
        assert_eq!(report.failed, 0);
        assert!(!dir.join("digits_1_easy_20260101_000000_000001.png").exists());
        assert!(!dir.join("digits_2_hard_20260101_000000_000002.png").exists());
        assert!(dir.join("digits_3_hard_20260101_000000_000003.png").exists());
        assert!(dir.join("digits_4_insane_20260101_000000_000004.png").exists());
        // Files without the artifact marker are never touched
        assert!(dir.join("favicon.png").exists());
    }

    #[test]
    fn test_cleanup_zero_threshold_purges_everything_old() {
        let root = tempfile::tempdir().unwrap();
        touch(root.path(), "digits_9_easy_20260101_000000_000009.png", 2 * MINUTE);

        let report = ArtifactStore::new(root.path()).cleanup(0);
        assert_eq!(report.removed, 1);
    }

    #[test]
    fn test_cleanup_missing_directory_is_quiet() {
        let root = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(root.path().join("never-created"));
        assert_eq!(store.cleanup(60), CleanupReport::default());
    }

    #[test]
    fn test_purge_tolerates_concurrent_removal() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("digits_5_easy_20260101_000000_000005.png");
        fs::write(&path, b"png").unwrap();

        assert!(purge(&path).unwrap());
        // Another process got there first
        assert!(!purge(&path).unwrap());
    }

    #[test]
    fn test_cleanup_reports_undeletable_entries() {
        let root = tempfile::tempdir().unwrap();
        // A directory with the marker prefix cannot be removed with remove_file
        let stuck = root.path().join("digits_stuck");
        fs::create_dir(&stuck).unwrap();
        File::open(&stuck)
            .unwrap()
            .set_modified(SystemTime::now() - 90 * MINUTE)
            .unwrap();

        let report = ArtifactStore::new(root.path()).cleanup(60);
        assert_eq!(report.scanned, 1);
        assert_eq!(report.removed, 0);
        assert_eq!(report.failed, 1);
        assert!(stuck.exists());
    }
}
