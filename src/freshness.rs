//! Mtime-based freshness checks for the incremental build.
//!
//! Skipping is an optimization only: deleting any output forces it to be
//! rebuilt, and a build with the check disabled produces the same files.

use std::path::Path;
use std::time::SystemTime;

/// Modification time of a file, `None` if it is missing or unreadable.
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Returns `true` if `output` exists and is strictly newer than `source`.
///
/// Equal timestamps count as stale so coarse filesystem clocks never hide a
/// change made in the same tick as the last build.
pub fn is_newer_than(output: &Path, source: &Path) -> bool {
    let (Some(output_time), Some(source_time)) = (get_mtime(output), get_mtime(source)) else {
        return false;
    };
    output_time > source_time
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::time::Duration;

    fn touch(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    #[test]
    fn missing_output_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.svg");
        fs::write(&source, "").unwrap();
        assert!(!is_newer_than(&dir.path().join("a.png"), &source));
    }

    #[test]
    fn compares_modification_times() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.svg");
        let output = dir.path().join("a.png");
        fs::write(&source, "").unwrap();
        fs::write(&output, "").unwrap();

        let base = SystemTime::now() - Duration::from_secs(3600);
        touch(&source, base);
        touch(&output, base + Duration::from_secs(10));
        assert!(is_newer_than(&output, &source));

        touch(&output, base);
        assert!(!is_newer_than(&output, &source));

        touch(&output, base - Duration::from_secs(10));
        assert!(!is_newer_than(&output, &source));
    }
}
