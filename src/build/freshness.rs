//! Modification-time staleness checks.

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

fn modified(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

/// Whether `derived` must be regenerated from `source`.
///
/// True when the derived file is missing or strictly older than the
/// source. Errors reading the source surface to the caller.
pub fn is_stale(source: &Path, derived: &Path) -> io::Result<bool> {
    let source_time = modified(source)?;
    match modified(derived) {
        Ok(derived_time) => Ok(source_time > derived_time),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options().write(true).open(path).unwrap().set_modified(time).unwrap();
    }

    #[test]
    fn test_missing_derived_is_stale() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.png");
        fs::write(&src, b"x").unwrap();
        assert!(is_stale(&src, &temp.path().join("a.avif")).unwrap());
    }

    #[test]
    fn test_newer_source_is_stale() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.png");
        let out = temp.path().join("a.avif");
        fs::write(&src, b"x").unwrap();
        fs::write(&out, b"y").unwrap();

        let now = SystemTime::now();
        set_mtime(&out, now - Duration::from_secs(60));
        set_mtime(&src, now);
        assert!(is_stale(&src, &out).unwrap());
    }

    #[test]
    fn test_older_or_equal_source_is_fresh() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.png");
        let out = temp.path().join("a.avif");
        fs::write(&src, b"x").unwrap();
        fs::write(&out, b"y").unwrap();

        let now = SystemTime::now();
        set_mtime(&src, now - Duration::from_secs(60));
        set_mtime(&out, now);
        assert!(!is_stale(&src, &out).unwrap());

        set_mtime(&src, now);
        assert!(!is_stale(&src, &out).unwrap());
    }

    #[test]
    fn test_missing_source_errors() {
        let temp = TempDir::new().unwrap();
        assert!(is_stale(&temp.path().join("gone.png"), &temp.path().join("gone.avif")).is_err());
    }
}
