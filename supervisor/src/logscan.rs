//! Validator log severity scanning.
//!
//! Validator log lines look like `[HH:MM:SS, <level>, <module>] message`,
//! where `<level>` is a numeric severity. Lines that do not match are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Lowest severity counted as an error.
pub const ERROR_THRESHOLD: u32 = 50;

static SEVERITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[[\d:]*, (\d*), .*\]").expect("severity regex is valid")
});

/// Numeric severity of one log line, if the line carries one.
pub fn line_severity(line: &str) -> Option<u32> {
    SEVERITY
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|level| level.as_str().parse().ok())
}

/// Whether the log at `path` has any line at or above `threshold`.
///
/// A missing or unreadable log has no errors. Undecodable bytes are replaced
/// rather than rejected.
pub fn log_has_error(path: &Path, threshold: u32) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                if line_severity(line.trim_end()).is_some_and(|level| level >= threshold) {
                    return true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_severity() {
        assert_eq!(line_severity("[12:01:33, 50, gossip] peer lost"), Some(50));
        assert_eq!(line_severity("[12:01:33, 20, journal] block committed"), Some(20));
        assert_eq!(line_severity("[, , ledger] no level"), None);
        assert_eq!(line_severity("plain text"), None);
        assert_eq!(line_severity("  [12:01:33, 50, x] indented"), None);
    }

    #[test]
    fn detects_error_lines() {
        let mut log = NamedTempFile::new().unwrap();
        writeln!(log, "[10:00:00, 20, main] starting").unwrap();
        writeln!(log, "garbage \u{fffd} line").unwrap();
        writeln!(log, "[10:00:01, 40, main] slow peer").unwrap();
        assert!(!log_has_error(log.path(), ERROR_THRESHOLD));

        writeln!(log, "[10:00:02, 50, main] failed to apply block").unwrap();
        assert!(log_has_error(log.path(), ERROR_THRESHOLD));
    }

    #[test]
    fn tolerates_invalid_utf8() {
        let mut log = NamedTempFile::new().unwrap();
        log.write_all(b"\xff\xfe\n[10:00:00, 60, main] fatal\n").unwrap();
        assert!(log_has_error(log.path(), ERROR_THRESHOLD));
    }

    #[test]
    fn missing_log_has_no_errors() {
        assert!(!log_has_error(Path::new("/nonexistent/validator.log"), ERROR_THRESHOLD));
    }
}
