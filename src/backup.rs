//! Append-only backup of the working file.
//!
//! Before any destructive overwrite, the current working-file content is
//! captured: a verbatim copy when no backup exists yet, otherwise the
//! prior content is appended after a timestamped separator. The chain
//! grows without bound; auditability is favored over disk usage.

use chrono::{SecondsFormat, Utc};
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Capture the current content of `working` into `backup`. Does nothing
/// when the working file does not exist. Returns whether a capture
/// happened.
pub fn capture(working: &Path, backup: &Path) -> Result<bool> {
    if !working.exists() {
        return Ok(false);
    }
    let current = fs::read_to_string(working)?;
    if backup.exists() {
        let mut chain = fs::read_to_string(backup)?;
        chain.push_str(&separator());
        chain.push_str(&current);
        fs::write(backup, chain)?;
    } else {
        fs::write(backup, current)?;
    }
    Ok(true)
}

fn separator() -> String {
    format!(
        "\n\n# ===== Backup from {} =====\n\n",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Whether two working-file contents differ, normalized for line-ending
/// differences only.
pub fn content_differs(a: &str, b: &str) -> bool {
    a.replace("\r\n", "\n") != b.replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_capture_is_a_verbatim_copy() {
        let dir = TempDir::new().unwrap();
        let working = dir.path().join(".env");
        let backup = dir.path().join(".env.backup");
        fs::write(&working, "A=1\n").unwrap();

        assert!(capture(&working, &backup).unwrap());
        assert_eq!(fs::read_to_string(&backup).unwrap(), "A=1\n");
    }

    #[test]
    fn second_capture_appends_after_timestamped_separator() {
        let dir = TempDir::new().unwrap();
        let working = dir.path().join(".env");
        let backup = dir.path().join(".env.backup");

        fs::write(&working, "A=1\n").unwrap();
        capture(&working, &backup).unwrap();
        fs::write(&working, "A=2\n").unwrap();
        capture(&working, &backup).unwrap();

        let chain = fs::read_to_string(&backup).unwrap();
        assert!(chain.starts_with("A=1\n"));
        assert!(chain.contains("# ===== Backup from "));
        assert!(chain.ends_with("A=2\n"));
        // all captures are preserved
        assert!(chain.contains("A=1\n"));
    }

    #[test]
    fn missing_working_file_captures_nothing() {
        let dir = TempDir::new().unwrap();
        let working = dir.path().join(".env");
        let backup = dir.path().join(".env.backup");
        assert!(!capture(&working, &backup).unwrap());
        assert!(!backup.exists());
    }

    #[test]
    fn content_differs_ignores_line_endings() {
        assert!(!content_differs("A=1\nB=2\n", "A=1\r\nB=2\r\n"));
        assert!(content_differs("A=1\n", "A=2\n"));
    }
}
