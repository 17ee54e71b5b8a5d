//! Utilities for path collection and display formatting.

use crate::{BatchPrintError, Result};
use std::path::PathBuf;

/// Expand multiple glob patterns into filesystem paths.
///
/// Accepts anything iterable with items that convert to `&str`, e.g.:
/// `&[&str]`, `Vec<String>`, or `Vec<&str>`. A pattern without glob
/// metacharacters is passed through as-is so that a missing file is reported
/// by whoever opens it, not silently dropped here.
///
/// Errors:
/// - Propagates `glob` parse errors.
/// - Propagates filesystem errors from glob iterator.
pub fn collect_paths_for_patterns<T>(patterns: T) -> Result<Vec<PathBuf>>
where
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    let mut resolved_paths = Vec::new();

    for pattern in patterns {
        let pattern = pattern.as_ref();
        if is_glob(pattern) {
            resolved_paths.extend(collect_paths_for_pattern(pattern)?);
        } else {
            resolved_paths.push(PathBuf::from(pattern));
        }
    }

    Ok(resolved_paths)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn collect_paths_for_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).map_err(|err| BatchPrintError::other(format!("{pattern}: {err}")))?;

    paths
        .map(|entry| entry.map_err(|err| BatchPrintError::other(err.to_string())))
        .filter(|entry| entry.as_ref().map(|p| p.is_file()).unwrap_or(true))
        .collect()
}

/// Format a byte count for display.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} bytes")
    }
}

/// Shorten `message` to at most `max_chars` characters, marking the cut.
pub fn truncate_message(message: &str, max_chars: usize) -> String {
    let message = message.trim();
    if message.chars().count() <= max_chars {
        return message.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut short: String = message.chars().take(keep).collect();
    short.push_str("...");
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case(0, "0 bytes")]
    #[case(512, "512 bytes")]
    #[case(2048, "2.00 KB")]
    #[case(5 * 1024 * 1024, "5.00 MB")]
    #[case(3 * 1024 * 1024 * 1024, "3.00 GB")]
    fn test_format_file_size(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(format_file_size(bytes), expected);
    }

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("  short  ", 150), "short");

        let long = "é".repeat(200);
        let short = truncate_message(&long, 150);
        assert_eq!(short.chars().count(), 150);
        assert!(short.ends_with("..."));
    }

    #[test]
    fn test_collect_paths_expands_globs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("c.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("folder.pdf")).unwrap();

        let pattern = format!("{}/*.pdf", dir.path().display());
        let mut paths = collect_paths_for_patterns([pattern.as_str()]).unwrap();
        paths.sort();
        assert_eq!(paths, vec![dir.path().join("a.pdf"), dir.path().join("b.pdf")]);
    }

    #[test]
    fn test_plain_paths_pass_through() {
        let paths = collect_paths_for_patterns(vec!["missing.docx".to_string()]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("missing.docx")]);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(collect_paths_for_patterns(["[unclosed*"]).is_err());
    }
}
