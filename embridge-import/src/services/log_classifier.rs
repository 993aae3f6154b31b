//! Pure text classification of embulk output
//!
//! Everything the pipeline learns about a run it learns by scraping text:
//! the guess output advertises the compressed input size, the run log
//! counts processed bytes per input file, and failures show up as marker
//! lines on stdout or stderr. All pattern knowledge lives here so the
//! runner and the monitor stay free of parsing details.

use once_cell::sync::Lazy;
use regex::Regex;

static CONTENT_LENGTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)Content-Length:\s([0-9]+)$").unwrap());

static PROCESSED_BYTES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([0-9,]+)\sbytes\)").unwrap());

static ERROR_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^Error").unwrap());

static USAGE_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Usage: embulk run <config\.yml>").unwrap());

/// Compressed input size advertised in guess output. The tool logs one
/// Content-Length line per input file request; the last one wins.
pub fn content_length(text: &str) -> Option<u64> {
    CONTENT_LENGTH_RE
        .captures_iter(text)
        .last()
        .and_then(|caps| caps[1].parse().ok())
}

/// Total bytes the tool reports having read so far. The run log carries
/// one "(N bytes)" figure per loaded file, thousands-separated.
pub fn processed_bytes(text: &str) -> u64 {
    PROCESSED_BYTES_RE
        .captures_iter(text)
        .filter_map(|caps| caps[1].replace(',', "").parse::<u64>().ok())
        .sum()
}

/// Log lines carrying a WARN marker. Any warning means the tool coerced
/// or skipped data, so the import cannot be trusted.
pub fn warning_lines(text: &str) -> Vec<&str> {
    text.lines().filter(|line| line.contains("WARN")).collect()
}

/// True when stdout contains a line starting with the tool's error marker.
pub fn stdout_reports_error(stdout: &str) -> bool {
    ERROR_MARKER_RE.is_match(stdout)
}

/// True when stderr contains the usage banner the tool prints after
/// rejecting its arguments.
pub fn stderr_reports_usage_error(stderr: &str) -> bool {
    USAGE_MARKER_RE.is_match(stderr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_length_takes_last_match() {
        let output = "\
2024-01-09 12:00:01 DEBUG Content-Length: 1024\n\
some other line\n\
2024-01-09 12:00:02 DEBUG Content-Length: 2048\n";
        assert_eq!(content_length(output), Some(2048));
    }

    #[test]
    fn test_content_length_absent() {
        assert_eq!(content_length(""), None);
        assert_eq!(content_length("no sizes here\n"), None);
        // Mid-line figures do not count, the value ends the line.
        assert_eq!(content_length("Content-Length: 10 trailing\n"), None);
    }

    #[test]
    fn test_processed_bytes_sums_comma_separated_figures() {
        let log = "\
2024-01-09 12:00:03 INFO Loading file1.csv.gz (1,234 bytes)\n\
2024-01-09 12:00:04 INFO Loading file2.csv.gz (766 bytes)\n";
        assert_eq!(processed_bytes(log), 2000);
    }

    #[test]
    fn test_processed_bytes_empty_log() {
        assert_eq!(processed_bytes(""), 0);
        assert_eq!(processed_bytes("nothing loaded yet\n"), 0);
    }

    #[test]
    fn test_warning_lines() {
        let log = "\
2024-01-09 12:00:03 INFO all good\n\
2024-01-09 12:00:04 WARN coerced null to 0 in column value\n\
2024-01-09 12:00:05 INFO done\n";
        let warnings = warning_lines(log);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("coerced null"));

        assert!(warning_lines("INFO nothing wrong\n").is_empty());
    }

    #[test]
    fn test_stdout_error_marker_is_line_anchored() {
        assert!(stdout_reports_error("Error: config.yml is invalid\n"));
        assert!(stdout_reports_error(
            "2024-01-09 12:00:03 INFO running\nError: java.lang.RuntimeException\n"
        ));
        // The marker must start a line.
        assert!(!stdout_reports_error("12:00:03 INFO recovered from Error\n"));
    }

    #[test]
    fn test_stderr_usage_marker() {
        let stderr = "\
Usage: embulk run <config.yml>\n\
    -b, --bundle BUNDLE_DIR\n";
        assert!(stderr_reports_usage_error(stderr));
        assert!(!stderr_reports_usage_error("error: unknown option\n"));
    }
}
