//! Tracing setup plus a plain-text error log for cycle failures.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::Local;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber. `RUST_LOG` wins, then `LOG_LEVEL`,
/// then `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| std::env::var("LOG_LEVEL").map(EnvFilter::new))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Appends one line to the error log so operators can review failures
/// without trawling stdout. A write failure is itself only logged.
pub fn append_error_log(path: &Path, context: &str, err: &anyhow::Error) {
    let line = format!(
        "{} | {} | {:#}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        context,
        err
    );
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(line.as_bytes()));
    if let Err(io_err) = result {
        error!(path = %path.display(), error = %io_err, "Failed to append to error log");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn error_log_lines_accumulate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("error.log");

        append_error_log(&path, "cycle", &anyhow::anyhow!("portal unreachable"));
        append_error_log(&path, "user 20230001", &anyhow::anyhow!("fetch failed"));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("cycle"));
        assert!(lines[0].contains("portal unreachable"));
        assert!(lines[1].contains("user 20230001"));
    }
}
