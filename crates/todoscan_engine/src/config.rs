use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, instrument};

use todoscan_base::{ErrorKind, PalHandle, ResultExt, TodoscanError, TodoscanResult};

use crate::report::ReportFormat;
use crate::scanner::{DEFAULT_QUEUE_CAPACITY, ScanOptions, default_worker_count};

/// Conventional configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "todoscan.toml";

/// Scan settings read from `todoscan.toml`. Every field is optional.
///
/// ```toml
/// ignore = ["vendor", "third_party"]
/// workers = 4
///
/// [report]
/// format = "markdown"
/// output = "todos.md"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Directory names skipped wherever they occur.
    pub ignore: Vec<String>,
    /// Worker pool size; host parallelism when absent.
    pub workers: Option<usize>,
    /// Capacity of the job queue between walk and workers.
    pub queue_capacity: Option<usize>,
    /// Report to write after the scan, if any.
    pub report: Option<ReportConfig>,
}

/// Where and how to write a report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    pub format: ReportFormat,
    pub output: PathBuf,
}

impl ScanConfig {
    /// Parse configuration from TOML text.
    pub fn parse(text: &str) -> TodoscanResult<Self> {
        toml::from_str(text).map_err(|e| {
            Box::new(TodoscanError::new(ErrorKind::Config {
                message: e.message().to_string(),
            }))
        })
    }

    /// Scanner options with configured overrides applied and clamped to at least 1.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            workers: self.workers.unwrap_or_else(default_worker_count).max(1),
            queue_capacity: self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY).max(1),
        }
    }
}

/// Load the configuration at `path`. A missing file yields the default configuration.
#[instrument(skip(pal), fields(path = %path.display()))]
pub fn load_config(pal: &PalHandle, path: &Path) -> TodoscanResult<ScanConfig> {
    let text = match pal.read_file_to_string(path) {
        Ok(text) => text,
        Err(e) if is_not_found(&e) => {
            debug!("no configuration file, using defaults");
            return Ok(ScanConfig::default());
        }
        Err(e) => return Err(e),
    };
    ScanConfig::parse(&text).with_context(|| format!("in {}", path.display()))
}

fn is_not_found(error: &TodoscanError) -> bool {
    matches!(
        error.kind(),
        ErrorKind::FileError { source, .. } if source.kind() == IoErrorKind::NotFound
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use todoscan_base::MockPal;

    fn pal_with(config: &str) -> PalHandle {
        let mock = MockPal::new();
        mock.add_file(CONFIG_FILE_NAME, config);
        PalHandle::new(mock)
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let pal = PalHandle::new(MockPal::new());
        let config = load_config(&pal, Path::new(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, ScanConfig::default());
        assert!(config.ignore.is_empty());
        assert!(config.report.is_none());
    }

    #[test]
    fn test_full_config() {
        let pal = pal_with(
            r#"
ignore = ["vendor", "node_modules"]
workers = 3
queue_capacity = 8

[report]
format = "json"
output = "out/todos.json"
"#,
        );
        let config = load_config(&pal, Path::new(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config.ignore, vec!["vendor", "node_modules"]);
        assert_eq!(
            config.scan_options(),
            ScanOptions {
                workers: 3,
                queue_capacity: 8
            }
        );
        assert_eq!(
            config.report,
            Some(ReportConfig {
                format: ReportFormat::Json,
                output: PathBuf::from("out/todos.json"),
            })
        );
    }

    #[test]
    fn test_markdown_format_aliases() {
        for format in ["markdown", "md"] {
            let config = ScanConfig::parse(&format!(
                "[report]\nformat = \"{}\"\noutput = \"r.md\"\n",
                format
            ))
            .unwrap();
            assert_eq!(config.report.unwrap().format, ReportFormat::Markdown);
        }
    }

    #[test]
    fn test_zero_overrides_are_clamped() {
        let config = ScanConfig::parse("workers = 0\nqueue_capacity = 0\n").unwrap();
        assert_eq!(
            config.scan_options(),
            ScanOptions {
                workers: 1,
                queue_capacity: 1
            }
        );
    }

    #[test]
    fn test_default_options_match_scanner_defaults() {
        assert_eq!(ScanConfig::default().scan_options(), ScanOptions::default());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let pal = pal_with("ignore = \"not a list\"\n");
        let err = load_config(&pal, Path::new(CONFIG_FILE_NAME)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Config { .. }), "{:?}", err);
        assert!(err.to_string().starts_with("in todoscan.toml: "), "{}", err);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = ScanConfig::parse("ignored = [\"x\"]\n").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Config { .. }));

        let err = ScanConfig::parse("[report]\nformat = \"html\"\noutput = \"x\"\n").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Config { .. }));
    }

    #[test]
    fn test_unreadable_file_propagates() {
        let mock = MockPal::new();
        mock.add_file(CONFIG_FILE_NAME, "");
        mock.fail_on_open(CONFIG_FILE_NAME);
        let err = load_config(&PalHandle::new(mock), Path::new(CONFIG_FILE_NAME)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::FileError { .. }));
    }
}
