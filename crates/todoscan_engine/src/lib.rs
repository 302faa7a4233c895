pub mod annotation;
pub mod config;
pub mod ignore_rules;
pub mod repo_root;
pub mod report;
pub mod scanner;

pub use annotation::{AnnotationMatcher, AnnotationRecord, LineMatch, sort_records};
pub use config::{CONFIG_FILE_NAME, ReportConfig, ScanConfig, load_config};
pub use ignore_rules::{IGNORE_FILE_NAME, IgnoreRule, IgnoreSet};
pub use repo_root::{REPO_MARKER_DIR, clean_path, find_repo_root, resolve_repo_root};
pub use report::{
    ReportData, ReportFormat, Summary, TagStat, build_report_data, render_json, render_markdown,
    write_report,
};
pub use scanner::{FileScanError, ScanOptions, ScanOutcome, scan, scan_with_pal};
