/* 📖 # Why does the CLI take a single positional argument?

Everything tunable lives in `todoscan.toml` in the current directory, so the command
line only needs to say where to scan:

    todoscan [ROOT]

ROOT defaults to `.`. Annotations go to stdout as `file:line  TAG  text`, sorted by
file and line, followed by a per-tag summary. Unreadable files are reported on stderr
and do not change the exit code.

Exit codes:
- 0: Scan finished (with or without annotations)
- 1: The root could not be walked, the configuration is invalid, or the report could
  not be written
*/

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process;

use tracing::debug;

use todoscan_base::tracing::init_tracing;
use todoscan_base::{PalHandle, RealPal};
use todoscan_engine::{
    AnnotationRecord, CONFIG_FILE_NAME, load_config, scan_with_pal, sort_records, write_report,
};

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Warning: {}", e);
    }

    let root = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let current_dir = env::current_dir().unwrap_or_else(|e| {
        eprintln!("Error: Failed to get current directory: {}", e);
        process::exit(1);
    });
    let pal = PalHandle::new(RealPal::new(current_dir));

    let config = match load_config(&pal, Path::new(CONFIG_FILE_NAME)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load {}: {}", CONFIG_FILE_NAME, e);
            process::exit(1);
        }
    };
    debug!(?config, "configuration loaded");

    let outcome = scan_with_pal(&pal, &root, &config.ignore, &config.scan_options());

    if !outcome.file_errors.is_empty() {
        eprintln!("Warnings during scanning:");
        for failure in &outcome.file_errors {
            eprintln!("  - {}: {}", failure.file, failure.error);
        }
    }

    let mut records = match outcome.into_result() {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    sort_records(&mut records);

    for record in &records {
        println!("{}", format_record(record));
    }
    println!();
    println!("{}", format_summary(&records));

    if let Some(report) = &config.report {
        if let Err(e) = write_report(&pal, report.format, &report.output, &records) {
            eprintln!("Error: Failed to write report: {}", e);
            process::exit(1);
        }
        println!("Report written to {}", report.output.display());
    }
}

fn format_record(record: &AnnotationRecord) -> String {
    if record.text.is_empty() {
        format!("{}:{}  {}", record.file, record.line, record.tag)
    } else {
        format!(
            "{}:{}  {}  {}",
            record.file, record.line, record.tag, record.text
        )
    }
}

fn format_summary(records: &[AnnotationRecord]) -> String {
    let mut by_tag: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *by_tag.entry(record.tag.as_str()).or_default() += 1;
    }
    let mut summary = format!("Found {} annotations", records.len());
    if !by_tag.is_empty() {
        let counts: Vec<String> = by_tag
            .iter()
            .map(|(tag, count)| format!("{} {}", tag, count))
            .collect();
        summary.push_str(&format!(" ({})", counts.join(", ")));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use todoscan_base::FilePath;

    fn record(file: &str, line: usize, tag: &str, text: &str) -> AnnotationRecord {
        AnnotationRecord {
            file: FilePath::from(file),
            line,
            tag: tag.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_format_record() {
        assert_eq!(
            format_record(&record("src/main.go", 12, "TODO", "refactor")),
            "src/main.go:12  TODO  refactor"
        );
        assert_eq!(format_record(&record("a.go", 1, "BUG", "")), "a.go:1  BUG");
    }

    #[test]
    fn test_format_summary() {
        let records = [
            record("a.go", 1, "TODO", ""),
            record("a.go", 2, "NOTE", ""),
            record("b.go", 1, "TODO", ""),
        ];
        assert_eq!(
            format_summary(&records),
            "Found 3 annotations (NOTE 1, TODO 2)"
        );
        assert_eq!(format_summary(&[]), "Found 0 annotations");
    }
}
