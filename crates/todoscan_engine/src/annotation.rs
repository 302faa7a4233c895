/* 📖 # Why a single shared matcher?

The annotation pattern is compiled once, on first use, and then only read. Every scan
worker borrows the same `&'static AnnotationMatcher`, so there is no per-worker setup
and no mutable global state.
*/

use std::io::{self, BufRead};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use todoscan_base::FilePath;

/// The marker keywords recognized in source lines, in their reported (uppercase) form.
pub const ANNOTATION_TAGS: [&str; 4] = ["TODO", "FIXME", "BUG", "NOTE"];

static SHARED_MATCHER: LazyLock<AnnotationMatcher> = LazyLock::new(AnnotationMatcher::new);

/// One annotation found in a scanned file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationRecord {
    /// Path relative to the scan root, with forward slashes.
    pub file: FilePath,
    /// 1-based line number.
    pub line: usize,
    /// Uppercased marker keyword.
    pub tag: String,
    /// Trimmed text following the keyword, possibly empty.
    pub text: String,
}

/// Tag and text extracted from a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMatch {
    pub tag: String,
    pub text: String,
}

/// Recognizes `TODO`, `FIXME`, `BUG` and `NOTE` as whole words, case-insensitively,
/// optionally followed by a colon, and captures the rest of the line.
#[derive(Debug)]
pub struct AnnotationMatcher {
    pattern: Regex,
}

impl AnnotationMatcher {
    fn new() -> Self {
        let keywords = ANNOTATION_TAGS.join("|");
        let pattern = Regex::new(&format!(r"(?i)\b({keywords})\b:?(.+)?"))
            .expect("annotation pattern is a valid regex");
        Self { pattern }
    }

    /// The process-wide matcher instance.
    pub fn shared() -> &'static AnnotationMatcher {
        &SHARED_MATCHER
    }

    /// Match one line. Only the first keyword occurrence is considered.
    pub fn match_line(&self, line: &str) -> Option<LineMatch> {
        let captures = self.pattern.captures(line)?;
        let tag = captures.get(1)?.as_str().to_uppercase();
        let text = captures
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        Some(LineMatch { tag, text })
    }

    /// Scan a stream line by line, producing records attributed to `file`.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; `\n` and `\r\n` endings are both
    /// accepted. Records come back in line order.
    pub fn scan_reader<R: BufRead>(
        &self,
        mut reader: R,
        file: &FilePath,
    ) -> io::Result<Vec<AnnotationRecord>> {
        let mut records = Vec::new();
        let mut buf = Vec::new();
        let mut line_number = 0;
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_number += 1;
            let line = String::from_utf8_lossy(trim_line_ending(&buf));
            if let Some(LineMatch { tag, text }) = self.match_line(&line) {
                records.push(AnnotationRecord {
                    file: file.clone(),
                    line: line_number,
                    tag,
                    text,
                });
            }
        }
        Ok(records)
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Order records by file, then line. Scans make no ordering promise across files.
pub fn sort_records(records: &mut [AnnotationRecord]) {
    records.sort_by(|a, b| {
        a.file
            .as_str()
            .cmp(b.file.as_str())
            .then(a.line.cmp(&b.line))
    });
}
