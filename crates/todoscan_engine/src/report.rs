/* 📖 # What goes into a report?

A report is a presentation view of a scan: the records in file/line order, each text
prefixed with its tag so a row reads on its own, plus per-tag counts. `ReportData` is
built once and rendered either as JSON for tooling or as Markdown for humans.
*/

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use todoscan_base::{PalHandle, TodoscanError, TodoscanResult};

use crate::annotation::{AnnotationRecord, sort_records};

/// Output format of a written report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    #[serde(alias = "md")]
    Markdown,
}

/// Aggregate counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub by_tag: BTreeMap<String, usize>,
}

/// Count and share of one tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagStat {
    pub tag: String,
    pub count: usize,
    /// Percentage of all records, rounded to one decimal.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub todos: Vec<AnnotationRecord>,
    pub summary: Summary,
    pub tag_stats: Vec<TagStat>,
}

/// Build the report view of `records`.
pub fn build_report_data(records: &[AnnotationRecord]) -> ReportData {
    let mut todos = records.to_vec();
    let mut by_tag: BTreeMap<String, usize> = BTreeMap::new();
    for todo in &mut todos {
        *by_tag.entry(todo.tag.clone()).or_default() += 1;
        todo.text = if todo.text.is_empty() {
            todo.tag.clone()
        } else {
            format!("{}: {}", todo.tag, todo.text)
        };
    }
    sort_records(&mut todos);

    let total = todos.len();
    let tag_stats = by_tag
        .iter()
        .map(|(tag, &count)| TagStat {
            tag: tag.clone(),
            count,
            percent: percent_of(count, total),
        })
        .collect();

    ReportData {
        todos,
        summary: Summary { total, by_tag },
        tag_stats,
    }
}

fn percent_of(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 * 1000.0 / total as f64).round() / 10.0
}

/// Pretty-printed JSON with a trailing newline.
pub fn render_json(data: &ReportData) -> TodoscanResult<String> {
    let mut json = serde_json::to_string_pretty(data)
        .map_err(|e| todoscan_base::err!("Failed to serialize report: {}", e))?;
    json.push('\n');
    Ok(json)
}

pub fn render_markdown(data: &ReportData) -> String {
    let mut out = String::new();
    out.push_str("# todoscan report\n\n");
    out.push_str("## Summary\n\n");
    out.push_str(&format!("- Total: {}\n", data.summary.total));
    for stat in &data.tag_stats {
        out.push_str(&format!(
            "- {}: {} ({:.1}%)\n",
            stat.tag, stat.count, stat.percent
        ));
    }
    out.push('\n');
    out.push_str("## Todos\n\n");
    out.push_str("| File | Line | Tag | Text |\n");
    out.push_str("|------|------:|-----:|------|\n");
    for todo in &data.todos {
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            todo.file,
            todo.line,
            todo.tag,
            escape_cell(&todo.text)
        ));
    }
    out
}

// A bare `|` would split the table row.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

impl ReportFormat {
    pub fn render(self, data: &ReportData) -> TodoscanResult<String> {
        match self {
            ReportFormat::Json => render_json(data),
            ReportFormat::Markdown => Ok(render_markdown(data)),
        }
    }
}

/// Render `records` in `format` and write the result to `output` through the PAL.
#[instrument(skip(pal, records), fields(output = %output.display(), records = records.len()))]
pub fn write_report(
    pal: &PalHandle,
    format: ReportFormat,
    output: &Path,
    records: &[AnnotationRecord],
) -> TodoscanResult<()> {
    let rendered = format.render(&build_report_data(records))?;
    let mut writer = pal.create_file(output)?;
    writer
        .write_all(rendered.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|e| Box::new(TodoscanError::file(output, e)))?;
    info!(?format, "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use todoscan_base::{FilePath, MockPal};

    fn record(file: &str, line: usize, tag: &str, text: &str) -> AnnotationRecord {
        AnnotationRecord {
            file: FilePath::from(file),
            line,
            tag: tag.to_string(),
            text: text.to_string(),
        }
    }

    fn sample() -> Vec<AnnotationRecord> {
        vec![
            record("b.go", 10, "FIXME", "second"),
            record("a.go", 2, "TODO", "first"),
            record("a.go", 20, "BUG", "third"),
        ]
    }

    #[test]
    fn test_build_report_data_sorts_and_enriches() {
        let data = build_report_data(&sample());
        let rows: Vec<_> = data
            .todos
            .iter()
            .map(|t| (t.file.as_str(), t.line, t.text.as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("a.go", 2, "TODO: first"),
                ("a.go", 20, "BUG: third"),
                ("b.go", 10, "FIXME: second"),
            ]
        );
        assert_eq!(data.summary.total, 3);
        let tags: Vec<_> = data.tag_stats.iter().map(|s| s.tag.as_str()).collect();
        assert_eq!(tags, vec!["BUG", "FIXME", "TODO"]);
    }

    #[test]
    fn test_empty_text_becomes_tag() {
        let data = build_report_data(&[record("x.go", 1, "NOTE", "")]);
        assert_eq!(data.todos[0].text, "NOTE");
    }

    #[test]
    fn test_percentages_round_to_one_decimal() {
        let data = build_report_data(&[
            record("a", 1, "TODO", ""),
            record("a", 2, "TODO", ""),
            record("a", 3, "NOTE", ""),
        ]);
        let percents: Vec<_> = data.tag_stats.iter().map(|s| (s.tag.as_str(), s.percent)).collect();
        assert_eq!(percents, vec![("NOTE", 33.3), ("TODO", 66.7)]);
    }

    #[test]
    fn test_empty_report() {
        let data = build_report_data(&[]);
        assert_eq!(data.summary.total, 0);
        assert!(data.tag_stats.is_empty());
        expect![[r#"
            # todoscan report

            ## Summary

            - Total: 0

            ## Todos

            | File | Line | Tag | Text |
            |------|------:|-----:|------|
        "#]]
        .assert_eq(&render_markdown(&data));
    }

    #[test]
    fn test_render_markdown() {
        let mut records = sample();
        records.push(record("c.go", 1, "NOTE", "a | b"));
        expect![[r#"
            # todoscan report

            ## Summary

            - Total: 4
            - BUG: 1 (25.0%)
            - FIXME: 1 (25.0%)
            - NOTE: 1 (25.0%)
            - TODO: 1 (25.0%)

            ## Todos

            | File | Line | Tag | Text |
            |------|------:|-----:|------|
            | a.go | 2 | TODO | TODO: first |
            | a.go | 20 | BUG | BUG: third |
            | b.go | 10 | FIXME | FIXME: second |
            | c.go | 1 | NOTE | NOTE: a \| b |
        "#]]
        .assert_eq(&render_markdown(&build_report_data(&records)));
    }

    #[test]
    fn test_render_json() {
        let data = build_report_data(&[
            record("src/a.go", 3, "TODO", "x"),
            record("src/a.go", 7, "TODO", ""),
        ]);
        expect![[r#"
            {
              "todos": [
                {
                  "file": "src/a.go",
                  "line": 3,
                  "tag": "TODO",
                  "text": "TODO: x"
                },
                {
                  "file": "src/a.go",
                  "line": 7,
                  "tag": "TODO",
                  "text": "TODO"
                }
              ],
              "summary": {
                "total": 2,
                "byTag": {
                  "TODO": 2
                }
              },
              "tagStats": [
                {
                  "tag": "TODO",
                  "count": 2,
                  "percent": 100.0
                }
              ]
            }
        "#]]
        .assert_eq(&render_json(&data).unwrap());
    }

    #[test]
    fn test_write_report_through_pal() {
        let mock = MockPal::new();
        let pal = PalHandle::new(mock.clone());
        write_report(&pal, ReportFormat::Markdown, Path::new("out/todos.md"), &sample()).unwrap();

        let written = String::from_utf8(mock.file_contents("out/todos.md").unwrap()).unwrap();
        assert!(written.starts_with("# todoscan report\n"));
        assert!(written.contains("| a.go | 2 | TODO | TODO: first |"));
    }

    #[test]
    fn test_write_json_report_parses_back() {
        let mock = MockPal::new();
        let pal = PalHandle::new(mock.clone());
        write_report(&pal, ReportFormat::Json, Path::new("todos.json"), &sample()).unwrap();

        let written = mock.file_contents("todos.json").unwrap();
        let value: serde_json::Value = serde_json::from_slice(&written).unwrap();
        assert_eq!(value["summary"]["total"], 3);
        assert_eq!(value["summary"]["byTag"]["FIXME"], 1);
        assert_eq!(value["todos"][0]["text"], "TODO: first");
    }
}
