use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{error, info};

use crate::classify::ClassifiedResults;

pub const DEFAULT_TITLE: &str = "Word Accessibility Checker Results";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write report to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Render the plain-text report. Same inputs give the same bytes.
#[allow(dead_code)]
pub fn render_report(results: &ClassifiedResults, document: &str, generated: &str) -> String {
    render_with_title(results, DEFAULT_TITLE, document, generated)
}

pub fn render_with_title(
    results: &ClassifiedResults,
    title: &str,
    document: &str,
    generated: &str,
) -> String {
    let mut out = String::new();

    // writeln! into a String cannot fail
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}\n", "=".repeat(50));
    let _ = writeln!(out, "Document: {}", document);
    let _ = writeln!(out, "Generated: {}\n", generated);

    // status is always set, so the summary block is never empty
    out.push_str("SUMMARY:\n");
    let _ = writeln!(out, "{}", "-".repeat(20));
    for (key, value) in results.summary.entries() {
        let _ = writeln!(out, "{}: {}", title_case_key(key), value);
    }
    out.push('\n');

    numbered_block(&mut out, "ERRORS", &results.errors);
    numbered_block(&mut out, "WARNINGS", &results.warnings);
    numbered_block(&mut out, "TIPS", &results.tips);

    if !results.all_fragments.is_empty() {
        out.push_str("ALL EXTRACTED TEXT ELEMENTS:\n");
        let _ = writeln!(out, "{}", "-".repeat(30));
        for (i, f) in results.all_fragments.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. [{}] {} (depth {})",
                i + 1,
                f.source_label,
                f.text,
                f.depth
            );
        }
        out.push('\n');
    }

    if !results.raw_text.is_empty() {
        out.push_str("RAW ACCESSIBILITY PANE CONTENT:\n");
        let _ = writeln!(out, "{}", "-".repeat(30));
        out.push_str(&results.raw_text);
        out.push_str("\n\n");
    }

    out
}

fn numbered_block(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        let _ = writeln!(out, "{}: None found\n", heading);
        return;
    }
    let _ = writeln!(out, "{} ({}):", heading, items.len());
    let _ = writeln!(out, "{}", "-".repeat(20));
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, item);
    }
    out.push('\n');
}

/// `error_count` -> `Error Count`
pub fn title_case_key(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Local time in ISO-8601 with microseconds.
pub fn timestamp_now() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Stamp, render and write the report in one go.
pub fn write_report(
    path: &Path,
    results: &ClassifiedResults,
    title: &str,
    document: &str,
) -> Result<(), ReportError> {
    let body = render_with_title(results, title, document, &timestamp_now());
    std::fs::write(path, body).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Results saved to {}", path.display());
    Ok(())
}

/// Like [`write_report`] but reports failure as `false` after logging it.
pub fn save_report(path: &Path, results: &ClassifiedResults, title: &str, document: &str) -> bool {
    match write_report(path, results, title, document) {
        Ok(()) => true,
        Err(e) => {
            error!("Error saving results: {}", e);
            false
        }
    }
}

/// `<dir>/<stem><suffix>`, e.g. `ConflictDoc_accessibility_results.txt`.
pub fn output_path(dir: &Path, document: &str, suffix: &str) -> PathBuf {
    let stem = Path::new(document)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    dir.join(format!("{}{}", stem, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::fragment::{PaneDump, TextFragment};

    const TS: &str = "2024-05-01T10:00:00.000000";

    fn sample() -> ClassifiedResults {
        let mut dump = PaneDump::from_fragments(vec![
            TextFragment::new("3 errors found", "Text", 1),
            TextFragment::new("1 warning found", "Text", 1),
            TextFragment::new("Consider adding alt text", "TreeItem", 2),
        ]);
        dump.raw_text = "Accessibility Assistant".into();
        classify(&dump)
    }

    #[test]
    fn full_layout() {
        let expected = "\
Word Accessibility Checker Results
==================================================

Document: ConflictDoc.docx
Generated: 2024-05-01T10:00:00.000000

SUMMARY:
--------------------
Error Count: 3
Warning Count: 1
Status: Issues found

ERRORS (1):
--------------------
1. 3 errors found

WARNINGS (1):
--------------------
1. 1 warning found

TIPS (1):
--------------------
1. Consider adding alt text

ALL EXTRACTED TEXT ELEMENTS:
------------------------------
1. [Text] 3 errors found (depth 1)
2. [Text] 1 warning found (depth 1)
3. [TreeItem] Consider adding alt text (depth 2)

RAW ACCESSIBILITY PANE CONTENT:
------------------------------
Accessibility Assistant

";
        assert_eq!(render_report(&sample(), "ConflictDoc.docx", TS), expected);
    }

    #[test]
    fn empty_results() {
        let r = classify(&PaneDump::default());
        let out = render_report(&r, "Empty.docx", TS);
        assert!(out.contains("Status: Status unclear\n"));
        assert!(out.contains("Note: Found 0 text elements but could not categorize them\n"));
        assert!(out.contains("ERRORS: None found\n\nWARNINGS: None found\n\nTIPS: None found\n\n"));
        assert!(!out.contains("ALL EXTRACTED TEXT ELEMENTS"));
        assert!(!out.contains("RAW ACCESSIBILITY PANE CONTENT"));
    }

    #[test]
    fn idempotent() {
        let r = sample();
        assert_eq!(render_report(&r, "a.docx", TS), render_report(&r, "a.docx", TS));
    }

    #[test]
    fn title_case() {
        assert_eq!(title_case_key("error_count"), "Error Count");
        assert_eq!(title_case_key("status"), "Status");
        assert_eq!(title_case_key("tip_count"), "Tip Count");
    }

    #[test]
    fn custom_title() {
        let out = render_with_title(&sample(), "Checker", "a.docx", TS);
        assert!(out.starts_with("Checker\n====="));
    }

    #[test]
    fn write_and_read_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        assert!(save_report(&path, &sample(), DEFAULT_TITLE, "ConflictDoc.docx"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Word Accessibility Checker Results\n"));
        assert!(text.contains("Document: ConflictDoc.docx\n"));
        assert!(text.contains("1. Consider adding alt text\n"));
    }

    #[test]
    fn write_failure_returns_false() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.txt");
        assert!(!save_report(&path, &sample(), DEFAULT_TITLE, "a.docx"));
        assert!(matches!(
            write_report(&path, &sample(), DEFAULT_TITLE, "a.docx"),
            Err(ReportError::Write { .. })
        ));
    }

    #[test]
    fn output_path_uses_document_stem() {
        let p = output_path(
            Path::new("/tmp/reports"),
            "ConflictDoc.docx",
            "_accessibility_results.txt",
        );
        assert_eq!(p, PathBuf::from("/tmp/reports/ConflictDoc_accessibility_results.txt"));
        let p = output_path(Path::new("."), "", ".txt");
        assert_eq!(p, PathBuf::from("./document.txt"));
    }
}
