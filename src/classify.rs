use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::fragment::{PaneDump, TextFragment};

static ERROR_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*error").unwrap());
static WARNING_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*warning").unwrap());
static TIP_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*tip").unwrap());

const NO_ISSUE_PHRASES: &[&str] =
    &["no issues", "no accessibility issues", "good to go", "no problems"];
const ISSUE_PHRASES: &[&str] = &["issues found", "problems found", "error", "warning"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Error,
    Warning,
    Tip,
}

impl Category {
    /// Checked in this order; the first match wins.
    pub const ALL: [Category; 3] = [Category::Error, Category::Warning, Category::Tip];

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Category::Error => &["error", "critical", "must fix"],
            Category::Warning => &["warning", "caution", "should fix"],
            Category::Tip => &["tip", "suggestion", "recommendation", "consider"],
        }
    }

    /// `lower` must already be lowercased.
    pub fn matches(self, lower: &str) -> bool {
        self.keywords().iter().any(|kw| lower.contains(kw))
    }
}

/// Category for a piece of pane text, or `None` when no keyword hits.
pub fn categorize(text: &str) -> Option<Category> {
    let lower = text.to_lowercase();
    Category::ALL.into_iter().find(|c| c.matches(&lower))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "No issues found")]
    NoIssues,
    #[serde(rename = "Issues found")]
    IssuesFound,
    #[default]
    #[serde(rename = "Status unclear")]
    Unclear,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::NoIssues => "No issues found",
            Status::IssuesFound => "Issues found",
            Status::Unclear => "Status unclear",
        }
    }

    /// Infer from fixed phrases in the combined pane text.
    pub fn infer(combined: &str) -> Status {
        let lower = combined.to_lowercase();
        if NO_ISSUE_PHRASES.iter().any(|p| lower.contains(p)) {
            Status::NoIssues
        } else if ISSUE_PHRASES.iter().any(|p| lower.contains(p)) {
            Status::IssuesFound
        } else {
            Status::Unclear
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip_count: Option<u64>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Summary {
    /// Present keys in their fixed order, values stringified.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::with_capacity(5);
        if let Some(n) = self.error_count {
            out.push(("error_count", n.to_string()));
        }
        if let Some(n) = self.warning_count {
            out.push(("warning_count", n.to_string()));
        }
        if let Some(n) = self.tip_count {
            out.push(("tip_count", n.to_string()));
        }
        out.push(("status", self.status.to_string()));
        if let Some(note) = &self.note {
            out.push(("note", note.clone()));
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedResults {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub tips: Vec<String>,
    pub summary: Summary,
    pub raw_text: String,
    pub all_fragments: Vec<TextFragment>,
}

impl ClassifiedResults {
    #[allow(dead_code)]
    pub fn category(&self, category: Category) -> &[String] {
        match category {
            Category::Error => &self.errors,
            Category::Warning => &self.warnings,
            Category::Tip => &self.tips,
        }
    }

    pub fn is_uncategorized(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty() && self.tips.is_empty()
    }
}

/// Sort pane fragments into errors, warnings and tips and derive the summary.
pub fn classify(dump: &PaneDump) -> ClassifiedResults {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut tips: Vec<String> = Vec::new();
    let mut non_empty = 0usize;

    for fragment in &dump.fragments {
        let text = fragment.text.trim();
        if text.is_empty() {
            continue;
        }
        non_empty += 1;
        let bucket = match categorize(text) {
            Some(Category::Error) => &mut errors,
            Some(Category::Warning) => &mut warnings,
            Some(Category::Tip) => &mut tips,
            None => continue,
        };
        if !bucket.iter().any(|t| t == text) {
            bucket.push(text.to_string());
        }
    }

    let combined = dump
        .fragments
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let mut summary = Summary {
        error_count: max_count(&ERROR_COUNT_RE, &combined),
        warning_count: max_count(&WARNING_COUNT_RE, &combined),
        tip_count: max_count(&TIP_COUNT_RE, &combined),
        status: Status::infer(&combined),
        note: None,
    };

    // nothing classified, so every non-empty fragment is unclassified
    if errors.is_empty() && warnings.is_empty() && tips.is_empty() {
        summary.note = Some(format!(
            "Found {} text elements but could not categorize them",
            non_empty
        ));
    }

    tracing::debug!(
        "Classified {} fragments: {} errors, {} warnings, {} tips ({})",
        dump.fragments.len(),
        errors.len(),
        warnings.len(),
        tips.len(),
        summary.status
    );

    ClassifiedResults {
        errors,
        warnings,
        tips,
        summary,
        raw_text: dump.raw_text.clone(),
        all_fragments: dump.fragments.clone(),
    }
}

fn max_count(re: &Regex, text: &str) -> Option<u64> {
    re.captures_iter(text)
        .filter_map(|c| c[1].parse::<u64>().ok())
        .max()
}
