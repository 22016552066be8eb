use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// `  [Button] Check accessibility` or `  - [Button] 'Check accessibility'`
static NODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^( *)(?:- )?\[([^\]]*)\] ?(.*)$").unwrap());

const DEFAULT_LABEL: &str = "Text";

/// One text node observed in the checker pane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    #[serde(alias = "type", default = "default_label")]
    pub source_label: String,
    #[serde(default)]
    pub depth: usize,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, source_label: impl Into<String>, depth: usize) -> Self {
        TextFragment {
            text: text.into(),
            source_label: source_label.into(),
            depth,
        }
    }
}

fn default_label() -> String {
    DEFAULT_LABEL.to_string()
}

/// Everything the scraper handed over for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneDump {
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub fragments: Vec<TextFragment>,
}

impl PaneDump {
    pub fn from_fragments(fragments: Vec<TextFragment>) -> Self {
        PaneDump {
            raw_text: String::new(),
            fragments,
        }
    }

    /// Build a dump from bare strings, all at depth 0.
    pub fn from_texts<S: AsRef<str>>(texts: &[S]) -> Self {
        Self::from_fragments(
            texts
                .iter()
                .map(|t| TextFragment::new(t.as_ref(), DEFAULT_LABEL, 0))
                .collect(),
        )
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.raw_text.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("failed to read pane dump {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON pane dump {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonDump {
    Full(PaneDump),
    Bare(Vec<TextFragment>),
}

/// Load a pane dump, picking the format from the file extension.
pub fn load(path: &Path) -> Result<PaneDump, DumpError> {
    let shown = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| DumpError::Io {
        path: shown.clone(),
        source,
    })?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let dump = if is_json {
        parse_json(&content).map_err(|source| DumpError::Json {
            path: shown.clone(),
            source,
        })?
    } else {
        parse_tree(&content)
    };

    tracing::debug!(
        "Loaded {} fragments from {} (raw text {} chars)",
        dump.fragments.len(),
        shown,
        dump.raw_text.chars().count()
    );
    Ok(dump)
}

/// Load a pane dump, falling back to an empty one when it cannot be read or parsed.
///
/// An empty dump classifies as "Status unclear" with a note, the same as a
/// scraper run that never found the pane.
pub fn load_or_empty(path: &Path) -> PaneDump {
    match load(path) {
        Ok(dump) => dump,
        Err(e) => {
            tracing::warn!("{}; treating it as an empty pane", e);
            PaneDump::default()
        }
    }
}

pub fn parse_json(content: &str) -> Result<PaneDump, serde_json::Error> {
    if content.trim().is_empty() {
        return Ok(PaneDump::default());
    }
    Ok(match serde_json::from_str::<JsonDump>(content)? {
        JsonDump::Full(dump) => dump,
        JsonDump::Bare(fragments) => PaneDump::from_fragments(fragments),
    })
}

/// Parse the indented `[ControlType] text` listing printed while walking the pane.
pub fn parse_tree(content: &str) -> PaneDump {
    let mut fragments = Vec::new();

    for line in content.replace("\r\n", "\n").lines() {
        if line.trim().is_empty() {
            continue;
        }
        fragments.push(parse_node(line));
    }

    let raw_text = fragments
        .iter()
        .find(|f| f.depth == 0)
        .map(|f| f.text.clone())
        .unwrap_or_default();

    PaneDump { raw_text, fragments }
}

fn parse_node(line: &str) -> TextFragment {
    let Some(caps) = NODE_RE.captures(line) else {
        let indent = line.len() - line.trim_start_matches(' ').len();
        return TextFragment::new(line.trim(), DEFAULT_LABEL, indent / 2);
    };

    let depth = caps[1].len() / 2;
    let label = match caps[2].trim() {
        "" => DEFAULT_LABEL,
        l => l,
    };
    let mut text = caps[3].trim_end();
    // `- [Label] 'text'` form quotes the text
    let dashed = line.trim_start().starts_with("- ");
    if dashed && text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
        text = &text[1..text.len() - 1];
    }

    TextFragment::new(text, label, depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_indentation_sets_depth() {
        let dump =
            parse_tree("[Pane] Accessibility\n  [Group] Errors\n    [TreeItem] Missing alt text");
        assert_eq!(dump.fragments.len(), 3);
        assert_eq!(dump.fragments[0], TextFragment::new("Accessibility", "Pane", 0));
        assert_eq!(dump.fragments[1].depth, 1);
        assert_eq!(dump.fragments[2].depth, 2);
        assert_eq!(dump.fragments[2].source_label, "TreeItem");
        assert_eq!(dump.raw_text, "Accessibility");
    }

    #[test]
    fn tree_dash_form_strips_quotes() {
        let dump = parse_tree("- [MsoWorkPane] 'Accessibility Assistant'\n  - [Button] 'Check'");
        assert_eq!(dump.fragments[0].text, "Accessibility Assistant");
        assert_eq!(dump.fragments[1], TextFragment::new("Check", "Button", 1));
    }

    #[test]
    fn tree_unlabelled_line_is_text() {
        let dump = parse_tree("    loose text");
        assert_eq!(dump.fragments[0], TextFragment::new("loose text", "Text", 2));
    }

    #[test]
    fn tree_skips_blank_lines() {
        let dump = parse_tree("\n[Text] a\r\n\r\n[Text] b\n");
        assert_eq!(dump.fragments.len(), 2);
    }

    #[test]
    fn tree_empty_label_defaults() {
        let dump = parse_tree("[] something");
        assert_eq!(dump.fragments[0].source_label, "Text");
    }

    #[test]
    fn tree_empty_input() {
        let dump = parse_tree("");
        assert!(dump.is_empty());
    }

    #[test]
    fn json_full_object() {
        let dump = parse_json(
            r#"{"raw_text": "Accessibility",
                "fragments": [{"text": "3 errors", "source_label": "Text", "depth": 1}]}"#,
        )
        .unwrap();
        assert_eq!(dump.raw_text, "Accessibility");
        assert_eq!(dump.fragments[0], TextFragment::new("3 errors", "Text", 1));
    }

    #[test]
    fn json_bare_array_with_type_alias() {
        let dump = parse_json(r#"[{"text": "Check", "type": "Button"}, {"text": "x"}]"#).unwrap();
        assert_eq!(dump.fragments[0], TextFragment::new("Check", "Button", 0));
        assert_eq!(dump.fragments[1].source_label, "Text");
        assert!(dump.raw_text.is_empty());
    }

    #[test]
    fn json_malformed_is_error() {
        assert!(parse_json("{not json").is_err());
    }

    #[test]
    fn load_picks_format_by_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        let json = dir.path().join("pane.json");
        std::fs::write(&json, r#"[{"text": "Tip: add headings"}]"#).unwrap();
        let txt = dir.path().join("pane.txt");
        std::fs::write(&txt, "[Text] Tip: add headings").unwrap();

        assert_eq!(load(&json).unwrap().fragments.len(), 1);
        assert_eq!(load(&txt).unwrap().fragments[0].text, "Tip: add headings");
    }

    #[test]
    fn load_missing_file() {
        let err = load(Path::new("does/not/exist.json")).unwrap_err();
        assert!(matches!(err, DumpError::Io { .. }));
    }

    #[test]
    fn truncated_json_loads_as_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("Garbled.json");
        std::fs::write(&path, r#"{"fragments": [ {"text": "3 err"#).unwrap();

        assert!(matches!(load(&path), Err(DumpError::Json { .. })));
        assert_eq!(load_or_empty(&path), PaneDump::default());
    }

    #[test]
    fn unreadable_dump_loads_as_empty() {
        assert_eq!(load_or_empty(Path::new("does/not/exist.txt")), PaneDump::default());
    }

    #[test]
    fn sample_fixture() {
        let dump = load(Path::new("tests/fixtures/conflict_doc.txt")).unwrap();
        assert_eq!(dump.raw_text, "Accessibility Assistant");
        assert!(dump.fragments.iter().any(|f| f.source_label == "TreeItem"));
    }
}
