use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analyzer::finding::{AnalysisResult, Finding, Severity};
use crate::session::DocumentId;

/// `source` tag attached to every diagnostic.
pub const DIAGNOSTIC_SOURCE: &str = "sast-yaml";

/// Zero-based line and character. `character` counts UTF-16 code units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Zero-width range at `position`.
    pub const fn point(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }
}

/// Editor severity tiers, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Information,
    Hint,
}

impl DiagnosticSeverity {
    pub fn label(&self) -> &str {
        match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Information => "info",
            DiagnosticSeverity::Hint => "hint",
        }
    }
}

impl From<&Severity> for DiagnosticSeverity {
    fn from(severity: &Severity) -> Self {
        match severity {
            Severity::High => DiagnosticSeverity::Error,
            Severity::Medium => DiagnosticSeverity::Warning,
            Severity::Low => DiagnosticSeverity::Information,
            Severity::Other(_) => DiagnosticSeverity::Hint,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDiagnostic {
    pub range: Range,
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub source: String,
    pub code: String,
}

/// An open document: identity, file name and a snapshot of its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    pub id: DocumentId,
    pub file_name: PathBuf,
    pub text: String,
}

impl TextDocument {
    pub fn new(file_name: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let file_name = file_name.into();
        Self {
            id: DocumentId::from_path(&file_name),
            file_name,
            text: text.into(),
        }
    }

    /// Read a document from disk.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(path, text))
    }

    /// File name without directories, as shown in messages and report titles.
    pub fn base_name(&self) -> String {
        self.file_name
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.file_name.display().to_string())
    }

    /// Convert a byte offset into a line/character position.
    ///
    /// Offsets past the end clamp to the end of the text; offsets inside a
    /// multi-byte character round down to its start.
    pub fn position_at(&self, offset: usize) -> Position {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &self.text[..offset];

        let line = before.matches('\n').count();
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let character: usize = before[line_start..].chars().map(char::len_utf16).sum();

        Position::new(saturate(line), saturate(character))
    }
}

fn saturate(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Locate `finding` in `document`: the first occurrence of its anchor text,
/// or the start of the document when there is none.
pub fn locate(finding: &Finding, document: &TextDocument) -> Position {
    finding
        .anchor_text()
        .and_then(|anchor| document.text.find(anchor))
        .map(|offset| document.position_at(offset))
        .unwrap_or_default()
}

/// Map one finding to an editor diagnostic.
pub fn to_diagnostic(finding: &Finding, document: &TextDocument) -> DocumentDiagnostic {
    DocumentDiagnostic {
        range: Range::point(locate(finding, document)),
        severity: DiagnosticSeverity::from(&finding.severity),
        message: format!("[{}] {}", finding.rule_id, finding.message),
        source: DIAGNOSTIC_SOURCE.to_string(),
        code: finding.rule_id.clone(),
    }
}

/// Map every finding of `result`, preserving analyzer order.
pub fn map_findings(result: &AnalysisResult, document: &TextDocument) -> Vec<DocumentDiagnostic> {
    result
        .findings
        .iter()
        .map(|finding| to_diagnostic(finding, document))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(rule_id: &str, severity: &str, play: Option<&str>, task: Option<&str>) -> Finding {
        Finding {
            rule_id: rule_id.to_string(),
            message: "message".to_string(),
            severity: Severity::from(severity.to_string()),
            play: play.map(str::to_string),
            task: task.map(str::to_string),
            description: None,
        }
    }

    #[test]
    fn test_position_at_counts_lines_and_columns() {
        let doc = TextDocument::new("site.yml", "- hosts: all\n  tasks:\n    - name: x\n");
        assert_eq!(doc.position_at(0), Position::new(0, 0));
        assert_eq!(doc.position_at(2), Position::new(0, 2));
        assert_eq!(doc.position_at(13), Position::new(1, 0));
        assert_eq!(doc.position_at(15), Position::new(1, 2));
    }

    #[test]
    fn test_position_at_uses_utf16_columns() {
        let doc = TextDocument::new("site.yml", "name: Установка 🚀 nginx");
        let offset = doc.text.find("nginx").unwrap();
        // "name: " = 6, "Установка" = 9, " " = 1, rocket = 2 (surrogate pair), " " = 1
        assert_eq!(doc.position_at(offset), Position::new(0, 19));
    }

    #[test]
    fn test_position_at_clamps() {
        let doc = TextDocument::new("a.yml", "ab\ncd");
        assert_eq!(doc.position_at(100), Position::new(1, 2));

        let doc = TextDocument::new("a.yml", "é");
        assert_eq!(doc.position_at(1), Position::new(0, 0));
    }

    #[test]
    fn test_anchor_at_offset_120() {
        let mut text = String::new();
        while text.len() < 120 {
            text.push_str("# padding line\n");
        }
        text.truncate(120);
        let padding_lines = text.matches('\n').count();
        let column = 120 - text.rfind('\n').map_or(0, |i| i + 1);
        text.push_str("Install package\n");
        let doc = TextDocument::new("site.yml", text);

        let diag = to_diagnostic(&finding("R1", "HIGH", None, Some("Install package")), &doc);
        let expected = Position::new(padding_lines as u32, column as u32);
        assert_eq!(doc.text.find("Install package"), Some(120));
        assert_eq!(diag.range, Range::point(expected));
        assert_eq!(diag.range.start, doc.position_at(120));
    }

    #[test]
    fn test_missing_anchor_falls_back_to_start() {
        let doc = TextDocument::new("site.yml", "- hosts: all\n  tasks: []\n");
        let diag = to_diagnostic(&finding("R1", "HIGH", None, Some("Install package")), &doc);
        assert_eq!(diag.range, Range::point(Position::new(0, 0)));
    }

    #[test]
    fn test_play_then_rule_id_anchor() {
        let doc = TextDocument::new("site.yml", "# ANS009\n- name: deploy\n  hosts: all\n");

        let diag = to_diagnostic(&finding("ANS009", "LOW", Some("deploy"), None), &doc);
        assert_eq!(diag.range.start, Position::new(1, 8));

        let diag = to_diagnostic(&finding("ANS009", "LOW", None, None), &doc);
        assert_eq!(diag.range.start, Position::new(0, 2));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let doc = TextDocument::new("site.yml", "- name: restart\n- name: restart\n");
        let diag = to_diagnostic(&finding("R", "LOW", None, Some("restart")), &doc);
        assert_eq!(diag.range.start, Position::new(0, 8));
    }

    #[test]
    fn test_severity_tiers() {
        let doc = TextDocument::new("a.yml", "");
        let tier = |s: &str| to_diagnostic(&finding("R", s, None, None), &doc).severity;
        assert_eq!(tier("HIGH"), DiagnosticSeverity::Error);
        assert_eq!(tier("MEDIUM"), DiagnosticSeverity::Warning);
        assert_eq!(tier("LOW"), DiagnosticSeverity::Information);
        assert_eq!(tier("CRITICAL"), DiagnosticSeverity::Hint);
        assert_eq!(tier(""), DiagnosticSeverity::Hint);
    }

    #[test]
    fn test_message_code_and_source() {
        let doc = TextDocument::new("a.yml", "");
        let diag = to_diagnostic(&finding("NO_SHELL", "MEDIUM", Some("deploy"), None), &doc);
        assert_eq!(diag.message, "[NO_SHELL] message");
        assert_eq!(diag.code, "NO_SHELL");
        assert_eq!(diag.source, DIAGNOSTIC_SOURCE);
    }

    #[test]
    fn test_base_name() {
        let doc = TextDocument::new("/work/play/site.yml", "");
        assert_eq!(doc.base_name(), "site.yml");
    }
}
