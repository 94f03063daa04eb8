use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;

/// Severity level reported by the analyzer.
///
/// Anything other than the three known labels is kept verbatim in `Other`
/// and ranks below `Low`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    High,
    Medium,
    Low,
    Other(String),
}

impl Severity {
    pub fn priority(&self) -> u8 {
        match self {
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
            Severity::Other(_) => 0,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Other(raw) => raw,
        }
    }

    /// CSS class used by the HTML report.
    pub fn css_class(&self) -> String {
        self.label().to_lowercase()
    }
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        match value.as_str() {
            "HIGH" => Severity::High,
            "MEDIUM" => Severity::Medium,
            "LOW" => Severity::Low,
            _ => Severity::Other(value),
        }
    }
}

impl From<Severity> for String {
    fn from(value: Severity) -> Self {
        match value {
            Severity::Other(raw) => raw,
            known => known.label().to_string(),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single issue reported by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: String,
    pub message: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Finding {
    /// Text used to locate the finding in its document: the task name, then
    /// the play name, then the rule id. Empty strings are skipped.
    pub fn anchor_text(&self) -> Option<&str> {
        [
            self.task.as_deref(),
            self.play.as_deref(),
            Some(self.rule_id.as_str()),
        ]
        .into_iter()
        .flatten()
        .find(|text| !text.is_empty())
    }

    pub fn is_high(&self) -> bool {
        self.severity == Severity::High
    }
}

/// Metadata block some analyzer versions emit next to `violations`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerMetadata {
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub analyzer_version: Option<String>,
}

/// Findings for one document snapshot, in the order the analyzer reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub findings: Vec<Finding>,
    pub metadata: Option<AnalyzerMetadata>,
}

impl AnalysisResult {
    pub fn new(findings: Vec<Finding>) -> Self {
        Self {
            findings,
            metadata: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn high_count(&self) -> usize {
        self.findings.iter().filter(|f| f.is_high()).count()
    }
}

#[derive(Debug, Deserialize)]
struct ResultEnvelope {
    #[serde(default)]
    violations: Option<Vec<Finding>>,
    #[serde(default)]
    metadata: Option<AnalyzerMetadata>,
}

/// Parse the analyzer's stdout.
///
/// A missing or `null` `violations` key is an empty result. Any other shape
/// is a [`AnalyzerError::ResultParse`].
pub fn parse_output(stdout: &[u8]) -> Result<AnalysisResult, AnalyzerError> {
    let envelope: ResultEnvelope =
        serde_json::from_slice(stdout).map_err(AnalyzerError::ResultParse)?;

    Ok(AnalysisResult {
        findings: envelope.violations.unwrap_or_default(),
        metadata: envelope.metadata,
    })
}
