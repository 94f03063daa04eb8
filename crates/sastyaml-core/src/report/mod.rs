pub mod html;

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::json;

use crate::analyzer::finding::{Finding, Severity};

/// How often one rule fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleTally {
    pub rule_id: String,
    pub count: usize,
    pub severity: Severity,
    pub description: String,
}

/// Counts and findings for one document, ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub document: String,
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub by_rule: Vec<RuleTally>,
    pub findings: Vec<Finding>,
}

impl ReportSummary {
    /// Aggregate `findings` for the document labelled `document`.
    ///
    /// Findings keep the analyzer's order. Rule tallies are in first-seen order.
    pub fn from_findings(document: impl Into<String>, findings: &[Finding]) -> Self {
        let count = |severity: Severity| findings.iter().filter(|f| f.severity == severity).count();

        let mut by_rule: Vec<RuleTally> = Vec::new();
        for finding in findings {
            match by_rule.iter_mut().find(|t| t.rule_id == finding.rule_id) {
                Some(tally) => tally.count += 1,
                None => by_rule.push(RuleTally {
                    rule_id: finding.rule_id.clone(),
                    count: 1,
                    severity: finding.severity.clone(),
                    description: finding.description.clone().unwrap_or_default(),
                }),
            }
        }

        Self {
            document: document.into(),
            total: findings.len(),
            high: count(Severity::High),
            medium: count(Severity::Medium),
            low: count(Severity::Low),
            by_rule,
            findings: findings.to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// JSON report in the same layout the analyzer uses for its own reports.
    pub fn to_json(&self, generated_at: DateTime<Local>) -> serde_json::Value {
        let by_rule: serde_json::Map<String, serde_json::Value> = self
            .by_rule
            .iter()
            .map(|tally| {
                (
                    tally.rule_id.clone(),
                    json!({
                        "count": tally.count,
                        "description": tally.description,
                        "severity": tally.severity,
                    }),
                )
            })
            .collect();

        json!({
            "metadata": {
                "generated_at": generated_at.to_rfc3339(),
                "document": self.document,
                "report_format": "json",
                "total_violations": self.total,
            },
            "summary": {
                "by_severity": {
                    "HIGH": self.high,
                    "MEDIUM": self.medium,
                    "LOW": self.low,
                },
                "by_rule": by_rule,
            },
            "violations": self.findings,
        })
    }
}
