pub mod analyzer;
pub mod config;
pub mod diagnostics;
pub mod eligibility;
pub mod error;
pub mod messages;
pub mod report;
pub mod session;
pub mod staging;

pub use analyzer::finding::{AnalysisResult, Finding, Severity};
pub use analyzer::process::ProcessAnalyzer;
pub use analyzer::Analyzer;
pub use config::Settings;
pub use diagnostics::{DiagnosticSeverity, DocumentDiagnostic, Position, Range, TextDocument};
pub use error::{AnalysisError, AnalyzerError, ConfigError};
pub use report::ReportSummary;
pub use session::{AnalysisMode, DocumentId, EditorHost, Session};
