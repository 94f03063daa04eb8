pub mod store;

use chrono::Local;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use crate::analyzer::finding::{AnalysisResult, Finding};
use crate::analyzer::Analyzer;
use crate::config::Settings;
use crate::diagnostics::{map_findings, DocumentDiagnostic, TextDocument};
use crate::eligibility::is_playbook;
use crate::error::AnalysisError;
use crate::messages;
use crate::report::{html::render_html, ReportSummary};
use store::DiagnosticStore;

/// How long the "analyzing" status message stays visible.
pub const STATUS_DURATION: Duration = Duration::from_secs(3);

/// Identity of an open document, such as a URI or an absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self(path.display().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the session needs from the editor it runs in.
pub trait EditorHost {
    /// Current settings. Read on every trigger so changes apply immediately.
    fn settings(&self) -> Settings;

    fn active_document(&self) -> Option<TextDocument>;

    fn open_documents(&self) -> Vec<TextDocument>;

    fn publish_diagnostics(&self, id: &DocumentId, diagnostics: &[DocumentDiagnostic]);

    fn clear_diagnostics(&self, id: &DocumentId);

    fn set_status_message(&self, text: &str, duration: Duration);

    fn show_information(&self, text: &str);

    fn show_warning(&self, text: &str);

    /// Show a warning offering one action. Returns true if the user chose it.
    fn show_warning_with_action(&self, text: &str, action: &str) -> bool;

    fn show_error(&self, text: &str);

    /// Display a rendered HTML report.
    fn show_report(&self, title: &str, html: &str);
}

/// How much an analysis talks to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    /// Status message while running, outcome summary afterwards.
    Interactive,
    /// No status or summary. Failures are still shown.
    Background,
    /// Like `Background`; used when the caller presents the result itself.
    Silent,
}

/// One editor session: the analyzer, the host, and the diagnostics published
/// so far.
pub struct Session<A, H> {
    analyzer: A,
    host: H,
    store: DiagnosticStore,
}

impl<A: Analyzer, H: EditorHost> Session<A, H> {
    pub fn new(analyzer: A, host: H) -> Self {
        Self {
            analyzer,
            host,
            store: DiagnosticStore::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    pub fn store(&self) -> &DiagnosticStore {
        &self.store
    }

    /// Diagnostics currently published for `id`.
    pub fn diagnostics(&self, id: &DocumentId) -> Option<Vec<DocumentDiagnostic>> {
        self.store.get(id)
    }

    /// Explicit "run analysis" on the active document.
    pub async fn run_analysis_command(&self) {
        match self.active_playbook() {
            Some(document) => {
                self.analyze_document(&document, AnalysisMode::Interactive)
                    .await;
            }
            None => self.host.show_warning(messages::NOTHING_TO_ANALYZE),
        }
    }

    /// Explicit "show report" on the active document. Returns true when a
    /// report was shown.
    pub async fn show_report_command(&self) -> bool {
        let Some(document) = self.active_playbook() else {
            self.host.show_warning(messages::NOTHING_TO_ANALYZE);
            return false;
        };

        match self.inspect(&document).await {
            Ok(result) => {
                self.present_report(&document, &result.findings);
                true
            }
            Err(AnalysisError::AnalyzerDisabled | AnalysisError::IneligibleDocument) => false,
            Err(error) => {
                self.report_failure(&document, &error);
                false
            }
        }
    }

    /// Save hook. Analyzes when `run_on_save` is on and the document is a
    /// playbook. Returns whether an analysis ran.
    pub async fn on_document_saved(&self, document: &TextDocument) -> bool {
        let settings = self.host.settings();
        if !settings.enabled || !settings.run_on_save || !is_playbook(&document.text) {
            return false;
        }
        self.analyze_document(document, AnalysisMode::Interactive)
            .await;
        true
    }

    /// Close hook: forget the document's diagnostics.
    pub fn on_document_closed(&self, id: &DocumentId) {
        self.store.remove(id);
        self.host.clear_diagnostics(id);
        tracing::debug!(document = %id, "cleared diagnostics for closed document");
    }

    /// Analyze every open playbook concurrently. Returns how many were
    /// analyzed.
    pub async fn startup_sweep(&self) -> usize {
        if !self.host.settings().enabled {
            return 0;
        }

        let documents: Vec<TextDocument> = self
            .host
            .open_documents()
            .into_iter()
            .filter(|document| is_playbook(&document.text))
            .collect();

        let runs = documents
            .iter()
            .map(|document| self.analyze_document(document, AnalysisMode::Background));
        futures::future::join_all(runs).await;

        tracing::info!(documents = documents.len(), "startup sweep finished");
        documents.len()
    }

    /// Run the pipeline for `document` and publish its diagnostics.
    ///
    /// Never fails: disabled or ineligible documents yield no findings, and
    /// analyzer failures are shown to the user and yield no findings.
    pub async fn analyze_document(&self, document: &TextDocument, mode: AnalysisMode) -> Vec<Finding> {
        if self.precheck(document).is_err() {
            return Vec::new();
        }

        if mode == AnalysisMode::Interactive {
            self.host
                .set_status_message(messages::STATUS_ANALYZING, STATUS_DURATION);
        }

        match self.execute(document).await {
            Ok(result) => {
                if mode == AnalysisMode::Interactive {
                    self.summarize(document, &result);
                }
                result.findings
            }
            Err(error) => {
                self.report_failure(document, &error);
                Vec::new()
            }
        }
    }

    /// Run the pipeline and hand back the raw result. Diagnostics are
    /// published as with [`Session::analyze_document`]; nothing is shown.
    pub async fn inspect(&self, document: &TextDocument) -> Result<AnalysisResult, AnalysisError> {
        self.precheck(document)?;
        self.execute(document).await
    }

    fn active_playbook(&self) -> Option<TextDocument> {
        self.host
            .active_document()
            .filter(|document| is_playbook(&document.text))
    }

    fn precheck(&self, document: &TextDocument) -> Result<(), AnalysisError> {
        if !self.host.settings().enabled {
            return Err(AnalysisError::AnalyzerDisabled);
        }
        if !is_playbook(&document.text) {
            return Err(AnalysisError::IneligibleDocument);
        }
        Ok(())
    }

    async fn execute(&self, document: &TextDocument) -> Result<AnalysisResult, AnalysisError> {
        let ticket = self.store.begin(&document.id);
        let generation = ticket.generation();
        tracing::debug!(document = %document.id, ?generation, "analysis started");

        let result = self.analyzer.analyze(&document.text).await?;
        let diagnostics = map_findings(&result, document);

        if ticket.publish(diagnostics.clone()) {
            self.host.publish_diagnostics(&document.id, &diagnostics);
            tracing::info!(
                document = %document.id,
                findings = result.len(),
                high = result.high_count(),
                "analysis finished"
            );
        } else {
            tracing::warn!(
                document = %document.id,
                ?generation,
                "discarding stale analysis result"
            );
        }

        Ok(result)
    }

    fn summarize(&self, document: &TextDocument, result: &AnalysisResult) {
        if result.is_empty() {
            self.host.show_information(messages::NO_FINDINGS);
            return;
        }

        let text = messages::findings_summary(result, &document.base_name());
        if self
            .host
            .show_warning_with_action(&text, messages::SHOW_REPORT_ACTION)
        {
            self.present_report(document, &result.findings);
        }
    }

    fn present_report(&self, document: &TextDocument, findings: &[Finding]) {
        let summary = ReportSummary::from_findings(document.file_name.display().to_string(), findings);
        let html = render_html(&summary, Local::now());
        self.host
            .show_report(&messages::report_title(&document.base_name()), &html);
    }

    fn report_failure(&self, document: &TextDocument, error: &AnalysisError) {
        tracing::error!(document = %document.id, %error, "analysis failed");
        self.host.show_error(&messages::analysis_failed(error));
    }
}
