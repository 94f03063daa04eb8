use chrono::Local;
use sastyaml_core::{DocumentDiagnostic, DocumentId, EditorHost, Settings, TextDocument};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::display;

/// Editor host backed by the terminal: diagnostics and messages go to
/// stdout/stderr, reports are written to disk.
pub struct TerminalHost {
    settings: Settings,
    documents: RefCell<Vec<TextDocument>>,
    active: RefCell<Option<DocumentId>>,
    open_report: bool,
    silent: bool,
    report_path: Option<PathBuf>,
    written: RefCell<Vec<PathBuf>>,
    notices: RefCell<Vec<Notice>>,
}

/// A warning or error shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Warning(String),
    Error(String),
}

impl TerminalHost {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            documents: RefCell::new(Vec::new()),
            active: RefCell::new(None),
            open_report: false,
            silent: false,
            report_path: None,
            written: RefCell::new(Vec::new()),
            notices: RefCell::new(Vec::new()),
        }
    }

    /// Accept the "show report" action whenever it is offered.
    pub fn with_open_report(mut self, open_report: bool) -> Self {
        self.open_report = open_report;
        self
    }

    /// Print nothing but errors. Used when stdout carries machine output.
    pub fn quiet(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Write reports to this exact path instead of the report directory.
    pub fn with_report_path(mut self, path: Option<PathBuf>) -> Self {
        self.report_path = path;
        self
    }

    /// Track `document` as open, replacing an older copy. Returns false when
    /// an identical copy was already open.
    pub fn open(&self, document: TextDocument) -> bool {
        let mut documents = self.documents.borrow_mut();
        match documents.iter_mut().find(|d| d.id == document.id) {
            Some(existing) if existing.text == document.text => false,
            Some(existing) => {
                *existing = document;
                true
            }
            None => {
                documents.push(document);
                true
            }
        }
    }

    pub fn close(&self, id: &DocumentId) {
        self.documents.borrow_mut().retain(|d| &d.id != id);
        let mut active = self.active.borrow_mut();
        if active.as_ref() == Some(id) {
            *active = None;
        }
    }

    pub fn set_active(&self, id: &DocumentId) {
        *self.active.borrow_mut() = Some(id.clone());
    }

    pub fn is_open(&self, id: &DocumentId) -> bool {
        self.documents.borrow().iter().any(|d| &d.id == id)
    }

    /// Warnings and errors shown so far, in order.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    pub fn error_count(&self) -> usize {
        self.notices
            .borrow()
            .iter()
            .filter(|n| matches!(n, Notice::Error(_)))
            .count()
    }

    /// Reports written so far.
    pub fn written_reports(&self) -> Vec<PathBuf> {
        self.written.borrow().clone()
    }

    fn report_destination(&self) -> PathBuf {
        if let Some(path) = &self.report_path {
            return path.clone();
        }
        let stem = self
            .active_document()
            .and_then(|d| {
                d.file_name
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
            })
            .unwrap_or_else(|| "playbook".to_string());
        self.settings.report_dir().join(report_file_name(&stem, Local::now()))
    }
}

/// `report_<stem>_<YYYYMMDD_HHMMSS>.html`
pub fn report_file_name(stem: &str, at: chrono::DateTime<Local>) -> String {
    format!("report_{}_{}.html", stem, at.format("%Y%m%d_%H%M%S"))
}

fn write_report(path: &Path, html: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
}

impl EditorHost for TerminalHost {
    fn settings(&self) -> Settings {
        self.settings.clone()
    }

    fn active_document(&self) -> Option<TextDocument> {
        let active = self.active.borrow();
        let id = active.as_ref()?;
        self.documents.borrow().iter().find(|d| &d.id == id).cloned()
    }

    fn open_documents(&self) -> Vec<TextDocument> {
        self.documents.borrow().clone()
    }

    fn publish_diagnostics(&self, id: &DocumentId, diagnostics: &[DocumentDiagnostic]) {
        if self.silent {
            return;
        }
        display::print_diagnostics(id.as_str(), diagnostics);
    }

    fn clear_diagnostics(&self, id: &DocumentId) {
        tracing::debug!(document = %id, "diagnostics cleared");
    }

    fn set_status_message(&self, text: &str, _duration: Duration) {
        if self.silent {
            return;
        }
        display::print_status(text);
    }

    fn show_information(&self, text: &str) {
        if self.silent {
            return;
        }
        display::print_information(text);
    }

    fn show_warning(&self, text: &str) {
        display::print_warning(text);
        self.notices.borrow_mut().push(Notice::Warning(text.to_string()));
    }

    fn show_warning_with_action(&self, text: &str, action: &str) -> bool {
        display::print_warning(text);
        self.notices.borrow_mut().push(Notice::Warning(text.to_string()));
        if self.open_report {
            display::print_status(&format!("-> {action}"));
        }
        self.open_report
    }

    fn show_error(&self, text: &str) {
        display::print_error(text);
        self.notices.borrow_mut().push(Notice::Error(text.to_string()));
    }

    fn show_report(&self, title: &str, html: &str) {
        let path = self.report_destination();
        match write_report(&path, html) {
            Ok(()) => {
                display::print_information(&format!("{title}: {}", path.display()));
                self.written.borrow_mut().push(path);
            }
            Err(e) => self.show_error(&format!(
                "Failed to write report '{}': {e}",
                path.display()
            )),
        }
    }
}
