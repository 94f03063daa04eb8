use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::DocumentId;
use crate::diagnostics::DocumentDiagnostic;

/// Ticket handed to an analysis when it starts. Later tickets for the same
/// document compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

#[derive(Debug, Default)]
struct Slot {
    started: u64,
    published: u64,
    in_flight: usize,
    closed: bool,
    diagnostics: Option<Vec<DocumentDiagnostic>>,
}

/// Current diagnostic set per document.
///
/// A result is only published if no analysis of the same document that
/// started later has already published, so a slow stale run cannot replace
/// fresher diagnostics. A document's slot lives as long as it has published
/// diagnostics or analyses in flight.
#[derive(Debug, Default)]
pub struct DiagnosticStore {
    slots: Mutex<HashMap<DocumentId, Slot>>,
}

/// An analysis of one document in progress. Dropping it marks the analysis
/// as finished, whether or not it published.
#[derive(Debug)]
pub struct Ticket<'a> {
    store: &'a DiagnosticStore,
    id: DocumentId,
    generation: Generation,
}

impl Ticket<'_> {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Replace the document's diagnostics unless a newer analysis already
    /// did, or the document was closed since this analysis started.
    /// Returns whether the set was replaced.
    pub fn publish(&self, diagnostics: Vec<DocumentDiagnostic>) -> bool {
        self.store.publish(&self.id, self.generation, diagnostics)
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        self.store.finish(&self.id);
    }
}

impl DiagnosticStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<DocumentId, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new analysis of `id`.
    pub fn begin(&self, id: &DocumentId) -> Ticket<'_> {
        let mut slots = self.slots();
        let slot = slots.entry(id.clone()).or_default();
        slot.started += 1;
        slot.in_flight += 1;
        slot.closed = false;
        Ticket {
            store: self,
            id: id.clone(),
            generation: Generation(slot.started),
        }
    }

    fn publish(&self, id: &DocumentId, generation: Generation, diagnostics: Vec<DocumentDiagnostic>) -> bool {
        let mut slots = self.slots();
        let Some(slot) = slots.get_mut(id) else {
            return false;
        };
        if generation.0 <= slot.published {
            return false;
        }
        slot.published = generation.0;
        slot.diagnostics = Some(diagnostics);
        true
    }

    fn finish(&self, id: &DocumentId) {
        let mut slots = self.slots();
        let Some(slot) = slots.get_mut(id) else {
            return;
        };
        slot.in_flight = slot.in_flight.saturating_sub(1);
        if slot.in_flight == 0 && slot.closed {
            slots.remove(id);
        }
    }

    pub fn get(&self, id: &DocumentId) -> Option<Vec<DocumentDiagnostic>> {
        self.slots().get(id).and_then(|slot| slot.diagnostics.clone())
    }

    /// Drop the diagnostics of `id`. Analyses still in flight for it will
    /// not publish; the slot goes away once the last of them finishes.
    pub fn remove(&self, id: &DocumentId) {
        let mut slots = self.slots();
        let Some(slot) = slots.get_mut(id) else {
            return;
        };
        if slot.in_flight == 0 {
            slots.remove(id);
            return;
        }
        slot.published = slot.started;
        slot.closed = true;
        slot.diagnostics = None;
    }

    /// Number of documents with a published diagnostic set.
    pub fn len(&self) -> usize {
        self.slots()
            .values()
            .filter(|slot| slot.diagnostics.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of documents the store holds any state for.
    pub fn tracked(&self) -> usize {
        self.slots().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticSeverity, Range};

    fn diag(code: &str) -> DocumentDiagnostic {
        DocumentDiagnostic {
            range: Range::default(),
            severity: DiagnosticSeverity::Warning,
            message: format!("[{code}] m"),
            source: "sast-yaml".to_string(),
            code: code.to_string(),
        }
    }

    fn codes(store: &DiagnosticStore, id: &DocumentId) -> Vec<String> {
        store
            .get(id)
            .unwrap_or_default()
            .into_iter()
            .map(|d| d.code)
            .collect()
    }

    #[test]
    fn test_publish_replaces_whole_set() {
        let store = DiagnosticStore::new();
        let id = DocumentId::new("file:///site.yml");

        assert!(store.begin(&id).publish(vec![diag("A"), diag("B")]));
        assert!(store.begin(&id).publish(vec![diag("C")]));

        assert_eq!(codes(&store, &id), vec!["C"]);
    }

    #[test]
    fn test_stale_result_is_dropped() {
        let store = DiagnosticStore::new();
        let id = DocumentId::new("file:///site.yml");

        let older = store.begin(&id);
        let newer = store.begin(&id);
        assert!(newer.generation() > older.generation());

        assert!(newer.publish(vec![diag("NEW")]));
        assert!(!older.publish(vec![diag("OLD")]));
        assert_eq!(codes(&store, &id), vec!["NEW"]);
    }

    #[test]
    fn test_in_order_completion_keeps_latest() {
        let store = DiagnosticStore::new();
        let id = DocumentId::new("file:///site.yml");

        let older = store.begin(&id);
        let newer = store.begin(&id);
        assert!(older.publish(vec![diag("OLD")]));
        assert!(newer.publish(vec![diag("NEW")]));
        assert_eq!(codes(&store, &id), vec!["NEW"]);
    }

    #[test]
    fn test_documents_are_independent() {
        let store = DiagnosticStore::new();
        let a = DocumentId::new("file:///a.yml");
        let b = DocumentId::new("file:///b.yml");

        let ta = store.begin(&a);
        let tb = store.begin(&b);
        assert!(tb.publish(vec![diag("B")]));
        assert!(ta.publish(vec![diag("A")]));
        assert_eq!(store.len(), 2);
        assert_eq!(codes(&store, &a), vec!["A"]);
    }

    #[test]
    fn test_remove_clears_and_blocks_in_flight() {
        let store = DiagnosticStore::new();
        let id = DocumentId::new("file:///site.yml");

        store.begin(&id).publish(vec![diag("A")]);
        store.remove(&id);
        assert!(store.get(&id).is_none());
        assert!(store.is_empty());

        let in_flight = store.begin(&id);
        store.remove(&id);
        assert!(!in_flight.publish(vec![diag("LATE")]));
        assert!(store.get(&id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_closed_documents_are_forgotten() {
        let store = DiagnosticStore::new();
        let id = DocumentId::new("file:///site.yml");

        store.begin(&id).publish(vec![diag("A")]);
        assert_eq!(store.tracked(), 1);
        store.remove(&id);
        assert_eq!(store.tracked(), 0);

        let in_flight = store.begin(&id);
        store.remove(&id);
        assert_eq!(store.tracked(), 1);
        drop(in_flight);
        assert_eq!(store.tracked(), 0);
    }

    #[test]
    fn test_reopened_document_publishes_after_close() {
        let store = DiagnosticStore::new();
        let id = DocumentId::new("file:///site.yml");

        let before_close = store.begin(&id);
        store.remove(&id);
        let after_reopen = store.begin(&id);

        assert!(!before_close.publish(vec![diag("OLD")]));
        drop(before_close);
        assert!(after_reopen.publish(vec![diag("NEW")]));
        drop(after_reopen);
        assert_eq!(codes(&store, &id), vec!["NEW"]);
        assert_eq!(store.tracked(), 1);
    }

    #[test]
    fn test_failed_analysis_leaves_no_slot_after_close() {
        let store = DiagnosticStore::new();
        let id = DocumentId::new("file:///site.yml");

        drop(store.begin(&id));
        store.remove(&id);
        assert_eq!(store.tracked(), 0);
    }

    #[test]
    fn test_unpublished_document_has_no_set() {
        let store = DiagnosticStore::new();
        let id = DocumentId::new("file:///site.yml");
        let _ticket = store.begin(&id);
        assert!(store.get(&id).is_none());
        assert!(store.is_empty());
    }
}
