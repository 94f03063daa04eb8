use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use sastyaml_core::{DocumentId, ProcessAnalyzer, Session, TextDocument};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::display;
use crate::host::TerminalHost;

type TerminalSession = Session<ProcessAnalyzer, TerminalHost>;

/// The paths a watch was asked for: directories are watched recursively,
/// single files only for themselves.
#[derive(Debug, Default)]
pub struct WatchScope {
    dirs: Vec<PathBuf>,
    files: Vec<PathBuf>,
}

impl WatchScope {
    pub fn new(roots: &[PathBuf]) -> Self {
        let (files, dirs): (Vec<PathBuf>, Vec<PathBuf>) =
            roots.iter().cloned().partition(|root| root.is_file());
        Self { dirs, files }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|file| file == path) || self.dirs.iter().any(|dir| path.starts_with(dir))
    }

    /// Where the watcher has to be registered for each root.
    fn targets(&self) -> impl Iterator<Item = (&Path, RecursiveMode)> {
        // Editors often save by replacing the file, so single files are
        // watched through their directory.
        let files = self.files.iter().map(|file| {
            (file.parent().unwrap_or(Path::new(".")), RecursiveMode::NonRecursive)
        });
        let dirs = self.dirs.iter().map(|dir| (dir.as_path(), RecursiveMode::Recursive));
        files.chain(dirs)
    }
}

/// Sweep the already-discovered playbooks, then analyze files as they are
/// saved until interrupted.
pub async fn run(session: &TerminalSession, roots: &[PathBuf]) -> Result<()> {
    let scope = WatchScope::new(roots);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
        let _ = tx.send(event);
    })
    .context("Failed to create file watcher")?;

    for (target, mode) in scope.targets() {
        watcher
            .watch(target, mode)
            .with_context(|| format!("Failed to watch '{}'", target.display()))?;
    }

    let analyzed = session.startup_sweep().await;
    display::print_status(&format!(
        "Watching {} path(s), {} playbook(s) analyzed. Press Ctrl-C to stop.",
        roots.len(),
        analyzed
    ));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(Ok(event)) => handle_event(session, &scope, event).await,
                Some(Err(e)) => tracing::warn!(error = %e, "file watcher error"),
                None => break,
            },
            _ = &mut shutdown => break,
        }
    }

    tracing::info!("watch stopped");
    Ok(())
}

async fn handle_event(session: &TerminalSession, scope: &WatchScope, event: Event) {
    for path in event
        .paths
        .iter()
        .filter(|p| is_yaml(p) && scope.contains(p))
    {
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => saved(session, path).await,
            EventKind::Remove(_) => closed(session, &DocumentId::from_path(path)),
            _ => {}
        }
    }
}

async fn saved(session: &TerminalSession, path: &Path) {
    let document = match TextDocument::open(path) {
        Ok(document) => document,
        // Renames surface as a modify of a path that is already gone.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            closed(session, &DocumentId::from_path(path));
            return;
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read changed file");
            return;
        }
    };

    let host = session.host();
    if !host.open(document.clone()) {
        return;
    }
    host.set_active(&document.id);
    session.on_document_saved(&document).await;
}

fn closed(session: &TerminalSession, id: &DocumentId) {
    if !session.host().is_open(id) {
        return;
    }
    session.host().close(id);
    session.on_document_closed(id);
}

pub fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml" | "yaml")
    )
}
