//! Local filesystem watcher for development workflows.
//!
//! # Responsibilities
//! - Watch the planted base directories for local edits
//! - Replant changed paths and limb removed ones without a webhook
//!
//! Disabled in production deployments, where the webhook driver is the
//! only writer of the content directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::ArborError;
use crate::server::Arbor;

/// One observed local change, expressed in tree terms.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LocalChange {
    Changed(String),
    Removed(String),
}

/// Watches the content base directories and mirrors local edits into
/// the route trees.
pub struct ContentWatcher {
    arbor: Arc<Arbor>,
}

impl ContentWatcher {
    pub fn new(arbor: Arc<Arbor>) -> Self {
        Self { arbor }
    }

    /// Start watching. Returns the watcher handle; dropping it stops
    /// the watch. Events are applied on the runtime, one at a time.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let (tx, mut rx) = mpsc::unbounded_channel::<LocalChange>();
        let base = self.arbor.base_path.clone();
        let roots = self.arbor.config.content.roots.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for change in changes_from_event(&base, &event) {
                        let _ = tx.send(change);
                    }
                }
                Err(e) => tracing::error!(error = %e, "Content watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        for root in &roots {
            let dir = self.arbor.base_path.join(root);
            if dir.is_dir() {
                watcher.watch(&dir, RecursiveMode::Recursive)?;
            }
        }
        tracing::info!(roots = roots.len(), "Content watcher started");

        let arbor = self.arbor;
        tokio::spawn(async move {
            while let Some(change) = rx.recv().await {
                apply_change(&arbor, change).await;
            }
        });

        Ok(watcher)
    }
}

async fn apply_change(arbor: &Arbor, change: LocalChange) {
    let result = match &change {
        LocalChange::Changed(path) => {
            tracing::info!(path = %path, "Local change detected, replanting");
            arbor.replant(path).await
        }
        LocalChange::Removed(path) => {
            tracing::info!(path = %path, "Local removal detected, limbing");
            arbor.limb(path).await
        }
    };
    match result {
        Ok(()) | Err(ArborError::NotPlanted(_)) => {}
        Err(e) => tracing::error!(change = ?change, error = %e, "Local change not applied"),
    }
}

/// Translate a notify event into tree operations on base-relative paths.
fn changes_from_event(base: &Path, event: &Event) -> Vec<LocalChange> {
    let mut out = Vec::new();
    for path in &event.paths {
        let Some(rel) = relative_path(base, path) else {
            continue;
        };
        if event.kind.is_remove() {
            out.push(LocalChange::Removed(rel));
        } else if event.kind.is_modify() || event.kind.is_create() {
            // Directory creation is covered when files land inside it.
            if path.is_file() {
                out.push(LocalChange::Changed(rel));
            }
        }
    }
    out
}

fn relative_path(base: &Path, path: &PathBuf) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let s = rel.to_str()?;
    if s.is_empty() {
        return None;
    }
    Some(s.replace('\\', "/"))
}
