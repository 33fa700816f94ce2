//! Applies verified push payloads to the content directory and tree.
//!
//! # Responsibilities
//! - Collapse a payload into a change set and apply it file by file
//! - Keep disk state and route trees consistent per file
//! - Decide whether the process must reinstall dependencies or restart
//!
//! # Design Decisions
//! - Files are processed sequentially; one file's failure is logged and
//!   skipped so the remaining files still land
//! - A file is limbed before any disk write, so a request racing the
//!   update sees either the old node or the replanted one, never a
//!   half-written file
//! - The driver never restarts the process itself; it reports the
//!   decision so the HTTP layer can acknowledge the delivery first

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::SyncConfig;
use crate::error::ArborError;
use crate::observability::metrics;
use crate::server::Arbor;
use crate::sync::changeset::{self, ChangeKind};
use crate::sync::fetch::ContentFetcher;
use crate::sync::payload::PushPayload;

/// What the process must do after a payload is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartAction {
    None,
    /// The entrypoint changed; restart the process.
    Restart,
    /// The manifest changed; run the install command, then restart.
    InstallAndRestart,
}

/// Result of applying one push payload.
#[derive(Debug)]
pub struct SyncOutcome {
    pub applied: usize,
    pub failed: usize,
    pub restart: RestartAction,
}

impl SyncOutcome {
    fn ignored() -> Self {
        Self {
            applied: 0,
            failed: 0,
            restart: RestartAction::None,
        }
    }
}

pub struct SyncDriver {
    arbor: Arc<Arbor>,
    fetcher: Arc<dyn ContentFetcher>,
}

impl SyncDriver {
    pub fn new(arbor: Arc<Arbor>, fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self { arbor, fetcher }
    }

    /// Apply one verified push payload. Per-file failures are isolated;
    /// the outcome reports how many files landed.
    pub async fn apply(&self, payload: &PushPayload) -> SyncOutcome {
        let config = self.arbor.config.sync.clone();
        if payload.branch() != config.branch {
            tracing::debug!(
                branch = %payload.branch(),
                tracked = %config.branch,
                "Ignoring push for untracked branch"
            );
            return SyncOutcome::ignored();
        }

        let changes = changeset::compute(payload);
        tracing::info!(
            repository = %payload.repository.full_name,
            files = changes.len(),
            "Applying push payload"
        );

        let mut outcome = SyncOutcome::ignored();
        for (path, kind) in &changes {
            let result = match kind {
                ChangeKind::Removed => self.remove_file(path).await,
                ChangeKind::Added | ChangeKind::Modified => {
                    self.update_file(&payload.repository.full_name, &config, path)
                        .await
                }
            };
            match result {
                Ok(()) => {
                    metrics::record_sync_file("applied");
                    outcome.applied += 1;
                }
                Err(e) => {
                    metrics::record_sync_file("failed");
                    tracing::error!(path = %path, error = %e, "Sync of file failed, skipping");
                    outcome.failed += 1;
                }
            }
        }

        outcome.restart = decide_restart(&changes, &config);
        outcome
    }

    async fn remove_file(&self, path: &str) -> Result<(), ArborError> {
        self.limb_quietly(path).await;

        let abs = self.arbor.base_path.join(path);
        remove_if_present(&abs).await?;
        if self.arbor.pipeline.has_siblings(path) {
            remove_if_present(&sibling(&abs, "map")).await?;
            remove_if_present(&sibling(&abs, "source")).await?;
        }
        prune_empty_dirs(&self.arbor.base_path, abs.parent()).await;

        tracing::info!(path = %path, "Removed file");
        Ok(())
    }

    async fn update_file(
        &self,
        repository: &str,
        config: &SyncConfig,
        path: &str,
    ) -> Result<(), ArborError> {
        self.limb_quietly(path).await;

        let raw = self.fetcher.fetch(repository, &config.branch, path).await?;
        let transformed = self.arbor.pipeline.transform(path, raw)?;

        let abs = self.arbor.base_path.join(path);
        if let Some(parent) = abs.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&abs, &transformed.contents).await?;
        for (sibling_path, bytes) in &transformed.siblings {
            tokio::fs::write(self.arbor.base_path.join(sibling_path), bytes).await?;
        }

        if self.under_served_root(path) {
            self.arbor.replant(path).await?;
        }

        tracing::info!(path = %path, bytes = transformed.contents.len(), "Updated file");
        Ok(())
    }

    /// Limb a path if it is currently planted; absent paths are fine.
    async fn limb_quietly(&self, path: &str) {
        match self.arbor.limb(path).await {
            Ok(()) => {}
            Err(ArborError::NotPlanted(_)) => {}
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Limb before update failed");
            }
        }
    }

    fn under_served_root(&self, path: &str) -> bool {
        self.arbor
            .config
            .content
            .roots
            .iter()
            .any(|root| path.starts_with(&format!("{}/", root)))
    }
}

/// Restart decision: a manifest change implies an install step first.
fn decide_restart(changes: &BTreeMap<String, ChangeKind>, config: &SyncConfig) -> RestartAction {
    if changes.contains_key(&config.manifest_file) {
        RestartAction::InstallAndRestart
    } else if changes.contains_key(&config.entrypoint_file) {
        RestartAction::Restart
    } else {
        RestartAction::None
    }
}

fn sibling(abs: &Path, suffix: &str) -> PathBuf {
    let mut name = abs.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

async fn remove_if_present(abs: &Path) -> Result<(), ArborError> {
    match tokio::fs::remove_file(abs).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Remove now-empty directories left behind by a deletion, walking up
/// to but never past the content base path.
async fn prune_empty_dirs(base: &Path, start: Option<&Path>) {
    let mut current = start.map(Path::to_path_buf);
    while let Some(dir) = current {
        if dir == base || !dir.starts_with(base) {
            break;
        }
        // remove_dir refuses non-empty directories, which ends the walk.
        if tokio::fs::remove_dir(&dir).await.is_err() {
            break;
        }
        current = dir.parent().map(Path::to_path_buf);
    }
}
