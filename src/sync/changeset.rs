//! Change-set computation from a push payload.
//!
//! A path may appear in several commits of one push; the last write wins,
//! in commit order, with removed < modified < added within one commit.

use std::collections::BTreeMap;

use crate::sync::payload::PushPayload;

/// Final disposition of one changed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Removed,
    Modified,
    Added,
}

/// Collapse the payload's commits into one disposition per path.
pub fn compute(payload: &PushPayload) -> BTreeMap<String, ChangeKind> {
    let mut files = BTreeMap::new();
    for commit in &payload.commits {
        for path in &commit.removed {
            files.insert(path.clone(), ChangeKind::Removed);
        }
        for path in &commit.modified {
            files.insert(path.clone(), ChangeKind::Modified);
        }
        for path in &commit.added {
            files.insert(path.clone(), ChangeKind::Added);
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::payload::{Commit, Repository};

    fn payload(commits: Vec<Commit>) -> PushPayload {
        PushPayload {
            git_ref: "refs/heads/master".into(),
            repository: Repository {
                full_name: "octo/site".into(),
            },
            commits,
        }
    }

    #[test]
    fn last_commit_wins() {
        let p = payload(vec![
            Commit {
                added: vec!["www/a.njs".into()],
                modified: vec![],
                removed: vec![],
            },
            Commit {
                added: vec![],
                modified: vec![],
                removed: vec!["www/a.njs".into()],
            },
        ]);
        assert_eq!(compute(&p)["www/a.njs"], ChangeKind::Removed);
    }

    #[test]
    fn within_one_commit_added_wins() {
        let p = payload(vec![Commit {
            added: vec!["www/a.njs".into()],
            modified: vec![],
            removed: vec!["www/a.njs".into()],
        }]);
        assert_eq!(compute(&p)["www/a.njs"], ChangeKind::Added);
    }
}
