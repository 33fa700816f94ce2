//! Push-event payload types.

use serde::Deserialize;

/// The subset of a push-event body the driver consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct PushPayload {
    /// Full ref, e.g. `refs/heads/master`.
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub repository: Repository,
    #[serde(default)]
    pub commits: Vec<Commit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
}

impl PushPayload {
    /// The branch name, i.e. the last ref component.
    pub fn branch(&self) -> &str {
        self.git_ref.rsplit('/').next().unwrap_or(&self.git_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_payload() {
        let body = r#"{
            "ref": "refs/heads/master",
            "repository": {"full_name": "octo/site"},
            "commits": [{"added": ["www/a.njs"], "modified": [], "removed": []}]
        }"#;
        let payload: PushPayload = serde_json::from_str(body).unwrap();
        assert_eq!(payload.branch(), "master");
        assert_eq!(payload.repository.full_name, "octo/site");
        assert_eq!(payload.commits[0].added, vec!["www/a.njs"]);
    }
}
