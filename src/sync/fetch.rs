//! Remote file retrieval for webhook-driven updates.
//!
//! # Responsibilities
//! - Fetch one file's current contents from the source repository
//! - Retry transient failures with jittered exponential backoff
//!
//! The driver only sees the [`ContentFetcher`] trait, so tests swap in
//! an in-memory map instead of a network client.

use std::future::Future;
use std::pin::Pin;

use base64::Engine;
use rand::Rng;
use std::time::Duration;
use url::Url;

use crate::error::ArborError;

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, ArborError>> + Send + 'a>>;

/// Source of file contents addressed by repository, branch and path.
pub trait ContentFetcher: Send + Sync {
    fn fetch<'a>(&'a self, repository: &'a str, branch: &'a str, path: &'a str) -> FetchFuture<'a>;
}

/// Fetches file contents through the GitHub contents API.
pub struct GithubFetcher {
    client: reqwest::Client,
    token: Option<String>,
    attempts: u32,
    base_delay_ms: u64,
}

#[derive(serde::Deserialize)]
struct ContentsResponse {
    content: String,
    encoding: String,
}

impl GithubFetcher {
    pub fn new(token: Option<String>, attempts: u32, base_delay_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("arbor-sync")
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            token,
            attempts: attempts.max(1),
            base_delay_ms,
        }
    }

    fn contents_url(repository: &str, branch: &str, path: &str) -> Result<Url, ArborError> {
        let base = format!("https://api.github.com/repos/{repository}/contents/{path}");
        let mut url = Url::parse(&base).map_err(|e| ArborError::Fetch {
            path: path.to_owned(),
            reason: format!("invalid contents URL: {e}"),
        })?;
        url.query_pairs_mut().append_pair("ref", branch);
        Ok(url)
    }

    async fn fetch_once(&self, url: Url, path: &str) -> Result<Vec<u8>, ArborError> {
        let mut request = self
            .client
            .get(url)
            .header("accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header("authorization", format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(|e| ArborError::Fetch {
            path: path.to_owned(),
            reason: format!("request failed: {e}"),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArborError::Fetch {
                path: path.to_owned(),
                reason: format!("unexpected status {status}"),
            });
        }

        let body: ContentsResponse = response.json().await.map_err(|e| ArborError::Fetch {
            path: path.to_owned(),
            reason: format!("malformed contents response: {e}"),
        })?;

        decode_contents(&body, path)
    }
}

impl ContentFetcher for GithubFetcher {
    fn fetch<'a>(&'a self, repository: &'a str, branch: &'a str, path: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            let url = Self::contents_url(repository, branch, path)?;
            let mut last_error = None;
            for attempt in 0..self.attempts {
                if attempt > 0 {
                    let delay = backoff_delay(attempt, self.base_delay_ms);
                    tracing::debug!(
                        path = %path,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying content fetch"
                    );
                    tokio::time::sleep(delay).await;
                }
                match self.fetch_once(url.clone(), path).await {
                    Ok(bytes) => return Ok(bytes),
                    Err(e) => {
                        tracing::warn!(path = %path, error = %e, "Content fetch attempt failed");
                        last_error = Some(e);
                    }
                }
            }
            Err(last_error.unwrap_or_else(|| ArborError::Fetch {
                path: path.to_owned(),
                reason: "no fetch attempts configured".into(),
            }))
        })
    }
}

fn decode_contents(body: &ContentsResponse, path: &str) -> Result<Vec<u8>, ArborError> {
    if body.encoding != "base64" {
        return Err(ArborError::Fetch {
            path: path.to_owned(),
            reason: format!("unsupported contents encoding {:?}", body.encoding),
        });
    }
    // The API wraps base64 payloads with newlines.
    let compact: String = body.content.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ArborError::Fetch {
            path: path.to_owned(),
            reason: format!("invalid base64 payload: {e}"),
        })
}

/// Exponential backoff with up to 10% jitter, capped at five seconds.
fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    let exponential = 2u64.saturating_pow(attempt.saturating_sub(1));
    let capped = base_ms.saturating_mul(exponential).min(5_000);
    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };
    Duration::from_millis(capped + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contents_url_includes_branch_ref() {
        let url = GithubFetcher::contents_url("acme/site", "master", "www/index.html").unwrap();
        assert_eq!(url.host_str(), Some("api.github.com"));
        assert_eq!(url.path(), "/repos/acme/site/contents/www/index.html");
        assert_eq!(url.query(), Some("ref=master"));
    }

    #[test]
    fn decodes_wrapped_base64() {
        let body = ContentsResponse {
            content: "aGVs\nbG8=\n".into(),
            encoding: "base64".into(),
        };
        assert_eq!(decode_contents(&body, "x").unwrap(), b"hello");
    }

    #[test]
    fn rejects_unknown_encoding() {
        let body = ContentsResponse {
            content: "hello".into(),
            encoding: "utf-8".into(),
        };
        assert!(matches!(
            decode_contents(&body, "x"),
            Err(ArborError::Fetch { .. })
        ));
    }

    #[test]
    fn backoff_grows_and_caps() {
        assert!(backoff_delay(1, 200).as_millis() >= 200);
        assert!(backoff_delay(2, 200).as_millis() >= 400);
        assert!(backoff_delay(12, 200).as_millis() <= 5_500);
    }
}
