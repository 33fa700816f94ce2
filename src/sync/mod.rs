//! Webhook-driven content synchronization.
//!
//! # Data Flow
//! 1. The HTTP layer receives a push delivery and verifies its signature
//! 2. The payload is parsed and collapsed into one disposition per path
//! 3. The driver fetches, transforms and replants each changed file
//! 4. A manifest or entrypoint change surfaces as a restart decision

pub mod changeset;
pub mod driver;
pub mod fetch;
pub mod payload;
pub mod signature;

pub use changeset::ChangeKind;
pub use driver::{RestartAction, SyncDriver, SyncOutcome};
pub use fetch::{ContentFetcher, GithubFetcher};
pub use payload::PushPayload;
