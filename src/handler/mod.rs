//! Handler subsystem.
//!
//! # Data Flow
//! ```text
//! plant/replant time:
//!     handler file → registry.rs (explicit registration or factory)
//!     → Arc<dyn Handler> stored on the tree leaf
//!
//! request time:
//!     ResolvedRoute → loader.rs (cache check, execution, persistence)
//!     → completed Context
//! ```

pub mod cache;
pub mod context;
pub mod loader;
pub mod registry;

pub use cache::{CacheStrategy, LoadCache};
pub use context::{CacheDirective, CacheEntry, Context, VaryFn};
pub use loader::{load, load_resolved};
pub use registry::{handler_fn, Completion, Handler, HandlerFactory, HandlerRegistry};
