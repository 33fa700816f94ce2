//! Arbor: route trees grown from a content directory.
//!
//! A serving library that maps URL paths onto a base directory of pages,
//! handlers and static assets. Directories become tree branches, files
//! become leaves, and `{param}` file names become pattern segments. The
//! tree supports surgical updates (limb and replant) driven either by a
//! repository webhook or a local filesystem watcher, with a content
//! pipeline that minifies markup and transforms scripts and styles on
//! the way in.
//!
//! # Architecture Overview
//!
//! ```text
//!  HTTP request ──▶ http::server ──▶ route::resolve ──▶ handler::load
//!                                         │                   │
//!                                    route tree           load cache
//!                                         ▲                   │
//!  webhook push ──▶ sync::driver ──▶ route::surgeon ◀── cache purge
//!                        │
//!                   pipeline (minify, transform, source maps)
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod route;
pub mod server;

// Content handling
pub mod handler;
pub mod pipeline;
pub mod sync;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod watch;

pub use config::ArborConfig;
pub use error::ArborError;
pub use handler::{handler_fn, Completion, Context, Handler, HandlerRegistry};
pub use http::HttpServer;
pub use route::ResolvedRoute;
pub use server::Arbor;
