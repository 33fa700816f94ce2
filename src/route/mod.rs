//! Route tree subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     base dirs on disk → plant.rs → RouteTable
//!
//! Request:
//!     raw URL path → path.rs (normalize) → resolve.rs (tree walk)
//!     → ResolvedRoute {target, params, flags}
//!
//! Sync:
//!     changed file path → surgeon.rs (limb / replant)
//!     → RouteTable updated in place, cache purged in the same call
//! ```
//!
//! # Design Decisions
//! - One tree per base directory; trees never cross-reference
//! - Literal children always beat pattern children at the same level
//! - File naming is parsed once into `SegmentKind` at plant time
//! - Only the surgeon mutates a planted tree

pub mod node;
pub mod path;
pub mod plant;
pub mod resolve;
pub mod segment;
pub mod surgeon;

pub use node::{RouteTable, TreeNode};
pub use resolve::{resolve, ResolvedRoute, Target};
pub use segment::{Naming, SegmentKind};
