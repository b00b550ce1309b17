//! Read-only queries over a built [`crate::codebase::Codebase`].

pub mod dead_code;
pub mod dependencies;
pub mod find;
pub mod stats;
pub mod usages;

pub use dead_code::{DeadCodeResult, DeadSymbol};
pub use find::FindResult;
pub use stats::ProjectStats;
pub use usages::Usage;
