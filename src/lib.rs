//! Symbol graph and safe-mutation engine for TypeScript/JavaScript projects.
//!
//! [`Codebase::open`] parses every source file under a root into a graph of
//! symbols and usages. Queries (`usages`, `dependencies`, `find_dead_code`)
//! read it; edits and refactors (`rename`, `move_to_file`, `remove_symbol`)
//! queue span-based text changes that [`Codebase::commit`] verifies, writes
//! and re-analyses in one step.

pub mod codebase;
pub mod commit;
pub mod config;
pub mod edit;
pub mod error;
pub mod graph;
pub mod parser;
pub mod query;
pub mod refactor;
pub mod resolver;
pub mod span;
pub mod walker;

pub use codebase::{Codebase, SourceFile};
pub use commit::{Diff, DiffSummary, FileDiff};
pub use config::CodeGraphConfig;
pub use edit::{EditRole, Editable, PendingTransaction, StructuralChange};
pub use error::{ParseError, RefactorError, Result, Warning};
pub use graph::SymbolGraph;
pub use graph::edge::{UsageEdge, UsageKind, UsageKinds};
pub use graph::node::{FileId, Symbol, SymbolId, SymbolKind};
pub use parser::{SyntaxAdapter, SyntaxTree, TreeSitterAdapter};
pub use query::{DeadCodeResult, DeadSymbol, FindResult, ProjectStats, Usage};
pub use refactor::{MoveStrategy, PlanState, RefactorPlan};
pub use resolver::ModuleTarget;
pub use span::{LineCol, Span};
