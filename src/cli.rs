use std::path::PathBuf;

use clap::{Parser, Subcommand};

use code_graph_refactor::MoveStrategy;

/// Symbol graph and safe refactoring for TypeScript/JavaScript codebases.
///
/// code-graph-refactor indexes a project into a graph of symbols and usages,
/// answers usage and dependency queries, and renames or moves code while
/// keeping every import consistent.
#[derive(Parser, Debug)]
#[command(
    name = "code-graph-refactor",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    /// Log graph construction and refactor planning to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output results as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a project directory and report what was found.
    Index {
        /// Path to the project root to index.
        path: PathBuf,
    },

    /// Find symbol definitions by name or regex pattern.
    Find {
        /// Symbol name or regex pattern (e.g. "UserService" or "User.*Service").
        pattern: String,

        /// Path to the project root to index and query.
        path: PathBuf,

        /// Case-insensitive pattern matching.
        #[arg(short = 'i', long)]
        case_insensitive: bool,

        /// Filter by symbol kind (comma-separated: function,class,variable,type,interface,enum,method).
        #[arg(long, value_delimiter = ',')]
        kind: Vec<String>,
    },

    /// Project statistics: files, symbols by kind, usages by kind.
    Stats {
        /// Path to the project root to index and query.
        path: PathBuf,
    },

    /// List every usage of a symbol, following imports and re-exports.
    Usages {
        /// `name`, `Qualified.name` or `path/to/file.ts::name`.
        symbol: String,

        /// Path to the project root to index and query.
        path: PathBuf,

        /// Usage kinds to report (comma-separated: direct,chained,indirect,aliased,all).
        #[arg(long, default_value = "all")]
        kinds: String,
    },

    /// Show what a symbol depends on, transitively up to a depth.
    Deps {
        /// `name`, `Qualified.name` or `path/to/file.ts::name`.
        symbol: String,

        /// Path to the project root to index and query.
        path: PathBuf,

        /// Usage kinds to follow (comma-separated: direct,chained,indirect,aliased,all).
        #[arg(long, default_value = "direct")]
        kinds: String,

        /// Number of hops to follow. Must be at least 1.
        #[arg(long, default_value_t = 1)]
        depth: usize,
    },

    /// Report unreachable files and symbols nothing uses.
    DeadCode {
        /// Path to the project root to index and query.
        path: PathBuf,

        /// Also report exported symbols with no usages.
        #[arg(long)]
        include_exported: bool,
    },

    /// Rename a symbol and every usage that spells its name.
    Rename {
        /// `name`, `Qualified.name` or `path/to/file.ts::name`.
        symbol: String,

        /// The new identifier.
        new_name: String,

        /// Path to the project root.
        path: PathBuf,

        /// Print the diff without writing any file.
        #[arg(long)]
        dry_run: bool,
    },

    /// Move a top-level symbol to another (possibly new) file.
    Move {
        /// `name`, `Qualified.name` or `path/to/file.ts::name`.
        symbol: String,

        /// Destination file, relative to the project root.
        dest: PathBuf,

        /// Path to the project root.
        path: PathBuf,

        /// Move the same-file symbols the moved code needs along with it.
        #[arg(long)]
        with_deps: bool,

        /// How importers are kept consistent (defaults to code-graph.toml, then update-all-imports).
        #[arg(long, value_enum)]
        strategy: Option<MoveStrategy>,

        /// Print the diff without writing any file.
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete a declaration and the import specifiers that name it.
    Remove {
        /// `name`, `Qualified.name` or `path/to/file.ts::name`.
        symbol: String,

        /// Path to the project root.
        path: PathBuf,

        /// Print the diff without writing any file.
        #[arg(long)]
        dry_run: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_move_with_strategy() {
        let cli = Cli::try_parse_from([
            "code-graph-refactor",
            "move",
            "foo",
            "src/util.ts",
            ".",
            "--strategy",
            "add-back-edge",
            "--dry-run",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Move {
                strategy, dry_run, ..
            } => {
                assert_eq!(strategy, Some(MoveStrategy::AddBackEdge));
                assert!(dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_deps_defaults_to_direct_one_hop() {
        let cli = Cli::try_parse_from(["code-graph-refactor", "deps", "foo", "."]).unwrap();
        match cli.command {
            Commands::Deps { depth, kinds, .. } => {
                assert_eq!(depth, 1);
                assert_eq!(kinds, "direct");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
