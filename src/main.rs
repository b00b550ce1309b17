mod cli;
mod output;

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use cli::{Cli, Commands};
use code_graph_refactor::{Codebase, SymbolId, SymbolKind, UsageKinds};
use output::IndexStats;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let json = cli.json;
    match cli.command {
        Commands::Index { path } => {
            let start = Instant::now();
            let cb = open(&path)?;
            let stats = cb.stats();
            output::print_index(
                &IndexStats {
                    file_count: stats.file_count,
                    unparsed_files: stats.unparsed_files,
                    symbol_count: stats.symbol_count,
                    edge_count: stats.edge_count,
                    warnings: cb.warnings().iter().map(ToString::to_string).collect(),
                    elapsed_secs: start.elapsed().as_secs_f64(),
                },
                json,
            );
        }

        Commands::Find {
            pattern,
            path,
            case_insensitive,
            kind,
        } => {
            let kinds = kind
                .iter()
                .map(|k| SymbolKind::parse(k).ok_or_else(|| anyhow!("unknown symbol kind '{k}'")))
                .collect::<Result<Vec<_>>>()?;
            let cb = open(&path)?;
            let results = cb.find_symbols(&pattern, case_insensitive, &kinds)?;
            output::print_find(&results, json);
        }

        Commands::Stats { path } => {
            let cb = open(&path)?;
            output::print_stats(&cb.stats(), json);
        }

        Commands::Usages {
            symbol,
            path,
            kinds,
        } => {
            let types = parse_kinds(&kinds)?;
            let cb = open(&path)?;
            let id = lookup(&cb, &symbol)?;
            let usages = cb.usages(id, types);
            output::print_usages(&cb, id, &usages, json);
        }

        Commands::Deps {
            symbol,
            path,
            kinds,
            depth,
        } => {
            let types = parse_kinds(&kinds)?;
            let cb = open(&path)?;
            let id = lookup(&cb, &symbol)?;
            let deps = cb.dependencies(id, types, depth)?;
            output::print_dependencies(&cb, &deps, json);
        }

        Commands::DeadCode {
            path,
            include_exported,
        } => {
            let cb = open(&path)?;
            output::print_dead_code(&cb.find_dead_code(include_exported), json);
        }

        Commands::Rename {
            symbol,
            new_name,
            path,
            dry_run,
        } => {
            let mut cb = open(&path)?;
            let id = lookup(&cb, &symbol)?;
            cb.rename(id, &new_name)
                .with_context(|| format!("cannot rename {symbol} to {new_name}"))?;
            finish(&mut cb, dry_run, json)?;
        }

        Commands::Move {
            symbol,
            dest,
            path,
            with_deps,
            strategy,
            dry_run,
        } => {
            let mut cb = open(&path)?;
            let id = lookup(&cb, &symbol)?;
            let strategy = strategy.unwrap_or(cb.config().refactor.default_strategy);
            cb.move_to_file(id, &dest, with_deps, strategy)
                .with_context(|| format!("cannot move {symbol} to {}", dest.display()))?;
            finish(&mut cb, dry_run, json)?;
        }

        Commands::Remove {
            symbol,
            path,
            dry_run,
        } => {
            let mut cb = open(&path)?;
            let id = lookup(&cb, &symbol)?;
            cb.remove_symbol(id)
                .with_context(|| format!("cannot remove {symbol}"))?;
            finish(&mut cb, dry_run, json)?;
        }
    }

    Ok(())
}

fn open(path: &Path) -> Result<Codebase> {
    Codebase::open(path).with_context(|| format!("failed to index {}", path.display()))
}

fn lookup(cb: &Codebase, query: &str) -> Result<SymbolId> {
    cb.get_symbol(query)
        .ok_or_else(|| anyhow!("symbol not found: {query}"))
}

fn parse_kinds(list: &str) -> Result<UsageKinds> {
    UsageKinds::parse(list).ok_or_else(|| anyhow!("unknown usage kind in '{list}'"))
}

/// Print the pending diff, writing it unless this is a dry run.
fn finish(cb: &mut Codebase, dry_run: bool, json: bool) -> Result<()> {
    let diff = if dry_run {
        cb.preview()?
    } else {
        cb.commit().context("commit failed")?
    };
    output::print_diff(&diff, dry_run, json);
    Ok(())
}
