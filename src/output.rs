use indexmap::IndexMap;
use serde::Serialize;

use code_graph_refactor::{
    Codebase, DeadCodeResult, Diff, FindResult, ProjectStats, SymbolId, Usage,
};

/// Aggregate counts printed by `index`.
#[derive(Debug, Serialize)]
pub struct IndexStats {
    pub file_count: usize,
    pub unparsed_files: usize,
    pub symbol_count: usize,
    pub edge_count: usize,
    pub warnings: Vec<String>,
    /// Wall-clock time for the indexing run in seconds.
    pub elapsed_secs: f64,
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// `qualified.name path:line`, or the raw id for symbols that are gone.
fn describe(cb: &Codebase, id: SymbolId) -> String {
    let Some(symbol) = cb.symbol(id) else {
        return id.to_string();
    };
    match symbol.file {
        Some(file) => {
            let f = cb.file(file);
            format!(
                "{} {}:{}",
                symbol.qualified_name,
                f.display_path(),
                f.line_col(symbol.span.start).line
            )
        }
        None => format!("{} (external)", symbol.qualified_name),
    }
}

pub fn print_index(stats: &IndexStats, json: bool) {
    if json {
        print_json(stats);
        return;
    }
    println!(
        "indexed {} file(s) in {:.2}s: {} symbol(s), {} usage edge(s)",
        stats.file_count, stats.elapsed_secs, stats.symbol_count, stats.edge_count
    );
    if stats.unparsed_files > 0 {
        println!("{} file(s) could not be parsed", stats.unparsed_files);
    }
    for warning in &stats.warnings {
        println!("warning: {warning}");
    }
}

pub fn print_find(results: &[FindResult], json: bool) {
    if json {
        print_json(results);
        return;
    }
    for r in results {
        println!(
            "def {} {}:{} {}",
            r.symbol_name,
            r.file_path.display(),
            r.line,
            r.kind
        );
    }
    println!("{} definitions found", results.len());
}

pub fn print_stats(stats: &ProjectStats, json: bool) {
    if json {
        print_json(stats);
        return;
    }
    println!("files: {} ({} unparsed)", stats.file_count, stats.unparsed_files);
    println!("symbols: {}", stats.symbol_count);
    for (kind, count) in &stats.symbols_by_kind {
        println!("  {kind}: {count}");
    }
    println!("usages: {}", stats.edge_count);
    for (kind, count) in &stats.edges_by_kind {
        println!("  {kind}: {count}");
    }
    println!(
        "imports: {} resolved, {} external, {} unresolved",
        stats.resolve.resolved, stats.resolve.external, stats.resolve.unresolved
    );
    println!("warnings: {}", stats.warnings);
}

pub fn print_usages(cb: &Codebase, target: SymbolId, usages: &[Usage], json: bool) {
    if json {
        print_json(usages);
        return;
    }
    println!("{}", describe(cb, target));
    for u in usages {
        println!(
            "  {} {}:{}:{} in {}",
            u.kind,
            u.path.display(),
            u.line,
            u.column,
            u.usage_name
        );
    }
    println!("{} usage(s)", usages.len());
}

pub fn print_dependencies(cb: &Codebase, deps: &IndexMap<SymbolId, Vec<SymbolId>>, json: bool) {
    if json {
        let named: IndexMap<String, Vec<String>> = deps
            .iter()
            .map(|(id, targets)| {
                (
                    describe(cb, *id),
                    targets.iter().map(|t| describe(cb, *t)).collect(),
                )
            })
            .collect();
        print_json(&named);
        return;
    }
    for (id, targets) in deps {
        println!("{}", describe(cb, *id));
        for t in targets {
            println!("  -> {}", describe(cb, *t));
        }
    }
}

pub fn print_dead_code(result: &DeadCodeResult, json: bool) {
    if json {
        print_json(result);
        return;
    }
    if !result.unreachable_files.is_empty() {
        println!("unreachable files:");
        for path in &result.unreachable_files {
            println!("  {}", path.display());
        }
    }
    for (path, symbols) in &result.unreferenced_symbols {
        for s in symbols {
            let marker = if s.exported { " (exported)" } else { "" };
            println!("unused {} {}:{} {}{}", s.name, path.display(), s.line, s.kind, marker);
        }
    }
    println!(
        "{} unreachable file(s), {} unreferenced symbol(s)",
        result.unreachable_files.len(),
        result.symbol_count()
    );
}

pub fn print_diff(diff: &Diff, dry_run: bool, json: bool) {
    if json {
        print_json(diff);
        return;
    }
    print!("{}", diff.unified());
    let verb = if dry_run { "would change" } else { "changed" };
    let s = &diff.summary;
    println!(
        "{verb} {} file(s): {} symbol(s) added, {} removed, {} renamed",
        s.files_changed, s.symbols_added, s.symbols_removed, s.symbols_renamed
    );
}
