//! The root object: files, the symbol arena, warnings and the pending
//! transaction, plus graph construction and incremental rebuild.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::config::CodeGraphConfig;
use crate::edit::EditRole;
use crate::edit::transaction::PendingTransaction;
use crate::error::{RefactorError, Result, Warning};
use crate::graph::SymbolGraph;
use crate::graph::edge::UsageEdge;
use crate::graph::node::{FileId, Symbol, SymbolId, SymbolKind, SymbolPayload};
use crate::parser::languages::Lang;
use crate::parser::{self, FileSyntax, ParseStatus, SyntaxAdapter, TreeSitterAdapter};
use crate::resolver::module_path::normalize;
use crate::resolver::{ModuleTarget, ResolveStats, Resolver, Target};
use crate::span::{LineCol, LineIndex, Span};
use crate::walker;

/// One analysed source file.
#[derive(Debug)]
pub struct SourceFile {
    pub id: FileId,
    /// Relative to the codebase root.
    pub path: PathBuf,
    /// The committed text.
    pub text: String,
    pub lang: Option<Lang>,
    pub status: ParseStatus,
    /// Bumped every time a commit rewrites this file.
    pub generation: u64,
    /// Placeholder symbol for the file's top-level scope.
    pub module: SymbolId,
    /// Parallel to `syntax.declarations`.
    pub declarations: Vec<SymbolId>,
    /// `imports[i][j]` is binding `j` of import statement `i`.
    pub imports: Vec<Vec<SymbolId>>,
    /// `exports[i][j]` is item `j` of export statement `i`.
    pub exports: Vec<Vec<SymbolId>>,
    pub(crate) syntax: FileSyntax,
    pub(crate) line_index: LineIndex,
    /// False for files queued for creation and for in-memory codebases.
    pub(crate) on_disk: bool,
    pub(crate) resolve: ResolveStats,
}

impl SourceFile {
    /// Every symbol the file owns, Module placeholder first.
    pub fn symbol_ids(&self) -> Vec<SymbolId> {
        std::iter::once(self.module)
            .chain(self.declarations.iter().copied())
            .chain(self.imports.iter().flatten().copied())
            .chain(self.exports.iter().flatten().copied())
            .collect()
    }

    pub fn line_col(&self, offset: usize) -> LineCol {
        self.line_index.line_col(offset)
    }

    pub fn is_parsed(&self) -> bool {
        self.status == ParseStatus::Parsed
    }

    /// The path with `/` separators, as used in module names and diffs.
    pub fn display_path(&self) -> String {
        display_path(&self.path)
    }
}

pub(crate) fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// A parsed project: the single owner of every file, symbol and edge.
///
/// Queries take `&self`; edits, refactors and `commit()` take `&mut self`,
/// so one writer at a time is enforced by the borrow checker. Share across
/// threads as `Arc<RwLock<Codebase>>`.
pub struct Codebase {
    root: PathBuf,
    disk_backed: bool,
    config: CodeGraphConfig,
    adapter: Arc<dyn SyntaxAdapter>,
    pub(crate) files: Vec<SourceFile>,
    pub(crate) by_path: HashMap<PathBuf, FileId>,
    pub(crate) graph: SymbolGraph,
    externals: HashMap<String, SymbolId>,
    warnings: Vec<Warning>,
    pub(crate) pending: Option<PendingTransaction>,
}

impl Codebase {
    /// Discover, parse and link every source file under `root`, reading
    /// `code-graph.toml` if present.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let config = CodeGraphConfig::load(root);
        Self::open_with(root, config, Arc::new(TreeSitterAdapter))
    }

    pub fn open_with(
        root: impl AsRef<Path>,
        config: CodeGraphConfig,
        adapter: Arc<dyn SyntaxAdapter>,
    ) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(RefactorError::FileNotFound(root.to_path_buf()));
        }

        let mut sources = Vec::new();
        for path in walker::walk_project(root, &config) {
            let full = root.join(&path);
            match std::fs::read_to_string(&full) {
                Ok(text) => sources.push((path, text)),
                Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                    log::warn!("skipping {}: not valid UTF-8", path.display());
                }
                Err(err) => return Err(RefactorError::io(full, err)),
            }
        }

        Ok(Self::build(root.to_path_buf(), true, config, adapter, sources))
    }

    /// Build an in-memory codebase from `(path, text)` pairs. Commits update
    /// the in-memory text only.
    pub fn from_sources<I, P, T>(root: impl Into<PathBuf>, sources: I) -> Self
    where
        I: IntoIterator<Item = (P, T)>,
        P: Into<PathBuf>,
        T: Into<String>,
    {
        Self::from_sources_with(root, CodeGraphConfig::default(), Arc::new(TreeSitterAdapter), sources)
    }

    pub fn from_sources_with<I, P, T>(
        root: impl Into<PathBuf>,
        config: CodeGraphConfig,
        adapter: Arc<dyn SyntaxAdapter>,
        sources: I,
    ) -> Self
    where
        I: IntoIterator<Item = (P, T)>,
        P: Into<PathBuf>,
        T: Into<String>,
    {
        let sources = sources
            .into_iter()
            .filter_map(|(p, t)| {
                let path = normalize(&p.into())?;
                Some((path, t.into()))
            })
            .collect();
        Self::build(root.into(), false, config, adapter, sources)
    }

    fn build(
        root: PathBuf,
        disk_backed: bool,
        config: CodeGraphConfig,
        adapter: Arc<dyn SyntaxAdapter>,
        mut sources: Vec<(PathBuf, String)>,
    ) -> Self {
        sources.sort_by(|a, b| a.0.cmp(&b.0));
        sources.dedup_by(|a, b| a.0 == b.0);

        // Parse in parallel; the collect is the barrier before resolution.
        let analysed: Vec<(ParseStatus, FileSyntax)> = sources
            .par_iter()
            .map(|(path, text)| parser::analyse(adapter.as_ref(), path, text))
            .collect();

        let mut codebase = Self {
            root,
            disk_backed,
            config,
            adapter,
            files: Vec::with_capacity(sources.len()),
            by_path: HashMap::with_capacity(sources.len()),
            graph: SymbolGraph::new(),
            externals: HashMap::new(),
            warnings: Vec::new(),
            pending: None,
        };

        for ((path, text), (status, syntax)) in sources.into_iter().zip(analysed) {
            let id = codebase.push_file(path, text, disk_backed);
            codebase.install_symbols(id, status, syntax);
        }
        let all: Vec<FileId> = (0..codebase.files.len()).map(FileId).collect();
        codebase.relink(&all);

        log::info!(
            "indexed {} files: {} symbols, {} edges, {} warnings",
            codebase.files.len(),
            codebase.graph.symbol_count(),
            codebase.graph.edge_count(),
            codebase.warnings.len()
        );
        codebase
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &CodeGraphConfig {
        &self.config
    }

    /// True when commits write to disk.
    pub fn is_disk_backed(&self) -> bool {
        self.disk_backed
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0]
    }

    /// Look a file up by project-relative (or absolute, under the root) path.
    pub fn file_id(&self, path: impl AsRef<Path>) -> Option<FileId> {
        let path = path.as_ref();
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        self.by_path.get(&normalize(relative)?).copied()
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.graph.symbol(id)
    }

    pub fn graph(&self) -> &SymbolGraph {
        &self.graph
    }

    /// Parse failures, unresolved imports and re-export cycles, in file order.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn pending(&self) -> Option<&PendingTransaction> {
        self.pending.as_ref()
    }

    pub fn has_pending_changes(&self) -> bool {
        self.pending.as_ref().is_some_and(|tx| !tx.is_empty())
    }

    /// Totals of the last link pass over every file.
    pub fn resolve_stats(&self) -> ResolveStats {
        let mut total = ResolveStats::default();
        for file in &self.files {
            total.merge(file.resolve);
        }
        total
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver {
            files: &self.files,
            by_path: &self.by_path,
            graph: &self.graph,
            bare_specifiers_from_root: self.config.resolve.bare_specifiers_from_root,
        }
    }

    /// Resolve `specifier` as written in `from`. Unlike graph construction,
    /// which degrades to placeholders, a relative specifier matching no file
    /// is an error here.
    pub fn resolve_import(&self, from: impl AsRef<Path>, specifier: &str) -> Result<ModuleTarget> {
        let from = from.as_ref();
        let file = self
            .file_id(from)
            .ok_or_else(|| RefactorError::FileNotFound(from.to_path_buf()))?;
        match self.resolver().resolve_module(file, specifier) {
            ModuleTarget::Unresolved => Err(RefactorError::UnresolvedImport {
                path: self.files[file.0].path.clone(),
                specifier: specifier.to_owned(),
            }),
            target => Ok(target),
        }
    }

    /// Find a symbol by `name`, `Qualified.name` or `path/to/file.ts::name`.
    ///
    /// When several symbols match, definitions win over bindings, then the
    /// first by file path and position.
    pub fn get_symbol(&self, query: &str) -> Option<SymbolId> {
        let (file, name) = match query.rsplit_once("::") {
            Some((path, name)) => (Some(self.file_id(path)?), name),
            None => (None, query),
        };
        let mut candidates: Vec<(u8, &Path, usize, SymbolId)> = self
            .graph
            .ids_named(name)
            .iter()
            .filter_map(|&id| {
                let symbol = self.graph.symbol(id)?;
                if file.is_some() && symbol.file != file {
                    return None;
                }
                let rank = match symbol.kind() {
                    k if k.is_definition() => 0,
                    SymbolKind::Import | SymbolKind::Export => 1,
                    SymbolKind::Parameter => 2,
                    SymbolKind::Module => 3,
                    _ => 4,
                };
                let path = symbol
                    .file
                    .map(|f| self.files[f.0].path.as_path())
                    .unwrap_or(Path::new(""));
                Some((rank, path, symbol.span.start, id))
            })
            .collect();
        candidates.sort();
        candidates.first().map(|c| c.3)
    }

    /// All symbols of `file` of the given kind, in source order.
    pub fn symbols_of_kind(&self, file: FileId, kind: SymbolKind) -> Vec<SymbolId> {
        let mut ids: Vec<SymbolId> = self.files[file.0]
            .symbol_ids()
            .into_iter()
            .filter(|&id| self.graph.symbol(id).is_some_and(|s| s.kind() == kind))
            .collect();
        ids.sort_by_key(|&id| self.graph.symbol(id).map(|s| s.span.start));
        ids
    }

    pub(crate) fn transaction(&mut self) -> &mut PendingTransaction {
        self.pending.get_or_insert_with(PendingTransaction::new)
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    fn push_file(&mut self, path: PathBuf, text: String, on_disk: bool) -> FileId {
        let id = FileId(self.files.len());
        let name = display_path(&path);
        let whole = Span::new(0, text.len());
        let module = self.graph.add_symbol(Symbol {
            name: name.clone(),
            qualified_name: name,
            file: Some(id),
            parent: None,
            span: whole,
            name_span: Span::point(0),
            statement: whole,
            removal: whole,
            role: EditRole::Span,
            doc: None,
            exported: false,
            default_export: false,
            member: false,
            payload: SymbolPayload::Module,
        });
        self.by_path.insert(path.clone(), id);
        self.files.push(SourceFile {
            id,
            lang: Lang::from_path(&path),
            line_index: LineIndex::new(&text),
            path,
            text,
            status: ParseStatus::Parsed,
            generation: 0,
            module,
            declarations: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            syntax: FileSyntax::default(),
            on_disk,
            resolve: ResolveStats::default(),
        });
        id
    }

    /// Add an empty file that a pending move will fill. Returns the existing
    /// id if the path is already known.
    pub(crate) fn create_file(&mut self, path: &Path) -> FileId {
        if let Some(id) = self.file_id(path) {
            return id;
        }
        let path = normalize(path).unwrap_or_else(|| path.to_path_buf());
        let id = self.push_file(path, String::new(), false);
        self.transaction().mark_created(id);
        log::debug!("queued creation of {}", self.files[id.0].path.display());
        id
    }

    /// Undo `create_file` for files that were never committed.
    pub(crate) fn drop_created(&mut self, created: &[FileId]) {
        let mut created = created.to_vec();
        created.sort();
        for id in created.into_iter().rev() {
            if id.0 + 1 != self.files.len() || self.files[id.0].on_disk {
                continue;
            }
            if let Some(file) = self.files.pop() {
                self.graph.remove_symbol(file.module);
                self.by_path.remove(&file.path);
            }
        }
    }

    /// Replace a file's committed text after a commit wrote it.
    pub(crate) fn set_text(&mut self, file: FileId, text: String) {
        let f = &mut self.files[file.0];
        f.line_index = LineIndex::new(&text);
        f.text = text;
        if self.disk_backed {
            f.on_disk = true;
        }
    }

    /// Turn one file's syntax facts into symbols. Edges come later, in `relink`.
    fn install_symbols(&mut self, file: FileId, status: ParseStatus, syntax: FileSyntax) {
        let path = self.files[file.0].path.clone();
        self.warnings
            .retain(|w| !(matches!(w, Warning::Parse { .. }) && *w.path() == path));
        if let ParseStatus::Unparsed { reason } = &status {
            log::warn!("{}: {}", path.display(), reason);
            self.warnings.push(Warning::Parse {
                path: path.clone(),
                reason: reason.clone(),
            });
        }

        let mut declarations: Vec<SymbolId> = Vec::with_capacity(syntax.declarations.len());
        let mut qualified: Vec<String> = Vec::with_capacity(syntax.declarations.len());
        for decl in &syntax.declarations {
            let qualified_name = match decl.parent {
                Some(p) => format!("{}.{}", qualified[p], decl.name),
                None => decl.name.clone(),
            };
            let payload = match decl.kind {
                SymbolKind::Function => SymbolPayload::Function {
                    body: decl.body,
                    value: decl.value,
                },
                SymbolKind::Method => SymbolPayload::Method { body: decl.body },
                SymbolKind::Class => SymbolPayload::Class { body: decl.body },
                SymbolKind::Parameter => SymbolPayload::Parameter,
                SymbolKind::TypeAlias => SymbolPayload::TypeAlias { value: decl.value },
                SymbolKind::Interface => SymbolPayload::Interface { body: decl.body },
                SymbolKind::Enum => SymbolPayload::Enum { body: decl.body },
                _ => SymbolPayload::Variable { value: decl.value },
            };
            let id = self.graph.add_symbol(Symbol {
                name: decl.name.clone(),
                qualified_name: qualified_name.clone(),
                file: Some(file),
                parent: decl.parent.map(|p| declarations[p]),
                span: decl.span,
                name_span: decl.name_span,
                statement: decl.statement,
                removal: decl.removal,
                role: decl.role,
                doc: decl.doc,
                exported: decl.exported,
                default_export: decl.default_export,
                member: decl.member,
                payload,
            });
            declarations.push(id);
            qualified.push(qualified_name);
        }

        let mut imports = Vec::with_capacity(syntax.imports.len());
        for (i, decl) in syntax.imports.iter().enumerate() {
            let ids = decl
                .bindings
                .iter()
                .map(|b| {
                    self.graph.add_symbol(Symbol {
                        name: b.local.clone(),
                        qualified_name: b.local.clone(),
                        file: Some(file),
                        parent: None,
                        span: b.item_span,
                        name_span: b.local_span,
                        statement: decl.statement,
                        removal: b.item_span,
                        role: EditRole::ListItem,
                        doc: None,
                        exported: false,
                        default_export: false,
                        member: false,
                        payload: SymbolPayload::Import {
                            module_path: decl.module_path.clone(),
                            binding: b.kind.clone(),
                            statement_index: i,
                            imported_span: b.imported_span,
                        },
                    })
                })
                .collect();
            imports.push(ids);
        }

        let mut exports = Vec::with_capacity(syntax.exports.len());
        for (i, decl) in syntax.exports.iter().enumerate() {
            let ids = decl
                .items
                .iter()
                .map(|item| {
                    self.graph.add_symbol(Symbol {
                        name: item.exported.clone(),
                        qualified_name: item.exported.clone(),
                        file: Some(file),
                        parent: None,
                        span: item.item_span,
                        name_span: item
                            .exported_span
                            .or(item.local_span)
                            .unwrap_or(item.item_span),
                        statement: decl.statement,
                        removal: item.item_span,
                        role: EditRole::ListItem,
                        doc: None,
                        exported: true,
                        default_export: item.exported == "default",
                        member: false,
                        payload: SymbolPayload::Export {
                            module_path: decl.source.as_ref().map(|s| s.0.clone()),
                            item: item.kind.clone(),
                            statement_index: i,
                            local_span: item.local_span,
                        },
                    })
                })
                .collect();
            exports.push(ids);
        }

        let f = &mut self.files[file.0];
        let whole = Span::new(0, f.text.len());
        f.status = status;
        f.syntax = syntax;
        f.declarations = declarations;
        f.imports = imports;
        f.exports = exports;
        let module = f.module;
        if let Some(m) = self.graph.symbol_mut(module) {
            m.span = whole;
            m.statement = whole;
            m.removal = whole;
        }
    }

    /// Drop every symbol of `file` except its Module placeholder.
    fn uninstall_symbols(&mut self, file: FileId) {
        let f = &mut self.files[file.0];
        let ids: Vec<SymbolId> = f
            .declarations
            .drain(..)
            .chain(f.imports.drain(..).flatten())
            .chain(f.exports.drain(..).flatten())
            .collect();
        for id in ids {
            self.graph.remove_symbol(id);
        }
    }

    fn external(&mut self, package: &str) -> SymbolId {
        if let Some(&id) = self.externals.get(package) {
            return id;
        }
        let id = self.graph.add_symbol(Symbol {
            name: package.to_owned(),
            qualified_name: package.to_owned(),
            file: None,
            parent: None,
            span: Span::point(0),
            name_span: Span::point(0),
            statement: Span::point(0),
            removal: Span::point(0),
            role: EditRole::Span,
            doc: None,
            exported: false,
            default_export: false,
            member: false,
            payload: SymbolPayload::External {
                package: package.to_owned(),
            },
        });
        self.externals.insert(package.to_owned(), id);
        id
    }

    /// Recompute every edge originating in `files` from their cached syntax facts.
    fn relink(&mut self, files: &[FileId]) {
        for &f in files {
            for id in self.files[f.0].symbol_ids() {
                self.graph.clear_outgoing(id);
            }
        }
        let paths: BTreeSet<&Path> = files.iter().map(|f| self.files[f.0].path.as_path()).collect();
        let mut kept = std::mem::take(&mut self.warnings);
        kept.retain(|w| matches!(w, Warning::Parse { .. }) || !paths.contains(w.path().as_path()));

        let links: Vec<_> = {
            let resolver = self.resolver();
            files.par_iter().map(|&f| resolver.link_file(f)).collect()
        };

        for (&f, link) in files.iter().zip(links) {
            for warning in link.warnings {
                log::warn!("{warning}");
                kept.push(warning);
            }
            for edge in link.edges {
                let to = match edge.to {
                    Target::Symbol(id) => id,
                    Target::External(package) => self.external(&package),
                };
                self.graph.add_edge(
                    edge.from,
                    to,
                    UsageEdge {
                        kind: edge.kind,
                        file: f,
                        site: edge.site,
                    },
                );
            }
            self.files[f.0].resolve = link.stats;
        }

        kept.sort_by(|a, b| a.path().cmp(b.path()));
        self.warnings = kept;
    }

    /// Files whose imports or re-exports reach any of `seeds`, transitively,
    /// seeds included.
    fn module_dependents(&self, seeds: &[FileId]) -> BTreeSet<FileId> {
        let resolver = self.resolver();
        let mut reverse: HashMap<FileId, Vec<FileId>> = HashMap::new();
        for file in &self.files {
            let specifiers = file
                .syntax
                .imports
                .iter()
                .map(|i| i.module_path.as_str())
                .chain(
                    file.syntax
                        .exports
                        .iter()
                        .filter_map(|e| e.source.as_ref().map(|s| s.0.as_str())),
                );
            for specifier in specifiers {
                if let ModuleTarget::File(target) = resolver.resolve_module(file.id, specifier) {
                    reverse.entry(target).or_default().push(file.id);
                }
            }
        }

        let mut seen: BTreeSet<FileId> = seeds.iter().copied().collect();
        let mut queue: VecDeque<FileId> = seeds.iter().copied().collect();
        while let Some(file) = queue.pop_front() {
            for &user in reverse.get(&file).map(Vec::as_slice).unwrap_or(&[]) {
                if seen.insert(user) {
                    queue.push_back(user);
                }
            }
        }
        seen
    }

    /// Re-parse `touched`, replace their symbols, and re-link them together
    /// with every file whose edges could have pointed into them. Untouched
    /// files are re-linked from cached syntax facts, never re-parsed.
    pub(crate) fn rebuild(&mut self, touched: &[FileId]) {
        let mut affected = self.module_dependents(touched);

        let analysed: Vec<(ParseStatus, FileSyntax)> = touched
            .par_iter()
            .map(|&f| {
                let file = &self.files[f.0];
                parser::analyse(self.adapter.as_ref(), &file.path, &file.text)
            })
            .collect();
        for (&f, (status, syntax)) in touched.iter().zip(analysed) {
            self.uninstall_symbols(f);
            self.install_symbols(f, status, syntax);
            self.files[f.0].generation += 1;
        }

        affected.extend(self.module_dependents(touched));
        affected.extend(
            self.warnings
                .iter()
                .filter(|w| !matches!(w, Warning::Parse { .. }))
                .filter_map(|w| self.by_path.get(w.path()).copied()),
        );
        let affected: Vec<FileId> = affected.into_iter().collect();
        log::debug!(
            "rebuild: {} re-parsed, {} re-linked",
            touched.len(),
            affected.len()
        );
        self.relink(&affected);
    }
}
