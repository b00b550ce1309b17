pub mod edge;
pub mod node;

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, StableGraph};
use petgraph::visit::EdgeRef;

use edge::{UsageEdge, UsageKind, UsageKinds};
use node::{FileId, Symbol, SymbolId, SymbolKind};

/// The symbol arena plus the usage edge table.
///
/// Every usage is stored exactly once as a directed edge `user -> used`;
/// dependencies are read along outgoing edges and usages along incoming
/// edges of the same store, so the two views cannot diverge.
pub struct SymbolGraph {
    graph: StableGraph<Symbol, UsageEdge>,
    /// Qualified name -> every symbol bearing it (one name may appear in many files).
    name_index: HashMap<String, Vec<SymbolId>>,
}

impl SymbolGraph {
    pub fn new() -> Self {
        Self {
            graph: StableGraph::new(),
            name_index: HashMap::new(),
        }
    }

    pub fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let name = symbol.qualified_name.clone();
        let id = SymbolId(self.graph.add_node(symbol));
        self.name_index.entry(name).or_default().push(id);
        id
    }

    /// Remove a symbol together with every edge touching it.
    pub fn remove_symbol(&mut self, id: SymbolId) -> Option<Symbol> {
        let symbol = self.graph.remove_node(id.0)?;
        if let Some(ids) = self.name_index.get_mut(&symbol.qualified_name) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.name_index.remove(&symbol.qualified_name);
            }
        }
        Some(symbol)
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.graph.node_weight(id.0)
    }

    pub(crate) fn symbol_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        self.graph.node_weight_mut(id.0)
    }

    pub fn contains(&self, id: SymbolId) -> bool {
        self.graph.contains_node(id.0)
    }

    pub fn add_edge(&mut self, from: SymbolId, to: SymbolId, edge: UsageEdge) {
        self.graph.add_edge(from.0, to.0, edge);
    }

    /// Drop every outgoing edge of `id`, leaving incoming edges alone.
    pub fn clear_outgoing(&mut self, id: SymbolId) {
        let edges: Vec<EdgeIndex> = self
            .graph
            .edges_directed(id.0, Direction::Outgoing)
            .map(|e| e.id())
            .collect();
        for e in edges {
            self.graph.remove_edge(e);
        }
    }

    /// `(target, edge)` for every dependency of `id` whose kind is in `kinds`.
    pub fn outgoing(&self, id: SymbolId, kinds: UsageKinds) -> Vec<(SymbolId, UsageEdge)> {
        self.graph
            .edges_directed(id.0, Direction::Outgoing)
            .filter(|e| kinds.contains(e.weight().kind))
            .map(|e| (SymbolId(e.target()), *e.weight()))
            .collect()
    }

    /// `(user, edge)` for every usage of `id` whose kind is in `kinds`.
    pub fn incoming(&self, id: SymbolId, kinds: UsageKinds) -> Vec<(SymbolId, UsageEdge)> {
        self.graph
            .edges_directed(id.0, Direction::Incoming)
            .filter(|e| kinds.contains(e.weight().kind))
            .map(|e| (SymbolId(e.source()), *e.weight()))
            .collect()
    }

    pub fn ids_named(&self, qualified_name: &str) -> &[SymbolId] {
        self.name_index
            .get(qualified_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.graph
            .node_indices()
            .map(move |i| (SymbolId(i), &self.graph[i]))
    }

    /// Every edge as `(from, to, edge)`.
    pub fn edges(&self) -> impl Iterator<Item = (SymbolId, SymbolId, &UsageEdge)> {
        self.graph.edge_indices().filter_map(move |e| {
            let (from, to) = self.graph.edge_endpoints(e)?;
            Some((SymbolId(from), SymbolId(to), &self.graph[e]))
        })
    }

    /// Number of symbol nodes, placeholders included.
    pub fn symbol_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Return a count of symbols broken down by kind.
    pub fn symbols_by_kind(&self) -> HashMap<SymbolKind, usize> {
        let mut map: HashMap<SymbolKind, usize> = HashMap::new();
        for (_, symbol) in self.symbols() {
            *map.entry(symbol.kind()).or_insert(0) += 1;
        }
        map
    }

    /// Return a count of edges broken down by kind.
    pub fn edges_by_kind(&self) -> HashMap<UsageKind, usize> {
        let mut map: HashMap<UsageKind, usize> = HashMap::new();
        for (_, _, edge) in self.edges() {
            *map.entry(edge.kind).or_insert(0) += 1;
        }
        map
    }

    /// Files that hold at least one usage site pointing at any of `targets`.
    pub fn files_using(&self, targets: &[SymbolId]) -> Vec<FileId> {
        let mut files: Vec<FileId> = targets
            .iter()
            .flat_map(|&t| self.incoming(t, UsageKinds::ALL))
            .map(|(_, e)| e.file)
            .collect();
        files.sort();
        files.dedup();
        files
    }
}

impl Default for SymbolGraph {
    fn default() -> Self {
        Self::new()
    }
}
