//! Per-database object inventory with declared dependency edges.
//!
//! A [`CatalogSnapshot`] is what both catalog implementations enumerate from:
//! the SQL Server catalog loads one per database, the in-memory catalog is
//! built from them directly. [`CatalogSnapshot::expand`] is the dependency
//! closure and ordering capability: a topological sort over the explicit edge
//! list, restricted to the seeds and (optionally) everything they depend on.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::debug;

use crate::core::{admits, NameFilter, ObjectCategory, ObjectKey, ScriptableObject};
use crate::error::{BackupError, Result};

/// One object known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub key: ObjectKey,
    pub schema: Option<String>,
    pub name: String,
    /// Shipped by Microsoft or tagged as tools-support; never exported.
    pub is_system: bool,
}

impl CatalogEntry {
    pub fn new(key: ObjectKey, schema: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            key,
            schema: schema.map(str::to_string),
            name: name.into(),
            is_system: false,
        }
    }

    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }

    fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}

/// Objects and dependency edges of one database.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    database: String,
    entries: Vec<CatalogEntry>,
    index: HashMap<ObjectKey, usize>,
    /// dependent -> dependencies, in declaration order.
    dependencies: HashMap<ObjectKey, Vec<ObjectKey>>,
}

impl CatalogSnapshot {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Add an object. A repeated key replaces nothing and is ignored.
    pub fn add_entry(&mut self, entry: CatalogEntry) {
        if self.index.contains_key(&entry.key) {
            return;
        }
        self.index.insert(entry.key, self.entries.len());
        self.entries.push(entry);
    }

    /// Declare that `dependent` references `dependency`.
    pub fn add_dependency(&mut self, dependent: ObjectKey, dependency: ObjectKey) {
        let deps = self.dependencies.entry(dependent).or_default();
        if !deps.contains(&dependency) {
            deps.push(dependency);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, key: ObjectKey) -> Option<&CatalogEntry> {
        self.index.get(&key).map(|&i| &self.entries[i])
    }

    /// Non-system objects of a category, in enumeration order.
    pub fn list(
        &self,
        category: ObjectCategory,
        filter: Option<&NameFilter>,
    ) -> Vec<ScriptableObject> {
        self.entries
            .iter()
            .filter(|e| e.key.category == category && !e.is_system)
            .filter(|e| admits(filter, &e.name))
            .map(|e| self.to_object(e))
            .collect()
    }

    /// Resolve a key to an object.
    pub fn lookup(&self, key: ObjectKey) -> Result<ScriptableObject> {
        self.entry(key)
            .map(|e| self.to_object(e))
            .ok_or_else(|| BackupError::UnknownObject {
                database: self.database.clone(),
                key: key.to_string(),
            })
    }

    /// Dependency-ordered keys for `seeds`.
    ///
    /// Every dependency of an object precedes it. Among objects whose
    /// dependencies are already placed, the earliest in enumeration order goes
    /// first, so the result depends only on the snapshot. References to objects outside the snapshot are
    /// treated as pre-existing and skipped, as are system objects.
    pub fn expand(&self, seeds: &[ObjectKey], include_transitive: bool) -> Result<Vec<ObjectKey>> {
        if seeds.is_empty() {
            return Err(BackupError::scripting(
                &self.database,
                "dependency expansion requires at least one object",
            ));
        }

        let mut selected: HashSet<ObjectKey> = HashSet::new();
        let mut queue: VecDeque<ObjectKey> = VecDeque::new();
        for key in seeds {
            let entry = self.entry(*key).ok_or_else(|| BackupError::UnknownObject {
                database: self.database.clone(),
                key: key.to_string(),
            })?;
            if !entry.is_system && selected.insert(*key) {
                queue.push_back(*key);
            }
        }

        if include_transitive {
            while let Some(key) = queue.pop_front() {
                for dep in self.dependencies.get(&key).into_iter().flatten() {
                    let known = self.entry(*dep).is_some_and(|e| !e.is_system);
                    if known && selected.insert(*dep) {
                        queue.push_back(*dep);
                    }
                }
            }
        }

        // Nodes go in enumeration order; node indices are the tie-break.
        let mut graph: DiGraph<ObjectKey, ()> = DiGraph::new();
        let mut nodes: HashMap<ObjectKey, NodeIndex> = HashMap::new();
        for entry in self.entries.iter().filter(|e| selected.contains(&e.key)) {
            nodes.insert(entry.key, graph.add_node(entry.key));
        }

        for entry in &self.entries {
            let Some(&to) = nodes.get(&entry.key) else {
                continue;
            };
            for dep in self.dependencies.get(&entry.key).into_iter().flatten() {
                if *dep == entry.key {
                    continue;
                }
                if let Some(&from) = nodes.get(dep) {
                    graph.update_edge(from, to, ());
                }
            }
        }

        let order = stable_toposort(&graph).ok_or_else(|| self.cycle_error(&graph))?;
        let keys: Vec<ObjectKey> = order.into_iter().map(|n| graph[n]).collect();

        debug!(
            "Expanded {} seed(s) to {} object(s) in {}",
            seeds.len(),
            keys.len(),
            self.database
        );
        Ok(keys)
    }

    fn cycle_error(&self, graph: &DiGraph<ObjectKey, ()>) -> BackupError {
        let mut objects: Vec<String> = tarjan_scc(graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .flatten()
            .filter_map(|n| self.entry(graph[n]).map(CatalogEntry::qualified_name))
            .collect();
        objects.sort();
        BackupError::DependencyCycle {
            database: self.database.clone(),
            objects,
        }
    }

    fn to_object(&self, entry: &CatalogEntry) -> ScriptableObject {
        ScriptableObject {
            database: self.database.clone(),
            schema: entry.schema.clone(),
            name: entry.name.clone(),
            key: entry.key,
        }
    }
}

/// Kahn's algorithm taking the lowest ready node index first. `None` when
/// the graph has a cycle.
fn stable_toposort(graph: &DiGraph<ObjectKey, ()>) -> Option<Vec<NodeIndex>> {
    let mut pending: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<NodeIndex>> = graph
        .node_indices()
        .filter(|n| pending[n.index()] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for next in graph.neighbors_directed(node, Direction::Outgoing) {
            pending[next.index()] -= 1;
            if pending[next.index()] == 0 {
                ready.push(Reverse(next));
            }
        }
    }
    (order.len() == graph.node_count()).then_some(order)
}
