//! Dependency graph (DAG) construction and traversal
//!
//! Answers set-valued traversal queries (ancestors, descendants, direct
//! successors, induced subgraphs) over the manifest's dependency edges. The
//! graph knows nothing about selection semantics.

use std::collections::{BTreeMap, BTreeSet};
use crate::manifest::Manifest;

/// Node identifier (unique_id from manifest)
pub type UniqueId = String;

/// Which expansions to apply around a set of matched nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Traversal {
    pub parents: bool,
    /// `None` means the full transitive closure
    pub parents_max_depth: Option<usize>,
    pub children: bool,
    pub children_max_depth: Option<usize>,
    pub childrens_parents: bool,
}

impl Traversal {
    pub fn is_empty(&self) -> bool {
        !self.parents && !self.children && !self.childrens_parents
    }
}

/// Traversal over an identifier the graph does not contain
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphLookupError {
    #[error("Node {0} does not exist in the graph")]
    NodeNotFound(UniqueId),
}

/// Dependency graph with forward and reverse edges
///
/// An edge `A -> B` means "A depends on B": B is a parent of A and must run first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    /// node -> nodes it depends on
    parents: BTreeMap<UniqueId, BTreeSet<UniqueId>>,

    /// node -> nodes that depend on it
    children: BTreeMap<UniqueId, BTreeSet<UniqueId>>,

    /// All nodes in the graph
    nodes: BTreeSet<UniqueId>,
}

impl Graph {
    /// Build a dependency graph from a manifest
    ///
    /// Every node and source becomes a graph node. Edges come from
    /// `parent_map` when the manifest carries one, else from `depends_on`.
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut graph = Self::default();

        for node_id in manifest.nodes.keys().chain(manifest.sources.keys()) {
            graph.add_node(node_id.clone());
        }

        if !manifest.parent_map.is_empty() {
            for (node_id, parent_ids) in &manifest.parent_map {
                graph.add_node(node_id.clone());
                for parent_id in parent_ids {
                    graph.add_edge(node_id, parent_id);
                }
            }
        } else {
            for (node_id, node) in &manifest.nodes {
                for dep_id in &node.depends_on.nodes {
                    graph.add_edge(node_id, dep_id);
                }
            }
        }

        tracing::debug!(
            nodes = graph.nodes.len(),
            edges = graph.edge_count(),
            "built dependency graph"
        );

        graph
    }

    /// Build a graph from `(dependent, dependency)` pairs plus isolated nodes
    pub fn from_edges<N, E, S>(nodes: N, edges: E) -> Self
    where
        N: IntoIterator<Item = S>,
        E: IntoIterator<Item = (S, S)>,
        S: Into<UniqueId>,
    {
        let mut graph = Self::default();
        for node in nodes {
            graph.add_node(node.into());
        }
        for (dependent, dependency) in edges {
            let dependent = dependent.into();
            let dependency = dependency.into();
            graph.add_edge(&dependent, &dependency);
        }
        graph
    }

    fn add_node(&mut self, node_id: UniqueId) {
        self.nodes.insert(node_id);
    }

    fn add_edge(&mut self, dependent: &str, dependency: &str) {
        self.nodes.insert(dependent.to_string());
        self.nodes.insert(dependency.to_string());
        self.parents
            .entry(dependent.to_string())
            .or_default()
            .insert(dependency.to_string());
        self.children
            .entry(dependency.to_string())
            .or_default()
            .insert(dependent.to_string());
    }

    /// All node identifiers in the graph
    pub fn nodes(&self) -> &BTreeSet<UniqueId> {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.parents.values().map(BTreeSet::len).sum()
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.contains(node_id)
    }

    /// Get immediate parents (dependencies) of a node
    pub fn parents(&self, node_id: &str) -> Vec<&UniqueId> {
        self.parents
            .get(node_id)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// Get immediate children (dependents) of a node
    pub fn children(&self, node_id: &str) -> Vec<&UniqueId> {
        self.children
            .get(node_id)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    fn check_members(&self, selected: &BTreeSet<UniqueId>) -> Result<(), GraphLookupError> {
        match selected.iter().find(|id| !self.nodes.contains(*id)) {
            Some(missing) => Err(GraphLookupError::NodeNotFound(missing.clone())),
            None => Ok(()),
        }
    }

    /// Multi-source BFS along `edges`, at most `max_depth` hops.
    ///
    /// Seeds are only part of the result when reachable from another seed.
    fn reachable(
        selected: &BTreeSet<UniqueId>,
        edges: &BTreeMap<UniqueId, BTreeSet<UniqueId>>,
        max_depth: Option<usize>,
    ) -> BTreeSet<UniqueId> {
        let mut result = BTreeSet::new();
        let mut frontier: Vec<&str> = selected.iter().map(String::as_str).collect();
        let mut depth = 0;

        while !frontier.is_empty() && max_depth.map_or(true, |max| depth < max) {
            let mut next = Vec::new();
            for node in frontier {
                if let Some(neighbors) = edges.get(node) {
                    for neighbor in neighbors {
                        if result.insert(neighbor.clone()) {
                            next.push(neighbor.as_str());
                        }
                    }
                }
            }
            frontier = next;
            depth += 1;
        }

        result
    }

    /// All ancestors of `selected`, optionally bounded to `max_depth` hops
    pub fn select_parents(
        &self,
        selected: &BTreeSet<UniqueId>,
        max_depth: Option<usize>,
    ) -> Result<BTreeSet<UniqueId>, GraphLookupError> {
        self.check_members(selected)?;
        Ok(Self::reachable(selected, &self.parents, max_depth))
    }

    /// All descendants of `selected`, optionally bounded to `max_depth` hops
    pub fn select_children(
        &self,
        selected: &BTreeSet<UniqueId>,
        max_depth: Option<usize>,
    ) -> Result<BTreeSet<UniqueId>, GraphLookupError> {
        self.check_members(selected)?;
        Ok(Self::reachable(selected, &self.children, max_depth))
    }

    /// Everything downstream of `selected`, plus every ancestor of that
    /// downstream set and of the selection itself (the `@` operator)
    pub fn select_childrens_parents(
        &self,
        selected: &BTreeSet<UniqueId>,
    ) -> Result<BTreeSet<UniqueId>, GraphLookupError> {
        let children = self.select_children(selected, None)?;
        let mut result: BTreeSet<UniqueId> = children.union(selected).cloned().collect();
        let parents = self.select_parents(&result, None)?;
        result.extend(parents);
        Ok(result)
    }

    /// Direct (one-hop) dependents of `selected`
    pub fn select_successors(
        &self,
        selected: &BTreeSet<UniqueId>,
    ) -> Result<BTreeSet<UniqueId>, GraphLookupError> {
        self.check_members(selected)?;
        Ok(selected
            .iter()
            .filter_map(|id| self.children.get(id))
            .flatten()
            .cloned()
            .collect())
    }

    /// Union of the expansions `traversal` asks for; empty when it asks for none
    pub fn collect_models(
        &self,
        selected: &BTreeSet<UniqueId>,
        traversal: &Traversal,
    ) -> Result<BTreeSet<UniqueId>, GraphLookupError> {
        let mut additional = BTreeSet::new();
        if traversal.childrens_parents {
            additional.extend(self.select_childrens_parents(selected)?);
        }
        if traversal.parents {
            additional.extend(self.select_parents(selected, traversal.parents_max_depth)?);
        }
        if traversal.children {
            additional.extend(self.select_children(selected, traversal.children_max_depth)?);
        }
        Ok(additional)
    }

    /// Induced subgraph on `node_ids`; ids the graph lacks are ignored
    pub fn subgraph(&self, node_ids: &BTreeSet<UniqueId>) -> Graph {
        let nodes: BTreeSet<UniqueId> = node_ids
            .iter()
            .filter(|id| self.nodes.contains(*id))
            .cloned()
            .collect();

        let restrict = |edges: &BTreeMap<UniqueId, BTreeSet<UniqueId>>| {
            edges
                .iter()
                .filter(|(id, _)| nodes.contains(*id))
                .map(|(id, targets)| {
                    let kept: BTreeSet<UniqueId> =
                        targets.intersection(&nodes).cloned().collect();
                    (id.clone(), kept)
                })
                .filter(|(_, targets)| !targets.is_empty())
                .collect::<BTreeMap<_, _>>()
        };

        Graph {
            parents: restrict(&self.parents),
            children: restrict(&self.children),
            nodes,
        }
    }

    /// Get topological sort of all nodes, dependencies first
    ///
    /// Ties are broken by unique_id so the order is deterministic. Returns
    /// `None` when the graph has a cycle.
    pub fn topological_sort(&self) -> Option<Vec<UniqueId>> {
        let mut in_degree: BTreeMap<&str, usize> = self
            .nodes
            .iter()
            .map(|node| (node.as_str(), self.parents.get(node).map_or(0, BTreeSet::len)))
            .collect();

        // Find nodes with no dependencies
        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(node, _)| *node)
            .collect();

        let mut result = Vec::with_capacity(self.nodes.len());

        // Kahn's algorithm
        while let Some(node) = ready.pop_first() {
            result.push(node.to_string());

            if let Some(children) = self.children.get(node) {
                for child in children {
                    if let Some(degree) = in_degree.get_mut(child.as_str()) {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.insert(child.as_str());
                        }
                    }
                }
            }
        }

        if result.len() == self.nodes.len() {
            Some(result)
        } else {
            None
        }
    }
}
