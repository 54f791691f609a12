//! Node selection over a manifest graph
//!
//! Pipeline for one call:
//! 1. restrict the graph to members (enabled sources, enabled non-empty nodes)
//! 2. evaluate the spec tree; each criteria leaf is searched, expanded along
//!    the graph and gets its direct tests attached
//! 3. filter by resource type, tag and required attributes
//! 4. pull in ephemeral models when anything was selected

use std::collections::BTreeSet;
use std::str::FromStr;

use dagsel_core::Diagnostic;
use dagsel_dbt::{Graph, Manifest, NodeRef, ResourceType, UniqueId};

use crate::cli::parse_difference;
use crate::criteria::SelectionCriteria;
use crate::error::SelectionError;
use crate::methods::MethodManager;
use crate::spec::SelectionSpec;

/// Attributes a node can be required to have set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeAttribute {
    Description,
    Columns,
    Tags,
    TestMetadata,
    Fqn,
}

impl NodeAttribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeAttribute::Description => "description",
            NodeAttribute::Columns => "columns",
            NodeAttribute::Tags => "tags",
            NodeAttribute::TestMetadata => "test_metadata",
            NodeAttribute::Fqn => "fqn",
        }
    }

    /// Is the attribute present and non-empty on `node`?
    pub fn is_set(&self, node: NodeRef<'_>) -> bool {
        match self {
            NodeAttribute::Description => !node.description().is_empty(),
            NodeAttribute::Columns => !node.columns().is_empty(),
            NodeAttribute::Tags => !node.tags().is_empty(),
            NodeAttribute::TestMetadata => node.test_metadata().is_some(),
            NodeAttribute::Fqn => !node.fqn().is_empty(),
        }
    }
}

impl FromStr for NodeAttribute {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "description" => Ok(NodeAttribute::Description),
            "columns" => Ok(NodeAttribute::Columns),
            "tags" => Ok(NodeAttribute::Tags),
            "test_metadata" => Ok(NodeAttribute::TestMetadata),
            "fqn" => Ok(NodeAttribute::Fqn),
            other => Err(SelectionError::UnknownAttribute(other.to_string())),
        }
    }
}

impl std::fmt::Display for NodeAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selected ids plus the warnings raised while selecting them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionResult {
    pub selected: BTreeSet<UniqueId>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolves selection specs against one manifest and its graph
pub struct NodeSelector<'m> {
    full_graph: &'m Graph,
    manifest: &'m Manifest,
    methods: MethodManager<'m>,
    resource_types: BTreeSet<ResourceType>,
    tags: BTreeSet<String>,
    required_attrs: Vec<NodeAttribute>,
    include_ephemeral: bool,
    warn_error: bool,
}

impl<'m> NodeSelector<'m> {
    pub fn new(graph: &'m Graph, manifest: &'m Manifest) -> Self {
        Self {
            full_graph: graph,
            manifest,
            methods: MethodManager::new(manifest),
            resource_types: BTreeSet::new(),
            tags: BTreeSet::new(),
            required_attrs: Vec::new(),
            include_ephemeral: true,
            warn_error: false,
        }
    }

    pub fn with_methods(mut self, methods: MethodManager<'m>) -> Self {
        self.methods = methods;
        self
    }

    /// Keep only these resource types; empty keeps everything
    pub fn with_resource_types(mut self, resource_types: impl IntoIterator<Item = ResourceType>) -> Self {
        self.resource_types = resource_types.into_iter().collect();
        self
    }

    /// Keep only resources carrying at least one of these tags
    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_required_attrs(mut self, attrs: impl IntoIterator<Item = NodeAttribute>) -> Self {
        self.required_attrs = attrs.into_iter().collect();
        self
    }

    pub fn include_ephemeral(mut self, include: bool) -> Self {
        self.include_ephemeral = include;
        self
    }

    /// Turn "selector matched nothing" warnings into errors
    pub fn warn_error(mut self, warn_error: bool) -> Self {
        self.warn_error = warn_error;
        self
    }

    /// Select from `--select` / `--exclude` style arguments
    pub fn select<S: AsRef<str>>(
        &self,
        include: Option<&[S]>,
        exclude: Option<&[S]>,
    ) -> Result<SelectionResult, SelectionError> {
        let spec = parse_difference(include, exclude)?;
        self.select_spec(&spec)
    }

    /// Run the whole pipeline for one spec tree
    pub fn select_spec(&self, spec: &SelectionSpec) -> Result<SelectionResult, SelectionError> {
        let filtered_graph = self.build_graph_member_subgraph();
        tracing::debug!(
            members = filtered_graph.len(),
            total = self.full_graph.len(),
            spec = %spec,
            "selecting nodes"
        );

        let mut diagnostics = Vec::new();
        let selected = self.select_nodes(&filtered_graph, spec, &mut diagnostics)?;
        let filtered = self.filter_selection(selected)?;
        let selected = self.add_ephemeral(&filtered_graph, filtered);

        tracing::debug!(selected = selected.len(), warnings = diagnostics.len(), "selection complete");
        Ok(SelectionResult { selected, diagnostics })
    }

    /// Evaluate one node of the spec tree over `graph`
    pub fn select_nodes(
        &self,
        graph: &Graph,
        spec: &SelectionSpec,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<BTreeSet<UniqueId>, SelectionError> {
        let Some((operation, group)) = spec.operation() else {
            return match spec {
                SelectionSpec::Criteria(criteria) => self.get_nodes_from_criteria(graph, criteria),
                _ => Ok(BTreeSet::new()),
            };
        };

        let selections = group
            .components
            .iter()
            .map(|component| self.select_nodes(graph, component, diagnostics))
            .collect::<Result<Vec<_>, _>>()?;
        let result = operation.combine_selections(selections);

        if group.expect_exists && result.is_empty() {
            self.alert_non_existence(&group.raw, diagnostics)?;
        }
        Ok(result)
    }

    /// Search, expand along the graph, then attach direct tests
    pub fn get_nodes_from_criteria(
        &self,
        graph: &Graph,
        criteria: &SelectionCriteria,
    ) -> Result<BTreeSet<UniqueId>, SelectionError> {
        let method = self.methods.get_method(criteria.method, &criteria.method_arguments)?;
        let mut collected: BTreeSet<UniqueId> = method.search(graph.nodes(), &criteria.value)?.collect();

        let specified = graph.collect_models(&collected, &criteria.traversal())?;
        collected.extend(specified);

        let result = self.expand_selection(graph, collected)?;
        tracing::debug!(selector = %criteria.raw, matched = result.len(), "resolved criteria");
        Ok(result)
    }

    /// Add tests that directly depend on the selection
    fn expand_selection(
        &self,
        graph: &Graph,
        mut selected: BTreeSet<UniqueId>,
    ) -> Result<BTreeSet<UniqueId>, SelectionError> {
        let tests: Vec<UniqueId> = graph
            .select_successors(&selected)?
            .into_iter()
            .filter(|id| {
                self.manifest
                    .get_node(id)
                    .map_or(false, |node| node.resource_type == ResourceType::Test)
            })
            .collect();
        selected.extend(tests);
        Ok(selected)
    }

    fn alert_non_existence(&self, raw: &str, diagnostics: &mut Vec<Diagnostic>) -> Result<(), SelectionError> {
        if self.warn_error {
            return Err(SelectionError::NoMatch(raw.to_string()));
        }
        // nested groups often share the same text
        if diagnostics.iter().any(|d| d.selector.as_deref() == Some(raw)) {
            return Ok(());
        }
        tracing::warn!("The selector '{}' does not match any nodes and will be ignored", raw);
        diagnostics.push(Diagnostic::no_match(raw));
        Ok(())
    }

    fn is_graph_member(&self, unique_id: &str) -> bool {
        match self.manifest.get(unique_id) {
            Some(node) => node.is_graph_member(),
            None => {
                tracing::debug!(unique_id, "graph node missing from manifest");
                false
            }
        }
    }

    /// The full graph restricted to enabled sources and enabled, non-empty nodes
    pub fn build_graph_member_subgraph(&self) -> Graph {
        let members: BTreeSet<UniqueId> = self
            .full_graph
            .nodes()
            .iter()
            .filter(|id| self.is_graph_member(id))
            .cloned()
            .collect();
        self.full_graph.subgraph(&members)
    }

    fn node_is_match(&self, node: NodeRef<'_>) -> bool {
        if !self.resource_types.is_empty() && !self.resource_types.contains(&node.resource_type()) {
            return false;
        }
        if !self.tags.is_empty() && !node.tags().iter().any(|tag| self.tags.contains(tag)) {
            return false;
        }
        self.required_attrs.iter().all(|attr| attr.is_set(node))
    }

    fn filter_selection(&self, selected: BTreeSet<UniqueId>) -> Result<BTreeSet<UniqueId>, SelectionError> {
        let mut filtered = BTreeSet::new();
        for unique_id in selected {
            let node = self
                .manifest
                .get(&unique_id)
                .ok_or_else(|| SelectionError::NodeNotFound(unique_id.clone()))?;
            if self.node_is_match(node) {
                filtered.insert(unique_id);
            }
        }
        Ok(filtered)
    }

    /// Ephemeral models compile into their dependents, so any non-empty
    /// selection needs all of them.
    fn add_ephemeral(&self, graph: &Graph, mut selected: BTreeSet<UniqueId>) -> BTreeSet<UniqueId> {
        if !self.include_ephemeral || selected.is_empty() {
            return selected;
        }
        let ephemeral: Vec<UniqueId> = self
            .manifest
            .ephemeral_nodes()
            .into_iter()
            .filter(|id| graph.contains(id))
            .collect();
        if !ephemeral.is_empty() {
            tracing::debug!(count = ephemeral.len(), "adding ephemeral models");
        }
        selected.extend(ephemeral);
        selected
    }

    /// Selected ids in dependency order
    pub fn execution_order(&self, selected: &BTreeSet<UniqueId>) -> Option<Vec<UniqueId>> {
        self.full_graph.subgraph(selected).topological_sort()
    }
}
