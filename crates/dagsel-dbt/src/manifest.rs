//! dbt manifest.json parsing
//!
//! Parses the subset of the manifest the selection engine reads: nodes,
//! sources, their configs, tags, fqns and dependency edges.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// dbt manifest.json structure (subset of fields we care about)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Metadata about the manifest
    #[serde(default)]
    pub metadata: ManifestMetadata,

    /// Models, tests, seeds, snapshots, analyses and operations
    #[serde(default)]
    pub nodes: BTreeMap<String, ManifestNode>,

    /// Source definitions
    #[serde(default)]
    pub sources: BTreeMap<String, ManifestSource>,

    /// Parent map (node -> list of parent nodes)
    #[serde(default)]
    pub parent_map: BTreeMap<String, Vec<String>>,
}

impl Manifest {
    /// Load manifest from file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ManifestError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_str(&contents)
    }

    /// Parse manifest from JSON string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(json)
            .map_err(|e| ManifestError::ParseError(e.to_string()))
    }

    /// Get a specific node by unique_id
    pub fn get_node(&self, unique_id: &str) -> Option<&ManifestNode> {
        self.nodes.get(unique_id)
    }

    /// Get a specific source by unique_id
    pub fn get_source(&self, unique_id: &str) -> Option<&ManifestSource> {
        self.sources.get(unique_id)
    }

    /// Look up a node or a source
    pub fn get(&self, unique_id: &str) -> Option<NodeRef<'_>> {
        self.nodes
            .get(unique_id)
            .map(NodeRef::Node)
            .or_else(|| self.sources.get(unique_id).map(NodeRef::Source))
    }

    /// Buildable nodes whose id is in `included`
    pub fn nodes_in<'a>(
        &'a self,
        included: &'a BTreeSet<String>,
    ) -> impl Iterator<Item = (&'a String, &'a ManifestNode)> + 'a {
        self.nodes.iter().filter(move |(id, _)| included.contains(*id))
    }

    /// Sources whose id is in `included`
    pub fn sources_in<'a>(
        &'a self,
        included: &'a BTreeSet<String>,
    ) -> impl Iterator<Item = (&'a String, &'a ManifestSource)> + 'a {
        self.sources.iter().filter(move |(id, _)| included.contains(*id))
    }

    /// Nodes and sources whose id is in `included`
    pub fn all_in<'a>(
        &'a self,
        included: &'a BTreeSet<String>,
    ) -> impl Iterator<Item = (&'a String, NodeRef<'a>)> + 'a {
        self.nodes_in(included)
            .map(|(id, node)| (id, NodeRef::Node(node)))
            .chain(self.sources_in(included).map(|(id, source)| (id, NodeRef::Source(source))))
    }

    /// Ids of every node materialized as `ephemeral`
    pub fn ephemeral_nodes(&self) -> BTreeSet<String> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.config.is_ephemeral())
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// Manifest metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    #[serde(default)]
    pub dbt_schema_version: String,
    #[serde(default)]
    pub dbt_version: String,
    #[serde(default)]
    pub generated_at: String,
    #[serde(default)]
    pub invocation_id: Option<String>,
}

/// Resource type of a graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Model,
    Test,
    Snapshot,
    Seed,
    Analysis,
    Operation,
    Rpc,
    Source,
}

impl ResourceType {
    pub const ALL: [ResourceType; 8] = [
        Self::Model,
        Self::Test,
        Self::Snapshot,
        Self::Seed,
        Self::Analysis,
        Self::Operation,
        Self::Rpc,
        Self::Source,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Test => "test",
            Self::Snapshot => "snapshot",
            Self::Seed => "seed",
            Self::Analysis => "analysis",
            Self::Operation => "operation",
            Self::Rpc => "rpc",
            Self::Source => "source",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|rt| rt.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// A config value: the dot-addressable tree behind `config.<key>[.<key>]` selectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ConfigValue>),
    Map(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    /// Descend into nested maps; `None` as soon as a key is missing or a
    /// non-map value is reached with path left over.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&ConfigValue> {
        match path.split_first() {
            None => Some(self),
            Some((key, rest)) => match self {
                Self::Map(map) => map.get(key.as_ref())?.get_path(rest),
                _ => None,
            },
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::List(_) | Self::Map(_))
    }

    /// Truthiness in the sense of "is this attribute set"
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Map(map) => !map.is_empty(),
        }
    }
}

impl std::fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("none"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// A node in the manifest (model, test, snapshot, etc.)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestNode {
    /// Unique identifier (e.g., "model.my_project.users")
    pub unique_id: String,

    /// Node name (e.g., "users")
    pub name: String,

    /// Resource type (model, test, snapshot, etc.)
    pub resource_type: ResourceType,

    /// Package name
    pub package_name: String,

    /// Relative path to SQL file
    #[serde(default)]
    pub path: String,

    /// Original file path, relative to the package root
    #[serde(default)]
    pub original_file_path: String,

    /// Package root on disk
    #[serde(default)]
    pub root_path: Option<String>,

    /// Schema name
    #[serde(default)]
    pub schema: Option<String>,

    /// Alias (output table name)
    #[serde(default)]
    pub alias: Option<String>,

    /// Node configuration
    #[serde(default)]
    pub config: NodeConfig,

    /// Tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Column definitions
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnDefinition>,

    /// Dependencies
    #[serde(default)]
    pub depends_on: DependsOn,

    /// Fully qualified name
    #[serde(default)]
    pub fqn: Vec<String>,

    /// Present on schema tests only
    #[serde(default)]
    pub test_metadata: Option<TestMetadata>,

    /// Raw body, used to detect empty files
    #[serde(default, alias = "raw_code")]
    pub raw_sql: Option<String>,
}

impl ManifestNode {
    /// A node whose file has no body. Seeds carry no SQL and are never empty.
    pub fn is_empty(&self) -> bool {
        self.resource_type != ResourceType::Seed
            && self.raw_sql.as_deref().map_or(false, |sql| sql.trim().is_empty())
    }

    /// Schema tests carry test metadata; data tests do not
    pub fn is_schema_test(&self) -> bool {
        self.resource_type == ResourceType::Test && self.test_metadata.is_some()
    }

    pub fn is_data_test(&self) -> bool {
        self.resource_type == ResourceType::Test && self.test_metadata.is_none()
    }
}

/// Node configuration (from dbt_project.yml or model config)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Whether the node is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Materialization type
    #[serde(default)]
    pub materialized: Option<String>,

    /// Every other config key
    #[serde(flatten)]
    pub extra: BTreeMap<String, ConfigValue>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            materialized: None,
            extra: BTreeMap::new(),
        }
    }
}

impl NodeConfig {
    pub fn is_ephemeral(&self) -> bool {
        self.materialized.as_deref() == Some("ephemeral")
    }

    /// Resolve a dotted config path such as `["materialized"]` or `["meta", "owner"]`
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<Cow<'_, ConfigValue>> {
        let (first, rest) = path.split_first()?;
        match first.as_ref() {
            "enabled" if rest.is_empty() => Some(Cow::Owned(ConfigValue::Bool(self.enabled))),
            "materialized" if rest.is_empty() => self
                .materialized
                .as_ref()
                .map(|m| Cow::Owned(ConfigValue::String(m.clone()))),
            "enabled" | "materialized" => None,
            key => self.extra.get(key)?.get_path(rest).map(Cow::Borrowed),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(flatten)]
    pub extra: BTreeMap<String, ConfigValue>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extra: BTreeMap::new(),
        }
    }
}

impl SourceConfig {
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<Cow<'_, ConfigValue>> {
        let (first, rest) = path.split_first()?;
        match first.as_ref() {
            "enabled" if rest.is_empty() => Some(Cow::Owned(ConfigValue::Bool(self.enabled))),
            "enabled" => None,
            key => self.extra.get(key)?.get_path(rest).map(Cow::Borrowed),
        }
    }
}

/// Test metadata (schema tests only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestMetadata {
    /// Test name, e.g. "unique" or "not_null"
    pub name: String,

    #[serde(default)]
    pub namespace: Option<String>,
}

/// Column definition from manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Data type (if specified)
    #[serde(default)]
    pub data_type: Option<String>,
}

/// Dependencies structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependsOn {
    /// List of node unique_ids this node depends on
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// A source in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestSource {
    /// Unique identifier (e.g., "source.my_project.raw.users")
    pub unique_id: String,

    /// Source name (e.g., "raw")
    pub source_name: String,

    /// Table name (e.g., "users")
    pub name: String,

    /// Package name
    pub package_name: String,

    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub original_file_path: String,

    #[serde(default)]
    pub root_path: Option<String>,

    #[serde(default)]
    pub fqn: Vec<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub description: String,

    /// Schema name
    #[serde(default)]
    pub schema: Option<String>,

    /// Identifier (actual table name)
    #[serde(default)]
    pub identifier: Option<String>,

    /// Column definitions
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnDefinition>,

    #[serde(default)]
    pub config: SourceConfig,
}

/// Borrowed view over either kind of selectable resource
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Node(&'a ManifestNode),
    Source(&'a ManifestSource),
}

impl<'a> NodeRef<'a> {
    pub fn unique_id(&self) -> &'a str {
        match *self {
            Self::Node(node) => &node.unique_id,
            Self::Source(source) => &source.unique_id,
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        match *self {
            Self::Node(node) => node.resource_type,
            Self::Source(_) => ResourceType::Source,
        }
    }

    pub fn package_name(&self) -> &'a str {
        match *self {
            Self::Node(node) => &node.package_name,
            Self::Source(source) => &source.package_name,
        }
    }

    pub fn fqn(&self) -> &'a [String] {
        match *self {
            Self::Node(node) => &node.fqn,
            Self::Source(source) => &source.fqn,
        }
    }

    pub fn tags(&self) -> &'a [String] {
        match *self {
            Self::Node(node) => &node.tags,
            Self::Source(source) => &source.tags,
        }
    }

    pub fn original_file_path(&self) -> &'a str {
        match *self {
            Self::Node(node) => &node.original_file_path,
            Self::Source(source) => &source.original_file_path,
        }
    }

    pub fn root_path(&self) -> Option<&'a str> {
        match *self {
            Self::Node(node) => node.root_path.as_deref(),
            Self::Source(source) => source.root_path.as_deref(),
        }
    }

    pub fn description(&self) -> &'a str {
        match *self {
            Self::Node(node) => &node.description,
            Self::Source(source) => &source.description,
        }
    }

    pub fn columns(&self) -> &'a BTreeMap<String, ColumnDefinition> {
        match *self {
            Self::Node(node) => &node.columns,
            Self::Source(source) => &source.columns,
        }
    }

    pub fn test_metadata(&self) -> Option<&'a TestMetadata> {
        match *self {
            Self::Node(node) => node.test_metadata.as_ref(),
            Self::Source(_) => None,
        }
    }

    pub fn config_lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<Cow<'a, ConfigValue>> {
        match *self {
            Self::Node(node) => node.config.lookup(path),
            Self::Source(source) => source.config.lookup(path),
        }
    }

    pub fn is_enabled(&self) -> bool {
        match *self {
            Self::Node(node) => node.config.enabled,
            Self::Source(source) => source.config.enabled,
        }
    }

    /// Enabled sources, and enabled non-empty buildable nodes
    pub fn is_graph_member(&self) -> bool {
        match *self {
            Self::Node(node) => node.config.enabled && !node.is_empty(),
            Self::Source(source) => source.config.enabled,
        }
    }
}

/// Manifest parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest file {0}: {1}")]
    IoError(String, String),

    #[error("Failed to parse manifest JSON: {0}")]
    ParseError(String),
}
