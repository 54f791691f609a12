//! Selector methods: the predicates behind `method:value`
//!
//! Each method scans the ids it is given and yields the ones that match.
//! [`MethodManager`] maps a [`MethodName`] to the implementation that
//! answers it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use dagsel_dbt::{ConfigValue, Manifest, ManifestNode, ResourceType, UniqueId};
use crate::error::SelectionError;

/// Wildcard accepted by the `fqn` and `source` methods
const SELECTOR_GLOB: &str = "*";
/// Separator inside dotted selector values
const SELECTOR_DELIMITER: char = '.';

/// The closed set of selector method names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MethodName {
    Fqn,
    Tag,
    Source,
    Path,
    Package,
    Config,
    TestName,
    TestType,
    ResourceType,
}

impl MethodName {
    pub const ALL: [MethodName; 9] = [
        MethodName::Fqn,
        MethodName::Tag,
        MethodName::Source,
        MethodName::Path,
        MethodName::Package,
        MethodName::Config,
        MethodName::TestName,
        MethodName::TestType,
        MethodName::ResourceType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MethodName::Fqn => "fqn",
            MethodName::Tag => "tag",
            MethodName::Source => "source",
            MethodName::Path => "path",
            MethodName::Package => "package",
            MethodName::Config => "config",
            MethodName::TestName => "test_name",
            MethodName::TestType => "test_type",
            MethodName::ResourceType => "resource_type",
        }
    }
}

impl fmt::Display for MethodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MethodName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MethodName::ALL
            .iter()
            .find(|name| name.as_str() == s)
            .copied()
            .ok_or_else(|| s.to_string())
    }
}

/// Lazily produced matches of one search
pub type SearchResults<'a> = Box<dyn Iterator<Item = UniqueId> + 'a>;

/// A predicate over manifest resources
pub trait SelectorMethod {
    fn name(&self) -> MethodName;

    /// Dotted arguments given after the method name
    fn arguments(&self) -> &[String] {
        &[]
    }

    /// Yield the ids in `included` that match `value`.
    ///
    /// Ids missing from the manifest are skipped.
    fn search<'a>(
        &'a self,
        included: &'a BTreeSet<UniqueId>,
        value: &'a str,
    ) -> Result<SearchResults<'a>, SelectionError>;
}

/// Does `fqn` match the dotted selector `selector`?
///
/// A `*` component matches the rest of the name, and the last selector
/// component may name the node itself.
fn is_selected_node(fqn: &[String], selector: &[&str]) -> bool {
    for (i, selector_part) in selector.iter().enumerate() {
        if *selector_part == SELECTOR_GLOB {
            return true;
        }
        if i == selector.len() - 1 && fqn.last().map(String::as_str) == Some(*selector_part) {
            return true;
        }
        match fqn.get(i) {
            Some(part) if part == selector_part => continue,
            _ => return false,
        }
    }
    true
}

/// `fqn` method
pub struct QualifiedNameMethod<'m> {
    manifest: &'m Manifest,
}

impl QualifiedNameMethod<'_> {
    /// The selector may omit the package name, and may be the bare node name
    fn node_is_match(qualified: &[&str], package_names: &BTreeSet<&str>, fqn: &[String]) -> bool {
        if qualified.len() == 1 && fqn.last().map(String::as_str) == Some(qualified[0]) {
            return true;
        }

        if package_names.contains(qualified[0]) && is_selected_node(fqn, qualified) {
            return true;
        }

        package_names.iter().any(|package| {
            let mut local_qualified = Vec::with_capacity(qualified.len() + 1);
            local_qualified.push(*package);
            local_qualified.extend_from_slice(qualified);
            is_selected_node(fqn, &local_qualified)
        })
    }
}

impl SelectorMethod for QualifiedNameMethod<'_> {
    fn name(&self) -> MethodName {
        MethodName::Fqn
    }

    fn search<'a>(
        &'a self,
        included: &'a BTreeSet<UniqueId>,
        value: &'a str,
    ) -> Result<SearchResults<'a>, SelectionError> {
        let qualified: Vec<&str> = value.split(SELECTOR_DELIMITER).collect();
        let nodes: Vec<(&UniqueId, &ManifestNode)> = self.manifest.nodes_in(included).collect();
        let package_names: BTreeSet<&str> =
            nodes.iter().map(|(_, node)| node.package_name.as_str()).collect();

        Ok(Box::new(
            nodes
                .into_iter()
                .filter(move |(_, node)| Self::node_is_match(&qualified, &package_names, &node.fqn))
                .map(|(id, _)| id.clone()),
        ))
    }
}

/// `tag` method: exact tag membership
pub struct TagMethod<'m> {
    manifest: &'m Manifest,
}

impl SelectorMethod for TagMethod<'_> {
    fn name(&self) -> MethodName {
        MethodName::Tag
    }

    fn search<'a>(
        &'a self,
        included: &'a BTreeSet<UniqueId>,
        value: &'a str,
    ) -> Result<SearchResults<'a>, SelectionError> {
        Ok(Box::new(
            self.manifest
                .all_in(included)
                .filter(move |(_, node)| node.tags().iter().any(|tag| tag == value))
                .map(|(id, _)| id.clone()),
        ))
    }
}

/// `source` method: `source`, `source.table` or `package.source.table`
pub struct SourceMethod<'m> {
    manifest: &'m Manifest,
}

impl SelectorMethod for SourceMethod<'_> {
    fn name(&self) -> MethodName {
        MethodName::Source
    }

    fn search<'a>(
        &'a self,
        included: &'a BTreeSet<UniqueId>,
        value: &'a str,
    ) -> Result<SearchResults<'a>, SelectionError> {
        let parts: Vec<&str> = value.split(SELECTOR_DELIMITER).collect();
        let (target_package, target_source, target_table) = match parts.as_slice() {
            [source] => (SELECTOR_GLOB, *source, SELECTOR_GLOB),
            [source, table] => (SELECTOR_GLOB, *source, *table),
            [package, source, table] => (*package, *source, *table),
            _ => return Err(SelectionError::InvalidSourceSelector(value.to_string())),
        };

        let matches = |target: &str, actual: &str| target == SELECTOR_GLOB || target == actual;

        Ok(Box::new(
            self.manifest
                .sources_in(included)
                .filter(move |(_, source)| {
                    matches(target_package, &source.package_name)
                        && matches(target_source, &source.source_name)
                        && matches(target_table, &source.name)
                })
                .map(|(id, _)| id.clone()),
        ))
    }
}

/// `path` method: glob relative to the project root.
///
/// A resource matches when its `original_file_path` is a glob hit or lies
/// under a directory that is.
pub struct PathMethod<'m> {
    manifest: &'m Manifest,
    root: PathBuf,
}

impl PathMethod<'_> {
    fn same_root(root_path: &Path, project_root: &Path) -> bool {
        match (root_path.canonicalize(), project_root.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => root_path == project_root,
        }
    }
}

impl SelectorMethod for PathMethod<'_> {
    fn name(&self) -> MethodName {
        MethodName::Path
    }

    fn search<'a>(
        &'a self,
        included: &'a BTreeSet<UniqueId>,
        value: &'a str,
    ) -> Result<SearchResults<'a>, SelectionError> {
        let pattern = format!(
            "{}{}{}",
            glob::Pattern::escape(&self.root.to_string_lossy()),
            std::path::MAIN_SEPARATOR,
            value
        );
        let entries = glob::glob(&pattern).map_err(|e| SelectionError::InvalidPathGlob {
            pattern: value.to_string(),
            message: e.to_string(),
        })?;

        let paths: BTreeSet<PathBuf> = entries
            .filter_map(Result::ok)
            .filter_map(|hit| hit.strip_prefix(&self.root).ok().map(Path::to_path_buf))
            .collect();
        tracing::trace!(pattern = %pattern, hits = paths.len(), "path selector expanded");

        Ok(Box::new(
            self.manifest
                .all_in(included)
                .filter(move |(_, node)| {
                    if let Some(root_path) = node.root_path() {
                        if !Self::same_root(Path::new(root_path), &self.root) {
                            return false;
                        }
                    }
                    let file_path = Path::new(node.original_file_path());
                    file_path.ancestors().any(|ancestor| {
                        !ancestor.as_os_str().is_empty() && paths.contains(ancestor)
                    })
                })
                .map(|(id, _)| id.clone()),
        ))
    }
}

/// `package` method
pub struct PackageMethod<'m> {
    manifest: &'m Manifest,
}

impl SelectorMethod for PackageMethod<'_> {
    fn name(&self) -> MethodName {
        MethodName::Package
    }

    fn search<'a>(
        &'a self,
        included: &'a BTreeSet<UniqueId>,
        value: &'a str,
    ) -> Result<SearchResults<'a>, SelectionError> {
        Ok(Box::new(
            self.manifest
                .all_in(included)
                .filter(move |(_, node)| node.package_name() == value)
                .map(|(id, _)| id.clone()),
        ))
    }
}

/// `config.<key>[.<key>...]` method
pub struct ConfigMethod<'m> {
    manifest: &'m Manifest,
    arguments: Vec<String>,
}

impl ConfigMethod<'_> {
    fn scalar_matches(config: &ConfigValue, value: &str, ignore_case: bool) -> bool {
        let rendered = config.to_string();
        if ignore_case {
            rendered.eq_ignore_ascii_case(value)
        } else {
            rendered == value
        }
    }

    /// Lists match when any scalar element does
    fn value_matches(config: &ConfigValue, value: &str, ignore_case: bool) -> bool {
        match config {
            ConfigValue::List(items) => items
                .iter()
                .any(|item| item.is_scalar() && Self::scalar_matches(item, value, ignore_case)),
            other => Self::scalar_matches(other, value, ignore_case),
        }
    }
}

impl SelectorMethod for ConfigMethod<'_> {
    fn name(&self) -> MethodName {
        MethodName::Config
    }

    fn arguments(&self) -> &[String] {
        &self.arguments
    }

    fn search<'a>(
        &'a self,
        included: &'a BTreeSet<UniqueId>,
        value: &'a str,
    ) -> Result<SearchResults<'a>, SelectionError> {
        if self.arguments.is_empty() {
            return Err(SelectionError::MissingConfigKey(value.to_string()));
        }
        // dbt normalizes severity casing on write, so compare it loosely
        let ignore_case = self.arguments.len() == 1 && self.arguments[0] == "severity";

        Ok(Box::new(
            self.manifest
                .all_in(included)
                .filter(move |(_, node)| {
                    node.config_lookup(self.arguments.as_slice())
                        .map_or(false, |config| Self::value_matches(&config, value, ignore_case))
                })
                .map(|(id, _)| id.clone()),
        ))
    }
}

/// `test_name` method: the generic test a schema test instantiates
pub struct TestNameMethod<'m> {
    manifest: &'m Manifest,
}

impl SelectorMethod for TestNameMethod<'_> {
    fn name(&self) -> MethodName {
        MethodName::TestName
    }

    fn search<'a>(
        &'a self,
        included: &'a BTreeSet<UniqueId>,
        value: &'a str,
    ) -> Result<SearchResults<'a>, SelectionError> {
        Ok(Box::new(
            self.manifest
                .nodes_in(included)
                .filter(move |(_, node)| {
                    node.resource_type == ResourceType::Test
                        && node.test_metadata.as_ref().map_or(false, |meta| meta.name == value)
                })
                .map(|(id, _)| id.clone()),
        ))
    }
}

/// `test_type` method: `schema` or `data`
pub struct TestTypeMethod<'m> {
    manifest: &'m Manifest,
}

impl SelectorMethod for TestTypeMethod<'_> {
    fn name(&self) -> MethodName {
        MethodName::TestType
    }

    fn search<'a>(
        &'a self,
        included: &'a BTreeSet<UniqueId>,
        value: &'a str,
    ) -> Result<SearchResults<'a>, SelectionError> {
        let is_match: fn(&ManifestNode) -> bool = match value {
            "schema" => ManifestNode::is_schema_test,
            "data" => ManifestNode::is_data_test,
            _ => return Err(SelectionError::InvalidTestType(value.to_string())),
        };

        Ok(Box::new(
            self.manifest
                .nodes_in(included)
                .filter(move |(_, node)| is_match(node))
                .map(|(id, _)| id.clone()),
        ))
    }
}

/// `resource_type` method
pub struct ResourceTypeMethod<'m> {
    manifest: &'m Manifest,
}

impl SelectorMethod for ResourceTypeMethod<'_> {
    fn name(&self) -> MethodName {
        MethodName::ResourceType
    }

    fn search<'a>(
        &'a self,
        included: &'a BTreeSet<UniqueId>,
        value: &'a str,
    ) -> Result<SearchResults<'a>, SelectionError> {
        let resource_type: ResourceType =
            value.parse().map_err(SelectionError::InvalidResourceType)?;

        Ok(Box::new(
            self.manifest
                .all_in(included)
                .filter(move |(_, node)| node.resource_type() == resource_type)
                .map(|(id, _)| id.clone()),
        ))
    }
}

/// Builds a method bound to a manifest
pub type MethodFactory =
    for<'m> fn(&'m Manifest, &Path, Vec<String>) -> Box<dyn SelectorMethod + 'm>;

fn fqn_method<'m>(manifest: &'m Manifest, _: &Path, _: Vec<String>) -> Box<dyn SelectorMethod + 'm> {
    Box::new(QualifiedNameMethod { manifest })
}

fn tag_method<'m>(manifest: &'m Manifest, _: &Path, _: Vec<String>) -> Box<dyn SelectorMethod + 'm> {
    Box::new(TagMethod { manifest })
}

fn source_method<'m>(manifest: &'m Manifest, _: &Path, _: Vec<String>) -> Box<dyn SelectorMethod + 'm> {
    Box::new(SourceMethod { manifest })
}

fn path_method<'m>(manifest: &'m Manifest, root: &Path, _: Vec<String>) -> Box<dyn SelectorMethod + 'm> {
    Box::new(PathMethod {
        manifest,
        root: root.to_path_buf(),
    })
}

fn package_method<'m>(manifest: &'m Manifest, _: &Path, _: Vec<String>) -> Box<dyn SelectorMethod + 'm> {
    Box::new(PackageMethod { manifest })
}

fn config_method<'m>(
    manifest: &'m Manifest,
    _: &Path,
    arguments: Vec<String>,
) -> Box<dyn SelectorMethod + 'm> {
    Box::new(ConfigMethod { manifest, arguments })
}

fn test_name_method<'m>(manifest: &'m Manifest, _: &Path, _: Vec<String>) -> Box<dyn SelectorMethod + 'm> {
    Box::new(TestNameMethod { manifest })
}

fn test_type_method<'m>(manifest: &'m Manifest, _: &Path, _: Vec<String>) -> Box<dyn SelectorMethod + 'm> {
    Box::new(TestTypeMethod { manifest })
}

fn resource_type_method<'m>(
    manifest: &'m Manifest,
    _: &Path,
    _: Vec<String>,
) -> Box<dyn SelectorMethod + 'm> {
    Box::new(ResourceTypeMethod { manifest })
}

fn default_factory(name: MethodName) -> MethodFactory {
    match name {
        MethodName::Fqn => fqn_method,
        MethodName::Tag => tag_method,
        MethodName::Source => source_method,
        MethodName::Path => path_method,
        MethodName::Package => package_method,
        MethodName::Config => config_method,
        MethodName::TestName => test_name_method,
        MethodName::TestType => test_type_method,
        MethodName::ResourceType => resource_type_method,
    }
}

/// Registry resolving method names to implementations over one manifest
pub struct MethodManager<'m> {
    manifest: &'m Manifest,
    project_root: PathBuf,
    factories: BTreeMap<MethodName, MethodFactory>,
}

impl<'m> MethodManager<'m> {
    /// A manager with every built-in method registered
    pub fn new(manifest: &'m Manifest) -> Self {
        let mut manager = Self::empty(manifest);
        for name in MethodName::ALL {
            manager.register(name, default_factory(name));
        }
        manager
    }

    /// A manager with nothing registered
    pub fn empty(manifest: &'m Manifest) -> Self {
        let project_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            manifest,
            project_root,
            factories: BTreeMap::new(),
        }
    }

    /// Root that `path` selectors are resolved against (default: cwd)
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.project_root = if root.is_relative() {
            std::env::current_dir()
                .map(|cwd| cwd.join(&root))
                .unwrap_or(root)
        } else {
            root
        };
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn register(&mut self, name: MethodName, factory: MethodFactory) {
        self.factories.insert(name, factory);
    }

    /// Instantiate the method for `name` with its dotted arguments
    pub fn get_method(
        &self,
        name: MethodName,
        arguments: &[String],
    ) -> Result<Box<dyn SelectorMethod + 'm>, SelectionError> {
        let factory = self
            .factories
            .get(&name)
            .ok_or(SelectionError::UnregisteredMethod(name))?;
        Ok(factory(self.manifest, &self.project_root, arguments.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn manifest() -> Manifest {
        let value = json!({
            "nodes": {
                "model.pkg.view_model": {
                    "unique_id": "model.pkg.view_model",
                    "name": "view_model",
                    "resource_type": "model",
                    "package_name": "pkg",
                    "original_file_path": "models/view_model.sql",
                    "fqn": ["pkg", "view_model"],
                    "tags": ["nightly"],
                    "config": {"materialized": "view", "tags": ["nightly", "hourly"]}
                },
                "model.pkg.nested.table_model": {
                    "unique_id": "model.pkg.nested.table_model",
                    "name": "table_model",
                    "resource_type": "model",
                    "package_name": "pkg",
                    "original_file_path": "models/nested/table_model.sql",
                    "fqn": ["pkg", "nested", "table_model"],
                    "config": {"materialized": "table", "meta": {"owner": "data"}}
                },
                "model.other.view_model": {
                    "unique_id": "model.other.view_model",
                    "name": "view_model",
                    "resource_type": "model",
                    "package_name": "other",
                    "original_file_path": "models/view_model.sql",
                    "fqn": ["other", "view_model"],
                    "config": {"materialized": "ephemeral"}
                },
                "test.pkg.unique_view_model_id": {
                    "unique_id": "test.pkg.unique_view_model_id",
                    "name": "unique_view_model_id",
                    "resource_type": "test",
                    "package_name": "pkg",
                    "fqn": ["pkg", "schema_test", "unique_view_model_id"],
                    "test_metadata": {"name": "unique"},
                    "config": {"severity": "ERROR"}
                },
                "test.pkg.view_summary": {
                    "unique_id": "test.pkg.view_summary",
                    "name": "view_summary",
                    "resource_type": "test",
                    "package_name": "pkg",
                    "fqn": ["pkg", "data_test", "view_summary"],
                    "config": {"severity": "warn"}
                },
                "seed.pkg.countries": {
                    "unique_id": "seed.pkg.countries",
                    "name": "countries",
                    "resource_type": "seed",
                    "package_name": "pkg",
                    "fqn": ["pkg", "countries"]
                }
            },
            "sources": {
                "source.pkg.raw.customers": {
                    "unique_id": "source.pkg.raw.customers",
                    "source_name": "raw",
                    "name": "customers",
                    "package_name": "pkg",
                    "fqn": ["pkg", "raw", "customers"],
                    "tags": ["nightly"]
                },
                "source.other.raw.orders": {
                    "unique_id": "source.other.raw.orders",
                    "source_name": "raw",
                    "name": "orders",
                    "package_name": "other",
                    "fqn": ["other", "raw", "orders"]
                },
                "source.pkg.ext.events": {
                    "unique_id": "source.pkg.ext.events",
                    "source_name": "ext",
                    "name": "events",
                    "package_name": "pkg",
                    "fqn": ["pkg", "ext", "events"]
                }
            }
        });
        Manifest::from_str(&value.to_string()).unwrap()
    }

    fn all_ids(manifest: &Manifest) -> BTreeSet<UniqueId> {
        manifest.nodes.keys().chain(manifest.sources.keys()).cloned().collect()
    }

    fn search(manager: &MethodManager<'_>, name: MethodName, args: &[&str], value: &str) -> Vec<String> {
        let manifest_ids = all_ids(manager.manifest);
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let method = manager.get_method(name, &args).unwrap();
        method.search(&manifest_ids, value).unwrap().collect()
    }

    #[test]
    fn method_names_roundtrip() {
        for name in MethodName::ALL {
            assert_eq!(name.as_str().parse::<MethodName>().unwrap(), name);
        }
        assert!("bogus".parse::<MethodName>().is_err());
    }

    #[test]
    fn manager_resolves_every_method() {
        let manifest = manifest();
        let manager = MethodManager::new(&manifest);
        for name in MethodName::ALL {
            let method = manager.get_method(name, &[]).unwrap();
            assert_eq!(method.name(), name);
        }

        let config = manager
            .get_method(MethodName::Config, &["materialized".to_string()])
            .unwrap();
        assert_eq!(config.arguments(), ["materialized".to_string()]);
    }

    #[test]
    fn unregistered_method_is_an_internal_error() {
        let manifest = manifest();
        let manager = MethodManager::empty(&manifest);
        assert!(matches!(
            manager.get_method(MethodName::Tag, &[]),
            Err(SelectionError::UnregisteredMethod(MethodName::Tag))
        ));
    }

    #[test]
    fn fqn_selection() {
        let manifest = manifest();
        let manager = MethodManager::new(&manifest);

        assert_eq!(
            search(&manager, MethodName::Fqn, &[], "view_model"),
            vec!["model.other.view_model", "model.pkg.view_model"]
        );
        assert_eq!(
            search(&manager, MethodName::Fqn, &[], "pkg.view_model"),
            vec!["model.pkg.view_model"]
        );
        assert_eq!(
            search(&manager, MethodName::Fqn, &[], "nested"),
            vec!["model.pkg.nested.table_model"]
        );
        assert_eq!(
            search(&manager, MethodName::Fqn, &[], "pkg.nested.*"),
            vec!["model.pkg.nested.table_model"]
        );
        assert_eq!(search(&manager, MethodName::Fqn, &[], "*").len(), 6);
        assert!(search(&manager, MethodName::Fqn, &[], "nothing").is_empty());
        // sources are not part of the fqn search
        assert!(search(&manager, MethodName::Fqn, &[], "customers").is_empty());
    }

    #[test]
    fn fqn_only_sees_included_packages() {
        let manifest = manifest();
        let manager = MethodManager::new(&manifest);
        let method = manager.get_method(MethodName::Fqn, &[]).unwrap();

        let included: BTreeSet<UniqueId> = ["model.pkg.nested.table_model".to_string()].into();
        let found: Vec<_> = method.search(&included, "nested.table_model").unwrap().collect();
        assert_eq!(found, vec!["model.pkg.nested.table_model"]);

        let found: Vec<_> = method.search(&included, "view_model").unwrap().collect();
        assert!(found.is_empty());
    }

    #[test]
    fn tag_selection() {
        let manifest = manifest();
        let manager = MethodManager::new(&manifest);
        assert_eq!(
            search(&manager, MethodName::Tag, &[], "nightly"),
            vec!["model.pkg.view_model", "source.pkg.raw.customers"]
        );
        assert!(search(&manager, MethodName::Tag, &[], "night").is_empty());
    }

    #[test]
    fn source_selection() {
        let manifest = manifest();
        let manager = MethodManager::new(&manifest);

        assert_eq!(
            search(&manager, MethodName::Source, &[], "raw"),
            vec!["source.other.raw.orders", "source.pkg.raw.customers"]
        );
        assert_eq!(
            search(&manager, MethodName::Source, &[], "raw.customers"),
            vec!["source.pkg.raw.customers"]
        );
        assert_eq!(
            search(&manager, MethodName::Source, &[], "other.raw.*"),
            vec!["source.other.raw.orders"]
        );
        assert_eq!(
            search(&manager, MethodName::Source, &[], "pkg.*.*"),
            vec!["source.pkg.ext.events", "source.pkg.raw.customers"]
        );
        assert!(search(&manager, MethodName::Source, &[], "pkg.raw.orders").is_empty());
    }

    #[test]
    fn source_selector_with_too_many_parts_fails() {
        let manifest = manifest();
        let manager = MethodManager::new(&manifest);
        let method = manager.get_method(MethodName::Source, &[]).unwrap();
        let included = all_ids(&manifest);
        assert!(matches!(
            method.search(&included, "a.b.c.d"),
            Err(SelectionError::InvalidSourceSelector(_))
        ));
    }

    #[test]
    fn package_selection() {
        let manifest = manifest();
        let manager = MethodManager::new(&manifest);
        assert_eq!(
            search(&manager, MethodName::Package, &[], "other"),
            vec!["model.other.view_model", "source.other.raw.orders"]
        );
    }

    #[test]
    fn config_selection() {
        let manifest = manifest();
        let manager = MethodManager::new(&manifest);

        assert_eq!(
            search(&manager, MethodName::Config, &["materialized"], "view"),
            vec!["model.pkg.view_model"]
        );
        assert_eq!(
            search(&manager, MethodName::Config, &["meta", "owner"], "data"),
            vec!["model.pkg.nested.table_model"]
        );
        // list values match any element
        assert_eq!(
            search(&manager, MethodName::Config, &["tags"], "hourly"),
            vec!["model.pkg.view_model"]
        );
        assert!(search(&manager, MethodName::Config, &["materialized"], "incremental").is_empty());
    }

    #[test]
    fn config_severity_is_case_insensitive() {
        let manifest = manifest();
        let manager = MethodManager::new(&manifest);

        assert_eq!(
            search(&manager, MethodName::Config, &["severity"], "error"),
            vec!["test.pkg.unique_view_model_id"]
        );
        assert_eq!(
            search(&manager, MethodName::Config, &["severity"], "WARN"),
            vec!["test.pkg.view_summary"]
        );
        assert!(search(&manager, MethodName::Config, &["materialized"], "VIEW").is_empty());
    }

    #[test]
    fn config_without_key_fails() {
        let manifest = manifest();
        let manager = MethodManager::new(&manifest);
        let method = manager.get_method(MethodName::Config, &[]).unwrap();
        let included = all_ids(&manifest);
        assert!(matches!(
            method.search(&included, "view"),
            Err(SelectionError::MissingConfigKey(_))
        ));
    }

    #[test]
    fn test_name_and_type_selection() {
        let manifest = manifest();
        let manager = MethodManager::new(&manifest);

        assert_eq!(
            search(&manager, MethodName::TestName, &[], "unique"),
            vec!["test.pkg.unique_view_model_id"]
        );
        assert_eq!(
            search(&manager, MethodName::TestType, &[], "schema"),
            vec!["test.pkg.unique_view_model_id"]
        );
        assert_eq!(
            search(&manager, MethodName::TestType, &[], "data"),
            vec!["test.pkg.view_summary"]
        );

        let method = manager.get_method(MethodName::TestType, &[]).unwrap();
        let included = all_ids(&manifest);
        assert!(matches!(
            method.search(&included, "unit"),
            Err(SelectionError::InvalidTestType(_))
        ));
    }

    #[test]
    fn resource_type_selection() {
        let manifest = manifest();
        let manager = MethodManager::new(&manifest);
        assert_eq!(
            search(&manager, MethodName::ResourceType, &[], "seed"),
            vec!["seed.pkg.countries"]
        );
        assert_eq!(search(&manager, MethodName::ResourceType, &[], "source").len(), 3);

        let method = manager.get_method(MethodName::ResourceType, &[]).unwrap();
        let included = all_ids(&manifest);
        assert!(matches!(
            method.search(&included, "widget"),
            Err(SelectionError::InvalidResourceType(_))
        ));
    }

    #[test]
    fn path_selection() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("models/nested")).unwrap();
        std::fs::write(dir.path().join("models/view_model.sql"), "select 1").unwrap();
        std::fs::write(dir.path().join("models/nested/table_model.sql"), "select 1").unwrap();

        let manifest = manifest();
        let manager = MethodManager::new(&manifest).with_project_root(dir.path());

        assert_eq!(
            search(&manager, MethodName::Path, &[], "models/nested"),
            vec!["model.pkg.nested.table_model"]
        );
        assert_eq!(
            search(&manager, MethodName::Path, &[], "models/*.sql"),
            vec!["model.other.view_model", "model.pkg.view_model"]
        );
        assert_eq!(search(&manager, MethodName::Path, &[], "models").len(), 3);
        assert!(search(&manager, MethodName::Path, &[], "macros").is_empty());
    }

    #[test]
    fn is_selected_node_rules() {
        let fqn: Vec<String> = ["pkg", "nested", "leaf"].iter().map(|s| s.to_string()).collect();
        assert!(is_selected_node(&fqn, &["pkg", "nested", "leaf"]));
        assert!(is_selected_node(&fqn, &["pkg", "nested"]));
        assert!(is_selected_node(&fqn, &["pkg", "*"]));
        assert!(is_selected_node(&fqn, &["pkg", "leaf"]));
        assert!(!is_selected_node(&fqn, &["pkg", "other"]));
        assert!(!is_selected_node(&fqn, &["pkg", "nested", "leaf", "extra"]));
    }
}
