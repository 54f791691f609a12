//! Node selection and graph resolution
//!
//! Turns `--select` / `--exclude` strings (or named YAML selectors) into a
//! deterministic set of manifest nodes:
//! - `criteria`: the single-token mini-language parser
//! - `spec`: the selection tree and its set algebra
//! - `cli`: space/comma splitting of command-line selectors
//! - `definition`: `selectors.yml` definitions
//! - `methods`: pluggable match predicates (`fqn`, `tag`, `source`, ...)
//! - `selector`: the `NodeSelector` orchestrating all of the above

pub mod error;
pub mod criteria;
pub mod spec;
pub mod cli;
pub mod definition;
pub mod methods;
pub mod selector;

pub use error::SelectionError;
pub use criteria::SelectionCriteria;
pub use spec::{SelectionGroup, SelectionSpec, SetOperation};
pub use cli::{parse_difference, parse_union, parse_union_from_default, DEFAULT_EXCLUDES, DEFAULT_INCLUDES};
pub use definition::{SelectorConfig, SelectorDefinition};
pub use methods::{MethodManager, MethodName, SelectorMethod};
pub use selector::{NodeAttribute, NodeSelector, SelectionResult};
