//! Selection errors

use dagsel_dbt::GraphLookupError;
use crate::methods::MethodName;

/// Everything that can make a selection call fail
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("Invalid selector spec \"{0}\"")]
    MalformedSpec(String),

    #[error("'{method}' is not a valid method name in selector \"{raw}\"")]
    InvalidSelector { raw: String, method: String },

    #[error("Invalid node spec \"{0}\" - \"@\" prefix and \"+\" suffix are incompatible")]
    IncompatibleModifiers(String),

    #[error("Invalid node spec \"{raw}\" - could not handle depth {depth}")]
    InvalidDepth { raw: String, depth: String },

    #[error(
        "Invalid source selector value \"{0}\". Sources must be of the form \
         `${{source_name}}`, `${{source_name}}.${{target_name}}`, or \
         `${{package_name}}.${{source_name}}.${{target_name}}`"
    )]
    InvalidSourceSelector(String),

    #[error("Invalid test type selector value \"{0}\": expected 'data' or 'schema'")]
    InvalidTestType(String),

    #[error("Invalid resource_type selector value \"{0}\"")]
    InvalidResourceType(String),

    #[error("The config selector needs a config key, e.g. config.materialized:{0}")]
    MissingConfigKey(String),

    #[error("Invalid path selector \"{pattern}\": {message}")]
    InvalidPathGlob { pattern: String, message: String },

    #[error("Unknown node attribute \"{0}\"")]
    UnknownAttribute(String),

    /// A valid method name with no implementation behind it: a wiring bug
    #[error("Internal error: no selector method registered for '{0}'")]
    UnregisteredMethod(MethodName),

    #[error("Node {0} not found in the manifest")]
    NodeNotFound(String),

    #[error(transparent)]
    Graph(#[from] GraphLookupError),

    /// Raised instead of a warning when warnings are treated as errors
    #[error("The selector '{0}' does not match any nodes")]
    NoMatch(String),

    #[error("Invalid selector definition{}: {message}", .name.as_ref().map(|n| format!(" '{}'", n)).unwrap_or_default())]
    InvalidDefinition { name: Option<String>, message: String },

    #[error("Could not read selector file {path}: {message}")]
    SelectorFile { path: String, message: String },

    #[error("No selector named '{0}'")]
    UnknownSelector(String),
}

impl SelectionError {
    pub(crate) fn definition(message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            name: None,
            message: message.into(),
        }
    }

    /// Errors caused by the selector text rather than by the engine
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            Self::UnregisteredMethod(_) | Self::NodeNotFound(_) | Self::Graph(_)
        )
    }
}
