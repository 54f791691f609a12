//! Diagnostic codes and selection warnings
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Selector resolution (1xxx)
    /// A selector (or one member of a union) matched no nodes
    SelectorNoMatch,

    /// The final selection is empty
    SelectionEmpty,

    /// A selector could not be parsed or evaluated
    SelectorInvalid,

    // Manifest / graph (2xxx)
    /// The selected subgraph could not be ordered (cycle)
    GraphCycle,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelectorNoMatch => "SELECTOR_NO_MATCH",
            Self::SelectionEmpty => "SELECTION_EMPTY",
            Self::SelectorInvalid => "SELECTOR_INVALID",
            Self::GraphCycle => "GRAPH_CYCLE",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - reported, selection continues
    Warn,

    /// Error - the selection call failed
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A diagnostic message raised while resolving a selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// The raw selector text this diagnostic is about, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            selector: None,
        }
    }

    /// Warning for a selector that resolved to no nodes
    pub fn no_match(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self::new(
            DiagnosticCode::SelectorNoMatch,
            Severity::Warn,
            format!("The selector '{}' does not match any nodes and will be ignored", raw),
        )
        .with_selector(raw)
    }

    /// The whole selection resolved to nothing
    pub fn selection_empty() -> Self {
        Self::new(DiagnosticCode::SelectionEmpty, Severity::Info, "No nodes selected")
    }

    /// A selection that failed to parse or evaluate
    pub fn invalid_selector(message: impl Into<String>) -> Self {
        Self::new(DiagnosticCode::SelectorInvalid, Severity::Error, message)
    }

    /// Attach the raw selector text
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }
}
