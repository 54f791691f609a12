//! Selection report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::diagnostic::{Diagnostic, Severity};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// One selected node, in execution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedNode {
    pub unique_id: String,
    pub resource_type: String,
}

/// Summary statistics for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Number of selected nodes
    pub selected: usize,

    /// Selected nodes per resource type
    pub by_resource_type: BTreeMap<String, usize>,

    /// Number of warnings
    pub warnings: usize,

    /// Number of errors
    pub errors: usize,
}

/// Selection report (selection.json v1)
///
/// This is the stable output format.
/// All fields are versioned and backward-compatible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// The raw include selectors, as given
    #[serde(default)]
    pub select: Vec<String>,

    /// The raw exclude selectors, as given
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Summary statistics
    pub summary: ReportSummary,

    /// Selected nodes in execution order
    pub nodes: Vec<SelectedNode>,

    /// All diagnostics
    pub diagnostics: Vec<Diagnostic>,
}

impl SelectionReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            select: Vec::new(),
            exclude: Vec::new(),
            summary: ReportSummary::default(),
            nodes: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Build a report from ordered nodes and the diagnostics raised while selecting them
    pub fn from_selection(nodes: Vec<SelectedNode>, diagnostics: Vec<Diagnostic>) -> Self {
        let mut report = Self::new();
        for node in nodes {
            report.add_node(node);
        }
        for diagnostic in diagnostics {
            report.add_diagnostic(diagnostic);
        }
        report
    }

    /// Record the raw selectors the report was produced from
    pub fn with_selectors(mut self, select: Vec<String>, exclude: Vec<String>) -> Self {
        self.select = select;
        self.exclude = exclude;
        self
    }

    /// Add a selected node to the report
    pub fn add_node(&mut self, node: SelectedNode) {
        self.summary.selected += 1;
        *self
            .summary
            .by_resource_type
            .entry(node.resource_type.clone())
            .or_insert(0) += 1;
        self.nodes.push(node);
    }

    /// Add a diagnostic to the report
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.summary.errors += 1,
            Severity::Warn => self.summary.warnings += 1,
            Severity::Info => {}
        }

        self.diagnostics.push(diagnostic);
    }

    /// Check if the report has any errors
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

impl Default for SelectionReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Diagnostic;

    fn node(id: &str, resource_type: &str) -> SelectedNode {
        SelectedNode {
            unique_id: id.to_string(),
            resource_type: resource_type.to_string(),
        }
    }

    #[test]
    fn empty_report() {
        let report = SelectionReport::new();
        assert_eq!(report.version, ReportVersion::CURRENT);
        assert_eq!(report.summary.selected, 0);
        assert!(!report.has_errors());
    }

    #[test]
    fn report_counts_nodes_and_diagnostics() {
        let report = SelectionReport::from_selection(
            vec![
                node("model.pkg.a", "model"),
                node("model.pkg.b", "model"),
                node("test.pkg.unique_a_id", "test"),
            ],
            vec![
                Diagnostic::no_match("tag:missing"),
                Diagnostic::selection_empty(),
            ],
        );

        assert_eq!(report.summary.selected, 3);
        assert_eq!(report.summary.by_resource_type.get("model"), Some(&2));
        assert_eq!(report.summary.by_resource_type.get("test"), Some(&1));
        assert_eq!(report.summary.warnings, 1);
        assert!(!report.has_errors());
    }

    #[test]
    fn invalid_selector_counts_as_error() {
        let report = SelectionReport::from_selection(
            vec![],
            vec![Diagnostic::invalid_selector("'bogus' is not a valid method name")],
        );

        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.summary.warnings, 0);
        assert!(report.has_errors());
    }

    #[test]
    fn report_roundtrips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selection.json");

        let report = SelectionReport::from_selection(vec![node("seed.pkg.codes", "seed")], vec![])
            .with_selectors(vec!["codes".to_string()], vec![]);
        report.save_to_file(&path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        let parsed: SelectionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
        assert!(json.contains("\"by_resource_type\""));
    }
}
