//! dagsel core
//!
//! Shared, versioned types: diagnostics, the selection report and the
//! `dagsel.toml` configuration. Never rename diagnostic codes - they are
//! part of the public API.

pub mod diagnostic;
pub mod report;
pub mod config;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use report::{SelectionReport, ReportSummary, ReportVersion, SelectedNode};
pub use config::{Config, ConfigError};
