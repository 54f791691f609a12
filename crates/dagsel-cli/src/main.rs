use clap::{Parser, Subcommand};
use colored::Colorize;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dagsel_core::{Config, Diagnostic, DiagnosticCode, SelectedNode, SelectionReport, Severity};
use dagsel_dbt::{Graph, Manifest, ResourceType, UniqueId};
use dagsel_selector::{
    parse_difference, MethodManager, NodeAttribute, NodeSelector, SelectionResult, SelectorConfig,
};

/// dagsel - dbt node selection from the command line
#[derive(Parser)]
#[command(name = "dagsel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: dagsel.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to dbt manifest.json (overrides the config file)
    #[arg(short = 'f', long, global = true)]
    manifest: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the nodes a selection resolves to, in execution order
    Ls {
        /// Selectors to include (default: everything)
        #[arg(short, long, num_args = 1..)]
        select: Vec<String>,

        /// Selectors to exclude
        #[arg(long, num_args = 1..)]
        exclude: Vec<String>,

        /// Named selector from the selectors file
        #[arg(long, conflicts_with_all = ["select", "exclude"])]
        selector: Option<String>,

        /// Only keep these resource types
        #[arg(long = "resource-type")]
        resource_types: Vec<String>,

        /// Only keep nodes carrying one of these tags
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Only keep nodes that have these attributes set
        #[arg(long = "require")]
        required_attrs: Vec<String>,

        /// Do not pull ephemeral models into the selection
        #[arg(long)]
        no_ephemeral: bool,

        /// Print the ids as a JSON array
        #[arg(long)]
        json: bool,

        /// Output file for the selection report
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show how selectors parse, without a manifest
    Parse {
        /// Selectors to include
        specs: Vec<String>,

        /// Selectors to exclude
        #[arg(long, num_args = 1..)]
        exclude: Vec<String>,
    },

    /// List the named selectors of the project
    Selectors,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    // Load config if specified
    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new("dagsel.toml").exists() {
        Config::from_file(Path::new("dagsel.toml"))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    match cli.command {
        Commands::Ls {
            select,
            exclude,
            selector,
            resource_types,
            tags,
            required_attrs,
            no_ephemeral,
            json,
            output,
        } => {
            let options = LsOptions {
                select,
                exclude,
                selector,
                resource_types,
                tags,
                required_attrs,
                include_ephemeral: config.include_ephemeral && !no_ephemeral,
                json,
                output,
            };
            ls_command(&config, cli.manifest.as_deref(), &options, cli.verbose)
        }
        Commands::Parse { specs, exclude } => parse_command(&specs, &exclude),
        Commands::Selectors => selectors_command(&config, cli.verbose),
    }
}

struct LsOptions {
    select: Vec<String>,
    exclude: Vec<String>,
    selector: Option<String>,
    resource_types: Vec<String>,
    tags: Vec<String>,
    required_attrs: Vec<String>,
    include_ephemeral: bool,
    json: bool,
    output: Option<PathBuf>,
}

/// `None` when nothing was given, so the defaults apply
fn non_empty(values: &[String]) -> Option<&[String]> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn load_manifest(config: &Config, manifest_override: Option<&Path>, verbose: bool) -> Result<Manifest> {
    let manifest_path = manifest_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.manifest_file());

    if !manifest_path.exists() {
        return Err(anyhow::anyhow!(
            "Manifest not found at {}. Run 'dbt compile' or 'dbt build' first.",
            manifest_path.display()
        ));
    }

    if verbose {
        eprintln!("{} {}", "Loading manifest from:".cyan(), manifest_path.display());
    }

    Manifest::from_file(&manifest_path).map_err(|e| anyhow::anyhow!("Failed to load manifest: {}", e))
}

/// Ls command - resolve a selection and print it in execution order
fn ls_command(config: &Config, manifest_override: Option<&Path>, options: &LsOptions, verbose: bool) -> Result<()> {
    let manifest = load_manifest(config, manifest_override, verbose)?;

    if verbose {
        eprintln!("{}", "Building dependency graph...".cyan());
    }
    let graph = Graph::from_manifest(&manifest);
    tracing::debug!(nodes = graph.len(), edges = graph.edge_count(), "graph built");

    let resource_types = options
        .resource_types
        .iter()
        .map(|t| t.parse::<ResourceType>().map_err(|t| anyhow::anyhow!("Unknown resource type '{}'", t)))
        .collect::<Result<Vec<_>>>()?;
    let required_attrs = options
        .required_attrs
        .iter()
        .map(|a| a.parse::<NodeAttribute>())
        .collect::<Result<Vec<_>, _>>()?;

    let methods = MethodManager::new(&manifest).with_project_root(&config.project_root);
    let selector = NodeSelector::new(&graph, &manifest)
        .with_methods(methods)
        .with_resource_types(resource_types)
        .with_tags(options.tags.iter().cloned())
        .with_required_attrs(required_attrs)
        .include_ephemeral(options.include_ephemeral)
        .warn_error(config.warn_error);

    let result = match &options.selector {
        Some(name) => {
            let selectors = SelectorConfig::from_path(&config.selectors_file())?;
            let definition = selectors.get(name)?;
            if verbose {
                eprintln!("{} {} = {}", "Using selector".cyan(), name, definition.definition);
            }
            selector.select_spec(&definition.definition)
        }
        None => selector.select(non_empty(&options.select), non_empty(&options.exclude)),
    };

    let SelectionResult { selected, mut diagnostics } = match result {
        Ok(result) => result,
        Err(err) => {
            let raw = match &options.selector {
                Some(name) => name.clone(),
                None => options.select.join(" "),
            };
            let diagnostic = Diagnostic::invalid_selector(err.to_string()).with_selector(raw);
            print_diagnostics(std::slice::from_ref(&diagnostic));
            if let Some(output) = &options.output {
                write_report(&manifest, &[], vec![diagnostic], options, output, verbose)?;
            }
            return Err(err).context("Selection failed");
        }
    };

    let ordered = order_selection(&selector, &selected, &mut diagnostics);
    if ordered.is_empty() {
        diagnostics.push(Diagnostic::selection_empty());
    }

    print_diagnostics(&diagnostics);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&ordered)?);
    } else {
        for unique_id in &ordered {
            println!("{}", unique_id);
        }
    }

    if verbose && !ordered.is_empty() {
        eprintln!();
        eprintln!("{} {}", "Selected nodes:".green(), ordered.len());
    }

    if let Some(output) = &options.output {
        write_report(&manifest, &ordered, diagnostics, options, output, verbose)?;
    }

    Ok(())
}

fn write_report(
    manifest: &Manifest,
    ordered: &[UniqueId],
    diagnostics: Vec<Diagnostic>,
    options: &LsOptions,
    output: &Path,
    verbose: bool,
) -> Result<()> {
    let nodes = ordered
        .iter()
        .map(|unique_id| SelectedNode {
            unique_id: unique_id.clone(),
            resource_type: manifest
                .get(unique_id)
                .map(|node| node.resource_type().to_string())
                .unwrap_or_default(),
        })
        .collect();
    let report = SelectionReport::from_selection(nodes, diagnostics)
        .with_selectors(options.select.clone(), options.exclude.clone());

    report
        .save_to_file(output)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    if verbose {
        eprintln!("{} {}", "Report saved to:".green(), output.display());
    }
    Ok(())
}

/// Dependency order of the selection; a cycle falls back to id order
fn order_selection(
    selector: &NodeSelector<'_>,
    selected: &BTreeSet<UniqueId>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<UniqueId> {
    match selector.execution_order(selected) {
        Some(order) => order,
        None => {
            diagnostics.push(Diagnostic::new(
                DiagnosticCode::GraphCycle,
                Severity::Warn,
                "The selected nodes contain a dependency cycle; listing them by id",
            ));
            selected.iter().cloned().collect()
        }
    }
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diag in diagnostics {
        let severity_str = match diag.severity {
            Severity::Error => "ERROR".red().bold(),
            Severity::Warn => "WARN".yellow().bold(),
            Severity::Info => "INFO".cyan(),
        };
        eprintln!("[{}] {}: {}", severity_str, diag.code, diag.message);
    }
}

/// Parse command - print the selection tree
fn parse_command(specs: &[String], exclude: &[String]) -> Result<()> {
    let spec = parse_difference(non_empty(specs), non_empty(exclude))?;
    println!("{}", spec);
    Ok(())
}

/// Selectors command - list named selectors
fn selectors_command(config: &Config, verbose: bool) -> Result<()> {
    let path = config.selectors_file();
    if verbose {
        eprintln!("{} {}", "Loading selectors from:".cyan(), path.display());
    }

    let selectors = SelectorConfig::load_optional(&path)?;
    if selectors.is_empty() {
        println!("{}", "No selectors defined".yellow());
        return Ok(());
    }

    for selector in selectors.iter() {
        println!("{}", selector.name.bold());
        if let Some(description) = &selector.description {
            println!("  {}", description);
        }
        println!("  {}", selector.definition.to_string().dimmed());
    }

    Ok(())
}
