//! vpc-stack CLI entrypoint.
//!
//! This is the main entrypoint for the vpc-stack command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use vpc_stack::cli::{Cli, Commands, OutputFormat, OutputFormatter};
use vpc_stack::config::{
    find_config_file, ConfigHasher, ConfigParser, ConfigValidator, Secrets, StackConfig,
};
use vpc_stack::engine::{ManifestEngine, MemoryEngine};
use vpc_stack::error::{ConfigError, Result};
use vpc_stack::planner::{DeclarationEmitter, StackPlanner};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Directory holding generated artifacts, next to the configuration file.
const ARTIFACT_DIR: &str = ".vpc-stack";

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.output);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` takes precedence over `--verbose`. Logs always go to stderr, and
/// are JSON lines when the command output is JSON.
fn init_logging(verbose: bool, output: OutputFormat) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match output {
        OutputFormat::Json => builder.json().init(),
        OutputFormat::Text => builder.init(),
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { warnings } => cmd_validate(cli.config.as_ref(), warnings, &formatter),
        Commands::Plan { detailed } => cmd_plan(cli.config.as_ref(), detailed, &formatter).await,
        Commands::Graph { out } => cmd_graph(cli.config.as_ref(), out.as_deref()).await,
        Commands::Apply { yes, manifest } => {
            cmd_apply(cli.config.as_ref(), yes, manifest, &formatter).await
        }
    }
}

/// Initialize a new stack directory.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing new stack in: {}", path.display());

    let config_path = path.join("stack.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    // Check if files exist
    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    // Create directory if needed
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    std::fs::write(&config_path, include_str!("../templates/stack.yaml"))?;
    eprintln!("Created: {}", config_path.display());

    std::fs::write(&env_path, include_str!("../templates/.env.example"))?;
    eprintln!("Created: {}", env_path.display());

    // Write/update .gitignore
    let entries = [".env", ".vpc-stack/"];
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        let missing: Vec<&str> = entries
            .into_iter()
            .filter(|entry| !existing.lines().any(|line| line.trim() == *entry))
            .collect();

        if !missing.is_empty() {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# vpc-stack")?;
            for entry in missing {
                writeln!(file, "{entry}")?;
            }
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, format!("{}\n", entries.join("\n")))?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nStack initialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Copy .env.example to .env and set the database password");
    eprintln!("  2. Edit stack.yaml with your network and instance settings");
    eprintln!("  3. Run 'vpc-stack validate' to check your configuration");
    eprintln!("  4. Run 'vpc-stack plan' to review the address plan");
    eprintln!("  5. Run 'vpc-stack apply' to write the declaration manifest");

    Ok(())
}

/// Validate configuration.
fn cmd_validate(
    config_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let config = load_config(&config_file)?;
    let result = ConfigValidator::new().check(&config);

    print_out(&formatter.format_validation(&config, &result, show_warnings))?;

    if result.is_valid() {
        Ok(())
    } else {
        Err(ConfigError::validation_general(format!(
            "{} error(s) found",
            result.error_count()
        ))
        .into())
    }
}

/// Show deployment plan.
async fn cmd_plan(
    config_path: Option<&PathBuf>,
    detailed: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, secrets) = load_stack(config_path)?;
    let engine = MemoryEngine::from_config(&config);

    let plan = StackPlanner::new(&config, &secrets).plan(&engine).await?;

    print_out(&formatter.format_plan(&plan, detailed)?)
}

/// Render the resource graph.
async fn cmd_graph(config_path: Option<&PathBuf>, out: Option<&Path>) -> Result<()> {
    let (config, secrets) = load_stack(config_path)?;
    let engine = MemoryEngine::from_config(&config);

    let plan = StackPlanner::new(&config, &secrets).plan(&engine).await?;
    let dot = plan.graph.to_dot();

    match out {
        Some(path) => {
            std::fs::write(path, dot)?;
            eprintln!("Wrote graph of {} resources to {}", plan.resource_count(), path.display());
            Ok(())
        }
        None => print_out(&dot),
    }
}

/// Emit the plan to the manifest engine.
async fn cmd_apply(
    config_path: Option<&PathBuf>,
    auto_approve: bool,
    manifest: Option<PathBuf>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    let (config, secrets) = load_stack(Some(&config_file))?;

    let manifest_path = manifest.unwrap_or_else(|| {
        base_dir(&config_file)
            .join(ARTIFACT_DIR)
            .join("manifest.json")
    });
    let config_hash = ConfigHasher::new().hash_config(&config)?;
    let engine = ManifestEngine::for_config(&manifest_path, &config, config_hash);

    let plan = StackPlanner::new(&config, &secrets).plan(&engine).await?;

    if formatter.format() == OutputFormat::Text {
        eprintln!("{}", formatter.format_plan(&plan, false)?);
    }

    // Confirm
    if !auto_approve {
        eprint!(
            "Write {} declarations to {}? [y/N]: ",
            plan.resource_count(),
            engine.path().display()
        );
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Apply cancelled.");
            return Ok(());
        }
    }

    let report = DeclarationEmitter::new(&engine).emit(&plan).await?;

    print_out(&formatter.format_emission(&report)?)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Returns the directory holding the configuration file.
fn base_dir(config_file: &Path) -> &Path {
    config_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Loads `.env` and the configuration with environment overrides.
fn load_config(config_file: &Path) -> Result<StackConfig> {
    debug!("Loading configuration from: {}", config_file.display());

    let parser = ConfigParser::new().with_base_path(base_dir(config_file));
    parser.load_dotenv()?;
    parser.load_with_env(config_file)
}

/// Loads the configuration and the secrets it names.
fn load_stack(config_path: Option<&PathBuf>) -> Result<(StackConfig, Secrets)> {
    let config_file = resolve_config_path(config_path)?;
    let config = load_config(&config_file)?;
    let secrets = ConfigParser::load_secrets(&config)?;
    Ok((config, secrets))
}

/// Writes command output to stdout.
fn print_out(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{text}")?;
    Ok(())
}
