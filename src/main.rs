//! eksdeploy CLI entrypoint.
//!
//! Validation diagnostics and logs always go to stderr, in text or JSON.
//! stdout carries the command's result: the plan for `plan`, and for `apply`
//! the kubeconfig of a reachable cluster and nothing else.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use eks_deploy::cli::{Cli, Commands, OutputFormatter};
use eks_deploy::config::{
    find_config_file, load_dotenv, ClusterConfig, ConfigValidator, StackConfig,
};
use eks_deploy::error::{DeployError, Result, StateError};
use eks_deploy::planner::{NetworkContext, PlanExecutor, TopologyResolver};
use eks_deploy::provision::DryRunProvisioner;
use eks_deploy::state::{LocalStateStore, StateStore, STATE_DIR};

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        // Diagnostics were already printed.
        Err(e) if e.is_validation_failure() => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system. Logs go to stderr.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate => cmd_validate(cli.config.as_ref(), &formatter),
        Commands::Plan => cmd_plan(cli.config.as_ref(), &formatter),
        Commands::Apply { yes } => {
            cmd_apply(
                cli.config.as_ref(),
                cli.state_dir.as_deref(),
                &cli.region,
                yes,
                &formatter,
            )
            .await
        }
    }
}

/// Write a template stack file.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing new eksdeploy stack in: {}", path.display());

    let config_path = path.join("eksdeploy.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    if !force && config_path.exists() {
        eprintln!("Stack file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    std::fs::write(&config_path, include_str!("../templates/eksdeploy.yaml"))?;
    eprintln!("Created: {}", config_path.display());

    std::fs::write(&env_path, include_str!("../templates/.env.example"))?;
    eprintln!("Created: {}", env_path.display());

    let state_entry = format!("{STATE_DIR}/");
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        let missing: Vec<&str> = [".env", state_entry.as_str()]
            .into_iter()
            .filter(|entry| !existing.lines().any(|line| line.trim() == *entry))
            .collect();
        if !missing.is_empty() {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# eksdeploy")?;
            for entry in missing {
                writeln!(file, "{entry}")?;
            }
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, format!(".env\n{state_entry}\n"))?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nStack initialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Edit eksdeploy.yaml with your cluster settings");
    eprintln!("  2. Run 'eksdeploy validate' to check your configuration");
    eprintln!("  3. Run 'eksdeploy plan' to see what will be provisioned");
    eprintln!("  4. Run 'eksdeploy apply' to provision the cluster");

    Ok(())
}

/// Validate configuration.
fn cmd_validate(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let (config, _) = load_cluster_config(config_path)?;
    report_diagnostics(&config, formatter)
}

/// Show the provisioning plan.
fn cmd_plan(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let (config, _) = load_cluster_config(config_path)?;
    report_diagnostics(&config, formatter)?;

    let plan = TopologyResolver::new().resolve(&config, &NetworkContext::pending())?;
    emit(&formatter.format_plan(&plan))
}

/// Record the cluster through the dry-run provisioner.
async fn cmd_apply(
    config_path: Option<&PathBuf>,
    state_dir: Option<&Path>,
    region: &str,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, config_file) = load_cluster_config(config_path)?;
    report_diagnostics(&config, formatter)?;

    let preview = TopologyResolver::new().resolve(&config, &NetworkContext::pending())?;
    eprintln!("{}", formatter.format_plan(&preview));

    let state_dir = state_dir.map_or_else(
        || config_dir(&config_file).join(STATE_DIR),
        Path::to_path_buf,
    );
    let store = LocalStateStore::with_base_dir(state_dir);
    debug!(
        "Using {} state at {}",
        store.backend_type(),
        store.state_path().display()
    );
    let provisioner = DryRunProvisioner::new(store).with_region(region);

    if provisioner.state().await?.config_hash == preview.config_hash {
        info!("Configuration unchanged since the last apply");
    }

    // A live foreign lock fails before the prompt.
    if let Some(lock) = provisioner.store().current_lock().await? {
        if !lock.is_own() {
            return Err(StateError::LockedByOther {
                cluster: lock.cluster,
                holder: lock.holder,
                since: lock.acquired_at.to_rfc3339(),
            }
            .into());
        }
    }

    eprintln!("Dry run: resources are recorded in local state, nothing is created in AWS.");
    if !auto_approve && !confirm("Do you want to record this cluster?")? {
        eprintln!("Apply cancelled.");
        return Ok(());
    }

    let lock = provisioner.store().acquire_lock(&config.cluster_name).await?;
    let applied = match PlanExecutor::new(&provisioner).apply(&config).await {
        Ok(outcome) => provisioner
            .mark_applied(&outcome.plan.config_hash)
            .await
            .map(|()| outcome),
        Err(e) => Err(e),
    };
    if let Err(e) = provisioner.store().release_lock(&lock).await {
        warn!("Failed to release state lock {}: {e}", lock.lock_id);
    }
    let outcome = applied?;

    eprintln!("{}", formatter.format_apply(&outcome));
    match &outcome.kubeconfig {
        Some(kubeconfig) => emit(&formatter.format_kubeconfig(kubeconfig)?),
        None => Ok(()),
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the stack file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path.clone()),
        None => find_config_file(std::env::current_dir()?),
    }
}

/// Directory holding the stack file.
fn config_dir(config_file: &Path) -> &Path {
    config_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Loads `.env`, the stack file and environment overrides into a typed configuration.
fn load_cluster_config(config_path: Option<&PathBuf>) -> Result<(ClusterConfig, PathBuf)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    load_dotenv(config_dir(&config_file))?;

    let source = StackConfig::load_file(&config_file)?.with_env_overrides();
    let config = ClusterConfig::from_source(&source)?;

    Ok((config, config_file))
}

/// Prints diagnostics to stderr and fails if there are errors.
fn report_diagnostics(config: &ClusterConfig, formatter: &OutputFormatter) -> Result<()> {
    let result = ConfigValidator::new().validate(config);
    eprintln!("{}", formatter.format_diagnostics(&result).trim_end());

    let recommendations = result.into_result()?;
    debug!("Proceeding with {} recommendations", recommendations.len());
    Ok(())
}

/// Asks a y/N question on stderr.
fn confirm(question: &str) -> Result<bool> {
    eprint!("{question} [y/N]: ");
    std::io::stderr().flush()?;

    let mut input = String::new();
    if std::io::stdin().read_line(&mut input)? == 0 {
        return Err(DeployError::internal(
            "stdin closed before confirmation, pass --yes to apply non-interactively",
        ));
    }

    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Writes command output to stdout.
fn emit(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}
