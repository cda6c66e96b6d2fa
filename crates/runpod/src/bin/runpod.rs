//! RunPod CLI - manage GPU pods from the command line.
//!
//! Pod state is kept in a JSON state file between invocations.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

use runpod::config::DEFAULT_TIMEOUT_SECS;
use runpod::{
    CredentialPlacement, Diagnostics, GpuCatalog, PlannedChange, PodApi, PodConfig, PodController,
    PodState, PodStatus, ProviderConfig, ReadOutcome, RunpodClient,
};

/// RunPod CLI - Provision and manage GPU pods.
#[derive(Parser)]
#[command(name = "runpod")]
#[command(about = "Provision and manage RunPod GPU pods")]
struct Cli {
    /// RunPod API key (or set `RUNPOD_API_KEY` env var).
    #[arg(long, env = "RUNPOD_API_KEY", default_value = "", hide_env_values = true)]
    api_key: String,

    /// GraphQL endpoint (or set `RUNPOD_API_URL` env var).
    #[arg(long, env = "RUNPOD_API_URL")]
    endpoint: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Send the API key as a bearer token instead of a query parameter.
    #[arg(long, default_value = "false")]
    bearer: bool,

    /// Pod state file.
    #[arg(long, default_value = "runpod-state.json")]
    state: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List GPU types.
    GpuTypes {
        /// Only show the GPU type with exactly this ID.
        #[arg(long)]
        id: Option<String>,
    },

    /// Create a pod from a JSON config file.
    Create {
        /// Pod config (JSON).
        #[arg(long)]
        config: PathBuf,
    },

    /// Refresh the tracked pod from the API.
    Read,

    /// Show what applying a config would change.
    Plan {
        /// Pod config (JSON).
        #[arg(long)]
        config: PathBuf,
    },

    /// Apply a changed config to the tracked pod.
    Update {
        /// Pod config (JSON).
        #[arg(long)]
        config: PathBuf,

        /// Terminate and recreate the pod if a write-once attribute changed.
        #[arg(long, default_value = "false")]
        replace: bool,
    },

    /// Terminate the tracked pod.
    Delete {
        /// Skip confirmation prompt.
        #[arg(long, short = 'y', default_value = "false")]
        yes: bool,
    },

    /// Start tracking an existing pod.
    Import {
        /// Pod ID.
        #[arg(long)]
        id: String,
    },

    /// Stop the tracked pod, keeping its volume.
    Stop,

    /// Resume the tracked pod.
    Resume {
        /// GPU count to resume with. Defaults to the tracked count.
        #[arg(long)]
        gpu_count: Option<u32>,
    },
}

/// Contents of the state file.
#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    /// Config the pod was last applied from. Absent for imported pods.
    config: Option<PodConfig>,
    /// Tracked pod state.
    state: PodState,
    /// Timestamp of last update.
    updated_at: String,
}

impl StateFile {
    fn new(config: Option<PodConfig>, state: PodState) -> Self {
        Self {
            config,
            state,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).context("Failed to read state file")?;
        let file: Self = serde_json::from_str(&content).context("Failed to parse state file")?;
        Ok(Some(file))
    }

    fn require(path: &Path) -> Result<Self> {
        match Self::load(path)? {
            Some(file) => Ok(file),
            None => bail!("No pod is tracked in {}", path.display()),
        }
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        self.updated_at = chrono::Utc::now().to_rfc3339();
        let content = serde_json::to_string_pretty(self).context("Failed to serialize state")?;
        std::fs::write(path, content).context("Failed to write state file")?;
        Ok(())
    }

    fn remove(path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove state file")?;
        }
        Ok(())
    }

    fn pod_id(&self) -> Result<&str> {
        self.state
            .id
            .as_deref()
            .context("State file has no pod ID")
    }
}

fn load_config(path: &Path) -> Result<PodConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pod config {}", path.display()))?;
    serde_json::from_str(&content).context("Failed to parse pod config")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let provider = ProviderConfig {
        api_key: Some(cli.api_key.trim().to_string()).filter(|k| !k.is_empty()),
        endpoint: cli.endpoint.clone(),
        timeout_secs: cli.timeout,
        credential_placement: if cli.bearer {
            CredentialPlacement::BearerHeader
        } else {
            CredentialPlacement::QueryParam
        },
        ..ProviderConfig::default()
    };
    let client = RunpodClient::new(&provider).context("Failed to create RunPod client")?;
    let controller = PodController::new(client);

    match cli.command {
        Commands::GpuTypes { id } => {
            let gpus = GpuCatalog::new(controller.api())
                .lookup(id.as_deref())
                .await
                .context("Failed to look up GPU types")?;

            println!("\n🎮 GPU Types");
            println!("{}", "=".repeat(80));
            println!("\n{:<32} {:<28} {:>8} {:>7} {:>9}", "ID", "NAME", "MEMORY", "SECURE", "COMMUNITY");
            for gpu in gpus {
                println!(
                    "{:<32} {:<28} {:>5} GB {:>7} {:>9}",
                    gpu.id,
                    gpu.display_name.unwrap_or_default(),
                    gpu.memory_in_gb.unwrap_or_default(),
                    if gpu.secure_cloud { "✓" } else { "-" },
                    if gpu.community_cloud { "✓" } else { "-" },
                );
            }
            println!();
        }

        Commands::Create { config } => {
            if StateFile::load(&cli.state)?.is_some() {
                bail!(
                    "A pod is already tracked in {}; delete it or use another --state file",
                    cli.state.display()
                );
            }

            let config = load_config(&config)?;
            info!(name = %config.name, image = %config.image_name, "Creating pod");
            let created = controller.create(&config).await?;

            let mut file = StateFile::new(Some(config), created.state);
            file.save(&cli.state)?;

            println!("\n✅ Pod created successfully!");
            print_warnings(&created.warnings);
            print_state(&file.state);
        }

        Commands::Read => {
            let mut file = StateFile::require(&cli.state)?;
            match controller.read(&file.state).await? {
                ReadOutcome::Synced(state) => {
                    file.state = state;
                    file.save(&cli.state)?;
                    print_state(&file.state);
                }
                ReadOutcome::Absent => {
                    StateFile::remove(&cli.state)?;
                    println!("\n⚠️  Pod no longer exists; state file removed");
                }
            }
        }

        Commands::Plan { config } => {
            let config = load_config(&config)?;
            let file = StateFile::load(&cli.state)?;
            let change = controller.plan(Some(&config), file.as_ref().map(|f| &f.state))?;
            print_plan(&change);
        }

        Commands::Update { config, replace } => {
            let config = load_config(&config)?;
            let mut file = StateFile::require(&cli.state)?;

            match controller.plan(Some(&config), Some(&file.state))? {
                PlannedChange::NoChange => {
                    println!("\n✅ No changes");
                    return Ok(());
                }
                PlannedChange::Replace(fields) if !replace => {
                    bail!(
                        "Changed attributes require a new pod: {}. Re-run with --replace",
                        fields.join(", ")
                    );
                }
                PlannedChange::Replace(fields) => {
                    info!(fields = %fields.join(", "), "Replacing pod");
                    controller.delete(&file.state).await?;
                    StateFile::remove(&cli.state)?;
                    let created = controller.create(&config).await?;
                    print_warnings(&created.warnings);
                    file = StateFile::new(Some(config.clone()), created.state);
                }
                PlannedChange::Create | PlannedChange::InPlace(_) | PlannedChange::Delete => {
                    file.state = controller.update(&config, &file.state).await?;
                    file.config = Some(config);
                }
            }

            file.save(&cli.state)?;
            println!("\n✅ Pod updated");
            print_state(&file.state);
        }

        Commands::Delete { yes } => {
            let file = StateFile::require(&cli.state)?;
            let id = file.pod_id()?;
            if !yes {
                println!("⚠️  Are you sure you want to terminate pod {id}?");
                println!("   Its container and volume will be lost.");
                println!("   Use --yes to skip this prompt.");
                return Ok(());
            }

            controller.delete(&file.state).await?;
            StateFile::remove(&cli.state)?;
            println!("\n✅ Pod {id} terminated");
        }

        Commands::Import { id } => {
            if StateFile::load(&cli.state)?.is_some() {
                bail!("A pod is already tracked in {}", cli.state.display());
            }

            let state = controller.import(&id).await?;
            let mut file = StateFile::new(None, state);
            file.save(&cli.state)?;

            println!("\n✅ Pod {id} imported");
            print_state(&file.state);
        }

        Commands::Stop => {
            let mut file = StateFile::require(&cli.state)?;
            let id = file.pod_id()?.to_string();
            controller.api().stop_pod(&id).await.context("Failed to stop pod")?;
            refresh(&controller, &mut file, PodStatus::Exited).await?;
            file.save(&cli.state)?;
            println!("\n🔴 Pod {id} stopped");
        }

        Commands::Resume { gpu_count } => {
            let mut file = StateFile::require(&cli.state)?;
            let id = file.pod_id()?.to_string();
            let gpu_count = gpu_count.or(file.state.gpu_count).unwrap_or(1);
            controller
                .api()
                .resume_pod(&id, gpu_count)
                .await
                .context("Failed to resume pod")?;
            refresh(&controller, &mut file, PodStatus::Running).await?;
            file.save(&cli.state)?;
            println!("\n🟢 Pod {id} resumed");
        }
    }

    Ok(())
}

/// Re-read the pod after a status change and record the new status.
async fn refresh<A: PodApi>(controller: &PodController<A>, file: &mut StateFile, status: PodStatus) -> Result<()> {
    if let ReadOutcome::Synced(state) = controller.read(&file.state).await? {
        file.state = state;
    }
    file.state.desired_status = Some(status);
    if let Some(config) = file.config.as_mut() {
        config.desired_status = status;
    }
    Ok(())
}

fn print_state(state: &PodState) {
    let status_emoji = match state.desired_status {
        Some(PodStatus::Running) => "🟢",
        Some(PodStatus::Exited) => "🔴",
        _ => "⚪",
    };

    println!("\n{} Pod: {}", status_emoji, state.name.as_deref().unwrap_or("(unnamed)"));
    println!("   ID:       {}", state.id.as_deref().unwrap_or("-"));
    if let Some(status) = state.desired_status {
        println!("   Status:   {status}");
    }
    println!("   Image:    {}", state.image_name.as_deref().unwrap_or("-"));
    println!(
        "   GPU:      {} x{}",
        state.gpu_type_id.as_deref().unwrap_or("-"),
        state.gpu_count.unwrap_or_default()
    );
    if let Some(machine) = &state.machine_id {
        println!("   Machine:  {machine}");
    }
    if let Some(uptime) = state.uptime_in_seconds {
        println!("   Uptime:   {uptime}s");
    }
    for port in state.port_mappings.iter().flatten() {
        println!(
            "   📡 {}:{} -> {} ({})",
            port.ip.as_deref().unwrap_or("-"),
            port.public_port.unwrap_or_default(),
            port.private_port.unwrap_or_default(),
            port.port_type.as_deref().unwrap_or("-"),
        );
    }
    println!();
}

fn print_warnings(warnings: &Diagnostics) {
    for warning in &warnings.0 {
        println!("⚠️  {}: {}", warning.summary, warning.detail);
    }
}

fn print_plan(change: &PlannedChange) {
    match change {
        PlannedChange::Create => println!("\n➕ Pod will be created"),
        PlannedChange::NoChange => println!("\n✅ No changes"),
        PlannedChange::InPlace(fields) => {
            println!("\n✏️  Pod will be updated in place: {}", fields.join(", "));
        }
        PlannedChange::Replace(fields) => {
            println!("\n♻️  Pod must be replaced: {}", fields.join(", "));
        }
        PlannedChange::Delete => println!("\n🗑️  Pod will be terminated"),
    }
}
