//! CLI command definitions and handlers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nimbus_azure::config::{ENV_ACCESS_TOKEN, ENV_DIRECTORY_TOKEN};
use nimbus_azure::{build_graph, AzureServices, IntegrationConfig};
use nimbus_engine::{RunReport, StepExecution, StepScheduler};
use nimbus_provider::{HttpTransport, StaticTokenProvider, Transport};
use nimbus_store::{export, InMemoryJobState, JobState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Main CLI structure
#[derive(Parser)]
#[command(name = "nimbus")]
#[command(about = "Cloud resource ingestion into a typed entity graph")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the active ingestion steps
    Run {
        /// Integration config file (JSON)
        #[arg(short, long, env = "NIMBUS_CONFIG")]
        config: PathBuf,

        /// Write the job state snapshot here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Comma-separated step allow-list, replacing the configured one
        #[arg(long, value_delimiter = ',')]
        steps: Vec<String>,

        /// Summary format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the step catalog in execution order
    Steps {
        /// Integration config file; the default activation is shown without one
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate a config file and its step graph
    Validate {
        /// Integration config file (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Output format options
#[derive(Clone, Debug, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    JsonPretty,
}

/// Command execution result
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Execute CLI commands
pub struct CommandExecutor {
    transport: Option<Arc<dyn Transport>>,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self { transport: None }
    }

    /// Use this transport instead of the HTTP one built from the environment
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    /// Execute a CLI command
    pub async fn execute(&mut self, command: Commands) -> Result<CommandResult> {
        match command {
            Commands::Run {
                config,
                output,
                steps,
                format,
            } => self.execute_run(config, output, steps, format).await,
            Commands::Steps { config, format } => self.execute_steps(config, format),
            Commands::Validate { config } => self.execute_validate(config),
        }
    }

    async fn execute_run(
        &self,
        config_path: PathBuf,
        output: Option<PathBuf>,
        steps: Vec<String>,
        format: OutputFormat,
    ) -> Result<CommandResult> {
        let mut config = load_config(&config_path)?;
        if !steps.is_empty() {
            config.active_steps = Some(steps);
        }
        config.validate()?;

        let graph = build_graph(&config)?;
        let transport = match &self.transport {
            Some(transport) => transport.clone(),
            None => http_transport(&config)?,
        };

        let scheduler = StepScheduler::new(graph).with_options(config.scheduler_options());
        let services = Arc::new(AzureServices::new(config, transport));
        let state = Arc::new(InMemoryJobState::new());
        let job_state: Arc<dyn JobState> = state.clone();

        let report = scheduler.run(job_state, services).await;

        // Partial data is written even when steps failed
        if let Some(path) = &output {
            let snapshot = state.snapshot().await;
            export::write_snapshot(&snapshot, path).await?;
            info!(path = %path.display(), "Job state snapshot written");
        }

        match format {
            OutputFormat::Text => print!("{}", render_report(&report)),
            OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
            OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&report)?),
        }

        let failed = report.failed_steps();
        let message = if failed.is_empty() {
            format!(
                "Ingested {} entities and {} relationships",
                report.total_entities(),
                report.total_relationships()
            )
        } else {
            format!("{} step(s) failed: {}", failed.len(), failed.join(", "))
        };

        Ok(CommandResult {
            success: report.succeeded(),
            message,
            data: Some(serde_json::to_value(&report)?),
        })
    }

    fn execute_steps(&self, config_path: Option<PathBuf>, format: OutputFormat) -> Result<CommandResult> {
        let config = match &config_path {
            Some(path) => load_config(path)?,
            None => IntegrationConfig::new("default", "", ""),
        };
        let graph = build_graph(&config)?;
        let metadata = graph.metadata();

        let listing: Vec<serde_json::Value> = metadata
            .iter()
            .map(|(step, active)| {
                serde_json::json!({
                    "id": step.id,
                    "name": step.name,
                    "active": active,
                    "depends_on": step.depends_on,
                    "produces_entities": step.produces_entities,
                    "produces_relationships": step.produces_relationships,
                    "required_permissions": step.required_permissions,
                })
            })
            .collect();

        match format {
            OutputFormat::Text => {
                for (step, active) in &metadata {
                    let marker = if *active { "active" } else { "inactive" };
                    println!("{} [{}] {}", step.id, marker, step.name);
                    if !step.depends_on.is_empty() {
                        println!("  depends on: {}", step.depends_on.join(", "));
                    }
                    if !step.required_permissions.is_empty() {
                        println!("  permissions: {}", step.required_permissions.join(", "));
                    }
                }
            }
            OutputFormat::Json => println!("{}", serde_json::to_string(&listing)?),
            OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&listing)?),
        }

        Ok(CommandResult {
            success: true,
            message: format!("{} steps, {} active", metadata.len(), graph.active_count()),
            data: Some(serde_json::json!({ "steps": listing })),
        })
    }

    fn execute_validate(&self, config_path: PathBuf) -> Result<CommandResult> {
        let config = load_config(&config_path)?;

        if let Err(e) = config.validate() {
            println!("Invalid configuration: {}", e);
            return Ok(CommandResult {
                success: false,
                message: e.to_string(),
                data: None,
            });
        }

        match build_graph(&config) {
            Ok(graph) => {
                let order: Vec<String> = graph
                    .execution_order()
                    .iter()
                    .map(|step| step.id().to_string())
                    .collect();
                println!("Configuration is valid: {} active steps", order.len());
                Ok(CommandResult {
                    success: true,
                    message: "Configuration is valid".to_string(),
                    data: Some(serde_json::json!({ "execution_order": order })),
                })
            }
            Err(e) => {
                println!("Invalid step graph: {}", e);
                Ok(CommandResult {
                    success: false,
                    message: e.to_string(),
                    data: None,
                })
            }
        }
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn load_config(path: &Path) -> Result<IntegrationConfig> {
    IntegrationConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn http_transport(config: &IntegrationConfig) -> Result<Arc<dyn Transport>> {
    let token = std::env::var(ENV_ACCESS_TOKEN)
        .with_context(|| format!("{} must be set to run against the provider", ENV_ACCESS_TOKEN))?;
    let mut tokens = StaticTokenProvider::new(&token);
    if let Ok(directory_token) = std::env::var(ENV_DIRECTORY_TOKEN) {
        tokens = tokens.with_directory_token(&directory_token);
    }

    let transport = HttpTransport::new(config.provider_config(), Arc::new(tokens))?;
    Ok(Arc::new(transport))
}

/// Per-step text summary
pub fn render_report(report: &RunReport) -> String {
    let mut output = format!("Run {}\n", report.run_id);
    for execution in &report.executions {
        output.push_str(&render_execution(execution));
    }
    output.push_str(&format!(
        "Total: {} entities, {} relationships, {} sibling failures\n",
        report.total_entities(),
        report.total_relationships(),
        report.sibling_failure_count()
    ));
    output
}

fn render_execution(execution: &StepExecution) -> String {
    let mut line = format!(
        "  {:<10} {:<32} entities={} relationships={}",
        execution.status.to_string(),
        execution.step_id,
        execution.entities_committed,
        execution.relationships_committed
    );
    if let Some(duration) = execution.duration_ms {
        line.push_str(&format!(" {}ms", duration));
    }
    line.push('\n');

    if let Some(error) = &execution.error {
        line.push_str(&format!("    error: {}\n", error));
        if let Some(endpoint) = &execution.endpoint {
            line.push_str(&format!("    endpoint: {}\n", endpoint));
        }
        if execution.partial_data_retained {
            line.push_str("    partial data retained\n");
        }
    }
    if !execution.upstream_failures.is_empty() {
        line.push_str(&format!(
            "    failed dependencies: {}\n",
            execution.upstream_failures.join(", ")
        ));
    }
    for failure in &execution.sibling_failures {
        line.push_str(&format!("    skipped children of {}: {}\n", failure.parent_key, failure.message));
    }
    line
}
