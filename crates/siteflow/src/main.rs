mod commands;
mod workspace;

use clap::{Args, Parser, Subcommand};
use siteflow_cloud::RetryConfig;
use siteflow_tableau::{ContentPermissions, TableauConfig, config};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "siteflow")]
#[command(about = "Declarative management of Tableau projects", long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Directory holding .siteflow/state.json
    #[arg(long, global = true, env = "SITEFLOW_DIR", default_value = ".")]
    dir: PathBuf,

    /// Log more (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Site-scoped API URL, e.g. https://host/api/3.19/sites/<site-id>
    #[arg(long, global = true, env = config::ENV_API_URL)]
    api_url: Option<String>,

    /// Session token sent as X-Tableau-Auth
    #[arg(long, global = true, env = config::ENV_AUTH_TOKEN, hide_env_values = true)]
    token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = config::ENV_TIMEOUT_SECS)]
    timeout: Option<u64>,

    /// Reads to wait for a created project to be listed (0 disables)
    #[arg(long, global = true, env = config::ENV_SETTLE_ATTEMPTS)]
    settle_attempts: Option<u32>,
}

impl ConnectionArgs {
    fn to_config(&self) -> anyhow::Result<TableauConfig> {
        let api_url = self.api_url.clone().ok_or_else(|| {
            anyhow::anyhow!("--api-url or {} is required", config::ENV_API_URL)
        })?;
        let token = self.token.clone().ok_or_else(|| {
            anyhow::anyhow!("--token or {} is required", config::ENV_AUTH_TOKEN)
        })?;

        let mut config = TableauConfig::new(api_url, token)?;
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(attempts) = self.settle_attempts {
            config = config.with_settle(RetryConfig {
                max_attempts: attempts,
                ..RetryConfig::default()
            });
        }
        Ok(config)
    }
}

/// Fields of a project as given on the command line
#[derive(Args)]
pub struct ProjectArgs {
    /// Display name
    #[arg(long)]
    pub name: Option<String>,

    /// Parent project ID (empty for top level)
    #[arg(long)]
    pub parent: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// LockedToProject, ManagedByOwner or LockedToProjectWithoutNested
    #[arg(long, value_parser = parse_permissions)]
    pub content_permissions: Option<ContentPermissions>,

    /// Owner user ID
    #[arg(long)]
    pub owner: Option<String>,
}

fn parse_permissions(value: &str) -> Result<ContentPermissions, String> {
    value.parse().map_err(|e: siteflow_tableau::TableauError| e.to_string())
}

#[derive(Subcommand)]
enum Commands {
    /// List every project on the site
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one project
    Get {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Create a project and track it
    Create {
        #[command(flatten)]
        project: ProjectArgs,
    },
    /// Update a tracked project; omitted fields keep their tracked values
    Update {
        id: String,
        #[command(flatten)]
        project: ProjectArgs,
    },
    /// Delete a project and stop tracking it
    Delete { id: String },
    /// Track an existing project
    Import { id: String },
    /// Re-read every tracked project, dropping those deleted remotely
    Refresh,
    /// Show tracked projects
    State,
    /// Show version
    Version,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Version => {
            println!("siteflow {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::State => {
            commands::state::handle(&workspace::state_manager(&cli.dir)).await?;
        }
        command => {
            let config = cli.connection.to_config()?;
            let workspace = workspace::Workspace::open(&cli.dir, &config)?;
            run(command, &workspace).await?;
        }
    }

    Ok(())
}

async fn run(command: Commands, workspace: &workspace::Workspace) -> anyhow::Result<()> {
    match command {
        Commands::List { json } => commands::list::handle_list(workspace, json).await,
        Commands::Get { id, json } => commands::list::handle_get(workspace, &id, json).await,
        Commands::Create { project } => commands::apply::handle_create(workspace, project).await,
        Commands::Update { id, project } => {
            commands::apply::handle_update(workspace, &id, project).await
        }
        Commands::Delete { id } => commands::apply::handle_delete(workspace, &id).await,
        Commands::Import { id } => commands::apply::handle_import(workspace, &id).await,
        Commands::Refresh => commands::state::handle_refresh(workspace).await,
        Commands::State | Commands::Version => Ok(()),
    }
}
