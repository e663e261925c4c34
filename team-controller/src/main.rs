use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use team_controller::admin;
use team_controller::connectors::github::config::ProviderConfigResolver;
use team_controller::manager::ControllerManager;
use team_controller::registry::github_registry;
use team_provider::config::load_config;
use team_provider::credentials::{
    CredentialStore, MemoryUsageTracker, SqliteUsageTracker, UsageTracker,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "team-controller")]
#[command(about = "Reconciles GitHub organization teams", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller until ctrl-c (default)
    Run,

    /// Store a token for a provider config, read from the first line of stdin
    StoreToken {
        /// Provider config name
        provider_config: String,

        /// Token lifetime; omit for tokens that do not expire
        #[arg(long)]
        expires_in_seconds: Option<i64>,
    },

    /// Delete the stored token of a provider config
    DeleteToken {
        /// Provider config name
        provider_config: String,

        /// Delete even if resources still use the provider config
        #[arg(long)]
        force: bool,
    },

    /// List provider configs with a stored token
    ListTokens,

    /// List resources recorded as using a provider config
    Usages {
        /// Provider config name
        provider_config: String,
    },
}

/// Credential store and persistent usage tracker sharing one database.
struct Stores {
    credentials: Arc<CredentialStore>,
    usage: Arc<SqliteUsageTracker>,
}

/// Opens the stores when `TEAM_CONTROLLER_ENCRYPTION_KEY` is set.
fn open_stores() -> Result<Option<Stores>> {
    let Ok(encryption_key) = std::env::var("TEAM_CONTROLLER_ENCRYPTION_KEY") else {
        return Ok(None);
    };
    let credentials_db = std::env::var("TEAM_CONTROLLER_CREDENTIALS_DB")
        .unwrap_or_else(|_| "credentials.db".to_string());

    let credentials = CredentialStore::new(&credentials_db, &encryption_key)
        .context("Failed to initialize credential store")?;
    let usage = SqliteUsageTracker::new(&credentials_db)
        .context("Failed to initialize usage tracker")?;
    info!(credentials_db = %credentials_db, "Credential store initialized");

    Ok(Some(Stores {
        credentials: Arc::new(credentials),
        usage: Arc::new(usage),
    }))
}

fn require_stores() -> Result<Stores> {
    open_stores()?.context("TEAM_CONTROLLER_ENCRYPTION_KEY is required (base64-encoded 32-byte key)")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "team_controller=info,team_provider=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run().await,
        Commands::StoreToken {
            provider_config,
            expires_in_seconds,
        } => {
            let stores = require_stores()?;
            let token = admin::read_token(std::io::stdin().lock())?;
            admin::store_token(&stores.credentials, &provider_config, token, expires_in_seconds)
        }
        Commands::DeleteToken {
            provider_config,
            force,
        } => {
            let stores = require_stores()?;
            if !admin::delete_token(&stores.credentials, stores.usage.as_ref(), &provider_config, force)? {
                println!("No token stored for provider config '{}'", provider_config);
            }
            Ok(())
        }
        Commands::ListTokens => {
            let stores = require_stores()?;
            for (provider_config, provider) in stores.credentials.list_all()? {
                println!("{}\t{}", provider_config, provider);
            }
            Ok(())
        }
        Commands::Usages { provider_config } => {
            let stores = require_stores()?;
            for (kind, name) in stores.usage.users_of(&provider_config)? {
                println!("{}/{}", kind, name);
            }
            Ok(())
        }
    }
}

async fn run() -> Result<()> {
    info!("Team controller starting...");

    // Read configuration from environment
    let config_path = std::env::var("TEAM_CONTROLLER_CONFIG")
        .unwrap_or_else(|_| "team-controller.toml".to_string());

    let mut config = load_config(&config_path)?;
    config.reconcile.apply_env();

    info!(
        config_path = %config_path,
        provider_configs = config.provider_configs.len(),
        resources = config.resources.len(),
        poll_interval_secs = config.reconcile.poll_interval_seconds,
        "Configuration loaded"
    );

    let (credential_store, usage): (Option<Arc<CredentialStore>>, Arc<dyn UsageTracker>) =
        match open_stores()? {
            Some(stores) => (Some(stores.credentials), stores.usage as Arc<dyn UsageTracker>),
            None => {
                info!("TEAM_CONTROLLER_ENCRYPTION_KEY not set, credential store disabled");
                (None, Arc::new(MemoryUsageTracker::new()))
            }
        };

    let resolver = Arc::new(ProviderConfigResolver::new(
        config.provider_configs.clone(),
        credential_store,
    ));
    let registry = github_registry(resolver, usage);

    let mut manager = ControllerManager::new(registry, config.reconcile.clone());
    let started = manager.start(config.resources).await;
    info!(schedulers_started = started, "Controller manager started");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    manager.shutdown().await;
    info!("Team controller stopped");

    Ok(())
}
