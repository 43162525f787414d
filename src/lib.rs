pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod services;
pub mod state;
pub mod web;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, MachineCommands, UserCommands};
pub use config::Config;
use state::SharedState;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with(cli).await
}

async fn run_with(cli: Cli) -> anyhow::Result<()> {
    if let Some(Commands::Init) = cli.command {
        if Config::create_default_if_missing()? {
            println!("✓ Created config.toml with default settings");
        } else {
            println!("config.toml already exists");
        }
        return Ok(());
    }

    let config = Config::load()?;
    config.validate()?;

    let serving = matches!(cli.command, None | Some(Commands::Serve));

    let prometheus_handle = if serving && config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    init_tracing(&config, serving)?;

    if prometheus_handle.is_some() {
        info!("Prometheus metrics recorder initialized");
    }

    let shared = SharedState::new(config).await?;

    match cli.command {
        None | Some(Commands::Serve) => run_server(shared, prometheus_handle).await,

        Some(Commands::Init) => Ok(()),

        Some(Commands::User { command }) => match command {
            UserCommands::Create {
                name,
                email,
                password,
                role,
            } => cli::cmd_user_create(&shared, &name, &email, &password, &role).await,
            UserCommands::Promote { email, role } => {
                cli::cmd_user_promote(&shared, &email, &role).await
            }
            UserCommands::List => cli::cmd_user_list(&shared).await,
        },

        Some(Commands::Machine { command }) => match command {
            MachineCommands::Add { ip } => cli::cmd_machine_add(&shared, &ip).await,
            MachineCommands::Remove { ip } => cli::cmd_machine_remove(&shared, &ip).await,
            MachineCommands::List => cli::cmd_machine_list(&shared).await,
        },

        Some(Commands::Logs { date }) => cli::cmd_logs(&shared, date.as_deref()).await,
    }
}

/// Console commands only log warnings so their output stays readable.
fn init_tracing(config: &Config, serving: bool) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = if serving {
        config.general.log_level.clone()
    } else {
        "warn".to_string()
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if serving && config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let (layer, task) = tracing_loki::builder()
            .label("app", "labtrack")?
            .extra_field("env", "production")?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}

async fn run_server(
    shared: SharedState,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("labtrack v{} starting...", env!("CARGO_PKG_VERSION"));

    let addr = format!(
        "{}:{}",
        shared.config().server.bind_address,
        shared.config().server.port
    );

    match shared.store.prune_expired_sessions(chrono::Utc::now()).await {
        Ok(0) => {}
        Ok(pruned) => info!(pruned, "Removed expired sessions"),
        Err(e) => error!("Failed to prune sessions: {e:#}"),
    }

    let app_state = web::create_app_state(Arc::new(shared), prometheus_handle);
    let app = web::router(app_state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Web server running at http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Web server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}
