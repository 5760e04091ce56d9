// Copyright 2025 proxy-rs Contributors
// Licensed under the Apache License, Version 2.0

//! Proxy entry point: configuration, logging, schema load, server start.

use clap::Parser;
use proxy_backend::CsvExecutorFactory;
use proxy_catalog::LogicSchema;
use proxy_common::ProxyConfig;
use proxy_frontend::{ProxyAuthenticator, ProxyServer};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "conf/proxy.toml")]
    config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// MySQL protocol listen port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// CSV data directory (overrides the config file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Logic schema name (overrides the config file)
    #[arg(short, long)]
    schema: Option<String>,

    /// Accepted username (overrides the config file)
    #[arg(short, long)]
    username: Option<String>,

    /// Accepted password (overrides the config file)
    #[arg(long)]
    password: Option<String>,
}

impl Args {
    fn apply_to(&self, config: &mut proxy_common::ProxyConfig) {
        if let Some(port) = self.port {
            config.query_port = port;
        }
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(schema) = &self.schema {
            config.schema_name = schema.clone();
        }
        if let Some(username) = &self.username {
            config.username = username.clone();
        }
        if let Some(password) = &self.password {
            config.password = password.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let mut config = load_config(&args.config)?;
    args.apply_to(&mut config);
    config.validate()?;
    info!("Query Port: {}", config.query_port);
    info!("Data Directory: {:?}", config.data_dir);
    info!("Logic Schema: {}", config.schema_name);

    let schema = Arc::new(LogicSchema::load(&config.data_dir, &config.schema_name)?);
    info!(
        tables = schema.table_names().count(),
        "logic schema loaded"
    );

    let authenticator = Arc::new(ProxyAuthenticator::new(
        config.username.clone(),
        config.password.clone(),
        config.schema_name.clone(),
    ));
    let factory = Arc::new(CsvExecutorFactory::new(schema));
    let server = ProxyServer::new(
        authenticator,
        factory,
        format!("0.0.0.0:{}", config.query_port),
    );

    tokio::spawn(async move {
        if let Err(e) = server.start().await {
            tracing::error!("proxy server error: {e}");
        }
    });

    info!("proxy is ready to serve");
    wait_for_shutdown().await;
    info!("proxy shut down");

    Ok(())
}

fn init_logging(log_level: &str) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

fn load_config(config_path: &PathBuf) -> anyhow::Result<ProxyConfig> {
    if config_path.exists() {
        let config = ProxyConfig::from_file(config_path)?;
        info!("configuration loaded from {:?}", config_path);
        Ok(config)
    } else {
        tracing::warn!("config file not found: {:?}, using defaults", config_path);
        Ok(ProxyConfig::default())
    }
}

/// Wait for SIGINT or SIGTERM.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C");
        }
        _ = terminate => {
            info!("received SIGTERM");
        }
    }
}
