//! CLI command handlers

use anyhow::{Context, Result};
use sendtext_core::models::{Configuration, RequestInputs};
use sendtext_core::services::logging::init_logging;
use sendtext_core::storage::{resolve_database, DatabaseEnv};
use sendtext_core::{ChannelKind, Dispatcher};
use std::path::{Path, PathBuf};

/// Expand `~/` and fall back to the XDG default when no path is given
fn resolve_config_path(config_file: Option<String>) -> Result<PathBuf> {
    match config_file {
        Some(path) if path.starts_with("~/") => {
            let home = dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
            Ok(home.join(&path[2..]))
        }
        Some(path) => Ok(PathBuf::from(path)),
        None => Configuration::default_config_path()
            .map_err(|e| anyhow::anyhow!("Failed to get default config path: {}", e)),
    }
}

/// Load the file (defaults when absent), apply environment overrides and validate
fn load_config(path: &Path) -> Result<Configuration> {
    let mut config = if path.exists() {
        Configuration::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?
    } else {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        Configuration::default()
    };
    config.apply_env_overrides();

    if let Err(errors) = config.validate() {
        return Err(anyhow::anyhow!(
            "Configuration validation failed:\n   - {}",
            errors.join("\n   - ")
        ));
    }
    Ok(config)
}

fn load_and_init(config_file: Option<String>) -> Result<Configuration> {
    let path = resolve_config_path(config_file)?;
    let config = load_config(&path)?;
    init_logging(config.log_level)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
    Ok(config)
}

/// Handle the 'serve' command
pub async fn handle_serve(
    host: Option<String>,
    port: Option<u16>,
    config_file: Option<String>,
) -> Result<()> {
    let mut config = load_and_init(config_file)?;
    if let Some(host) = host {
        config.server_host = host;
    }
    if let Some(port) = port {
        config.server_port = port;
    }

    let server = sendtext_core::server::SendTextServer::from_config(config)?;
    tracing::info!(database = %server.database().target.engine_name(), "Database resolved");
    server.start().await
}

/// Handle the 'send' command. Returns whether the text was delivered.
pub async fn handle_send(
    opt: String,
    text: Option<String>,
    target: Option<String>,
    receivers: Option<String>,
    config_file: Option<String>,
) -> Result<bool> {
    let kind: ChannelKind = opt.parse().map_err(|e| anyhow::anyhow!("{}", e))?;
    let config = load_and_init(config_file)?;
    let dispatcher = Dispatcher::from_config(config).context("Failed to create HTTP client")?;

    let mut inputs = RequestInputs::default();
    if let Some(text) = text {
        inputs = inputs.with_text(text);
    }
    if let Some(target) = target {
        inputs = inputs.with_subject_channel(target);
    }
    if let Some(receivers) = receivers {
        inputs = inputs.with_query("receivers", receivers);
    }

    let result = dispatcher.dispatch(kind, &inputs).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.is_ok())
}

/// Handle the 'alert' command
pub async fn handle_alert(text: String, config_file: Option<String>) -> Result<()> {
    let config = load_and_init(config_file)?;
    let dispatcher = Dispatcher::from_config(config).context("Failed to create HTTP client")?;

    let results = dispatcher.alert(&text).await;
    if results.is_empty() {
        println!("No channel has enable_alert set; nothing sent");
        return Ok(());
    }
    for (kind, result) in results {
        let entry = serde_json::json!({ "channel": kind, "result": result });
        println!("{}", serde_json::to_string_pretty(&entry)?);
    }
    Ok(())
}

/// Handle the 'config --init' command
pub fn handle_config_init(config_file: Option<String>) -> Result<()> {
    let config_path = resolve_config_path(config_file)?;
    println!("Config file: {}", config_path.display());

    let config = if config_path.exists() {
        println!("Configuration file already exists, keeping its values");
        Configuration::load_from_file(&config_path)
            .map_err(|e| anyhow::anyhow!("Failed to load existing config: {}", e))?
    } else {
        Configuration::default()
    };

    if let Err(errors) = config.validate() {
        println!("Configuration validation failed:");
        for error in &errors {
            println!("   - {}", error);
        }
        return Err(anyhow::anyhow!("Configuration validation failed"));
    }

    config
        .save_to_file(&config_path)
        .map_err(|e| anyhow::anyhow!("Failed to save configuration: {}", e))?;

    println!("Configuration saved");
    println!("   Server: {}:{}", config.server_host, config.server_port);
    println!("   Data path: {}", config.data_path.display());
    println!(
        "   Tokens may also be supplied through {}, {} and {}",
        sendtext_core::models::ENV_SLACK_TOKEN,
        sendtext_core::models::ENV_TELEGRAM_TOKEN,
        sendtext_core::models::ENV_EMAIL_PASSWORD
    );
    Ok(())
}

/// Handle the 'db' command
pub fn handle_db(config_file: Option<String>) -> Result<()> {
    let path = resolve_config_path(config_file)?;
    let config = load_config(&path)?;
    let layout = resolve_database(&config.data_path, &DatabaseEnv::from_env())
        .context("Failed to resolve database target")?;
    print!("{}", layout);
    Ok(())
}
