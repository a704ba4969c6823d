//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use warden_core::config::{AppConfig, StoreBackend};
use warden_core::error::AppError;

use crate::output::{self, OutputFormat};

const REDACTED: &str = "****";

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration with secrets redacted
    Show,
    /// Validate the effective configuration
    Validate,
}

/// Execute config commands
pub fn execute(
    args: &ConfigArgs,
    config_path: &str,
    config: AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            output::print_item(&redacted(&config)?, format);
        }
        ConfigCommand::Validate => match config.validate() {
            Ok(()) => {
                output::print_success(&format!("Configuration '{config_path}' is valid"));
                output::print_kv("Issuer", &config.auth.jwt_issuer);
                output::print_kv("Store", &config.store.backend.to_string());
                if config.store.backend == StoreBackend::Redis {
                    output::print_kv("Redis", &mask_password(&config.store.redis.url));
                }
                output::print_kv(
                    "Access / refresh TTL",
                    &format!(
                        "{}m / {}h",
                        config.auth.access_token_ttl_minutes, config.auth.refresh_token_ttl_hours
                    ),
                );
            }
            Err(e) => {
                output::print_error(&format!("Configuration invalid: {e}"));
                return Err(e);
            }
        },
    }

    Ok(())
}

/// The configuration as JSON with the signing secret and Redis password masked.
fn redacted(config: &AppConfig) -> Result<serde_json::Value, AppError> {
    let mut value = serde_json::to_value(config)?;
    if let Some(secret) = value.pointer_mut("/auth/jwt_secret") {
        *secret = serde_json::Value::String(REDACTED.to_string());
    }
    if let Some(url) = value.pointer_mut("/store/redis/url") {
        *url = serde_json::Value::String(mask_password(&config.store.redis.url));
    }
    Ok(value)
}

/// Mask password in a connection URL for display
fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
            if colon_pos >= scheme_end {
                let mut masked = url[..colon_pos + 1].to_string();
                masked.push_str(REDACTED);
                masked.push_str(&url[at_pos..]);
                return masked;
            }
        }
    }
    url.to_string()
}
