//! CLI command definitions and dispatch.

pub mod config;
pub mod password;
pub mod roles;
pub mod token;

use clap::{Parser, Subcommand};

use warden_core::config::AppConfig;
use warden_core::error::AppError;

use crate::output::OutputFormat;

/// Warden — token lifecycle and access-control engine
#[derive(Debug, Parser)]
#[command(name = "warden", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Configuration management
    Config(config::ConfigArgs),
    /// Password hashing and policy checks
    Password(password::PasswordArgs),
    /// Token inspection
    Token(token::TokenArgs),
    /// Role and capability table
    Roles(roles::RolesArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, app_config: AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Config(args) => config::execute(args, &self.config, app_config, self.format),
            Commands::Password(args) => password::execute(args, &app_config, self.format).await,
            Commands::Token(args) => token::execute(args, &app_config, self.format),
            Commands::Roles(args) => roles::execute(args, self.format),
        }
    }
}

/// Helper: read a secret from the argument or prompt for it without echo.
pub fn secret_or_prompt(
    value: Option<&String>,
    prompt: &str,
    confirm: bool,
) -> Result<String, AppError> {
    if let Some(value) = value {
        return Ok(value.clone());
    }

    let mut input = dialoguer::Password::new().with_prompt(prompt);
    if confirm {
        input = input.with_confirmation("Confirm", "Values do not match");
    }
    input
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}
