//! Password hashing and policy CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use warden_auth::password::{PasswordHasher, PasswordValidator};
use warden_core::config::AppConfig;
use warden_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for password commands
#[derive(Debug, Args)]
pub struct PasswordArgs {
    /// Password subcommand
    #[command(subcommand)]
    pub command: PasswordCommand,
}

/// Password subcommands
#[derive(Debug, Subcommand)]
pub enum PasswordCommand {
    /// Hash a password with the configured Argon2id cost
    Hash {
        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Check a password against the configured strength policy
    Check {
        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
        /// Email the password must not be derived from
        #[arg(long)]
        email: Option<String>,
        /// Username the password must not be derived from
        #[arg(long)]
        username: Option<String>,
    },
}

/// Failed policy rule row for table output
#[derive(Debug, Serialize, Tabled)]
struct RuleRow {
    /// Rule
    rule: String,
}

/// Execute password commands
pub async fn execute(
    args: &PasswordArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        PasswordCommand::Hash { password } => {
            let password = super::secret_or_prompt(password.as_ref(), "Password", true)?;
            let hasher = PasswordHasher::new(&config.password.hash)?;
            let hash = hasher.hash(&password).await?;
            println!("{hash}");
        }
        PasswordCommand::Check {
            password,
            email,
            username,
        } => {
            let password = super::secret_or_prompt(password.as_ref(), "Password", false)?;
            let validator = PasswordValidator::new(&config.password);
            let user_inputs: Vec<&str> = [email.as_deref(), username.as_deref()]
                .into_iter()
                .flatten()
                .collect();

            let failed = validator.check(&password, &user_inputs);
            if failed.is_empty() {
                output::print_success("Password satisfies the policy");
            } else {
                output::print_warning("Password does not satisfy the policy");
                let rows: Vec<RuleRow> = failed
                    .iter()
                    .map(|rule| RuleRow {
                        rule: rule.to_string(),
                    })
                    .collect();
                output::print_list(&rows, format);
                return Err(AppError::weak_password(failed));
            }
        }
    }

    Ok(())
}
