//! Token inspection CLI commands.

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;

use warden_auth::jwt::{JwtDecoder, TokenClaims};
use warden_core::config::AppConfig;
use warden_core::error::AppError;
use warden_core::traits::{Clock, SystemClock};

use crate::output::{self, OutputFormat};

/// Arguments for token commands
#[derive(Debug, Args)]
pub struct TokenArgs {
    /// Token subcommand
    #[command(subcommand)]
    pub command: TokenCommand,
}

/// Token subcommands
#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Verify a token's signature and issuer and print its claims
    Inspect {
        /// Encoded token (will prompt if not provided)
        token: Option<String>,
    },
}

/// Claims plus their standing at the time of inspection.
#[derive(Debug, Serialize)]
struct Inspection {
    #[serde(flatten)]
    claims: TokenClaims,
    expired: bool,
}

/// Execute token commands
pub fn execute(
    args: &TokenArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        TokenCommand::Inspect { token } => {
            let token = super::secret_or_prompt(token.as_ref(), "Token", false)?;
            let clock: Arc<dyn Clock> = Arc::new(SystemClock);
            let decoder = JwtDecoder::new(&config.auth, Arc::clone(&clock))?;

            let claims = decoder.inspect(token.trim())?;
            let expired = claims.is_expired_at(clock.now());
            output::print_item(&Inspection { claims, expired }, format);
            if expired {
                output::print_warning("Token has expired");
            }
        }
    }

    Ok(())
}
