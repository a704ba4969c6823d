//! Role table CLI command.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use warden_auth::rbac::capabilities_of;
use warden_core::error::AppError;
use warden_entity::Role;

use crate::output::{self, OutputFormat};

/// Arguments for the roles command
#[derive(Debug, Args)]
pub struct RolesArgs {
    /// Only show this role
    #[arg(short, long)]
    pub role: Option<String>,
}

/// Capability display row for table output
#[derive(Debug, Serialize, Tabled)]
struct CapabilityRow {
    /// Role
    role: String,
    /// Capability
    capability: String,
}

/// Execute the roles command
pub fn execute(args: &RolesArgs, format: OutputFormat) -> Result<(), AppError> {
    let roles = match &args.role {
        Some(role) => vec![role.parse::<Role>()?],
        None => Role::ALL.to_vec(),
    };

    let rows: Vec<CapabilityRow> = roles
        .into_iter()
        .flat_map(|role| {
            capabilities_of(role)
                .into_iter()
                .map(move |capability| CapabilityRow {
                    role: role.to_string(),
                    capability: capability.to_string(),
                })
        })
        .collect();

    output::print_list(&rows, format);
    Ok(())
}
