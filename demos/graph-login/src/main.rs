//! Graph Login Demo
//!
//! Signs in with the device-code flow, caches the credential, and walks the
//! directory with the paged Graph client.
//!
//! Run with:
//!   cargo run -p graph-login -- login
//!   cargo run -p graph-login -- users --max 50
//!   cargo run -p graph-login -- roles --global-admins
//!
//! Configuration comes from `GRAPH_DEVICE_*` environment variables, with the
//! flags below taking precedence.

mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use graph_device_sdk::{CredentialManager, GraphClient, GraphOptions};

/// Device-code sign-in and directory enumeration for Microsoft Graph
#[derive(Parser, Debug)]
#[command(name = "graph-login")]
#[command(about = "Sign in with a device code and query the Microsoft Graph directory")]
struct Args {
    /// Directory holding tokens.json
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Tenant ID or domain (default: common)
    #[arg(long, global = true)]
    tenant: Option<String>,

    /// OAuth client ID
    #[arg(long, global = true)]
    client_id: Option<String>,

    /// Print raw JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Obtain a token, reusing or refreshing the cached one when possible
    Login {
        /// Run the device-code flow even if a valid credential exists
        #[arg(long)]
        force: bool,
    },
    /// Show the cached credential without touching the network
    Status,
    /// Delete the cached credential
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List directory users
    Users {
        /// Stop after at least this many users
        #[arg(long, short = 'm')]
        max: Option<usize>,
    },
    /// List activated directory roles and their members
    Roles {
        /// Only show the Global Administrator role
        #[arg(long)]
        global_admins: bool,
    },
}

fn build_options(args: &Args) -> GraphOptions {
    let mut options = GraphOptions::from_env();
    if let Some(dir) = &args.output_dir {
        options.output_dir.clone_from(dir);
    }
    if let Some(client_id) = &args.client_id {
        options.client_id.clone_from(client_id);
    }
    if let Some(tenant) = &args.tenant {
        options = options.with_tenant(tenant);
    }
    options
}

async fn client(manager: &CredentialManager) -> anyhow::Result<GraphClient> {
    let token = manager.access_token().await?;
    Ok(GraphClient::new(token, manager.options())?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Default: info for the SDK and demo, warn for deps. Override with RUST_LOG.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("graph_device_sdk=info,graph_login=info,warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let options = build_options(&args);
    tracing::debug!(
        command = ?args.command,
        output_dir = %options.output_dir.display(),
        token_url = %options.token_url,
        "Resolved configuration"
    );
    let manager = CredentialManager::new(options)?;

    match args.command {
        Command::Login { force } => {
            let credential = if force {
                manager.run_device_code_flow().await?
            } else {
                manager.credential().await?
            };
            output::display_credential(&credential, manager.store().path());
        }
        Command::Status => match manager.current_credential() {
            Some(credential) => output::display_credential(&credential, manager.store().path()),
            None => output::display_signed_out(manager.store().path()),
        },
        Command::Logout => {
            manager.logout()?;
            output::display_logged_out(manager.store().path());
        }
        Command::Whoami => {
            let client = client(&manager).await?;
            let me = output::with_spinner("Fetching profile", client.me()).await?;
            output::display_users(std::slice::from_ref(&me), args.json)?;
        }
        Command::Users { max } => {
            let client = client(&manager).await?;
            let users = match output::with_spinner("Listing users", client.list_users(max)).await {
                Ok(users) => users,
                Err(partial) => {
                    output::display_partial(partial.records.len(), &partial.source);
                    return Err(partial.source.into());
                }
            };
            output::display_users(&users, args.json)?;
        }
        Command::Roles { global_admins } => {
            let client = client(&manager).await?;
            if global_admins {
                match output::with_spinner("Looking up Global Administrators", client.global_admins())
                    .await?
                {
                    Some(role) => output::display_roles(std::slice::from_ref(&role), args.json)?,
                    None => output::display_warning("Global Administrator role is not activated"),
                }
            } else {
                let roles =
                    output::with_spinner("Listing roles", client.roles_with_members()).await?;
                output::display_roles(&roles, args.json)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_environment() {
        let args = Args::parse_from([
            "graph-login",
            "--output-dir",
            "/tmp/graph-login-state",
            "--client-id",
            "demo-client",
            "--tenant",
            "contoso.onmicrosoft.com",
            "status",
        ]);
        let options = build_options(&args);

        assert_eq!(options.output_dir, PathBuf::from("/tmp/graph-login-state"));
        assert_eq!(options.client_id, "demo-client");
        assert!(options.token_url.contains("/contoso.onmicrosoft.com/"));
        assert!(matches!(args.command, Command::Status));
    }
}
