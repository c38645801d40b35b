//! Styled output and spinners for the login demo

use std::future::Future;
use std::io::{self, IsTerminal};
use std::path::Path;

use console::style;
use graph_device_sdk::utils::redact;
use graph_device_sdk::{Credential, GraphError, RoleWithMembers, User};

/// Run a future behind a spinner when stdout is a terminal
pub async fn with_spinner<F: Future>(message: &str, future: F) -> F::Output {
    if !io::stdout().is_terminal() {
        return future.await;
    }

    let spinner = cliclack::spinner();
    spinner.start(format!("{message}..."));
    let output = future.await;
    spinner.stop(message);
    output
}

pub fn display_credential(credential: &Credential, path: &Path) {
    let state = if credential.is_valid() {
        style("valid").green()
    } else {
        style("expired").red()
    };

    println!("\n{}", style("─── CREDENTIAL ────────────────────────────").dim());
    println!("  {} {state}", style("State:").dim());
    println!(
        "  {} {}",
        style("Token:").dim(),
        redact(&credential.access_token)
    );
    println!(
        "  {} {}",
        style("Expires:").dim(),
        credential.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(remaining) = credential.remaining_validity() {
        println!("  {} {} min", style("Remaining:").dim(), remaining.as_secs() / 60);
    }
    println!(
        "  {} {}",
        style("Refresh:").dim(),
        if credential.refresh_token.is_some() { "yes" } else { "no" }
    );
    if let Some(audience) = credential.audience() {
        println!("  {} {audience}", style("Audience:").dim());
    }
    println!("  {} {}", style("Stored at:").dim(), path.display());
}

pub fn display_signed_out(path: &Path) {
    println!(
        "{} no credential at {}",
        style("Signed out:").yellow(),
        path.display()
    );
}

pub fn display_logged_out(path: &Path) {
    println!("{} removed {}", style("✓").green(), path.display());
}

pub fn display_warning(message: &str) {
    eprintln!("{} {message}", style("warning:").yellow().bold());
}

pub fn display_partial(fetched: usize, error: &GraphError) {
    eprintln!(
        "{} listing stopped after {fetched} records: {error}",
        style("error:").red().bold()
    );
}

pub fn display_users(users: &[User], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(users)?);
        return Ok(());
    }

    for user in users {
        let enabled = match user.account_enabled {
            Some(false) => style(" (disabled)").red().to_string(),
            _ => String::new(),
        };
        println!(
            "  {} {}{enabled}",
            style(user.display_name.as_deref().unwrap_or("<no name>")).bold(),
            style(user.user_principal_name.as_deref().unwrap_or(&user.id)).dim(),
        );
        if let Some(title) = &user.job_title {
            println!("      {}", style(title).dim());
        }
    }
    println!("\n{} users", users.len());
    Ok(())
}

pub fn display_roles(roles: &[RoleWithMembers], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(roles)?);
        return Ok(());
    }

    for entry in roles {
        println!(
            "\n{} {}",
            style(&entry.role.display_name).cyan().bold(),
            style(format!("({} members)", entry.members.len())).dim()
        );
        for member in &entry.members {
            let kind = if member.is_service_principal() {
                style("app").magenta()
            } else {
                style("user").green()
            };
            println!(
                "  [{kind}] {} {}",
                member.display_name.as_deref().unwrap_or("<no name>"),
                style(member.user_principal_name.as_deref().unwrap_or(&member.id)).dim()
            );
        }
    }
    Ok(())
}
