//! Presentation of the user code to the operator

use super::credential::Credential;
use super::device_code::DeviceCodeSession;

/// Shows the verification URL and user code to whoever must approve the sign-in
pub trait CodePresenter: Send + Sync {
    /// Called once per device-code session, before polling starts
    fn present(&self, session: &DeviceCodeSession);

    /// Called after the flow succeeded
    fn authenticated(&self, _credential: &Credential) {}
}

/// Prints a boxed prompt to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePresenter;

const BOX_WIDTH: usize = 58;

impl CodePresenter for ConsolePresenter {
    fn present(&self, session: &DeviceCodeSession) {
        println!();
        println!("┌{}┐", "─".repeat(BOX_WIDTH));
        println!("│  {:<w$}│", "To sign in, open a browser and go to:", w = BOX_WIDTH - 2);
        println!("│  {:<w$}│", session.verification_url, w = BOX_WIDTH - 2);
        println!("│{}│", " ".repeat(BOX_WIDTH));
        println!(
            "│  {:<w$}│",
            format!("Enter the code: {}", session.user_code),
            w = BOX_WIDTH - 2
        );
        println!("└{}┘", "─".repeat(BOX_WIDTH));
        if let Some(message) = &session.message {
            println!("{message}");
        }
        println!();
        println!("Waiting for authentication...");
    }

    fn authenticated(&self, credential: &Credential) {
        println!(
            "✓ Authentication successful (token expires {})",
            credential.expires_at.format("%H:%M:%S UTC")
        );
    }
}
