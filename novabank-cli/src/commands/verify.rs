//! Verify command - e-mail verification with a one-time code

use anyhow::Result;
use clap::Subcommand;

use super::execute;
use crate::output;

#[derive(Subcommand)]
pub enum VerifyCommands {
    /// Send a new verification code
    Request {
        /// Registered e-mail address
        email: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Confirm the e-mail address with the received code
    Confirm {
        /// Registered e-mail address
        email: String,
        /// Six-digit code
        code: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: VerifyCommands) -> Result<()> {
    match command {
        VerifyCommands::Request { email, json } => execute(
            "verify request",
            json,
            |ctx| ctx.auth.request_verification(&ctx.local_actor(), &email),
            output::code_sent,
        ),
        VerifyCommands::Confirm { email, code, json } => execute(
            "verify confirm",
            json,
            |ctx| ctx.auth.verify_account(&ctx.local_actor(), &email, &code),
            |user| output::success(&format!("{} is verified. You can now log in.", user.email)),
        ),
    }
}
