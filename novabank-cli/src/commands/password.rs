//! Password command - forgotten password flow

use anyhow::Result;
use clap::Subcommand;

use super::{attempt, execute, read_password};
use crate::output::{self, format_time};

#[derive(Subcommand)]
pub enum PasswordCommands {
    /// Send a password reset code
    Forgot {
        /// Registered e-mail address
        email: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a new password using the received code
    Reset {
        /// Registered e-mail address
        email: String,
        /// Six-digit code
        code: String,
        /// New password (prompted for after the code is accepted when omitted)
        #[arg(long, short)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: PasswordCommands) -> Result<()> {
    match command {
        PasswordCommands::Forgot { email, json } => execute(
            "password forgot",
            json,
            |ctx| ctx.auth.request_password_reset(&ctx.local_actor(), &email),
            output::code_sent,
        ),
        PasswordCommands::Reset {
            email,
            code,
            password,
            json,
        } => match password {
            Some(password) => execute(
                "password reset",
                json,
                |ctx| ctx.auth.reset_password(&ctx.local_actor(), &email, &code, &password),
                |_| output::success("Password changed."),
            ),
            // check the code before asking for a new password
            None => {
                let grant = attempt("password reset", json, |ctx| {
                    ctx.auth.verify_password_reset(&ctx.local_actor(), &email, &code)
                })?;
                output::info(&format!(
                    "Code accepted for {}. Choose a new password before {}.",
                    grant.email(),
                    format_time(&grant.expires_at())
                ));
                let password = read_password(None, true)?;
                execute(
                    "password change",
                    json,
                    move |ctx| ctx.auth.change_password(&ctx.local_actor(), grant, &password),
                    |_| output::success("Password changed."),
                )
            }
        },
    }
}
