//! Register command - create a user and send the verification code

use anyhow::Result;

use super::{execute, read_password};
use crate::output;
use novabank_core::domain::Role;

pub fn run(
    username: &str,
    email: &str,
    password: Option<String>,
    admin: bool,
    json: bool,
) -> Result<()> {
    let password = read_password(password, true)?;
    let role = if admin { Role::Admin } else { Role::Customer };

    execute(
        "register",
        json,
        |ctx| {
            ctx.auth
                .register_with_role(&ctx.local_actor(), username, email, &password, role)
        },
        |receipt| {
            output::success(&format!(
                "Registered {} (user id {})",
                receipt.user.username, receipt.user.id
            ));
            output::code_sent(&receipt.verification);
        },
    )
}
