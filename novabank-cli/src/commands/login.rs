//! Login command - check credentials

use anyhow::Result;

use super::{execute, read_password};
use crate::output;

pub fn run(login: &str, password: Option<String>, json: bool) -> Result<()> {
    let password = read_password(password, false)?;

    execute(
        "login",
        json,
        |ctx| ctx.auth.login(&ctx.local_actor(), login, &password),
        |user| {
            output::success(&format!(
                "Welcome, {} ({}, user id {})",
                user.username, user.role, user.id
            ))
        },
    )
}
