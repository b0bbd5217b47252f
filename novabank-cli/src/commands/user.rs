//! User command - admin control over who may log in

use anyhow::Result;
use clap::{Args, Subcommand};

use super::{attempt, execute, read_password};
use crate::output;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Allow a user to log in again
    Activate(StatusArgs),
    /// Lock a user out of login
    Deactivate(StatusArgs),
}

#[derive(Args)]
pub struct StatusArgs {
    /// E-mail address of the user to change
    email: String,
    /// Admin username or e-mail performing the change
    #[arg(long = "as")]
    admin: String,
    /// Admin password (prompted for when omitted)
    #[arg(long, short)]
    password: Option<String>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(command: UserCommands) -> Result<()> {
    let (args, active) = match command {
        UserCommands::Activate(args) => (args, true),
        UserCommands::Deactivate(args) => (args, false),
    };
    let command = if active { "user activate" } else { "user deactivate" };

    let password = read_password(args.password, false)?;
    let admin = attempt(command, args.json, |ctx| {
        ctx.auth.login(&ctx.local_actor(), &args.admin, &password)
    })?;

    execute(
        command,
        args.json,
        |ctx| {
            let actor = ctx.local_actor().with_user(admin.id);
            ctx.auth.set_user_active(&actor, &args.email, active)
        },
        |user| {
            let status = if user.is_active { "active" } else { "inactive" };
            output::success(&format!("{} is now {}.", user.email, status))
        },
    )
}
