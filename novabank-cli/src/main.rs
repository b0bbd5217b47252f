//! NovaBank CLI - accounts, transfers and sign-in from the terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    account, audit, history, login, logs, password, register, transfer, user, verify, Reported,
};

/// NovaBank - banking core command line client
#[derive(Parser)]
#[command(name = "nb", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open and list accounts
    Account {
        #[command(subcommand)]
        command: account::AccountCommands,
    },

    /// Show the transaction history of an account, newest first
    History {
        /// Account id
        account_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Transfer money to another account by IBAN
    Transfer {
        /// Source account id
        #[arg(long)]
        from: i64,
        /// Destination IBAN
        #[arg(long)]
        to: String,
        /// Amount, at most two decimal places
        #[arg(long)]
        amount: Decimal,
        /// Free-text description
        #[arg(long, short, default_value = "")]
        description: String,
        /// Id of the user performing the transfer (recorded in the audit trail)
        #[arg(long)]
        user: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Register a new user and send a verification code
    Register {
        /// Username
        username: String,
        /// E-mail address the code is sent to
        email: String,
        /// Password (prompted for when omitted)
        #[arg(long, short)]
        password: Option<String>,
        /// Register with the admin role
        #[arg(long)]
        admin: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Verify a registered e-mail address
    Verify {
        #[command(subcommand)]
        command: verify::VerifyCommands,
    },

    /// Reset a forgotten password
    Password {
        #[command(subcommand)]
        command: password::PasswordCommands,
    },

    /// Check a username or e-mail and password
    Login {
        /// Username or e-mail address
        login: String,
        /// Password (prompted for when omitted)
        #[arg(long, short)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Activate or deactivate users (admin only)
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },

    /// Show the audit trail, newest first
    Audit {
        /// Number of entries to show (all when omitted)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the operational log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("NOVABANK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        // already printed by the command
        Err(e) if e.is::<Reported>() => ExitCode::FAILURE,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Account { command } => account::run(command),
        Commands::History { account_id, json } => history::run(account_id, json),
        Commands::Transfer { from, to, amount, description, user, json } => {
            transfer::run(from, &to, amount, &description, user, json)
        }
        Commands::Register { username, email, password, admin, json } => {
            register::run(&username, &email, password, admin, json)
        }
        Commands::Verify { command } => verify::run(command),
        Commands::Password { command } => password::run(command),
        Commands::Login { login, password, json } => login::run(&login, password, json),
        Commands::User { command } => user::run(command),
        Commands::Audit { limit, json } => audit::run(limit, json),
        Commands::Logs { command } => logs::run(command),
    }
}
