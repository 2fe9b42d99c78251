//! Rental Desk CLI - drive the client session core from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in and keep the session across runs
//! rd-cli login -e admin@rental.com -p admin123 --remember
//!
//! # Show the signed-in user
//! rd-cli whoami
//!
//! # Check whether the stored session may enter a route
//! rd-cli gate /admin/users --role admin
//!
//! # Sign out
//! rd-cli logout
//! ```
//!
//! # Commands
//!
//! - `login` / `register` / `logout` / `whoami` - Session lifecycle
//! - `forgot-password` / `reset-password` / `update-profile` - Account changes
//! - `gate` - Evaluate a route gate against the current session
//!
//! Each run restores the durable session from `RENTAL_DESK_STORAGE_DIR`,
//! performs one action, and exits. Sessions created without `--remember`
//! live in the ephemeral scope and end with the run. The bundled identity
//! service is the in-memory mock, so accounts registered and reset tokens
//! issued in one run are gone in the next.
//!
//! # Logging
//!
//! Logs go to stderr. `RUST_LOG` sets the filter; set
//! `RENTAL_DESK_LOG_FORMAT=json` for JSON lines.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rental_desk_core::{Registration, Role};
use rental_desk_session::{
    ActionOutcome, AuthFailure, ConfigError, FileStore, MockIdentityService, SessionConfig,
    SessionController,
};
use secrecy::SecretString;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "rd-cli")]
#[command(author, version, about = "Rental Desk session tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,

        /// Keep the session after this run
        #[arg(long)]
        remember: bool,
    },
    /// Create an account and sign in to it
    Register {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        phone: String,

        /// Account role (`admin`, `staff`, `customer`)
        #[arg(short, long, default_value = "customer")]
        role: Role,

        /// Company name
        #[arg(long)]
        company: Option<String>,

        /// Accept the terms and conditions
        #[arg(long)]
        accept_terms: bool,
    },
    /// Sign out and clear the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Request a password reset link
    ForgotPassword {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Set a new password with a reset token
    ResetPassword {
        /// Reset token from the reset link
        #[arg(long)]
        token: String,

        /// New password (at least 8 characters)
        #[arg(long)]
        password: String,
    },
    /// Edit the signed-in user's profile
    UpdateProfile {
        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        phone: Option<String>,
    },
    /// Evaluate a route gate for the current session
    Gate {
        /// Route being entered
        path: String,

        /// Role allowed to enter (repeatable)
        #[arg(short, long = "role")]
        roles: Vec<Role>,

        /// Do not require a signed-in user
        #[arg(long)]
        public: bool,
    },
}

/// Errors that end a CLI run.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The action was rejected.
    #[error("{0}")]
    Action(#[from] AuthFailure),

    /// A later action replaced this one before it finished.
    #[error("Action was superseded by a newer one")]
    Superseded,
}

/// Turn an action outcome into the run's result.
fn finish(outcome: ActionOutcome) -> Result<(), CliError> {
    match outcome {
        ActionOutcome::Committed => Ok(()),
        ActionOutcome::Failed(failure) => Err(CliError::Action(failure)),
        ActionOutcome::Superseded => Err(CliError::Superseded),
    }
}

fn init_tracing() {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rental_desk_session=info,rd_cli=info".into());
    let json = std::env::var("RENTAL_DESK_LOG_FORMAT").is_ok_and(|format| format == "json");

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = SessionConfig::from_env()?;
    let identity = MockIdentityService::seeded().with_latency(config.mock_latency);
    let store = FileStore::new(config.storage_dir.clone());
    let controller = SessionController::new(identity, store, config);
    controller.init_verified().await;

    let result = match cli.command {
        Commands::Login {
            email,
            password,
            remember,
        } => {
            let password = SecretString::from(password);
            commands::session::login(&controller, &email, &password, remember).await
        }
        Commands::Register {
            email,
            password,
            first_name,
            last_name,
            phone,
            role,
            company,
            accept_terms,
        } => {
            let registration = Registration {
                email,
                password: SecretString::from(password),
                first_name,
                last_name,
                phone,
                role,
                company_name: company,
                accept_terms,
            };
            commands::session::register(&controller, registration).await
        }
        Commands::Logout => {
            commands::session::logout(&controller);
            Ok(())
        }
        Commands::Whoami => {
            commands::session::whoami(&controller);
            Ok(())
        }
        Commands::ForgotPassword { email } => {
            commands::account::forgot_password(&controller, &email).await
        }
        Commands::ResetPassword { token, password } => {
            let password = SecretString::from(password);
            commands::account::reset_password(&controller, &token, &password).await
        }
        Commands::UpdateProfile {
            first_name,
            last_name,
            phone,
        } => commands::account::update_profile(&controller, first_name, last_name, phone).await,
        Commands::Gate {
            path,
            roles,
            public,
        } => {
            commands::gate::evaluate(&controller, &path, roles, public);
            Ok(())
        }
    };

    controller.shutdown();
    result
}
