//! Subcommand implementations.
//!
//! Results go to stdout; diagnostics go through `tracing` to stderr.

pub mod account;
pub mod gate;
pub mod session;

use rental_desk_session::{FileStore, MockIdentityService, SessionController};

/// Controller wired the way the CLI runs it.
pub type Controller = SessionController<MockIdentityService, FileStore>;

/// Write one line of command output.
#[allow(clippy::print_stdout)]
pub fn print(line: impl std::fmt::Display) {
    println!("{line}");
}
