//! CLI module

mod commands;
mod console;
mod handlers;

pub use commands::{Cli, Commands};
pub use console::{ConsoleEvent, ConsoleListener};
pub use handlers::run;
