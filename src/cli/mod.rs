mod args;
mod commands;
mod orchestrator;

pub use args::{Cli, Commands, ConfigSubcommands};
pub use commands::run;
pub use orchestrator::create_orchestrator;
