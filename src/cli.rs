//! CLI domain: parse, route and output only.
//! No domain orchestration; single route table dispatches to the RPC core and script engine.

mod output;
mod parse;
mod route;

pub use output::{
    error_envelope, exit_code_for, map_error, render_error, render_output, success_envelope,
    CommandOutput, EXIT_AUTH, EXIT_CONNECTION, EXIT_FAILURE, EXIT_SUCCESS,
};
pub use parse::{CacheCommands, Cli, Commands, OutputFormat};
pub use route::{RunContext, RunOptions};
