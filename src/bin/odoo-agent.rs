//! odoo-agent CLI Binary
//!
//! Command-line interface for guarded access to Odoo's external API.

use clap::Parser;
use odoo_agent::cli::{
    exit_code_for, render_error, render_output, Cli, OutputFormat, RunContext, RunOptions,
};
use odoo_agent::config::ConfigLoader;
use odoo_agent::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

/// Profile selector consulted when `--profile` is absent.
const PROFILE_ENV: &str = "ODOO_PROFILE";

fn main() {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(odoo_agent::cli::EXIT_FAILURE);
    }

    info!(command = cli.command.name(), "odoo-agent starting");

    let options = RunOptions {
        profile: cli
            .profile
            .clone()
            .or_else(|| std::env::var(PROFILE_ENV).ok().filter(|p| !p.is_empty())),
        force: cli.force,
        context: cli.context.clone(),
        no_cache: cli.no_cache,
    };

    let context = match RunContext::new(cli.workspace.clone(), cli.config.clone(), options) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error loading configuration: {}", e);
            fail(&e, None, cli.format);
        }
    };
    let profile_name = context.profile().ok().map(|p| p.name.clone());

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            process::exit(odoo_agent::cli::EXIT_FAILURE);
        }
    };

    match runtime.block_on(context.execute(&cli.command)) {
        Ok(output) => {
            info!(success = output.success(), "Command finished");
            println!("{}", render_output(&output, cli.format));
            process::exit(output.exit_code());
        }
        Err(e) => {
            error!("Command failed: {}", e);
            fail(&e, profile_name.as_deref(), cli.format);
        }
    }
}

fn fail(error: &odoo_agent::ApiError, profile_name: Option<&str>, format: OutputFormat) -> ! {
    let rendered = render_error(error, profile_name, format);
    match format {
        OutputFormat::Json => println!("{}", rendered),
        OutputFormat::Text => eprintln!("{}", rendered),
    }
    process::exit(exit_code_for(error))
}

/// Build logging configuration from CLI args and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = if let Some(ref config_path) = cli.config {
        ConfigLoader::load_from_file(config_path)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    } else {
        ConfigLoader::load(&cli.workspace)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    };

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = Some(file.clone());
    }

    config
}
