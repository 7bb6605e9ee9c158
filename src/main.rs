mod apply;
mod cli;
mod constants;
mod entity;
mod errors;
mod linux;
mod manifest;
mod provision;
mod run;
mod sanity;
mod utils;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use errors::{
    ErrorClass,
    VliError,
};

fn main() {
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli_args = cli::Cli::parse();

    if let Err(err) = run::run(cli_args) {
        print_error(&err);

        std::process::exit(match err.class() {
            ErrorClass::Validation => 2,
            ErrorClass::Unlock => 3,
            ErrorClass::DestructiveOperation => 1,
        });
    }
}

fn print_error(err: &VliError) {
    eprintln!("{}", format!("vli-rs error: {err}").red());

    if let Some(code) = err.exit_status() {
        eprintln!("{}", format!("failed command exited with status {code}").red());
    }

    let VliError::InstallError {
        stage_reached,
        actions_performed,
        warnings,
        ..
    } = err
    else {
        return;
    };

    eprintln!("{}", format!("furthest stage completed: {stage_reached}").yellow());

    if stage_reached.is_destructive() {
        eprintln!(
            "{}",
            "the partition table was rewritten, existing data on the device is gone".yellow()
        );
    }

    for warning in warnings {
        eprintln!(
            "{}",
            format!("WARN: {}: {}", warning.context, warning.message).yellow()
        );
    }

    match serde_json::to_string(actions_performed) {
        Ok(json) => eprintln!("actions performed: {json}"),
        Err(err) => tracing::error!("failed to serialize actions: {err}"),
    }
}
