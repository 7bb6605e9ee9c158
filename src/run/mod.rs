mod apply;
mod plan;
mod teardown;
mod validate;

use std::env;

use colored::Colorize;

use crate::constants::{
    defaults,
    ENV_VLI_LOC,
};
use crate::errors::VliError;
use crate::manifest::Manifest;
use crate::{
    cli,
    linux,
};

pub fn run(cli_args: cli::Cli) -> Result<(), VliError> {
    let manifest = Manifest::from_file(&cli_args.manifest)?;
    let location = install_location(&manifest);

    match cli_args.commands {
        cli::Commands::Validate => validate::run(&manifest),
        cli::Commands::Plan => plan::run(&manifest),
        cli::Commands::Apply(args_apply) => {
            warn_non_root();
            apply::run(&manifest, &location, args_apply)
        }
        cli::Commands::Teardown => {
            warn_non_root();
            teardown::run(&manifest, &location)
        }
    }
}

fn warn_non_root() {
    if !linux::is_root() {
        eprintln!("{}", "WARN: running as non-root user".yellow())
    }
}

/// Manifest location, then $VLI_LOC, then the default
fn install_location(manifest: &Manifest) -> String {
    manifest
        .location
        .clone()
        .or_else(|| env::var(ENV_VLI_LOC).ok())
        .unwrap_or(defaults::INSTALL_LOCATION.to_string())
}

#[test]
fn test_install_location() {
    let mut manifest = Manifest::from_yaml(crate::manifest::EXAMPLE_YAML).unwrap();
    assert_eq!(install_location(&manifest), "/mnt");

    manifest.location = Some("/target".into());
    assert_eq!(install_location(&manifest), "/target");
}
