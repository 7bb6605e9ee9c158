use clap::{
    Args,
    Parser,
    Subcommand,
};

use crate::errors::VliError;

#[derive(Debug, Parser)]
#[clap(
    version,
    about = "Encrypted LVM-on-LUKS disk provisioner for new installations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub commands: Commands,

    /// Manifest file (YAML, or TOML if it ends in .toml)
    #[arg(
        global = true,
        short = 'f',
        long = "file",
        value_parser = validate_filename,
        default_value_t = String::from("./manifest.yaml")
    )]
    pub manifest: String,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate manifest and target device without touching anything
    Validate,

    /// Print the partition layout that apply would write
    Plan,

    /// Wipe the target device and provision it
    Apply(ArgsApply),

    /// Unmount the target tree and close the encrypted container
    Teardown,
}

#[derive(Debug, Args)]
pub struct ArgsApply {
    /// Skip the confirmation prompt (required when stderr is not a terminal)
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}

fn validate_filename(name: &str) -> Result<String, VliError> {
    if name.is_empty() {
        return Err(VliError::BadArgs(String::from("empty filename")));
    }

    Ok(name.to_string())
}
