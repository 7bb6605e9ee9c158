use colored::Colorize;
use dialoguer::console::Term;
use dialoguer::Confirm;

use crate::apply::Installer;
use crate::cli;
use crate::entity::blockdev::PartitionLayout;
use crate::errors::VliError;
use crate::manifest::Manifest;
use crate::sanity;
use crate::utils::shell::SystemExecutor;

pub(super) fn run(
    manifest: &Manifest,
    location: &str,
    args: cli::ArgsApply,
) -> Result<(), VliError> {
    sanity::check(manifest)?;

    if !args.yes && !Term::stderr().is_term() {
        return Err(VliError::BadArgs(
            "stderr is not a terminal, use --yes to confirm non-interactively".into(),
        ));
    }

    let mut exec = SystemExecutor;
    let installer = Installer::new(manifest, location, &mut exec);

    let report = installer.install(|layout| args.yes || confirm(layout))?;

    for warning in &report.warnings {
        eprintln!(
            "{}",
            format!("WARN: {}: {}", warning.context, warning.message).yellow()
        );
    }

    println!("{}", report.to_json_string());

    Ok(())
}

fn confirm(layout: &PartitionLayout) -> bool {
    eprintln!("{}", "Partition layout to be written:".bold());
    for part in &layout.partitions {
        eprintln!(
            "  {} {:?} {} MiB ({})",
            part.device,
            part.role,
            layout.bytes(part.role).unwrap_or_default() / (1024 * 1024),
            part.label,
        );
    }

    let prompt = format!(
        "All data on {} will be lost. Continue?",
        layout.device.path
    );

    match Confirm::new().with_prompt(prompt).default(false).interact() {
        Ok(yes) => yes,
        Err(err) => {
            tracing::error!("confirmation prompt failed: {err}");
            false
        }
    }
}
