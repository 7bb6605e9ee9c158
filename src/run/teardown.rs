use colored::Colorize;

use crate::apply;
use crate::errors::VliError;
use crate::manifest::Manifest;
use crate::utils::shell::SystemExecutor;

pub(super) fn run(manifest: &Manifest, location: &str) -> Result<(), VliError> {
    let mut progress = Vec::new();
    let warnings = apply::teardown(&mut SystemExecutor, manifest, location, &mut progress);

    for warning in &warnings {
        eprintln!(
            "{}",
            format!("WARN: {}: {}", warning.context, warning.message).yellow()
        );
    }

    let json = serde_json::to_string(&progress)
        .map_err(|err| VliError::VliRsBug(format!("failed to serialize actions: {err}")))?;

    println!("{json}");

    Ok(())
}
