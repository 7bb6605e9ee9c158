use crate::apply::Installer;
use crate::errors::VliError;
use crate::manifest::Manifest;
use crate::utils::shell::SystemExecutor;

pub(super) fn run(manifest: &Manifest) -> Result<(), VliError> {
    let mut exec = SystemExecutor;
    let layout = Installer::new(manifest, "", &mut exec).plan()?;

    let json = serde_json::to_string_pretty(&layout)
        .map_err(|err| VliError::VliRsBug(format!("failed to serialize layout: {err}")))?;

    println!("{json}");

    Ok(())
}
