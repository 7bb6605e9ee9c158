use crate::entity::action::Action;
use crate::entity::report::Warning;
use crate::linux::luks::exit_codes;
use crate::linux::{
    lvm,
    partition_name,
};
use crate::manifest::Manifest;
use crate::provision::{
    encryption,
    mount,
    volume,
};
use crate::utils::shell::Executor;

/// Live-system state an installation holds on to
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resources {
    pub swaps: Vec<String>,
    /// Volume group
    pub vg: Option<String>,
    /// LUKS mapper name
    pub luks: Option<String>,
}

/// Releases `held` in reverse order of acquisition: unmount everything
/// under `location`, deactivate (and with `remove_vg`, remove) the volume
/// group, then close the LUKS mapping.
///
/// Never fails. Every problem is returned as a warning.
pub fn release(
    exec: &mut dyn Executor,
    location: &str,
    held: &Resources,
    remove_vg: bool,
    progress: &mut Vec<Action>,
) -> Vec<Warning> {
    let mut warnings = mount::unmount_all(exec, location, &held.swaps, progress);

    if let Some(vg) = &held.vg {
        if let Err(err) = volume::release_group(exec, vg, remove_vg, progress) {
            warnings.push(Warning::new("lvm", err));
        }
    }

    if let Some(name) = &held.luks {
        match encryption::close(exec, name, progress) {
            Ok(()) => {}
            Err(err) if err.exit_status() == Some(exit_codes::WRONG_DEVICE) => {
                tracing::debug!(%name, "luks mapping not active");
            }
            Err(err) => warnings.push(Warning::new("luks", err)),
        }
    }

    warnings
}

/// Releases whatever a finished installation from `manifest` left active,
/// without destroying anything.
pub fn teardown(
    exec: &mut dyn Executor,
    manifest: &Manifest,
    location: &str,
    progress: &mut Vec<Action>,
) -> Vec<Warning> {
    let mut held = Resources {
        luks: Some(manifest.luks.name.clone()),
        ..Default::default()
    };

    if manifest.has_swap() {
        held.swaps.push(partition_name(&manifest.device, 2));
    }

    match lvm::list_vgs(exec) {
        Ok(vgs) if vgs.contains(&manifest.volumes.vg) => {
            held.vg = Some(manifest.volumes.vg.clone());
        }
        Ok(_) => {}
        Err(err) => {
            return vec![Warning::new("lvm", format!("cannot list volume groups: {err}"))];
        }
    }

    release(exec, location, &held, false, progress)
}
