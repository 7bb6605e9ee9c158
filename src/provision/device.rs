use crate::entity::blockdev::DeviceSpec;
use crate::errors::VliError;
use crate::linux::{
    lsblk,
    lvm,
};
use crate::utils::shell::Executor;

// Device types we are willing to wipe
const ALLOWED_TYPES: [&str; 2] = ["disk", "loop"];

// Child types that mean the device backs an active mapping
const MAPPING_TYPES: [&str; 2] = ["crypt", "lvm"];

/// Probes `path` and returns its geometry if it is safe to wipe.
///
/// Rejects non-block devices, devices with anything mounted (or active
/// swap) on them or their partitions, devices holding active device
/// mappings, and devices backing an active volume group named
/// `reserved_vg`. Read-only.
pub fn validate(
    exec: &mut dyn Executor,
    path: &str,
    reserved_vg: &str,
) -> Result<DeviceSpec, VliError> {
    let invalid = |reason: String| VliError::InvalidDevice {
        device: path.to_string(),
        reason,
    };

    let entry = match lsblk::lsblk(exec, path) {
        Ok(entry) => entry,
        Err(err @ VliError::CmdFailed { .. }) => {
            return Err(invalid(format!("not a block device: {err}")));
        }
        Err(err) => return Err(err),
    };

    if !ALLOWED_TYPES.contains(&entry.dev_type.as_str()) {
        return Err(invalid(format!(
            "device type {} is not a whole disk",
            entry.dev_type
        )));
    }

    if let Some((name, mnt)) = entry.mountpoints().into_iter().next() {
        return Err(invalid(format!("{name} is mounted on {mnt}")));
    }

    if let Some(mapping) = find_mapping(&entry) {
        return Err(invalid(format!("holds active device mapping {mapping}")));
    }

    let pvs = lvm::list_pvs(exec).map_err(|err| {
        invalid(format!("failed to list physical volumes: {err}"))
    })?;

    for (pv, vg) in pvs {
        if vg == reserved_vg && is_on_device(path, &pv) {
            return Err(invalid(format!(
                "{pv} backs active volume group {vg}"
            )));
        }
    }

    if entry.log_sec == 0 || entry.size < entry.log_sec {
        return Err(invalid(format!(
            "bad geometry: size {} sector size {}",
            entry.size, entry.log_sec
        )));
    }

    tracing::info!(
        device = path,
        size = entry.size,
        sector_size = entry.log_sec,
        "device validated"
    );

    Ok(DeviceSpec {
        path: path.to_string(),
        sector_size: entry.log_sec,
        size_bytes: entry.size,
    })
}

/// Whether `pv` is `device` itself or one of its partitions
fn is_on_device(device: &str, pv: &str) -> bool {
    let Some(rest) = pv.strip_prefix(device) else {
        return false;
    };

    let number = match device.ends_with(|c: char| c.is_ascii_digit()) {
        true => rest.strip_prefix('p'),
        false => Some(rest),
    };

    rest.is_empty()
        || number.is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

fn find_mapping(entry: &lsblk::EntryLsblk) -> Option<String> {
    for child in &entry.children {
        if MAPPING_TYPES.contains(&child.dev_type.as_str()) {
            return Some(child.name.clone());
        }

        if let Some(name) = find_mapping(child) {
            return Some(name);
        }
    }

    None
}
