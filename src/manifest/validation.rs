use std::collections::HashSet;

use super::{
    Manifest,
    ManifestLv,
};
use crate::entity::blockdev::FsKind;
use crate::entity::parse_human_bytes;
use crate::errors::VliError;

/// Static manifest checks, done before any device is probed or touched
pub fn validate(manifest: &Manifest) -> Result<(), VliError> {
    if !manifest.device.starts_with("/dev/") {
        return Err(VliError::BadManifest(format!(
            "device {} is not under /dev",
            manifest.device
        )));
    }

    if manifest.boot_bytes()? == 0 {
        return Err(VliError::BadManifest("zero-sized boot partition".into()));
    }

    if let Some(ref swap) = manifest.swap {
        parse_human_bytes(&swap.size)?;
    }

    validate_luks(manifest)?;
    validate_lvs(manifest)?;
    validate_labels(manifest)?;

    Ok(())
}

fn validate_luks(manifest: &Manifest) -> Result<(), VliError> {
    const MSG: &str = "luks validation failed";
    let luks = &manifest.luks;

    if !is_valid_name(&luks.name) {
        return Err(VliError::BadManifest(format!(
            "{MSG}: bad mapper name {:?}",
            luks.name
        )));
    }

    match (&luks.token, &luks.passphrase) {
        (None, None) => {
            return Err(VliError::BadManifest(format!(
                "{MSG}: either token or passphrase is required"
            )));
        }
        (Some(_), Some(_)) => {
            return Err(VliError::BadManifest(format!(
                "{MSG}: token and passphrase are mutually exclusive"
            )));
        }
        (None, Some(passphrase)) if passphrase.is_empty() => {
            return Err(VliError::BadManifest(format!("{MSG}: empty passphrase")));
        }
        _ => {}
    }

    if let Some(ref token) = luks.token {
        if !(1..=2).contains(&token.slot) {
            return Err(VliError::BadManifest(format!(
                "{MSG}: token slot must be 1 or 2, got {}",
                token.slot
            )));
        }

        if let Some(ref challenge) = token.challenge {
            if challenge.is_empty() || hex::decode(challenge).is_err() {
                return Err(VliError::BadManifest(format!(
                    "{MSG}: challenge is not a hex string"
                )));
            }
        }
    }

    if let Some(ref recovery) = luks.recovery_passphrase {
        if recovery.is_empty() {
            return Err(VliError::BadManifest(format!(
                "{MSG}: empty recovery passphrase"
            )));
        }
    }

    Ok(())
}

fn validate_lvs(manifest: &Manifest) -> Result<(), VliError> {
    const MSG: &str = "lvm validation failed";
    let lvm = &manifest.volumes;

    if !is_valid_name(&lvm.vg) {
        return Err(VliError::BadManifest(format!(
            "{MSG}: bad vg name {:?}",
            lvm.vg
        )));
    }

    if lvm.lvs.is_empty() {
        return Err(VliError::BadManifest(format!("{MSG}: no lvs")));
    }

    let mut names = HashSet::new();
    let mut mountpoints = HashSet::from([manifest.boot.mountpoint.as_str()]);
    let mut has_root = false;

    let l = lvm.lvs.len();
    for (i, lv) in lvm.lvs.iter().enumerate() {
        if !is_valid_name(&lv.name) || !names.insert(lv.name.as_str()) {
            return Err(VliError::BadManifest(format!(
                "{MSG}: bad or duplicate lv name {:?}",
                lv.name
            )));
        }

        match lv.size {
            // Only the last lv may take the remaining space
            None if i != l - 1 => {
                return Err(VliError::BadManifest(format!(
                    "{MSG}: unsized lv {} must be the last lv",
                    lv.name
                )));
            }
            None => {}
            Some(ref size) => {
                if parse_human_bytes(size)? == 0 {
                    return Err(VliError::BadManifest(format!(
                        "{MSG}: zero-sized lv {}",
                        lv.name
                    )));
                }
            }
        }

        validate_mountpoint(lv, &mut mountpoints)?;
        if lv.mountpoint.as_deref() == Some("/") {
            has_root = true;
        }
    }

    if !has_root {
        return Err(VliError::BadManifest(format!(
            "{MSG}: no lv is mounted at /"
        )));
    }

    Ok(())
}

fn validate_mountpoint<'a>(
    lv: &'a ManifestLv,
    mountpoints: &mut HashSet<&'a str>,
) -> Result<(), VliError> {
    const MSG: &str = "mountpoint validation failed";

    match (lv.fs_type, &lv.mountpoint) {
        (FsKind::Swap, Some(mnt)) => Err(VliError::BadManifest(format!(
            "{MSG}: swap lv {} cannot be mounted at {mnt}",
            lv.name
        ))),

        (_, Some(mnt)) => {
            if !mnt.starts_with('/') {
                return Err(VliError::BadManifest(format!(
                    "{MSG}: mountpoint {mnt} for lv {} is not absolute",
                    lv.name
                )));
            }

            if !mountpoints.insert(mnt.as_str()) {
                return Err(VliError::BadManifest(format!(
                    "{MSG}: duplicate mountpoint {mnt}"
                )));
            }

            Ok(())
        }

        _ => Ok(()),
    }
}

// fstab refers to filesystems by label, so labels must fit and be unique
fn validate_labels(manifest: &Manifest) -> Result<(), VliError> {
    const MSG: &str = "label validation failed";

    let mut labels: Vec<(&str, FsKind)> =
        vec![(manifest.boot.label.as_str(), FsKind::Vfat)];

    if let Some(swap) = manifest.swap.as_ref().filter(|_| manifest.has_swap()) {
        labels.push((swap.label.as_str(), FsKind::Swap));
    }

    for lv in &manifest.volumes.lvs {
        labels.push((lv.label(), lv.fs_type));
    }

    let mut dups = HashSet::new();
    for (label, fs) in labels {
        if label.is_empty() || label.len() > fs.max_label_len() {
            return Err(VliError::BadManifest(format!(
                "{MSG}: label {label:?} does not fit {fs} (max {} chars)",
                fs.max_label_len()
            )));
        }

        if label.chars().any(char::is_whitespace) {
            return Err(VliError::BadManifest(format!(
                "{MSG}: label {label:?} contains whitespace"
            )));
        }

        // vfat labels are case-insensitive
        if !dups.insert(label.to_lowercase()) {
            return Err(VliError::BadManifest(format!(
                "{MSG}: duplicate label {label}"
            )));
        }
    }

    Ok(())
}

// Names used in /dev/mapper and /dev/{vg}/{lv}
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-+.".contains(c))
}
