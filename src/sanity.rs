use std::collections::BTreeSet;

use crate::constants::REQUIRED_COMMANDS;
use crate::entity::blockdev::FsKind;
use crate::errors::VliError;
use crate::manifest::Manifest;
use crate::utils::fs::file_exists;
use crate::utils::shell::in_path;

/// Programs `manifest` needs on top of [`REQUIRED_COMMANDS`]
pub fn manifest_commands(manifest: &Manifest) -> BTreeSet<&'static str> {
    let mut kinds = vec![FsKind::Vfat];
    if manifest.has_swap() {
        kinds.push(FsKind::Swap);
    }
    kinds.extend(manifest.volumes.lvs.iter().map(|lv| lv.fs_type));

    let mut commands: BTreeSet<&'static str> = kinds
        .into_iter()
        .map(|kind| match kind {
            FsKind::Vfat => "mkfs.vfat",
            FsKind::Xfs => "mkfs.xfs",
            FsKind::Ext4 => "mkfs.ext4",
            FsKind::Swap => "mkswap",
        })
        .collect();

    if manifest.luks.token.is_some() {
        commands.insert("ykchalresp");
    }

    commands
}

/// Checks that the target device node exists and every program
/// the installation will run is in `$PATH`
pub fn check(manifest: &Manifest) -> Result<(), VliError> {
    if !file_exists(&manifest.device) {
        return Err(VliError::InvalidDevice {
            device: manifest.device.clone(),
            reason: "no such device node".into(),
        });
    }

    let missing: Vec<&str> = REQUIRED_COMMANDS
        .into_iter()
        .chain(manifest_commands(manifest))
        .filter(|cmd| !in_path(cmd))
        .collect();

    if !missing.is_empty() {
        return Err(VliError::MissingCommand(missing.join(", ")));
    }

    Ok(())
}

#[test]
fn test_manifest_commands() {
    let manifest = Manifest::from_yaml(crate::manifest::EXAMPLE_YAML).unwrap();
    let commands: Vec<&str> = manifest_commands(&manifest).into_iter().collect();

    assert_eq!(
        commands,
        vec!["mkfs.ext4", "mkfs.vfat", "mkfs.xfs", "mkswap", "ykchalresp"]
    );
}

#[test]
fn test_manifest_commands_zero_swap() {
    let mut manifest = Manifest::from_yaml(crate::manifest::EXAMPLE_YAML).unwrap();
    manifest.swap.as_mut().unwrap().size = "0g".into();

    assert!(!manifest_commands(&manifest).contains("mkswap"));
}
