use std::path::{
    Path,
    PathBuf,
};

use crate::constants::{
    defaults,
    UNLOCK_DIR,
};
use crate::entity::action::{
    Action,
    ActionPersist,
};
use crate::entity::blockdev::FsKind;
use crate::errors::VliError;
use crate::linux::luks;
use crate::utils::fs::{
    append,
    write_restricted,
};
use crate::utils::shell::Executor;

use super::encryption::{
    EncryptedContainer,
    EncryptionSecret,
    TokenChallenge,
};
use super::filesystem::Filesystem;
use super::mount::depth;

/// Renders fstab entries for `filesystems`, root first.
/// Filesystems without a mountpoint are left out, swap is always in.
pub fn fstab(filesystems: &[Filesystem]) -> String {
    let mut mounted: Vec<&Filesystem> = filesystems
        .iter()
        .filter(|fs| fs.kind != FsKind::Swap && fs.mountpoint.is_some())
        .collect();

    mounted.sort_by_key(|fs| depth(fs.mountpoint.as_deref().unwrap_or("/")));

    let mut out = String::new();
    for fs in mounted {
        let mnt = fs.mountpoint.as_deref().unwrap_or("/");
        let pass = if mnt == "/" { 1 } else { 2 };

        out.push_str(&format!(
            "LABEL={}\t{}\t{}\t{}\t0 {}\n",
            fs.label,
            mnt,
            fs.kind.fstab_type(),
            fs.mnt_opts.as_deref().unwrap_or(defaults::MNT_OPTS),
            pass,
        ));
    }

    for fs in filesystems.iter().filter(|fs| fs.kind == FsKind::Swap) {
        out.push_str(&format!(
            "LABEL={}\tnone\tswap\t{}\t0 0\n",
            fs.label,
            defaults::MNT_OPTS
        ));
    }

    out
}

pub fn crypttab(name: &str, uuid: &str) -> String {
    format!("{name}\tUUID={uuid}\tnone\tluks\n")
}

/// Boot-time helper that rebuilds the composite secret and opens the container
pub fn unlock_script(name: &str, uuid: &str, slot: u8, dir: &str) -> String {
    format!(
        r#"#!/bin/sh
# Opens {name} with the hardware token in slot {slot}
set -e

{{ ykchalresp -{slot} -x "$(cat {dir}/challenge)" | tr -d '\n'; cat {dir}/key; }} \
    | cryptsetup open --type luks2 --key-file - UUID={uuid} {name}
"#
    )
}

/// Appends fstab entries to `{location}/etc/fstab`
pub fn write_fstab(
    location: &str,
    filesystems: &[Filesystem],
    progress: &mut Vec<Action>,
) -> Result<(), VliError> {
    let path = Path::new(location).join("etc/fstab");
    append(&path, &fstab(filesystems))?;

    progress.push(ActionPersist::WriteFstab(path.to_string_lossy().to_string()).into());
    Ok(())
}

/// Appends the container to `{location}/etc/crypttab`, returning its LUKS UUID
pub fn write_crypttab(
    exec: &mut dyn Executor,
    location: &str,
    container: &EncryptedContainer,
    progress: &mut Vec<Action>,
) -> Result<String, VliError> {
    let uuid = luks::uuid(exec, &container.device)?;
    let path = Path::new(location).join("etc/crypttab");
    append(&path, &crypttab(&container.name, &uuid))?;

    progress.push(ActionPersist::WriteCrypttab(path.to_string_lossy().to_string()).into());
    Ok(uuid)
}

/// Writes the challenge, key blob and unlock script for token-bound
/// containers under `{location}/etc/vli/{name}`. Does nothing without a token.
///
/// The token response itself is never written anywhere.
pub fn write_unlock_helper(
    location: &str,
    container: &EncryptedContainer,
    uuid: &str,
    secret: &EncryptionSecret,
    progress: &mut Vec<Action>,
) -> Result<(), VliError> {
    let Some(TokenChallenge { slot, challenge }) = secret.token() else {
        return Ok(());
    };

    let target_dir = Path::new("/").join(UNLOCK_DIR).join(&container.name);
    let dir: PathBuf = Path::new(location).join(UNLOCK_DIR).join(&container.name);

    write_restricted(&dir.join("challenge"), challenge.as_bytes(), 0o400)?;
    write_restricted(&dir.join("key"), secret.key(), 0o400)?;
    write_restricted(
        &dir.join("unlock.sh"),
        unlock_script(&container.name, uuid, *slot, &target_dir.to_string_lossy())
            .as_bytes(),
        0o500,
    )?;

    progress.push(ActionPersist::WriteUnlockHelper(dir.to_string_lossy().to_string()).into());
    Ok(())
}
