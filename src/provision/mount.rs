use std::collections::HashSet;

use crate::entity::action::{
    Action,
    ActionMount,
};
use crate::entity::blockdev::FsKind;
use crate::entity::report::Warning;
use crate::errors::VliError;
use crate::linux::mount as linux_mount;
use crate::utils::shell::Executor;

use super::filesystem::Filesystem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub source: String,
    /// Absolute target, already prefixed with the install location
    pub target: String,
    pub options: Option<String>,
}

/// Mounts in the order they must happen, parents before children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPlan {
    pub location: String,
    pub entries: Vec<MountEntry>,
    pub swaps: Vec<String>,
}

impl MountPlan {
    pub fn build(location: &str, filesystems: &[Filesystem]) -> Result<Self, VliError> {
        let mut seen = HashSet::new();
        let mut mounted: Vec<&Filesystem> = Vec::new();
        let mut swaps = Vec::new();

        for fs in filesystems {
            if fs.kind == FsKind::Swap {
                swaps.push(fs.device.clone());
                continue;
            }

            let Some(mnt) = &fs.mountpoint else {
                continue;
            };

            if !mnt.starts_with('/') {
                return Err(VliError::Mount(format!(
                    "mountpoint {mnt} for {} is not absolute",
                    fs.device
                )));
            }

            if !seen.insert(normalize(mnt)) {
                return Err(VliError::Mount(format!("duplicate mountpoint {mnt}")));
            }

            mounted.push(fs);
        }

        if !seen.contains("/") {
            return Err(VliError::Mount("no filesystem is mounted on /".into()));
        }

        mounted.sort_by_key(|fs| depth(fs.mountpoint.as_deref().unwrap_or("/")));

        let entries = mounted
            .into_iter()
            .map(|fs| MountEntry {
                source: fs.device.clone(),
                target: prepend_base(location, fs.mountpoint.as_deref().unwrap_or("/")),
                options: fs.mnt_opts.clone(),
            })
            .collect();

        Ok(Self {
            location: location.to_string(),
            entries,
            swaps,
        })
    }
}

/// Mounts every entry of `plan` in order, then activates swaps.
///
/// Failing to activate swap only yields a warning.
pub fn mount(
    exec: &mut dyn Executor,
    plan: &MountPlan,
    progress: &mut Vec<Action>,
) -> Result<Vec<Warning>, VliError> {
    for entry in &plan.entries {
        std::fs::create_dir_all(&entry.target).map_err(|err| {
            VliError::FileError(err, format!("failed to create mountpoint {}", entry.target))
        })?;
        progress.push(ActionMount::Mkdir(entry.target.clone()).into());

        linux_mount::mount(exec, &entry.source, &entry.target, entry.options.as_deref())
            .map_err(|err| {
                VliError::Mount(format!(
                    "failed to mount {} on {}: {err}",
                    entry.source, entry.target
                ))
            })?;

        progress.push(
            ActionMount::MountFs {
                src: entry.source.clone(),
                dst: entry.target.clone(),
                opts: entry.options.clone(),
            }
            .into(),
        );
    }

    let mut warnings = Vec::new();
    for swap in &plan.swaps {
        match linux_mount::swapon(exec, swap) {
            Ok(()) => progress.push(ActionMount::Swapon(swap.clone()).into()),
            Err(err) => warnings.push(Warning::new(
                "swapon",
                format!("failed to activate swap {swap}: {err}"),
            )),
        }
    }

    Ok(warnings)
}

/// Deactivates `swaps` and unmounts everything under `prefix`.
///
/// Best-effort and idempotent: failures become warnings, and calling it
/// with nothing mounted does nothing.
pub fn unmount_all(
    exec: &mut dyn Executor,
    prefix: &str,
    swaps: &[String],
    progress: &mut Vec<Action>,
) -> Vec<Warning> {
    let mut warnings = Vec::new();

    let active = match linux_mount::active_swaps(exec) {
        Ok(active) => active,
        Err(err) => {
            warnings.push(Warning::new("swapoff", format!("cannot list swaps: {err}")));
            Vec::new()
        }
    };

    for swap in swaps.iter().filter(|s| active.contains(s)) {
        match linux_mount::swapoff(exec, swap) {
            Ok(()) => progress.push(ActionMount::Swapoff(swap.clone()).into()),
            Err(err) => warnings.push(Warning::new(
                "swapoff",
                format!("failed to deactivate swap {swap}: {err}"),
            )),
        }
    }

    if !linux_mount::is_mountpoint(exec, prefix) {
        tracing::debug!(prefix, "nothing mounted");
        return warnings;
    }

    match linux_mount::umount_recursive(exec, prefix) {
        Ok(()) => progress.push(ActionMount::UnmountAll(prefix.to_string()).into()),
        Err(err) => warnings.push(Warning::new(
            "umount",
            format!("failed to unmount {prefix}: {err}"),
        )),
    }

    warnings
}

/// Joins mountpoint `mnt` under `base`
pub fn prepend_base(base: &str, mnt: &str) -> String {
    let base = base.trim_end_matches('/');
    let rel = mnt.trim_matches('/');

    match (base.is_empty(), rel.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{rel}"),
        (false, true) => base.to_string(),
        (false, false) => format!("{base}/{rel}"),
    }
}

/// Number of path components, "/" is 0
pub fn depth(mnt: &str) -> usize {
    mnt.split('/').filter(|c| !c.is_empty()).count()
}

fn normalize(mnt: &str) -> String {
    let components: Vec<&str> = mnt.split('/').filter(|c| !c.is_empty()).collect();
    format!("/{}", components.join("/"))
}
