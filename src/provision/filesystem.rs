use crate::entity::action::{
    Action,
    ActionFs,
};
use crate::entity::blockdev::FsKind;
use crate::errors::VliError;
use crate::linux::mkfs;
use crate::utils::shell::Executor;

/// A filesystem (or swap area) to create on a partition or volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filesystem {
    pub device: String,
    pub kind: FsKind,
    pub label: String,
    /// Absolute path in the target tree, None for unmounted filesystems and swap
    pub mountpoint: Option<String>,
    pub fs_opts: Option<String>,
    pub mnt_opts: Option<String>,
}

/// Creates the filesystem described by `fs`, destroying any data on its device
pub fn format(
    exec: &mut dyn Executor,
    fs: &Filesystem,
    progress: &mut Vec<Action>,
) -> Result<(), VliError> {
    if fs.label.is_empty() || fs.label.len() > fs.kind.max_label_len() {
        return Err(VliError::Format {
            device: fs.device.clone(),
            fs_type: fs.kind.to_string(),
            error: Box::new(VliError::BadManifest(format!(
                "label {:?} must be 1-{} bytes for {}",
                fs.label,
                fs.kind.max_label_len(),
                fs.kind,
            ))),
        });
    }

    tracing::info!(device = %fs.device, fs = %fs.kind, label = %fs.label, "creating filesystem");

    mkfs::create_fs(exec, &fs.device, fs.kind, &fs.label, fs.fs_opts.as_deref()).map_err(
        |err| VliError::Format {
            device: fs.device.clone(),
            fs_type: fs.kind.to_string(),
            error: Box::new(err),
        },
    )?;

    progress.push(
        ActionFs::CreateFs {
            device: fs.device.clone(),
            fs_type: fs.kind.to_string(),
            fs_opts: fs.fs_opts.clone(),
        }
        .into(),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::fake::FakeSystem;

    fn root() -> Filesystem {
        Filesystem {
            device: "/dev/vg0/root".into(),
            kind: FsKind::Xfs,
            label: "root".into(),
            mountpoint: Some("/".into()),
            fs_opts: Some("-m crc=1".into()),
            mnt_opts: None,
        }
    }

    #[test]
    fn test_format() {
        let mut sys = FakeSystem::new();
        let mut progress = Vec::new();

        format(&mut sys, &root(), &mut progress).unwrap();

        assert_eq!(
            sys.history[0],
            vec!["mkfs.xfs", "-f", "-L", "root", "-m", "crc=1", "/dev/vg0/root"]
        );
        assert_eq!(progress.len(), 1);
    }

    #[test]
    fn test_format_label_too_long() {
        let mut sys = FakeSystem::new();
        let fs = Filesystem {
            label: "averylonglabel".into(),
            ..root()
        };

        assert!(matches!(
            format(&mut sys, &fs, &mut vec![]),
            Err(VliError::Format { .. })
        ));
        assert!(sys.history.is_empty());
    }

    #[test]
    fn test_format_failure() {
        let mut sys = FakeSystem::new().fail_on("mkfs.xfs", 1);

        let err = format(&mut sys, &root(), &mut vec![]).unwrap_err();
        assert!(matches!(err, VliError::Format { .. }));
        assert_eq!(err.exit_status(), Some(1));
    }
}
