use crate::entity::blockdev::FsKind;
use crate::errors::VliError;
use crate::utils::shell::{
    split_opts,
    Executor,
};

/// Executes one of:
/// ```shell
/// mkfs.vfat -F 32 -n {label} {opts} {device}
/// mkfs.xfs -f -L {label} {opts} {device}
/// mkfs.ext4 -F -L {label} {opts} {device}
/// mkswap -L {label} {opts} {device}
/// ```
///
/// `opts` are passed through verbatim after shell-style splitting
pub fn create_fs(
    exec: &mut dyn Executor,
    device: &str,
    fs: FsKind,
    label: &str,
    opts: Option<&str>,
) -> Result<(), VliError> {
    let (cmd, args) = mkfs_cmd(device, fs, label, opts)?;
    let args: Vec<&str> = args.iter().map(|s| s.as_str()).collect();

    exec.exec(cmd, &args)
}

fn mkfs_cmd(
    device: &str,
    fs: FsKind,
    label: &str,
    opts: Option<&str>,
) -> Result<(&'static str, Vec<String>), VliError> {
    let (cmd, mut args): (&'static str, Vec<String>) = match fs {
        FsKind::Vfat => (
            "mkfs.vfat",
            vec!["-F".into(), "32".into(), "-n".into(), label.into()],
        ),
        FsKind::Xfs => ("mkfs.xfs", vec!["-f".into(), "-L".into(), label.into()]),
        FsKind::Ext4 => ("mkfs.ext4", vec!["-F".into(), "-L".into(), label.into()]),
        FsKind::Swap => ("mkswap", vec!["-L".into(), label.into()]),
    };

    if let Some(opts) = opts {
        args.extend(split_opts(opts)?);
    }

    args.push(device.to_string());
    Ok((cmd, args))
}

#[test]
fn test_mkfs_cmd() {
    let (cmd, args) = mkfs_cmd(
        "/dev/void/root",
        FsKind::Xfs,
        "root",
        Some("-d su=128k,sw=1 -i maxpct=5"),
    )
    .unwrap();

    assert_eq!(cmd, "mkfs.xfs");
    assert_eq!(
        args,
        vec![
            "-f",
            "-L",
            "root",
            "-d",
            "su=128k,sw=1",
            "-i",
            "maxpct=5",
            "/dev/void/root"
        ]
    );

    let (cmd, args) = mkfs_cmd("/dev/sda1", FsKind::Vfat, "EFI", None).unwrap();
    assert_eq!(cmd, "mkfs.vfat");
    assert_eq!(args, vec!["-F", "32", "-n", "EFI", "/dev/sda1"]);

    let (cmd, args) = mkfs_cmd("/dev/sda2", FsKind::Swap, "swap", None).unwrap();
    assert_eq!(cmd, "mkswap");
    assert_eq!(args, vec!["-L", "swap", "/dev/sda2"]);

    assert!(mkfs_cmd("/dev/sda2", FsKind::Ext4, "x", Some("'oops")).is_err());
}
