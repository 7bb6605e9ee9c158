use crate::entity::blockdev::Partition;
use crate::errors::VliError;
use crate::utils::shell::Executor;

/// Executes:
/// ```shell
/// sgdisk --zap-all ${{ device }}
/// ```
pub fn zap(exec: &mut dyn Executor, device: &str) -> Result<(), VliError> {
    exec.exec("sgdisk", &["--zap-all", device])
}

/// Executes, with one `--new`, `--typecode` and `--change-name`
/// triple per partition:
/// ```shell
/// sgdisk --clear --new=1:2048:4196351 --typecode=1:${{ guid }} --change-name=1:EFI ${{ device }}
/// ```
pub fn create_partitions(
    exec: &mut dyn Executor,
    device: &str,
    partitions: &[Partition],
) -> Result<(), VliError> {
    let args = create_partitions_args(device, partitions);
    let args: Vec<&str> = args.iter().map(|s| s.as_str()).collect();

    exec.exec("sgdisk", &args)
}

/// Executes:
/// ```shell
/// partprobe ${{ device }}
/// ```
pub fn reload(exec: &mut dyn Executor, device: &str) -> Result<(), VliError> {
    exec.exec("partprobe", &[device])
}

fn create_partitions_args(device: &str, partitions: &[Partition]) -> Vec<String> {
    let mut args = vec!["--clear".to_string()];

    for part in partitions {
        let n = part.index;
        args.push(format!("--new={n}:{}:{}", part.start_sector, part.end_sector()));
        args.push(format!("--typecode={n}:{}", part.type_guid));
        args.push(format!("--change-name={n}:{}", part.label));
    }

    args.push(device.to_string());
    args
}

#[test]
fn test_create_partitions_args() {
    use crate::entity::blockdev::{
        partition_types,
        PartitionRole,
    };

    let partitions = vec![
        Partition {
            index: 1,
            role: PartitionRole::Boot,
            start_sector: 2048,
            sectors: 1024,
            type_guid: partition_types::EFI.into(),
            label: "EFI".into(),
            device: "/dev/sda1".into(),
        },
        Partition {
            index: 2,
            role: PartitionRole::System,
            start_sector: 3072,
            sectors: 4096,
            type_guid: partition_types::LINUX_LUKS.into(),
            label: "system".into(),
            device: "/dev/sda2".into(),
        },
    ];

    let args = create_partitions_args("/dev/sda", &partitions);
    assert_eq!(
        args,
        vec![
            "--clear".to_string(),
            "--new=1:2048:3071".into(),
            format!("--typecode=1:{}", partition_types::EFI),
            "--change-name=1:EFI".into(),
            "--new=2:3072:7167".into(),
            format!("--typecode=2:{}", partition_types::LINUX_LUKS),
            "--change-name=2:system".into(),
            "/dev/sda".into(),
        ]
    );
}
