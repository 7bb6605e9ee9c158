use crate::constants::{
    defaults,
    ALIGNMENT_OFFSET_SECTORS,
    GPT_ENTRY_ARRAY_BYTES,
};
use crate::entity::action::{
    Action,
    ActionDisk,
};
use crate::entity::blockdev::{
    partition_types,
    DeviceSpec,
    Partition,
    PartitionLayout,
    PartitionRole,
};
use crate::errors::VliError;
use crate::linux::{
    partition_name,
    sgdisk,
};
use crate::utils::shell::Executor;

const MIB: u64 = 1024 * 1024;

/// Requested sizes in bytes. A zero swap size means no swap partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionSizes {
    pub boot: u64,
    pub swap: u64,
}

/// GPT partition names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionLabels {
    pub boot: String,
    pub swap: String,
    pub system: String,
}

impl Default for PartitionLabels {
    fn default() -> Self {
        Self {
            boot: defaults::BOOT_LABEL.to_string(),
            swap: defaults::SWAP_LABEL.to_string(),
            system: defaults::SYSTEM_LABEL.to_string(),
        }
    }
}

/// Sectors at the end of the disk taken by the backup GPT
pub fn gpt_backup_sectors(sector_size: u64) -> u64 {
    1 + GPT_ENTRY_ARRAY_BYTES.div_ceil(sector_size)
}

/// Sectors available to partitions, between the alignment offset
/// and the backup GPT
pub fn usable_sectors(device: &DeviceSpec) -> u64 {
    device
        .total_sectors()
        .saturating_sub(ALIGNMENT_OFFSET_SECTORS + gpt_backup_sectors(device.sector_size))
}

/// Computes the layout boot | swap | system without touching the disk.
///
/// Boot and swap sizes are rounded up to whole MiB so every partition
/// starts 1 MiB aligned. The system partition takes everything left.
pub fn plan(
    device: &DeviceSpec,
    sizes: &PartitionSizes,
    labels: &PartitionLabels,
) -> Result<PartitionLayout, VliError> {
    let ss = device.sector_size;
    let usable = usable_sectors(device);

    let boot = to_aligned_sectors(sizes.boot, ss);
    let swap = to_aligned_sectors(sizes.swap, ss);

    if boot == 0 {
        return Err(VliError::BadManifest("boot partition size is zero".into()));
    }

    if boot + swap >= usable {
        return Err(VliError::InsufficientSpace {
            device: device.path.clone(),
            required: (boot + swap) * ss,
            available: usable * ss,
        });
    }

    let mut partitions = Vec::with_capacity(3);
    let mut start = ALIGNMENT_OFFSET_SECTORS;

    let mut push = |role: PartitionRole, sectors: u64, type_guid: &str, label: &str| {
        let index = partitions.len() as u32 + 1;
        partitions.push(Partition {
            index,
            role,
            start_sector: start,
            sectors,
            type_guid: type_guid.to_string(),
            label: label.to_string(),
            device: partition_name(&device.path, index),
        });

        start += sectors;
    };

    push(PartitionRole::Boot, boot, partition_types::EFI, &labels.boot);

    if swap > 0 {
        push(PartitionRole::Swap, swap, partition_types::LINUX_SWAP, &labels.swap);
    }

    push(
        PartitionRole::System,
        usable - boot - swap,
        partition_types::LINUX_LUKS,
        &labels.system,
    );

    tracing::debug!(device = %device.path, ?partitions, "planned partitions");

    Ok(PartitionLayout {
        device: device.clone(),
        partitions,
    })
}

/// Writes `layout` to disk, replacing any existing partition table
pub fn apply(
    exec: &mut dyn Executor,
    layout: &PartitionLayout,
    progress: &mut Vec<Action>,
) -> Result<(), VliError> {
    let device = &layout.device.path;

    tracing::info!(%device, "wiping partition table");
    sgdisk::zap(exec, device)?;
    progress.push(
        ActionDisk::ZapPartitionTable {
            device: device.clone(),
        }
        .into(),
    );

    sgdisk::create_partitions(exec, device, &layout.partitions)?;
    for part in &layout.partitions {
        progress.push(
            ActionDisk::CreatePartition {
                device: device.clone(),
                number: part.index,
                label: part.label.clone(),
                start_sector: part.start_sector,
                sectors: part.sectors,
            }
            .into(),
        );
    }

    sgdisk::reload(exec, device)?;
    progress.push(
        ActionDisk::ReloadPartitions {
            device: device.clone(),
        }
        .into(),
    );

    Ok(())
}

fn to_aligned_sectors(bytes: u64, sector_size: u64) -> u64 {
    bytes.div_ceil(MIB) * MIB / sector_size
}
