use serde::{
    Deserialize,
    Serialize,
};

use crate::constants::cipher;

/// GPT partition type GUIDs
pub mod partition_types {
    pub const EFI: &str = "C12A7328-F81F-11D2-BA4B-00A0C93EC93B";
    pub const LINUX_SWAP: &str = "0657FD6D-A4AB-43C4-84E5-0933C84B4F4F";
    pub const LINUX_LUKS: &str = "CA7D7CCB-63ED-4C53-861C-1742536059CC";
}

/// A raw block device eligible for destructive use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub path: String,
    pub sector_size: u64,
    pub size_bytes: u64,
}

impl DeviceSpec {
    pub fn total_sectors(&self) -> u64 {
        self.size_bytes / self.sector_size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionRole {
    Boot,
    Swap,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// 1-based GPT partition number
    pub index: u32,
    pub role: PartitionRole,
    pub start_sector: u64,
    pub sectors: u64,
    pub type_guid: String,
    pub label: String,
    /// Partition device node, e.g. /dev/nvme0n1p3
    pub device: String,
}

impl Partition {
    /// Last sector (inclusive)
    pub fn end_sector(&self) -> u64 {
        self.start_sector + self.sectors - 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionLayout {
    pub device: DeviceSpec,
    pub partitions: Vec<Partition>,
}

impl PartitionLayout {
    pub fn get(&self, role: PartitionRole) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.role == role)
    }

    pub fn bytes(&self, role: PartitionRole) -> Option<u64> {
        self.get(role).map(|p| p.sectors * self.device.sector_size)
    }
}

/// Parameters of a new LUKS container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CipherParams {
    pub luks_type: &'static str,
    pub cipher: &'static str,
    pub key_size_bits: u32,
    pub hash: &'static str,
    pub pbkdf: &'static str,
    pub iter_time_ms: u32,
    pub sector_size: u32,
}

impl CipherParams {
    pub const fn policy() -> Self {
        Self {
            luks_type: cipher::TYPE,
            cipher: cipher::CIPHER,
            key_size_bits: cipher::KEY_SIZE_BITS,
            hash: cipher::HASH,
            pbkdf: cipher::PBKDF,
            iter_time_ms: cipher::ITER_TIME_MS,
            sector_size: cipher::SECTOR_SIZE,
        }
    }
}

/// Filesystems the installer knows how to create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FsKind {
    #[serde(alias = "fat32", alias = "fat")]
    Vfat,
    Xfs,
    Ext4,
    Swap,
}

impl FsKind {
    /// Longest label the mkfs tool accepts
    pub fn max_label_len(self) -> usize {
        match self {
            FsKind::Vfat => 11,
            FsKind::Xfs => 12,
            FsKind::Ext4 => 16,
            FsKind::Swap => 15,
        }
    }

    /// Filesystem type as written in fstab
    pub fn fstab_type(self) -> &'static str {
        match self {
            FsKind::Vfat => "vfat",
            FsKind::Xfs => "xfs",
            FsKind::Ext4 => "ext4",
            FsKind::Swap => "swap",
        }
    }
}

impl std::fmt::Display for FsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fstab_type())
    }
}
