pub mod defaults {
    pub const INSTALL_LOCATION: &str = "/mnt";
    pub const BOOT_SIZE: &str = "2048MiB";
    pub const BOOT_MOUNTPOINT: &str = "/boot";
    pub const BOOT_LABEL: &str = "EFI";
    pub const SWAP_LABEL: &str = "swap";
    pub const SYSTEM_LABEL: &str = "system";
    pub const LUKS_NAME: &str = "cryptsys";
    pub const VG_NAME: &str = "vg0";
    pub const TOKEN_SLOT: u8 = 2;
    pub const MNT_OPTS: &str = "defaults";
}

/// Partitioning starts at this sector, 1 MiB on 512-byte sector disks
pub const ALIGNMENT_OFFSET_SECTORS: u64 = 2048;

/// Size of the GPT partition entry array (128 entries of 128 bytes).
/// The backup GPT at the end of the disk takes this plus one header sector.
pub const GPT_ENTRY_ARRAY_BYTES: u64 = 128 * 128;

/// Random key blob length for token-based unlock
pub const KEY_BLOB_LEN: usize = 64;

/// Random challenge length for token-based unlock
pub const CHALLENGE_LEN: usize = 32;

/// Target tree directory holding unlock helpers, relative to install location
pub const UNLOCK_DIR: &str = "etc/vli";

/// Fixed LUKS2 parameters, see [`crate::entity::blockdev::CipherParams`].
/// Not user-tunable.
pub mod cipher {
    pub const TYPE: &str = "luks2";
    pub const CIPHER: &str = "aes-xts-plain64";
    pub const KEY_SIZE_BITS: u32 = 512;
    pub const HASH: &str = "sha512";
    pub const PBKDF: &str = "argon2id";
    pub const ITER_TIME_MS: u32 = 5000;
    pub const SECTOR_SIZE: u32 = 4096;
}

/// Key slots
pub const LUKS_SLOT_PRIMARY: &str = "0";
pub const LUKS_SLOT_RECOVERY: &str = "1";

pub const ENV_VLI_LOC: &str = "VLI_LOC";

// Use programs instead of bindings to avoid API dependencies
pub const REQUIRED_COMMANDS: [&str; 16] = [
    "lsblk",
    "sgdisk",
    "partprobe",
    "cryptsetup",
    "pvs",
    "pvcreate",
    "vgs",
    "vgcreate",
    "vgchange",
    "vgremove",
    "lvcreate",
    "mount",
    "umount",
    "mountpoint",
    "swapon",
    "swapoff",
];
