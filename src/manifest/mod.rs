pub mod validation;

use std::path::Path;

use serde::{
    Deserialize,
    Serialize,
};

use crate::constants::defaults;
use crate::entity::blockdev::FsKind;
use crate::entity::parse_human_bytes;
use crate::errors::VliError;

/// Everything the installer needs to know, passed in once at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(alias = "install_location", alias = "mnt")]
    pub location: Option<String>,

    #[serde(alias = "disk")]
    pub device: String,

    #[serde(default)]
    pub boot: ManifestBoot,

    pub swap: Option<ManifestSwap>,

    #[serde(default, alias = "encryption")]
    pub luks: ManifestLuks,

    #[serde(alias = "lvm")]
    pub volumes: ManifestLvm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestBoot {
    #[serde(default = "default_boot_size")]
    pub size: String,

    #[serde(default = "default_boot_label")]
    pub label: String,

    #[serde(default = "default_boot_mountpoint", alias = "mount")]
    pub mountpoint: String,

    #[serde(alias = "fsopts", alias = "filesystem_options")]
    pub fs_opts: Option<String>,

    #[serde(alias = "mntopts", alias = "mount_options")]
    pub mnt_opts: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestSwap {
    pub size: String,

    #[serde(default = "default_swap_label")]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestLuks {
    /// Mapper name, i.e. /dev/mapper/{name}
    #[serde(default = "default_luks_name")]
    pub name: String,

    /// GPT partition name of the system partition
    #[serde(default = "default_system_label")]
    pub label: String,

    // Used as the unlock secret when no token is configured
    #[serde(alias = "key")]
    pub passphrase: Option<String>,

    #[serde(alias = "yubikey")]
    pub token: Option<ManifestToken>,

    /// Second key slot, so the volume survives a lost token
    #[serde(alias = "recovery", alias = "backup_passphrase")]
    pub recovery_passphrase: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestToken {
    #[serde(default = "default_token_slot")]
    pub slot: u8,

    /// Hex challenge. A random one is generated if omitted.
    pub challenge: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestLvm {
    #[serde(default = "default_vg_name", alias = "vg_name")]
    pub vg: String,

    /// Created in order. The only unsized volume must come last.
    pub lvs: Vec<ManifestLv>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestLv {
    pub name: String,

    // None means all remaining free space
    pub size: Option<String>,

    #[serde(rename = "fs", alias = "fstype", alias = "filesystem")]
    pub fs_type: FsKind,

    // Defaults to the LV name
    pub label: Option<String>,

    #[serde(alias = "mount", alias = "mount_point")]
    pub mountpoint: Option<String>,

    #[serde(alias = "fsopts", alias = "filesystem_options")]
    pub fs_opts: Option<String>,

    #[serde(alias = "mntopts", alias = "mount_options")]
    pub mnt_opts: Option<String>,
}

impl ManifestLv {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

impl Default for ManifestBoot {
    fn default() -> Self {
        Self {
            size: default_boot_size(),
            label: default_boot_label(),
            mountpoint: default_boot_mountpoint(),
            fs_opts: None,
            mnt_opts: None,
        }
    }
}

impl Default for ManifestLuks {
    fn default() -> Self {
        Self {
            name: default_luks_name(),
            label: default_system_label(),
            passphrase: None,
            token: None,
            recovery_passphrase: None,
        }
    }
}

impl Manifest {
    #[inline]
    pub fn from_yaml(manifest_yaml: &str) -> Result<Self, VliError> {
        serde_yaml::from_str(manifest_yaml)
            .map_err(|err| VliError::BadManifest(err.to_string()))
    }

    #[inline]
    pub fn from_toml(manifest_toml: &str) -> Result<Self, VliError> {
        toml::from_str(manifest_toml)
            .map_err(|err| VliError::BadManifest(err.to_string()))
    }

    /// Reads a manifest file, choosing the parser by file extension
    pub fn from_file(manifest_file: &str) -> Result<Self, VliError> {
        let content = std::fs::read_to_string(manifest_file)
            .map_err(|err| VliError::FileError(err, manifest_file.to_string()))?;

        match Path::new(manifest_file).extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_yaml(&content),
        }
    }

    pub fn boot_bytes(&self) -> Result<u64, VliError> {
        parse_human_bytes(&self.boot.size)
    }

    pub fn swap_bytes(&self) -> Result<u64, VliError> {
        match &self.swap {
            Some(swap) => parse_human_bytes(&swap.size),
            None => Ok(0),
        }
    }

    /// Whether a swap partition gets created. A zero size means none.
    pub fn has_swap(&self) -> bool {
        matches!(self.swap_bytes(), Ok(size) if size > 0)
    }
}

fn default_boot_size() -> String {
    defaults::BOOT_SIZE.to_string()
}

fn default_boot_label() -> String {
    defaults::BOOT_LABEL.to_string()
}

fn default_boot_mountpoint() -> String {
    defaults::BOOT_MOUNTPOINT.to_string()
}

fn default_swap_label() -> String {
    defaults::SWAP_LABEL.to_string()
}

fn default_luks_name() -> String {
    defaults::LUKS_NAME.to_string()
}

fn default_system_label() -> String {
    defaults::SYSTEM_LABEL.to_string()
}

fn default_token_slot() -> u8 {
    defaults::TOKEN_SLOT
}

fn default_vg_name() -> String {
    defaults::VG_NAME.to_string()
}

#[cfg(test)]
pub(crate) const EXAMPLE_YAML: &str = r#"
device: /dev/nvme0n1
location: /mnt

boot:
  size: 2048MiB

swap:
  size: 40960MiB

luks:
  name: cryptsys
  token:
    slot: 2
    challenge: 00112233445566778899aabbccddeeff
  recovery_passphrase: correct horse battery staple

lvm:
  vg: void
  lvs:
    - name: root
      size: 64GiB
      fs: xfs
      mountpoint: /
      fs_opts: -d su=128k,sw=1
      mnt_opts: defaults,noatime
    - name: var
      size: 32GiB
      fs: xfs
      mountpoint: /var
    - name: tmp
      size: 8GiB
      fs: ext4
      mountpoint: /tmp
    - name: home
      fs: xfs
      mountpoint: /home
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml() {
        let manifest = Manifest::from_yaml(EXAMPLE_YAML).unwrap();

        assert_eq!(manifest.device, "/dev/nvme0n1");
        assert_eq!(manifest.boot.label, "EFI");
        assert_eq!(manifest.boot.mountpoint, "/boot");
        assert_eq!(manifest.boot_bytes().unwrap(), 2048 * 1024 * 1024);
        assert_eq!(manifest.swap_bytes().unwrap(), 40960 * 1024 * 1024);
        assert_eq!(manifest.luks.token.as_ref().unwrap().slot, 2);
        assert_eq!(manifest.volumes.vg, "void");
        assert_eq!(manifest.volumes.lvs.len(), 4);
        assert_eq!(manifest.volumes.lvs[2].fs_type, FsKind::Ext4);
        assert!(manifest.volumes.lvs[3].size.is_none());
        assert_eq!(manifest.volumes.lvs[3].label(), "home");
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
device = "/dev/sda"

[luks]
passphrase = "pass1234"

[volumes]
lvs = [
    { name = "root", fs = "ext4", mountpoint = "/" },
]
"#;

        let manifest = Manifest::from_toml(toml).unwrap();
        assert_eq!(manifest.device, "/dev/sda");
        assert_eq!(manifest.luks.name, "cryptsys");
        assert_eq!(manifest.volumes.vg, "vg0");
        assert!(manifest.swap.is_none());
        assert_eq!(manifest.swap_bytes().unwrap(), 0);
        assert!(!manifest.has_swap());
    }

    #[test]
    fn test_zero_swap() {
        let yaml = r#"
device: /dev/vdb
swap:
  size: 0g
luks:
  passphrase: pass1234
lvm:
  lvs:
    - name: root
      fs: ext4
      mountpoint: /
"#;

        let manifest = Manifest::from_yaml(yaml).unwrap();
        assert!(manifest.swap.is_some());
        assert!(!manifest.has_swap());

        let manifest = Manifest::from_yaml(EXAMPLE_YAML).unwrap();
        assert!(manifest.has_swap());
    }

    #[test]
    fn test_parse_bad_fs() {
        let yaml = r#"
device: /dev/sda
lvm:
  lvs:
    - name: root
      fs: ntfs
"#;

        assert!(matches!(
            Manifest::from_yaml(yaml),
            Err(VliError::BadManifest(_))
        ));
    }
}
