use crate::entity::action::{
    Action,
    ActionLvm,
};
use crate::entity::parse_human_bytes;
use crate::errors::VliError;
use crate::linux::lvm;
use crate::utils::shell::Executor;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeSize {
    Bytes(u64),
    /// Whatever is left in the group
    AllRemaining,
}

impl VolumeSize {
    /// `None` means all remaining space
    pub fn parse(size: Option<&str>) -> Result<Self, VliError> {
        match size {
            None => Ok(Self::AllRemaining),
            Some(s) => parse_human_bytes(s).map(Self::Bytes),
        }
    }
}

impl std::fmt::Display for VolumeSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "{}MiB", bytes / MIB),
            Self::AllRemaining => write!(f, "100%FREE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalVolume {
    pub name: String,
    pub vg: String,
    /// Actual size after extent rounding. For the remaining-space
    /// volume this is the free space at creation time.
    pub size_bytes: u64,
}

impl LogicalVolume {
    pub fn device(&self) -> String {
        format!("/dev/{}/{}", self.vg, self.name)
    }
}

/// A volume group created by us, tracking its free space locally
#[derive(Debug)]
pub struct VolumeGroup {
    pub name: String,
    pub pv: String,
    pub extent_size: u64,
    free_bytes: u64,
    volumes: Vec<LogicalVolume>,
}

/// Creates a PV on `pv` and a group `name` on top of it
pub fn create_group(
    exec: &mut dyn Executor,
    pv: &str,
    name: &str,
    progress: &mut Vec<Action>,
) -> Result<VolumeGroup, VliError> {
    lvm::create_pv(exec, pv)
        .map_err(|err| VliError::Lvm(format!("failed to create pv {pv}: {err}")))?;
    progress.push(ActionLvm::CreatePv(pv.to_string()).into());

    lvm::create_vg(exec, name, pv)
        .map_err(|err| VliError::Lvm(format!("failed to create vg {name} on {pv}: {err}")))?;
    progress.push(
        ActionLvm::CreateVg {
            pv: pv.to_string(),
            vg: name.to_string(),
        }
        .into(),
    );

    let (free_bytes, extent_size) = lvm::vg_free(exec, name)?;
    tracing::info!(vg = name, free_bytes, extent_size, "created volume group");

    Ok(VolumeGroup {
        name: name.to_string(),
        pv: pv.to_string(),
        extent_size,
        free_bytes,
        volumes: Vec::new(),
    })
}

impl VolumeGroup {
    pub fn free_bytes(&self) -> u64 {
        self.free_bytes
    }

    pub fn volumes(&self) -> &[LogicalVolume] {
        &self.volumes
    }

    /// Creates a logical volume, rounding absolute sizes up to whole extents.
    ///
    /// `AllRemaining` takes the rest of the group and may be used once.
    pub fn create_volume(
        &mut self,
        exec: &mut dyn Executor,
        name: &str,
        size: VolumeSize,
        progress: &mut Vec<Action>,
    ) -> Result<LogicalVolume, VliError> {
        if self.volumes.iter().any(|lv| lv.name == name) {
            return Err(VliError::Lvm(format!(
                "duplicate lv {name} in vg {}",
                self.name
            )));
        }

        let (mib, size_bytes) = match size {
            VolumeSize::Bytes(0) => {
                return Err(VliError::Lvm(format!("lv {name} has zero size")));
            }

            VolumeSize::Bytes(bytes) => {
                let rounded = bytes.div_ceil(self.extent_size) * self.extent_size;
                if rounded > self.free_bytes {
                    return Err(VliError::Lvm(format!(
                        "lv {name} needs {rounded} bytes, vg {} has {} bytes free",
                        self.name, self.free_bytes
                    )));
                }

                (Some(rounded.div_ceil(MIB)), rounded)
            }

            VolumeSize::AllRemaining => {
                if self.free_bytes == 0 {
                    return Err(VliError::Lvm(format!(
                        "no space left in vg {} for lv {name}",
                        self.name
                    )));
                }

                (None, self.free_bytes)
            }
        };

        lvm::create_lv(exec, &self.name, name, mib)
            .map_err(|err| VliError::Lvm(format!("failed to create lv {name}: {err}")))?;

        self.free_bytes -= size_bytes;
        progress.push(
            ActionLvm::CreateLv {
                vg: self.name.clone(),
                lv: name.to_string(),
                size: size.to_string(),
            }
            .into(),
        );

        let lv = LogicalVolume {
            name: name.to_string(),
            vg: self.name.clone(),
            size_bytes,
        };

        tracing::info!(lv = %lv.device(), size_bytes, "created logical volume");
        self.volumes.push(lv.clone());

        Ok(lv)
    }
}

/// Deactivates `vg`, then removes it if `remove` is set
pub fn release_group(
    exec: &mut dyn Executor,
    vg: &str,
    remove: bool,
    progress: &mut Vec<Action>,
) -> Result<(), VliError> {
    lvm::deactivate_vg(exec, vg)
        .map_err(|err| VliError::Lvm(format!("failed to deactivate vg {vg}: {err}")))?;
    progress.push(ActionLvm::DeactivateVg(vg.to_string()).into());

    if !remove {
        return Ok(());
    }

    lvm::remove_vg(exec, vg)
        .map_err(|err| VliError::Lvm(format!("failed to remove vg {vg}: {err}")))?;
    progress.push(ActionLvm::RemoveVg(vg.to_string()).into());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::fake::FakeSystem;

    const GIB: u64 = 1024 * MIB;

    fn group(sys: &mut FakeSystem) -> VolumeGroup {
        create_group(sys, "/dev/mapper/cryptsys", "vg0", &mut vec![]).unwrap()
    }

    #[test]
    fn test_create_group() {
        let mut sys = FakeSystem::new();
        sys.pv_bytes = 10 * GIB + 123;

        let mut progress = Vec::new();
        let vg = create_group(&mut sys, "/dev/mapper/cryptsys", "vg0", &mut progress).unwrap();

        assert_eq!(vg.pv, "/dev/mapper/cryptsys");
        assert_eq!(vg.free_bytes(), 10 * GIB);
        assert_eq!(vg.extent_size, 4 * MIB);
        assert_eq!(progress.len(), 2);
        assert!(sys.ran("pvcreate", None));
    }

    #[test]
    fn test_create_group_collision() {
        let mut sys = FakeSystem::new();
        group(&mut sys);

        assert!(matches!(
            create_group(&mut sys, "/dev/mapper/other", "vg0", &mut vec![]),
            Err(VliError::Lvm(_))
        ));
    }

    #[test]
    fn test_create_volumes() {
        let mut sys = FakeSystem::new();
        sys.pv_bytes = 100 * GIB;
        let mut vg = group(&mut sys);
        let mut progress = Vec::new();

        let root = vg
            .create_volume(&mut sys, "root", VolumeSize::Bytes(64 * GIB), &mut progress)
            .unwrap();
        assert_eq!(root.device(), "/dev/vg0/root");
        assert_eq!(root.size_bytes, 64 * GIB);

        // 1 MiB rounds up to a whole 4 MiB extent
        let tiny = vg
            .create_volume(&mut sys, "tiny", VolumeSize::Bytes(MIB), &mut progress)
            .unwrap();
        assert_eq!(tiny.size_bytes, 4 * MIB);
        assert_eq!(sys.history.last().unwrap()[3], "4m");

        let home = vg
            .create_volume(&mut sys, "home", VolumeSize::AllRemaining, &mut progress)
            .unwrap();
        assert_eq!(home.size_bytes, 36 * GIB - 4 * MIB);
        assert_eq!(vg.free_bytes(), 0);
        assert_eq!(vg.volumes().len(), 3);

        let total: u64 = vg.volumes().iter().map(|lv| lv.size_bytes).sum();
        assert_eq!(total, 100 * GIB);
    }

    #[test]
    fn test_remaining_twice() {
        let mut sys = FakeSystem::new();
        let mut vg = group(&mut sys);

        vg.create_volume(&mut sys, "home", VolumeSize::AllRemaining, &mut vec![])
            .unwrap();

        assert!(matches!(
            vg.create_volume(&mut sys, "data", VolumeSize::AllRemaining, &mut vec![]),
            Err(VliError::Lvm(_))
        ));
        assert_eq!(sys.count("lvcreate", None), 1);
    }

    #[test]
    fn test_remaining_first_exhausts_group() {
        let mut sys = FakeSystem::new();
        let mut vg = group(&mut sys);

        vg.create_volume(&mut sys, "root", VolumeSize::AllRemaining, &mut vec![])
            .unwrap();

        assert!(matches!(
            vg.create_volume(&mut sys, "var", VolumeSize::Bytes(GIB), &mut vec![]),
            Err(VliError::Lvm(_))
        ));
    }

    #[test]
    fn test_duplicate_name() {
        let mut sys = FakeSystem::new();
        let mut vg = group(&mut sys);

        vg.create_volume(&mut sys, "root", VolumeSize::Bytes(GIB), &mut vec![])
            .unwrap();
        assert!(vg
            .create_volume(&mut sys, "root", VolumeSize::Bytes(GIB), &mut vec![])
            .is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(VolumeSize::parse(None).unwrap(), VolumeSize::AllRemaining);
        assert_eq!(
            VolumeSize::parse(Some("8GiB")).unwrap(),
            VolumeSize::Bytes(8 * GIB)
        );
        assert!(VolumeSize::parse(Some("lots")).is_err());
    }

    #[test]
    fn test_release_group() {
        let mut sys = FakeSystem::new();
        group(&mut sys);

        let mut progress = Vec::new();
        release_group(&mut sys, "vg0", false, &mut progress).unwrap();
        assert!(sys.vgs.contains_key("vg0"));

        release_group(&mut sys, "vg0", true, &mut progress).unwrap();
        assert!(!sys.vgs.contains_key("vg0"));
        assert_eq!(progress.len(), 3);
    }
}
