mod teardown;

pub use teardown::{
    release,
    teardown,
    Resources,
};

use std::time::Instant;

use crate::entity::action::{
    Action,
    ActionDisk,
};
use crate::entity::blockdev::{
    CipherParams,
    FsKind,
    PartitionLayout,
    PartitionRole,
};
use crate::entity::report::{
    Report,
    Warning,
};
use crate::entity::stage::Stage;
use crate::errors::VliError;
use crate::manifest::{
    validation,
    Manifest,
};
use crate::provision::encryption::{
    self,
    EncryptionSecret,
    TokenChallenge,
};
use crate::provision::filesystem::{
    self,
    Filesystem,
};
use crate::provision::mount::{
    self,
    MountPlan,
};
use crate::provision::partition::{
    self,
    PartitionLabels,
    PartitionSizes,
};
use crate::provision::volume::{
    self,
    VolumeSize,
};
use crate::provision::{
    device,
    persist,
};
use crate::utils::shell::Executor;

/// Drives one installation from a validated manifest to a mounted,
/// configured target tree under `location`.
///
/// Stages only move forward. If anything fails once the disk has been
/// touched, everything acquired on the live system is released again
/// (mounts, volume group, LUKS mapping). The partition table is left as is.
pub struct Installer<'a> {
    manifest: &'a Manifest,
    location: String,
    exec: &'a mut dyn Executor,

    stage: Stage,
    touched: bool,
    held: Resources,
    progress: Vec<Action>,
    warnings: Vec<Warning>,
}

impl<'a> Installer<'a> {
    pub fn new(manifest: &'a Manifest, location: &str, exec: &'a mut dyn Executor) -> Self {
        Self {
            manifest,
            location: location.to_string(),
            exec,
            stage: Stage::Unvalidated,
            touched: false,
            held: Resources::default(),
            progress: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Validates the manifest and target device, then computes the
    /// partition layout. Read-only.
    pub fn plan(&mut self) -> Result<PartitionLayout, VliError> {
        validation::validate(self.manifest)?;

        let device = device::validate(
            &mut *self.exec,
            &self.manifest.device,
            &self.manifest.volumes.vg,
        )?;
        self.progress.push(
            ActionDisk::ValidateDevice {
                device: device.path.clone(),
            }
            .into(),
        );

        let sizes = PartitionSizes {
            boot: self.manifest.boot_bytes()?,
            swap: self.manifest.swap_bytes()?,
        };

        let labels = PartitionLabels {
            boot: self.manifest.boot.label.clone(),
            swap: self
                .manifest
                .swap
                .as_ref()
                .map(|swap| swap.label.clone())
                .unwrap_or_default(),
            system: self.manifest.luks.label.clone(),
        };

        let layout = partition::plan(&device, &sizes, &labels)?;
        self.progress.push(
            ActionDisk::PlanPartitions {
                device: device.path.clone(),
                partitions: layout.partitions.len(),
            }
            .into(),
        );

        self.stage.advance(Stage::Planned)?;
        Ok(layout)
    }

    /// Runs the whole installation. `confirm` sees the planned layout
    /// and must return true before anything is written to disk.
    pub fn install<F>(mut self, confirm: F) -> Result<Report, VliError>
    where
        F: FnOnce(&PartitionLayout) -> bool,
    {
        let start = Instant::now();

        let layout = match self.plan() {
            Ok(layout) => layout,
            Err(err) => return Err(self.fail(err)),
        };

        if !confirm(&layout) {
            tracing::info!(device = %layout.device.path, "installation aborted by user");
            return Err(VliError::Aborted);
        }

        if let Err(err) = self.provision(&layout) {
            return Err(self.fail(err));
        }

        tracing::info!(location = %self.location, "installation done");

        Ok(Report {
            location: self.location,
            device: self.manifest.device.clone(),
            stage_reached: self.stage,
            summary: Box::new(self.progress.into()),
            warnings: self.warnings,
            duration: start.elapsed(),
        })
    }

    fn provision(&mut self, layout: &PartitionLayout) -> Result<(), VliError> {
        let manifest = self.manifest;
        let params = CipherParams::policy();

        self.touched = true;
        partition::apply(&mut *self.exec, layout, &mut self.progress)?;
        self.stage.advance(Stage::PartitionsWritten)?;

        // Container
        let system = partition_device(layout, PartitionRole::System)?;
        let secret = unlock_secret(manifest)?;

        let container = encryption::format(
            &mut *self.exec,
            &system,
            &manifest.luks.name,
            &secret,
            &params,
            &mut self.progress,
        )?;

        let mapper = encryption::open(&mut *self.exec, &container, &secret, &mut self.progress)?;
        self.held.luks = Some(container.name.clone());

        if let Some(recovery) = &manifest.luks.recovery_passphrase {
            encryption::add_recovery_key(
                &mut *self.exec,
                &container,
                &secret,
                &EncryptionSecret::passphrase(recovery),
                &params,
                &mut self.progress,
            )?;
        }

        self.stage.advance(Stage::ContainerOpen)?;

        // Volumes
        let mut vg = volume::create_group(
            &mut *self.exec,
            &mapper,
            &manifest.volumes.vg,
            &mut self.progress,
        )?;
        self.held.vg = Some(vg.name.clone());

        let mut filesystems = vec![Filesystem {
            device: partition_device(layout, PartitionRole::Boot)?,
            kind: FsKind::Vfat,
            label: manifest.boot.label.clone(),
            mountpoint: Some(manifest.boot.mountpoint.clone()),
            fs_opts: manifest.boot.fs_opts.clone(),
            mnt_opts: manifest.boot.mnt_opts.clone(),
        }];

        if let Some(swap) = layout.get(PartitionRole::Swap) {
            filesystems.push(Filesystem {
                device: swap.device.clone(),
                kind: FsKind::Swap,
                label: swap.label.clone(),
                mountpoint: None,
                fs_opts: None,
                mnt_opts: None,
            });
        }

        for lv in &manifest.volumes.lvs {
            let size = VolumeSize::parse(lv.size.as_deref())?;
            let volume = vg.create_volume(&mut *self.exec, &lv.name, size, &mut self.progress)?;

            filesystems.push(Filesystem {
                device: volume.device(),
                kind: lv.fs_type,
                label: lv.label().to_string(),
                mountpoint: lv.mountpoint.clone(),
                fs_opts: lv.fs_opts.clone(),
                mnt_opts: lv.mnt_opts.clone(),
            });
        }

        tracing::info!(
            vg = %vg.name,
            pv = %vg.pv,
            volumes = vg.volumes().len(),
            free_bytes = vg.free_bytes(),
            "volumes created"
        );
        self.stage.advance(Stage::VolumesCreated)?;

        // Filesystems
        for fs in &filesystems {
            filesystem::format(&mut *self.exec, fs, &mut self.progress)?;
        }

        self.stage.advance(Stage::Formatted)?;

        // Mounts
        let plan = MountPlan::build(&self.location, &filesystems)?;
        self.held.swaps = plan.swaps.clone();

        let warnings = mount::mount(&mut *self.exec, &plan, &mut self.progress)?;
        self.warnings.extend(warnings);
        self.stage.advance(Stage::Mounted)?;

        // Target configuration
        persist::write_fstab(&self.location, &filesystems, &mut self.progress)?;
        let uuid = persist::write_crypttab(
            &mut *self.exec,
            &self.location,
            &container,
            &mut self.progress,
        )?;
        persist::write_unlock_helper(
            &self.location,
            &container,
            &uuid,
            &secret,
            &mut self.progress,
        )?;

        Ok(())
    }

    /// Rolls back if the disk was touched, and wraps `err` with progress
    fn fail(mut self, err: VliError) -> VliError {
        if self.touched {
            tracing::error!(stage = %self.stage, "installation failed, rolling back: {err}");

            let warnings = release(
                &mut *self.exec,
                &self.location,
                &self.held,
                true,
                &mut self.progress,
            );

            self.warnings.extend(warnings);
        }

        VliError::InstallError {
            error: Box::new(err),
            stage_reached: self.stage,
            actions_performed: self.progress,
            warnings: self.warnings,
        }
    }
}

fn partition_device(layout: &PartitionLayout, role: PartitionRole) -> Result<String, VliError> {
    layout
        .get(role)
        .map(|part| part.device.clone())
        .ok_or_else(|| VliError::VliRsBug(format!("no {role:?} partition in layout")))
}

/// With a token, a fresh key blob bound to the token's response.
/// Otherwise the manifest passphrase.
fn unlock_secret(manifest: &Manifest) -> Result<EncryptionSecret, VliError> {
    let luks = &manifest.luks;

    match (&luks.token, &luks.passphrase) {
        (Some(token), _) => Ok(EncryptionSecret::generate(TokenChallenge {
            slot: token.slot,
            challenge: token
                .challenge
                .clone()
                .unwrap_or_else(encryption::random_challenge),
        })),

        (None, Some(passphrase)) => Ok(EncryptionSecret::passphrase(passphrase)),

        (None, None) => Err(VliError::BadManifest(
            "luks needs either a token or a passphrase".into(),
        )),
    }
}
