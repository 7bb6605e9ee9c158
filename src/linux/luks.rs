use std::path::Path;

use crate::constants::{
    LUKS_SLOT_PRIMARY,
    LUKS_SLOT_RECOVERY,
};
use crate::entity::blockdev::CipherParams;
use crate::errors::VliError;
use crate::utils::shell::Executor;

// Secrets are only ever passed as key files, never as arguments

/// Executes:
/// ```shell
/// cryptsetup luksFormat --batch-mode --type luks2 --cipher aes-xts-plain64 \
///     --key-size 512 --hash sha512 --pbkdf argon2id --iter-time 5000 \
///     --sector-size 4096 --key-slot 0 --key-file ${{ key_file }} ${{ device }}
/// ```
pub fn format(
    exec: &mut dyn Executor,
    device: &str,
    key_file: &Path,
    params: &CipherParams,
) -> Result<(), VliError> {
    let key_file = key_file.to_string_lossy();
    let key_size = params.key_size_bits.to_string();
    let iter_time = params.iter_time_ms.to_string();
    let sector_size = params.sector_size.to_string();

    exec.exec(
        "cryptsetup",
        &[
            "luksFormat",
            "--batch-mode",
            "--type",
            params.luks_type,
            "--cipher",
            params.cipher,
            "--key-size",
            &key_size,
            "--hash",
            params.hash,
            "--pbkdf",
            params.pbkdf,
            "--iter-time",
            &iter_time,
            "--sector-size",
            &sector_size,
            "--key-slot",
            LUKS_SLOT_PRIMARY,
            "--key-file",
            &key_file,
            device,
        ],
    )
}

/// Executes:
/// ```shell
/// cryptsetup open --type luks2 --key-file ${{ key_file }} ${{ device }} ${{ name }}
/// ```
pub fn open(
    exec: &mut dyn Executor,
    device: &str,
    key_file: &Path,
    name: &str,
) -> Result<(), VliError> {
    let key_file = key_file.to_string_lossy();

    exec.exec(
        "cryptsetup",
        &[
            "open",
            "--type",
            "luks2",
            "--key-file",
            &key_file,
            device,
            name,
        ],
    )
}

/// Executes:
/// ```shell
/// cryptsetup luksAddKey --batch-mode --key-slot 1 --pbkdf argon2id \
///     --iter-time 5000 --key-file ${{ key_file }} ${{ device }} ${{ new_key_file }}
/// ```
pub fn add_key(
    exec: &mut dyn Executor,
    device: &str,
    key_file: &Path,
    new_key_file: &Path,
    params: &CipherParams,
) -> Result<(), VliError> {
    let key_file = key_file.to_string_lossy();
    let new_key_file = new_key_file.to_string_lossy();
    let iter_time = params.iter_time_ms.to_string();

    exec.exec(
        "cryptsetup",
        &[
            "luksAddKey",
            "--batch-mode",
            "--key-slot",
            LUKS_SLOT_RECOVERY,
            "--pbkdf",
            params.pbkdf,
            "--iter-time",
            &iter_time,
            "--key-file",
            &key_file,
            device,
            &new_key_file,
        ],
    )
}

/// Executes:
/// ```shell
/// cryptsetup close ${{ name }}
/// ```
pub fn close(exec: &mut dyn Executor, name: &str) -> Result<(), VliError> {
    exec.exec("cryptsetup", &["close", name])
}

/// Executes:
/// ```shell
/// cryptsetup luksUUID ${{ device }}
/// ```
pub fn uuid(exec: &mut dyn Executor, device: &str) -> Result<String, VliError> {
    let out = exec.output("cryptsetup", &["luksUUID", device])?;
    let uuid = out.trim();

    if uuid.is_empty() {
        return Err(VliError::VliRsBug(format!(
            "empty luksUUID output for {device}"
        )));
    }

    Ok(uuid.to_string())
}

/// cryptsetup exit codes, see cryptsetup(8)
pub mod exit_codes {
    pub const NO_PERMISSION: i32 = 2;
    pub const WRONG_DEVICE: i32 = 4;
    pub const DEVICE_BUSY: i32 = 5;
}

#[cfg(test)]
mod tests {
    use super::{
        close,
        format,
        open,
    };
    use crate::entity::blockdev::CipherParams;
    use crate::linux::is_root;
    use crate::utils::shell::{
        in_path,
        SystemExecutor,
    };

    #[ignore = "needs cryptsetup, root and a scratch image"]
    #[test]
    fn test_luks() {
        if !in_path("cryptsetup") || !is_root() {
            println!("WARN: skipping luks tests - no cryptsetup in path or not root");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("fake-luks.img");
        let key = dir.path().join("key");
        let opened_name = "vlifakeluks";

        std::fs::File::create(&img)
            .and_then(|f| f.set_len(64 * 1024 * 1024))
            .unwrap();
        std::fs::write(&key, b"pass1234").unwrap();

        let img = img.to_string_lossy().to_string();
        let mut exec = SystemExecutor;

        format(&mut exec, &img, &key, &CipherParams::policy()).expect("luksFormat failed");
        open(&mut exec, &img, &key, opened_name).expect("luksOpen failed");
        close(&mut exec, opened_name).expect("luksClose failed");
    }
}
