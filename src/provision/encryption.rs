use std::fmt;
use std::fs;
use std::io::{
    Seek,
    SeekFrom,
    Write,
};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use rand::RngCore;
use tempfile::NamedTempFile;
use zeroize::Zeroizing;

use crate::constants::{
    CHALLENGE_LEN,
    KEY_BLOB_LEN,
};
use crate::entity::action::{
    Action,
    ActionLuks,
};
use crate::entity::blockdev::CipherParams;
use crate::errors::{
    UnlockFailure,
    VliError,
};
use crate::linux::luks::{
    self,
    exit_codes,
};
use crate::linux::ykchalresp;
use crate::utils::shell::{
    exit_code,
    Executor,
};

/// Hardware token challenge-response configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenChallenge {
    pub slot: u8,
    /// Hex-encoded challenge
    pub challenge: String,
}

/// Unlock material for a LUKS container.
///
/// Without a token the key is the passphrase itself. With a token,
/// the key is a random blob and the effective secret is the token's
/// response to `challenge` followed by the blob.
pub struct EncryptionSecret {
    token: Option<TokenChallenge>,
    key: Zeroizing<Vec<u8>>,
}

impl EncryptionSecret {
    pub fn passphrase(passphrase: &str) -> Self {
        Self {
            token: None,
            key: Zeroizing::new(passphrase.as_bytes().to_vec()),
        }
    }

    pub fn with_token(token: TokenChallenge, key: Zeroizing<Vec<u8>>) -> Self {
        Self {
            token: Some(token),
            key,
        }
    }

    /// Token-bound secret with a fresh random key blob
    pub fn generate(token: TokenChallenge) -> Self {
        let mut key = Zeroizing::new(vec![0u8; KEY_BLOB_LEN]);
        rand::thread_rng().fill_bytes(&mut key);

        Self::with_token(token, key)
    }

    pub fn token(&self) -> Option<&TokenChallenge> {
        self.token.as_ref()
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Bytes cryptsetup actually sees. Talks to the token if there is one.
    fn composite(
        &self,
        exec: &mut dyn Executor,
        device: &str,
    ) -> Result<Zeroizing<Vec<u8>>, VliError> {
        let Some(token) = &self.token else {
            return Ok(self.key.clone());
        };

        let response = ykchalresp::challenge_response(exec, token.slot, &token.challenge)
            .map_err(|err| VliError::Unlock {
                device: device.to_string(),
                reason: UnlockFailure::TokenUnavailable(err.to_string()),
            })?;

        let mut composite = Zeroizing::new(Vec::with_capacity(response.len() + self.key.len()));
        composite.extend_from_slice(&response);
        composite.extend_from_slice(&self.key);

        Ok(composite)
    }
}

impl fmt::Debug for EncryptionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionSecret")
            .field("token", &self.token)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Random hex challenge for a new token binding
pub fn random_challenge() -> String {
    let mut challenge = [0u8; CHALLENGE_LEN];
    rand::thread_rng().fill_bytes(&mut challenge);

    hex::encode(challenge)
}

/// A key file readable only by us, overwritten and unlinked on drop
struct SecretFile {
    file: NamedTempFile,
    len: usize,
}

impl SecretFile {
    fn create(material: &[u8]) -> Result<Self, VliError> {
        let file = tempfile::Builder::new()
            .prefix(".vli-key-")
            .tempfile()
            .map_err(|err| VliError::FileError(err, "secret key file".into()))?;

        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o600))
            .map_err(|err| VliError::FileError(err, file.path().to_string_lossy().into()))?;

        let mut secret = Self {
            file,
            len: material.len(),
        };

        let written = secret.file.as_file_mut().write_all(material);
        written
            .and_then(|_| secret.file.as_file().sync_all())
            .map_err(|err| {
                VliError::FileError(err, secret.path().to_string_lossy().into())
            })?;

        Ok(secret)
    }

    fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for SecretFile {
    fn drop(&mut self) {
        let zeros = vec![0u8; self.len];
        let f = self.file.as_file_mut();

        let wiped = f
            .seek(SeekFrom::Start(0))
            .and_then(|_| f.write_all(&zeros))
            .and_then(|_| f.sync_all());

        if let Err(err) = wiped {
            tracing::warn!("failed to wipe key file {}: {err}", self.file.path().display());
        }
    }
}

/// Runs `f` with the composite secret of `secret` available as a key file
fn with_key_file<T>(
    exec: &mut dyn Executor,
    device: &str,
    secret: &EncryptionSecret,
    f: impl FnOnce(&mut dyn Executor, &Path) -> Result<T, VliError>,
) -> Result<T, VliError> {
    let key_file = {
        let material = secret.composite(exec, device)?;
        SecretFile::create(&material)?
    };

    f(exec, key_file.path())
}

/// A formatted LUKS2 partition and the mapper name it opens as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedContainer {
    pub device: String,
    pub name: String,
}

impl EncryptedContainer {
    pub fn mapper(&self) -> String {
        format!("/dev/mapper/{}", self.name)
    }
}

/// Formats `partition` as LUKS2 with `secret` in the primary key slot
pub fn format(
    exec: &mut dyn Executor,
    partition: &str,
    name: &str,
    secret: &EncryptionSecret,
    params: &CipherParams,
    progress: &mut Vec<Action>,
) -> Result<EncryptedContainer, VliError> {
    tracing::info!(partition, cipher = params.cipher, "formatting luks container");

    with_key_file(exec, partition, secret, |exec, key_file| {
        luks::format(exec, partition, key_file, params)
    })
    .map_err(|err| crypto_err(partition, err))?;

    progress.push(
        ActionLuks::Format {
            device: partition.to_string(),
        }
        .into(),
    );

    Ok(EncryptedContainer {
        device: partition.to_string(),
        name: name.to_string(),
    })
}

/// Opens `container`, returning the mapper device path.
///
/// A wrong secret leaves the container closed and may be retried.
pub fn open(
    exec: &mut dyn Executor,
    container: &EncryptedContainer,
    secret: &EncryptionSecret,
    progress: &mut Vec<Action>,
) -> Result<String, VliError> {
    let device = &container.device;

    with_key_file(exec, device, secret, |exec, key_file| {
        luks::open(exec, device, key_file, &container.name)
    })
    .map_err(|err| unlock_err(device, err))?;

    progress.push(
        ActionLuks::Open {
            device: device.clone(),
            name: container.name.clone(),
        }
        .into(),
    );

    tracing::info!(device = %device, mapper = %container.mapper(), "opened luks container");
    Ok(container.mapper())
}

/// Adds `recovery` to the recovery key slot, authenticating with `secret`
pub fn add_recovery_key(
    exec: &mut dyn Executor,
    container: &EncryptedContainer,
    secret: &EncryptionSecret,
    recovery: &EncryptionSecret,
    params: &CipherParams,
    progress: &mut Vec<Action>,
) -> Result<(), VliError> {
    let device = &container.device;
    let recovery_file = SecretFile::create(recovery.key())?;

    with_key_file(exec, device, secret, |exec, key_file| {
        luks::add_key(exec, device, key_file, recovery_file.path(), params)
    })
    .map_err(|err| match exit_code(&err) {
        Some(exit_codes::NO_PERMISSION) => VliError::Unlock {
            device: device.clone(),
            reason: UnlockFailure::WrongSecret,
        },
        _ => crypto_err(device, err),
    })?;

    progress.push(
        ActionLuks::AddRecoveryKey {
            device: device.clone(),
        }
        .into(),
    );

    Ok(())
}

pub fn close(
    exec: &mut dyn Executor,
    name: &str,
    progress: &mut Vec<Action>,
) -> Result<(), VliError> {
    luks::close(exec, name).map_err(|err| crypto_err(name, err))?;
    progress.push(
        ActionLuks::Close {
            name: name.to_string(),
        }
        .into(),
    );

    Ok(())
}

fn crypto_err(device: &str, err: VliError) -> VliError {
    match err {
        VliError::Unlock { .. } | VliError::FileError(..) => err,
        err => VliError::CryptoSetup {
            device: device.to_string(),
            error: Box::new(err),
        },
    }
}

fn unlock_err(device: &str, err: VliError) -> VliError {
    let reason = match exit_code(&err) {
        Some(exit_codes::NO_PERMISSION) => UnlockFailure::WrongSecret,
        Some(exit_codes::DEVICE_BUSY) => UnlockFailure::DeviceBusy,
        Some(exit_codes::WRONG_DEVICE) => {
            UnlockFailure::Other(format!("{device} is not a LUKS device"))
        }
        _ => match err {
            VliError::Unlock { .. } | VliError::FileError(..) => return err,
            err => UnlockFailure::Other(err.to_string()),
        },
    };

    VliError::Unlock {
        device: device.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::fake::FakeSystem;

    fn token() -> TokenChallenge {
        TokenChallenge {
            slot: 2,
            challenge: "00112233".into(),
        }
    }

    fn params() -> CipherParams {
        CipherParams::policy()
    }

    #[test]
    fn test_format_open_close() {
        let mut sys = FakeSystem::new();
        let secret = EncryptionSecret::passphrase("pass1234");
        let mut progress = Vec::new();

        let container =
            format(&mut sys, "/dev/sda3", "cryptsys", &secret, &params(), &mut progress).unwrap();
        assert_eq!(container.mapper(), "/dev/mapper/cryptsys");
        assert_eq!(sys.luks["/dev/sda3"], vec![b"pass1234".to_vec()]);

        let mapper = open(&mut sys, &container, &secret, &mut progress).unwrap();
        assert_eq!(mapper, "/dev/mapper/cryptsys");
        assert_eq!(sys.opened["cryptsys"], "/dev/sda3");

        close(&mut sys, "cryptsys", &mut progress).unwrap();
        assert!(sys.opened.is_empty());
        assert_eq!(progress.len(), 3);
    }

    #[test]
    fn test_format_args() {
        let mut sys = FakeSystem::new();
        let secret = EncryptionSecret::passphrase("pass1234");

        format(&mut sys, "/dev/sda3", "cryptsys", &secret, &params(), &mut vec![]).unwrap();

        let args = &sys.history[0];
        for expected in ["luks2", "aes-xts-plain64", "512", "sha512", "argon2id", "4096"] {
            assert!(args.iter().any(|a| a == expected), "missing {expected}");
        }

        // Secret never appears on the command line
        assert!(!args.iter().any(|a| a.contains("pass1234")));
    }

    #[test]
    fn test_key_files_removed() {
        let mut sys = FakeSystem::new();
        sys.token = Some("hmac".into());

        let secret = EncryptionSecret::generate(token());
        let recovery = EncryptionSecret::passphrase("recovery");
        let mut progress = Vec::new();

        let container =
            format(&mut sys, "/dev/sda3", "cryptsys", &secret, &params(), &mut progress).unwrap();
        open(&mut sys, &container, &secret, &mut progress).unwrap();
        add_recovery_key(&mut sys, &container, &secret, &recovery, &params(), &mut progress)
            .unwrap();

        // Recovery key file included
        assert_eq!(sys.key_files.len(), 4);
        for path in &sys.key_files {
            assert!(!path.exists(), "{} still exists", path.display());
        }
    }

    #[test]
    fn test_token_composite() {
        let mut sys = FakeSystem::new();
        sys.token = Some("hmac".into());

        let key = Zeroizing::new(b"blob".to_vec());
        let secret = EncryptionSecret::with_token(token(), key);

        format(&mut sys, "/dev/sda3", "cryptsys", &secret, &params(), &mut vec![]).unwrap();

        let mut expected = hex::encode("hmac00112233").into_bytes();
        expected.extend_from_slice(b"blob");
        assert_eq!(sys.luks["/dev/sda3"], vec![expected]);
        assert!(sys.ran("ykchalresp", Some("-2")));
    }

    #[test]
    fn test_token_unavailable() {
        let mut sys = FakeSystem::new();
        let secret = EncryptionSecret::generate(token());

        match format(&mut sys, "/dev/sda3", "cryptsys", &secret, &params(), &mut vec![]) {
            Err(VliError::Unlock {
                reason: UnlockFailure::TokenUnavailable(_),
                ..
            }) => {}
            other => panic!("unexpected result: {other:?}"),
        }

        assert!(!sys.ran("cryptsetup", None));
    }

    #[test]
    fn test_open_wrong_secret_then_retry() {
        let mut sys = FakeSystem::new();
        let right = EncryptionSecret::passphrase("right");
        let wrong = EncryptionSecret::passphrase("wrong");
        let mut progress = Vec::new();

        let container =
            format(&mut sys, "/dev/sda3", "cryptsys", &right, &params(), &mut progress).unwrap();

        match open(&mut sys, &container, &wrong, &mut progress) {
            Err(VliError::Unlock {
                reason: UnlockFailure::WrongSecret,
                ..
            }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(sys.opened.is_empty());
        assert_eq!(progress.len(), 1);
        assert_eq!(sys.key_files.len(), 2);
        assert!(sys.key_files.iter().all(|path| !path.exists()));

        open(&mut sys, &container, &right, &mut progress).unwrap();
        assert!(sys.opened.contains_key("cryptsys"));
    }

    #[test]
    fn test_add_recovery_key_wrong_secret() {
        let mut sys = FakeSystem::new();
        let right = EncryptionSecret::passphrase("right");
        let wrong = EncryptionSecret::passphrase("wrong");
        let recovery = EncryptionSecret::passphrase("recovery");
        let mut progress = Vec::new();

        let container =
            format(&mut sys, "/dev/sda3", "cryptsys", &right, &params(), &mut progress).unwrap();

        match add_recovery_key(&mut sys, &container, &wrong, &recovery, &params(), &mut progress) {
            Err(VliError::Unlock {
                reason: UnlockFailure::WrongSecret,
                ..
            }) => {}
            other => panic!("unexpected result: {other:?}"),
        }

        assert_eq!(sys.luks["/dev/sda3"].len(), 1);
        assert_eq!(progress.len(), 1);

        // Format key, rejected key and recovery key
        assert_eq!(sys.key_files.len(), 3);
        for path in &sys.key_files {
            assert!(!path.exists(), "{} still exists", path.display());
        }
    }

    #[test]
    fn test_add_recovery_key_failure() {
        let mut sys = FakeSystem::new();
        let secret = EncryptionSecret::passphrase("pass");
        let recovery = EncryptionSecret::passphrase("recovery");

        let container =
            format(&mut sys, "/dev/sda3", "cryptsys", &secret, &params(), &mut vec![]).unwrap();
        sys.fail.insert("cryptsetup luksAddKey".into(), 1);

        let err = add_recovery_key(&mut sys, &container, &secret, &recovery, &params(), &mut vec![])
            .unwrap_err();

        assert!(matches!(err, VliError::CryptoSetup { .. }));
        assert_eq!(sys.key_files.len(), 2);
        assert!(sys.key_files.iter().all(|path| !path.exists()));
    }

    #[test]
    fn test_open_busy() {
        let mut sys = FakeSystem::new();
        let secret = EncryptionSecret::passphrase("pass");
        let container =
            format(&mut sys, "/dev/sda3", "cryptsys", &secret, &params(), &mut vec![]).unwrap();

        open(&mut sys, &container, &secret, &mut vec![]).unwrap();
        match open(&mut sys, &container, &secret, &mut vec![]) {
            Err(VliError::Unlock {
                reason: UnlockFailure::DeviceBusy,
                ..
            }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_format_failure() {
        let mut sys = FakeSystem::new().fail_on("cryptsetup luksFormat", 1);
        let secret = EncryptionSecret::passphrase("pass");

        let err = format(&mut sys, "/dev/sda3", "cryptsys", &secret, &params(), &mut vec![])
            .unwrap_err();

        assert!(matches!(err, VliError::CryptoSetup { .. }));
        assert_eq!(err.exit_status(), Some(1));

        assert_eq!(sys.key_files.len(), 1);
        assert!(!sys.key_files[0].exists());
    }

    #[test]
    fn test_random_challenge() {
        let a = random_challenge();
        assert_eq!(a.len(), CHALLENGE_LEN * 2);
        assert_ne!(a, random_challenge());
    }
}
