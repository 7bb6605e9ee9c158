use std::fs;
use std::io::Write;
use std::os::unix::fs::{
    DirBuilderExt,
    OpenOptionsExt,
    PermissionsExt,
};
use std::path::Path;

use crate::errors::VliError;

pub fn file_exists<P>(path: P) -> bool
where
    P: AsRef<std::path::Path>,
{
    path.as_ref().exists()
}

/// Creates `path` with `mode` and writes `content` to it.
///
/// The file must not exist yet, and parent directories are created
/// with mode 0700.
pub fn write_restricted(
    path: &Path,
    content: &[u8],
    mode: u32,
) -> Result<(), VliError> {
    let display = path.display().to_string();

    if let Some(parent) = path.parent() {
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(parent)
            .map_err(|err| {
                VliError::FileError(err, format!("failed to create parent of {display}"))
            })?;
    }

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .open(path)
        .map_err(|err| VliError::FileError(err, format!("failed to create {display}")))?;

    file.write_all(content)
        .and_then(|_| file.sync_all())
        .map_err(|err| VliError::FileError(err, format!("failed to write {display}")))?;

    // Creation mode is subject to umask
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|err| {
        VliError::FileError(err, format!("failed to chmod {display}"))
    })
}

/// Appends `content` to `path`, creating it and its parents if needed
pub fn append(path: &Path, content: &str) -> Result<(), VliError> {
    let display = path.display().to_string();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            VliError::FileError(err, format!("failed to create parent of {display}"))
        })?;
    }

    fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .and_then(|mut f| f.write_all(content.as_bytes()))
        .map_err(|err| VliError::FileError(err, format!("failed to append to {display}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_restricted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc/vli/cryptsys/key");

        write_restricted(&path, b"secret", 0o400).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"secret");
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o400);

        let parent_mode = fs::metadata(path.parent().unwrap())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(parent_mode & 0o777, 0o700);

        // Write-once
        assert!(write_restricted(&path, b"again", 0o400).is_err());
    }

    #[test]
    fn test_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc/fstab");

        append(&path, "a\n").unwrap();
        append(&path, "b\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
    }
}
