use thiserror::Error;

use crate::entity::action::Action;
use crate::entity::report::Warning;
use crate::entity::stage::Stage;
use crate::utils::shell::CmdError;

#[derive(Debug, Error)]
pub enum VliError {
    #[error("file error: {1}: {0}")]
    FileError(std::io::Error, String),

    #[error("bad manifest: {0}")]
    BadManifest(String),

    #[error("bad cli arguments: {0}")]
    BadArgs(String),

    #[error("missing required program: {0}")]
    MissingCommand(String),

    #[error("invalid device {device}: {reason}")]
    InvalidDevice { device: String, reason: String },

    #[error(
        "insufficient space on {device}: need {required} bytes, have {available} bytes"
    )]
    InsufficientSpace {
        device: String,
        required: u64,
        available: u64,
    },

    #[error("{context}: {error}")]
    CmdFailed { error: CmdError, context: String },

    #[error("cryptsetup failed on {device}: {error}")]
    CryptoSetup { device: String, error: Box<VliError> },

    #[error("failed to unlock {device}: {reason}")]
    Unlock {
        device: String,
        reason: UnlockFailure,
    },

    #[error("lvm error: {0}")]
    Lvm(String),

    #[error("failed to create {fs_type} on {device}: {error}")]
    Format {
        device: String,
        fs_type: String,
        error: Box<VliError>,
    },

    #[error("mount error: {0}")]
    Mount(String),

    #[error("aborted by user before any changes were made")]
    Aborted,

    #[error("installation failed after stage {stage_reached}: {error}")]
    InstallError {
        error: Box<VliError>,
        stage_reached: Stage,
        actions_performed: Vec<Action>,
        warnings: Vec<Warning>,
    },

    #[error("vli-rs bug: {0}")]
    VliRsBug(String),
}

#[derive(Debug, Error)]
pub enum UnlockFailure {
    #[error("wrong secret")]
    WrongSecret,

    #[error("hardware token unavailable: {0}")]
    TokenUnavailable(String),

    #[error("device busy or mapping already exists")]
    DeviceBusy,

    #[error("{0}")]
    Other(String),
}

/// How an error should be treated by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input caught before anything destructive happened
    Validation,
    /// A tool modifying disks failed, state may be partial
    DestructiveOperation,
    /// Wrong or missing secret, no disk state changed
    Unlock,
}

impl VliError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::FileError(..)
            | Self::BadManifest(_)
            | Self::BadArgs(_)
            | Self::MissingCommand(_)
            | Self::InvalidDevice { .. }
            | Self::InsufficientSpace { .. }
            | Self::Aborted => ErrorClass::Validation,

            Self::Unlock { .. } => ErrorClass::Unlock,

            Self::InstallError { error, .. } => error.class(),

            Self::CmdFailed { .. }
            | Self::CryptoSetup { .. }
            | Self::Lvm(_)
            | Self::Format { .. }
            | Self::Mount(_)
            | Self::VliRsBug(_) => ErrorClass::DestructiveOperation,
        }
    }

    /// Exit status of the failed external command, if any
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            Self::CmdFailed {
                error: CmdError::ErrExit { code, .. },
                ..
            } => Some(*code),

            Self::CryptoSetup { error, .. } | Self::Format { error, .. } => {
                error.exit_status()
            }

            Self::InstallError { error, .. } => error.exit_status(),

            _ => None,
        }
    }
}
