use std::env;
use std::fs;
use std::process::Command;

use thiserror::Error;

use crate::errors::VliError;

#[derive(Debug, Error)]
pub enum CmdError {
    #[error("failed to spawn: {error}")]
    ErrSpawn { error: std::io::Error },

    #[error("exited with status {code}: {stderr}")]
    ErrExit { code: i32, stderr: String },

    #[error("terminated by signal")]
    ErrSignal,
}

/// Runs external programs on behalf of the provisioning components.
///
/// Every disk, LUKS, LVM and mount operation goes through an `Executor`,
/// so the same code can drive the live system or a simulated one.
pub trait Executor {
    /// Runs `cmd` with `args`, failing on non-zero exit status
    fn exec(&mut self, cmd: &str, args: &[&str]) -> Result<(), VliError> {
        self.output(cmd, args).map(|_| ())
    }

    /// Runs `cmd` with `args` and returns its stdout
    fn output(&mut self, cmd: &str, args: &[&str]) -> Result<String, VliError>;
}

/// Spawns real processes
#[derive(Debug, Default)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn output(&mut self, cmd: &str, args: &[&str]) -> Result<String, VliError> {
        tracing::debug!(command = cmd, args = args.join(" "), "exec");

        let output = Command::new(cmd).args(args).output().map_err(|err| {
            VliError::CmdFailed {
                error: CmdError::ErrSpawn { error: err },
                context: format!("command {cmd} failed to spawn"),
            }
        })?;

        match output.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout).to_string()),
            Some(code) => Err(VliError::CmdFailed {
                error: CmdError::ErrExit {
                    code,
                    stderr: String::from_utf8_lossy(&output.stderr)
                        .trim()
                        .to_string(),
                },
                context: format!("command {cmd} exited with non-zero status"),
            }),
            None => Err(VliError::CmdFailed {
                error: CmdError::ErrSignal,
                context: format!("command {cmd} terminated by signal"),
            }),
        }
    }
}

/// Returns the exit code if `err` is a failed command that exited normally
pub fn exit_code(err: &VliError) -> Option<i32> {
    match err {
        VliError::CmdFailed {
            error: CmdError::ErrExit { code, .. },
            ..
        } => Some(*code),
        _ => None,
    }
}

/// Splits option strings like `-d su=64k,sw=4 -m crc=1` with shell rules
pub fn split_opts(opts: &str) -> Result<Vec<String>, VliError> {
    shlex::split(opts)
        .ok_or_else(|| VliError::BadManifest(format!("malformed options: {opts}")))
}

pub fn in_path(program: &str) -> bool {
    if let Ok(path) = env::var("PATH") {
        for p in path.split(':') {
            let p_str = format!("{}/{}", p, program);
            if fs::metadata(p_str).is_ok() {
                return true;
            }
        }
    }

    false
}
