use crate::errors::VliError;
use crate::utils::shell::Executor;

/// Executes:
/// ```shell
/// mount [-o {opts}] {src} {dst}
/// ```
pub fn mount(
    exec: &mut dyn Executor,
    src: &str,
    dst: &str,
    opts: Option<&str>,
) -> Result<(), VliError> {
    match opts {
        Some(opts) => exec.exec("mount", &["-o", opts, src, dst]),
        None => exec.exec("mount", &[src, dst]),
    }
}

/// Executes:
/// ```shell
/// umount -R {dst}
/// ```
pub fn umount_recursive(exec: &mut dyn Executor, dst: &str) -> Result<(), VliError> {
    exec.exec("umount", &["-R", dst])
}

/// Executes `mountpoint -q {dst}`, which exits 0 only if dst is mounted
pub fn is_mountpoint(exec: &mut dyn Executor, dst: &str) -> bool {
    exec.exec("mountpoint", &["-q", dst]).is_ok()
}

pub fn swapon(exec: &mut dyn Executor, device: &str) -> Result<(), VliError> {
    exec.exec("swapon", &[device])
}

pub fn swapoff(exec: &mut dyn Executor, device: &str) -> Result<(), VliError> {
    exec.exec("swapoff", &[device])
}

/// Executes:
/// ```shell
/// swapon --show=NAME --noheadings
/// ```
pub fn active_swaps(exec: &mut dyn Executor) -> Result<Vec<String>, VliError> {
    let out = exec.output("swapon", &["--show=NAME", "--noheadings"])?;

    Ok(out
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}
