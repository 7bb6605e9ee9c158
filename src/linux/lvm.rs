use crate::errors::VliError;
use crate::utils::shell::Executor;

/// Executes:
/// ```shell
/// pvcreate ${{ pv }}
/// ```
pub fn create_pv(exec: &mut dyn Executor, pv: &str) -> Result<(), VliError> {
    exec.exec("pvcreate", &["--yes", pv])
}

/// Executes:
/// ```shell
/// vgcreate ${{ vg }} ${{ pv }}
/// ```
pub fn create_vg(
    exec: &mut dyn Executor,
    vg: &str,
    pv: &str,
) -> Result<(), VliError> {
    exec.exec("vgcreate", &[vg, pv])
}

/// Executes:
/// ```shell
/// lvcreate --yes -L ${{ mib }}m ${{ vg }} -n ${{ lv }}
///
/// # or, if mib is None:
///
/// lvcreate --yes -l 100%FREE ${{ vg }} -n ${{ lv }}
/// ```
pub fn create_lv(
    exec: &mut dyn Executor,
    vg: &str,
    lv: &str,
    mib: Option<u64>,
) -> Result<(), VliError> {
    let (size_flag, size) = match mib {
        Some(mib) => ("-L", format!("{mib}m")),
        None => ("-l", "100%FREE".to_string()),
    };

    exec.exec("lvcreate", &["--yes", size_flag, &size, vg, "-n", lv])
}

/// Executes:
/// ```shell
/// vgs --noheadings -o vg_name
/// ```
pub fn list_vgs(exec: &mut dyn Executor) -> Result<Vec<String>, VliError> {
    let out = exec.output("vgs", &["--noheadings", "-o", "vg_name"])?;

    Ok(out
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

/// Executes:
/// ```shell
/// pvs --noheadings --separator : -o pv_name,vg_name
/// ```
///
/// and returns (pv, vg) pairs. PVs without a VG are omitted.
pub fn list_pvs(
    exec: &mut dyn Executor,
) -> Result<Vec<(String, String)>, VliError> {
    let out = exec.output(
        "pvs",
        &["--noheadings", "--separator", ":", "-o", "pv_name,vg_name"],
    )?;

    Ok(out
        .lines()
        .filter_map(|line| {
            let (pv, vg) = line.trim().split_once(':')?;
            if vg.is_empty() {
                return None;
            }

            Some((pv.to_string(), vg.to_string()))
        })
        .collect())
}

/// Executes:
/// ```shell
/// vgs --noheadings --nosuffix --units b -o vg_free,vg_extent_size ${{ vg }}
/// ```
///
/// and returns (free bytes, extent size in bytes)
pub fn vg_free(exec: &mut dyn Executor, vg: &str) -> Result<(u64, u64), VliError> {
    let out = exec.output(
        "vgs",
        &[
            "--noheadings",
            "--nosuffix",
            "--units",
            "b",
            "-o",
            "vg_free,vg_extent_size",
            vg,
        ],
    )?;

    let fields: Vec<u64> = out
        .split_whitespace()
        .map(|f| f.parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|err| VliError::Lvm(format!("unexpected vgs output {out:?}: {err}")))?;

    match fields.as_slice() {
        [free, extent] if *extent > 0 => Ok((*free, *extent)),
        _ => Err(VliError::Lvm(format!("unexpected vgs output {out:?}"))),
    }
}

/// Executes:
/// ```shell
/// vgchange -an ${{ vg }}
/// ```
pub fn deactivate_vg(exec: &mut dyn Executor, vg: &str) -> Result<(), VliError> {
    exec.exec("vgchange", &["-an", vg])
}

/// Executes:
/// ```shell
/// vgremove --force ${{ vg }}
/// ```
pub fn remove_vg(exec: &mut dyn Executor, vg: &str) -> Result<(), VliError> {
    exec.exec("vgremove", &["--force", vg])
}
