use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::json;

use super::shell::{
    CmdError,
    Executor,
};
use crate::errors::VliError;

const MIB: u64 = 1024 * 1024;
const EXTENT: u64 = 4 * MIB;

#[derive(Debug, Clone, Copy)]
pub struct FakeVg {
    pub free: u64,
    pub extent: u64,
}

/// In-memory stand-in for the disk tools, answering commands the way
/// the real tools would for a single machine.
#[derive(Debug, Default)]
pub struct FakeSystem {
    pub history: Vec<Vec<String>>,

    /// lsblk JSON by device path
    pub disks: HashMap<String, String>,
    pub pvs: Vec<(String, String)>,
    pub vgs: HashMap<String, FakeVg>,
    /// Size of any new PV
    pub pv_bytes: u64,

    /// Accepted keys per LUKS device
    pub luks: HashMap<String, Vec<Vec<u8>>>,
    /// Mapper name to LUKS device
    pub opened: HashMap<String, String>,
    /// Token HMAC secret, None means no token plugged in
    pub token: Option<String>,
    /// Every key file cryptsetup was given
    pub key_files: Vec<PathBuf>,

    pub mounts: Vec<String>,
    pub swaps: Vec<String>,

    /// Commands (`cmd` or `cmd subcommand`) forced to fail with an exit code
    pub fail: HashMap<String, i32>,
}

impl FakeSystem {
    pub fn new() -> Self {
        Self {
            pv_bytes: 400 * 1024 * MIB,
            ..Default::default()
        }
    }

    pub fn with_disk(mut self, path: &str, size: u64, sector: u64) -> Self {
        self.disks.insert(path.to_string(), disk_json(path, size, sector, None));
        self
    }

    pub fn with_mounted_disk(mut self, path: &str, size: u64, mnt: &str) -> Self {
        self.disks
            .insert(path.to_string(), disk_json(path, size, 512, Some(mnt)));
        self
    }

    pub fn fail_on(mut self, cmd: &str, code: i32) -> Self {
        self.fail.insert(cmd.to_string(), code);
        self
    }

    /// Number of times `cmd` (optionally with first arg `sub`) was run
    pub fn count(&self, cmd: &str, sub: Option<&str>) -> usize {
        self.history
            .iter()
            .filter(|h| h[0] == cmd && sub.map_or(true, |s| h.get(1).map(String::as_str) == Some(s)))
            .count()
    }

    pub fn ran(&self, cmd: &str, sub: Option<&str>) -> bool {
        self.count(cmd, sub) > 0
    }

    fn key_file(&mut self, args: &[&str]) -> Vec<u8> {
        let i = args
            .iter()
            .position(|a| *a == "--key-file")
            .expect("no --key-file");

        let path = PathBuf::from(args[i + 1]);
        let key = std::fs::read(&path).expect("key file not readable");
        self.key_files.push(path);

        key
    }

    fn cryptsetup(&mut self, args: &[&str]) -> Result<String, VliError> {
        let last = args[args.len() - 1];

        match args[0] {
            "luksFormat" => {
                let key = self.key_file(args);
                self.luks.insert(last.to_string(), vec![key]);
                Ok(String::new())
            }

            "open" => {
                let key = self.key_file(args);
                let device = args[args.len() - 2];

                if self.opened.contains_key(last) {
                    return failed("cryptsetup", 5, "Device already exists");
                }

                match self.luks.get(device) {
                    None => failed("cryptsetup", 4, "not a valid LUKS device"),
                    Some(keys) if !keys.contains(&key) => {
                        failed("cryptsetup", 2, "No key available with this passphrase")
                    }
                    Some(_) => {
                        self.opened.insert(last.to_string(), device.to_string());
                        Ok(String::new())
                    }
                }
            }

            "luksAddKey" => {
                let key = self.key_file(args);
                let device = args[args.len() - 2];
                let new_key = std::fs::read(last).expect("new key file not readable");
                self.key_files.push(PathBuf::from(last));

                match self.luks.get_mut(device) {
                    Some(keys) if keys.contains(&key) => {
                        keys.push(new_key);
                        Ok(String::new())
                    }
                    Some(_) => failed("cryptsetup", 2, "No key available"),
                    None => failed("cryptsetup", 4, "not a valid LUKS device"),
                }
            }

            "close" => match self.opened.remove(last) {
                Some(_) => Ok(String::new()),
                None => failed("cryptsetup", 4, "Device is not active"),
            },

            "luksUUID" => match self.luks.contains_key(last) {
                true => Ok("0b7e1d0e-8c4a-4a3e-9d2b-6f1c2a3b4c5d\n".into()),
                false => failed("cryptsetup", 4, "not a valid LUKS device"),
            },

            _ => Ok(String::new()),
        }
    }

    fn lvm(&mut self, cmd: &str, args: &[&str]) -> Result<String, VliError> {
        match cmd {
            "pvs" => Ok(self
                .pvs
                .iter()
                .map(|(pv, vg)| format!("  {pv}:{vg}\n"))
                .collect()),

            "vgcreate" => {
                let (vg, pv) = (args[0], args[1]);
                if self.vgs.contains_key(vg) {
                    return failed(cmd, 5, "already exists");
                }

                let free = self.pv_bytes / EXTENT * EXTENT;
                self.vgs.insert(vg.to_string(), FakeVg { free, extent: EXTENT });
                self.pvs.push((pv.to_string(), vg.to_string()));
                Ok(String::new())
            }

            "vgs" if args.contains(&"vg_name") => {
                Ok(self.vgs.keys().map(|vg| format!("  {vg}\n")).collect())
            }

            "vgs" => match self.vgs.get(args[args.len() - 1]) {
                Some(vg) => Ok(format!("  {} {}\n", vg.free, vg.extent)),
                None => failed(cmd, 5, "Volume group not found"),
            },

            "lvcreate" => {
                let (flag, size, vg) = (args[1], args[2], args[3]);
                let Some(fake_vg) = self.vgs.get_mut(vg) else {
                    return failed(cmd, 5, "Volume group not found");
                };

                if flag == "-l" {
                    if fake_vg.free == 0 {
                        return failed(cmd, 5, "Insufficient free space");
                    }
                    fake_vg.free = 0;
                    return Ok(String::new());
                }

                let mib: u64 = size.trim_end_matches('m').parse().expect("bad lvcreate size");
                if mib * MIB > fake_vg.free {
                    return failed(cmd, 5, "Insufficient free space");
                }

                fake_vg.free -= mib * MIB;
                Ok(String::new())
            }

            "vgremove" => {
                let vg = args[args.len() - 1];
                self.vgs.remove(vg);
                self.pvs.retain(|(_, v)| v != vg);
                Ok(String::new())
            }

            _ => Ok(String::new()),
        }
    }

    fn mount(&mut self, cmd: &str, args: &[&str]) -> Result<String, VliError> {
        let last = args[args.len() - 1];

        match cmd {
            "mount" => {
                self.mounts.push(last.to_string());
                Ok(String::new())
            }

            "umount" => {
                let before = self.mounts.len();
                self.mounts
                    .retain(|m| !(m == last || m.starts_with(&format!("{last}/"))));

                match self.mounts.len() < before {
                    true => Ok(String::new()),
                    false => failed(cmd, 32, "not mounted"),
                }
            }

            "mountpoint" => match self.mounts.iter().any(|m| m == last) {
                true => Ok(String::new()),
                false => failed(cmd, 32, "is not a mountpoint"),
            },

            "swapon" if args[0].starts_with("--show") => {
                Ok(self.swaps.iter().map(|s| format!("{s}\n")).collect())
            }

            "swapon" => {
                if self.swaps.iter().any(|s| s == last) {
                    return failed(cmd, 255, "Device or resource busy");
                }
                self.swaps.push(last.to_string());
                Ok(String::new())
            }

            "swapoff" => {
                let before = self.swaps.len();
                self.swaps.retain(|s| s != last);

                match self.swaps.len() < before {
                    true => Ok(String::new()),
                    false => failed(cmd, 255, "Invalid argument"),
                }
            }

            _ => Ok(String::new()),
        }
    }
}

impl Executor for FakeSystem {
    fn output(&mut self, cmd: &str, args: &[&str]) -> Result<String, VliError> {
        let mut entry = vec![cmd.to_string()];
        entry.extend(args.iter().map(|a| a.to_string()));
        self.history.push(entry);

        let sub = args.first().map(|a| format!("{cmd} {a}"));
        let forced = sub
            .and_then(|s| self.fail.get(&s).copied())
            .or(self.fail.get(cmd).copied());

        if let Some(code) = forced {
            // The tool still got to see its key file
            if let Some(i) = args.iter().position(|a| *a == "--key-file") {
                self.key_files.push(PathBuf::from(args[i + 1]));
            }

            return failed(cmd, code, "forced failure");
        }

        match cmd {
            "lsblk" => match self.disks.get(args[args.len() - 1]) {
                Some(json) => Ok(json.clone()),
                None => failed(cmd, 32, "not a block device"),
            },

            "ykchalresp" => match &self.token {
                Some(secret) => Ok(format!(
                    "{}\n",
                    hex::encode(format!("{secret}{}", args[args.len() - 1]))
                )),
                None => failed(cmd, 1, "Yubikey core error: no yubikey present"),
            },

            "cryptsetup" => self.cryptsetup(args),

            "pvs" | "vgcreate" | "vgs" | "lvcreate" | "vgremove" => self.lvm(cmd, args),

            "mount" | "umount" | "mountpoint" | "swapon" | "swapoff" => {
                self.mount(cmd, args)
            }

            _ => Ok(String::new()),
        }
    }
}

fn failed(cmd: &str, code: i32, stderr: &str) -> Result<String, VliError> {
    Err(VliError::CmdFailed {
        error: CmdError::ErrExit {
            code,
            stderr: stderr.to_string(),
        },
        context: format!("command {cmd} exited with non-zero status"),
    })
}

fn disk_json(path: &str, size: u64, sector: u64, mnt: Option<&str>) -> String {
    let name = path.trim_start_matches("/dev/");
    let children = match mnt {
        Some(mnt) => json!([{
            "name": format!("{name}1"),
            "type": "part",
            "size": size / 2,
            "log-sec": sector,
            "mountpoint": mnt,
        }]),
        None => json!([]),
    };

    json!({
        "blockdevices": [{
            "name": name,
            "type": "disk",
            "size": size,
            "log-sec": sector,
            "mountpoint": null,
            "children": children,
        }]
    })
    .to_string()
}
