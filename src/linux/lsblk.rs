use serde::{
    Deserialize,
    Deserializer,
};

use crate::errors::VliError;
use crate::utils::shell::Executor;

// For parsing `lsblk --json` output
#[derive(Debug, Deserialize)]
struct OutputLsblk {
    blockdevices: Vec<EntryLsblk>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryLsblk {
    pub name: String,

    #[serde(rename = "type")]
    pub dev_type: String,

    #[serde(deserialize_with = "de_number")]
    pub size: u64,

    #[serde(rename = "log-sec", deserialize_with = "de_number")]
    pub log_sec: u64,

    pub mountpoint: Option<String>,

    #[serde(default)]
    pub children: Vec<EntryLsblk>,
}

impl EntryLsblk {
    /// Mountpoints of this device and all of its descendants,
    /// including `[SWAP]` for active swap
    pub fn mountpoints(&self) -> Vec<(String, String)> {
        let mut mounts = Vec::new();
        if let Some(ref mnt) = self.mountpoint {
            mounts.push((self.name.clone(), mnt.clone()));
        }

        for child in &self.children {
            mounts.extend(child.mountpoints());
        }

        mounts
    }
}

/// Executes:
/// ```shell
/// lsblk --json --bytes --output NAME,TYPE,SIZE,LOG-SEC,MOUNTPOINT ${{ device }}
/// ```
pub fn lsblk(
    exec: &mut dyn Executor,
    device: &str,
) -> Result<EntryLsblk, VliError> {
    let out = exec.output(
        "lsblk",
        &[
            "--json",
            "--bytes",
            "--output",
            "NAME,TYPE,SIZE,LOG-SEC,MOUNTPOINT",
            device,
        ],
    )?;

    parse(&out)?
        .into_iter()
        .next()
        .ok_or_else(|| VliError::VliRsBug(format!("lsblk returned nothing for {device}")))
}

fn parse(output: &str) -> Result<Vec<EntryLsblk>, VliError> {
    serde_json::from_str::<OutputLsblk>(output)
        .map(|o| o.blockdevices)
        .map_err(|err| VliError::VliRsBug(format!("unexpected lsblk output: {err}")))
}

// Older util-linux prints numbers as strings
fn de_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(u64),
        Str(String),
    }

    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => Ok(n),
        NumOrStr::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
