use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    Disk(ActionDisk),
    Luks(ActionLuks),
    Lvm(ActionLvm),
    Fs(ActionFs),
    Mount(ActionMount),
    Persist(ActionPersist),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionDisk {
    #[serde(rename = "validateDevice")]
    ValidateDevice { device: String },

    #[serde(rename = "planPartitions")]
    PlanPartitions { device: String, partitions: usize },

    #[serde(rename = "zapPartitionTable")]
    ZapPartitionTable { device: String },

    #[serde(rename = "createPartition")]
    CreatePartition {
        device: String,
        number: u32,
        label: String,
        start_sector: u64,
        sectors: u64,
    },

    #[serde(rename = "reloadPartitions")]
    ReloadPartitions { device: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionLuks {
    #[serde(rename = "luksFormat")]
    Format { device: String },

    #[serde(rename = "luksOpen")]
    Open { device: String, name: String },

    #[serde(rename = "luksAddRecoveryKey")]
    AddRecoveryKey { device: String },

    #[serde(rename = "luksClose")]
    Close { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionLvm {
    #[serde(rename = "createLvmPv")]
    CreatePv(String),

    #[serde(rename = "createLvmVg")]
    CreateVg { pv: String, vg: String },

    #[serde(rename = "createLvmLv")]
    CreateLv { vg: String, lv: String, size: String },

    #[serde(rename = "deactivateLvmVg")]
    DeactivateVg(String),

    #[serde(rename = "removeLvmVg")]
    RemoveVg(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionFs {
    #[serde(rename = "createFilesystem")]
    CreateFs {
        device: String,
        fs_type: String,
        fs_opts: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionMount {
    #[serde(rename = "mkdirMountpoint")]
    Mkdir(String),

    #[serde(rename = "mountFilesystem")]
    MountFs {
        src: String,
        dst: String,
        opts: Option<String>,
    },

    #[serde(rename = "swapon")]
    Swapon(String),

    #[serde(rename = "swapoff")]
    Swapoff(String),

    #[serde(rename = "unmountAll")]
    UnmountAll(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionPersist {
    #[serde(rename = "writeFstab")]
    WriteFstab(String),

    #[serde(rename = "writeCrypttab")]
    WriteCrypttab(String),

    #[serde(rename = "writeUnlockHelper")]
    WriteUnlockHelper(String),
}

impl From<ActionDisk> for Action {
    fn from(action: ActionDisk) -> Self {
        Action::Disk(action)
    }
}

impl From<ActionLuks> for Action {
    fn from(action: ActionLuks) -> Self {
        Action::Luks(action)
    }
}

impl From<ActionLvm> for Action {
    fn from(action: ActionLvm) -> Self {
        Action::Lvm(action)
    }
}

impl From<ActionFs> for Action {
    fn from(action: ActionFs) -> Self {
        Action::Fs(action)
    }
}

impl From<ActionMount> for Action {
    fn from(action: ActionMount) -> Self {
        Action::Mount(action)
    }
}

impl From<ActionPersist> for Action {
    fn from(action: ActionPersist) -> Self {
        Action::Persist(action)
    }
}

#[test]
fn test_json_action() {
    let action: Action = ActionLvm::CreateLv {
        vg: "vg0".into(),
        lv: "home".into(),
        size: "100%FREE".into(),
    }
    .into();

    let json = serde_json::to_value(&action).unwrap();
    assert_eq!(json["createLvmLv"]["lv"], "home");
    assert_eq!(json["createLvmLv"]["size"], "100%FREE");
}
