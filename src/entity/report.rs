use serde::{
    Deserialize,
    Serialize,
};
use serde_json::json;

use super::action::*;
use super::stage::Stage;

#[derive(Debug)]
pub struct Report {
    pub location: String,
    pub device: String,
    pub stage_reached: Stage,
    pub summary: Box<StageActions>,
    pub warnings: Vec<Warning>,
    pub duration: std::time::Duration,
}

impl Report {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "location": self.location,
            "device": self.device,
            "stageReached": self.stage_reached,
            "summary": self.summary,
            "warnings": self.warnings,
            "elapsedTime": self.duration,
        })
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }
}

/// A problem that was logged without stopping the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub context: String,
    pub message: String,
}

impl Warning {
    pub fn new(context: &str, message: impl ToString) -> Self {
        let warning = Self {
            context: context.to_string(),
            message: message.to_string(),
        };

        tracing::warn!(context = warning.context, "{}", warning.message);
        warning
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StageActions {
    #[serde(rename = "stage-disk")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disk: Vec<ActionDisk>,

    #[serde(rename = "stage-luks")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub luks: Vec<ActionLuks>,

    #[serde(rename = "stage-lvm")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lvm: Vec<ActionLvm>,

    #[serde(rename = "stage-filesystems")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filesystems: Vec<ActionFs>,

    #[serde(rename = "stage-mountpoints")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mountpoints: Vec<ActionMount>,

    #[serde(rename = "stage-persist")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub persist: Vec<ActionPersist>,
}

impl From<Vec<Action>> for StageActions {
    fn from(value: Vec<Action>) -> Self {
        let mut s = Self::default();

        for v in value {
            match v {
                Action::Disk(action) => s.disk.push(action),
                Action::Luks(action) => s.luks.push(action),
                Action::Lvm(action) => s.lvm.push(action),
                Action::Fs(action) => s.filesystems.push(action),
                Action::Mount(action) => s.mountpoints.push(action),
                Action::Persist(action) => s.persist.push(action),
            }
        }

        s
    }
}

#[test]
fn test_report_json() {
    let actions: Vec<Action> = vec![
        ActionDisk::ZapPartitionTable {
            device: "/dev/nvme0n1".into(),
        }
        .into(),
        ActionLuks::Open {
            device: "/dev/nvme0n1p3".into(),
            name: "cryptsys".into(),
        }
        .into(),
        ActionMount::Swapon("/dev/nvme0n1p2".into()).into(),
    ];

    let report = Report {
        location: "/mnt".into(),
        device: "/dev/nvme0n1".into(),
        stage_reached: Stage::Mounted,
        summary: Box::new(actions.into()),
        warnings: vec![Warning::new("swap", "swapon failed")],
        duration: std::time::Duration::from_secs(20),
    };

    let json = report.to_json();
    assert_eq!(json["stageReached"], "mounted");
    assert_eq!(json["summary"]["stage-disk"].as_array().unwrap().len(), 1);
    assert_eq!(json["summary"]["stage-luks"].as_array().unwrap().len(), 1);
    assert!(json["summary"].get("stage-lvm").is_none());
    assert_eq!(json["warnings"][0]["context"], "swap");
}
