use std::fmt;

use serde::{
    Deserialize,
    Serialize,
};

use crate::errors::VliError;

/// Provisioning progress, in the only order the stages may complete
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Unvalidated,
    Planned,
    PartitionsWritten,
    ContainerOpen,
    VolumesCreated,
    Formatted,
    Mounted,
}

impl Stage {
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Unvalidated => Some(Stage::Planned),
            Stage::Planned => Some(Stage::PartitionsWritten),
            Stage::PartitionsWritten => Some(Stage::ContainerOpen),
            Stage::ContainerOpen => Some(Stage::VolumesCreated),
            Stage::VolumesCreated => Some(Stage::Formatted),
            Stage::Formatted => Some(Stage::Mounted),
            Stage::Mounted => None,
        }
    }

    /// Moves to `to`, which must directly follow the current stage
    pub fn advance(&mut self, to: Stage) -> Result<(), VliError> {
        if self.next() != Some(to) {
            return Err(VliError::VliRsBug(format!(
                "illegal stage transition {self} -> {to}"
            )));
        }

        *self = to;
        Ok(())
    }

    /// Whether the disk may have been modified once this stage is reached
    pub fn is_destructive(self) -> bool {
        self >= Stage::PartitionsWritten
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Unvalidated => "unvalidated",
            Stage::Planned => "planned",
            Stage::PartitionsWritten => "partitions-written",
            Stage::ContainerOpen => "container-open",
            Stage::VolumesCreated => "volumes-created",
            Stage::Formatted => "formatted",
            Stage::Mounted => "mounted",
        };

        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance() {
        let mut stage = Stage::Unvalidated;

        for to in [
            Stage::Planned,
            Stage::PartitionsWritten,
            Stage::ContainerOpen,
            Stage::VolumesCreated,
            Stage::Formatted,
            Stage::Mounted,
        ] {
            stage.advance(to).unwrap();
            assert_eq!(stage, to);
        }

        assert!(stage.next().is_none());
    }

    #[test]
    fn test_advance_skip() {
        let mut stage = Stage::Planned;

        assert!(stage.advance(Stage::VolumesCreated).is_err());
        assert!(stage.advance(Stage::Unvalidated).is_err());
        assert_eq!(stage, Stage::Planned);
    }

    #[test]
    fn test_is_destructive() {
        assert!(!Stage::Planned.is_destructive());
        assert!(Stage::PartitionsWritten.is_destructive());
        assert!(Stage::Mounted.is_destructive());
    }
}
