//! Updates: the record Core keeps for every write and execution.

use serde::{Deserialize, Serialize};

use super::{ResourceTarget, Version, deserialize_id};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateStatus {
    /// Waiting on another execution against the same target.
    Queued,
    #[default]
    InProgress,
    Complete,
}

impl std::fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "Queued",
            Self::InProgress => "InProgress",
            Self::Complete => "Complete",
        };
        f.write_str(s)
    }
}

/// One stage of an update's execution log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Log {
    pub stage: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub start_ts: i64,
    #[serde(default)]
    pub end_ts: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Update {
    #[serde(
        default,
        rename = "_id",
        alias = "id",
        deserialize_with = "deserialize_id"
    )]
    pub id: String,
    /// Operation name, eg. `DeployStack`.
    pub operation: String,
    pub start_ts: i64,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub target: ResourceTarget,
    #[serde(default)]
    pub logs: Vec<Log>,
    #[serde(default)]
    pub end_ts: Option<i64>,
    #[serde(default)]
    pub status: UpdateStatus,
    #[serde(default)]
    pub version: Version,
    #[serde(default)]
    pub commit_hash: String,
    #[serde(default)]
    pub other_data: String,
}

impl Update {
    pub fn is_complete(&self) -> bool {
        self.status == UpdateStatus::Complete
    }

    /// Logs of stages that did not succeed.
    pub fn failed_logs(&self) -> impl Iterator<Item = &Log> {
        self.logs.iter().filter(|log| !log.success)
    }

    /// Duration in ms, once the update has finished.
    pub fn duration_ms(&self) -> Option<i64> {
        self.end_ts.map(|end| end - self.start_ts)
    }
}

/// Lightweight form pushed over the update websocket and returned by `ListUpdates`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateListItem {
    pub id: String,
    pub operation: String,
    pub start_ts: i64,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub target: ResourceTarget,
    #[serde(default)]
    pub status: UpdateStatus,
    #[serde(default)]
    pub version: Version,
    #[serde(default)]
    pub other_data: String,
}
