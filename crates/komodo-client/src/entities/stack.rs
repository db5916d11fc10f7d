//! Stacks: docker compose projects deployed to a server.

use serde::{Deserialize, Serialize};

use super::{Resource, ResourceListItem};

pub type Stack = Resource<StackConfig, StackInfo>;

pub type StackListItem = ResourceListItem<StackListItemInfo>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackState {
    /// Currently running `docker compose up`.
    Deploying,
    /// All containers are running.
    Running,
    Paused,
    Stopped,
    Created,
    Restarting,
    Dead,
    Removing,
    /// Containers are in a mix of states.
    Unhealthy,
    /// The stack is not deployed.
    Down,
    #[default]
    Unknown,
}

impl StackState {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Running | Self::Deploying)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackServiceWithUpdate {
    pub service: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub update_available: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackListItemInfo {
    #[serde(default)]
    pub server_id: String,
    #[serde(default)]
    pub state: StackState,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub services: Vec<StackServiceWithUpdate>,
    #[serde(default)]
    pub project_missing: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackInfo {
    #[serde(default)]
    pub missing_files: Vec<String>,
    #[serde(default)]
    pub deployed_hash: Option<String>,
    #[serde(default)]
    pub latest_hash: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackConfig {
    #[serde(default)]
    pub server_id: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub auto_update: bool,
    #[serde(default)]
    pub poll_for_updates: bool,
    #[serde(default)]
    pub file_paths: Vec<String>,
}
