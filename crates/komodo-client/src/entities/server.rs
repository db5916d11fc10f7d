//! Servers: hosts running the Periphery agent.

use serde::{Deserialize, Serialize};

use super::{Resource, ResourceListItem};
use crate::maintenance::MaintenanceWindow;

pub type Server = Resource<ServerConfig, ServerInfo>;

pub type ServerListItem = ResourceListItem<ServerListItemInfo>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerState {
    /// Server health check passing.
    Ok,
    /// Server is unreachable.
    #[default]
    NotOk,
    /// Server is disabled.
    Disabled,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerListItemInfo {
    #[serde(default)]
    pub state: ServerState,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub terminals_disabled: bool,
    #[serde(default)]
    pub container_exec_disabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerInfo {}

/// The subset of server configuration the client reads and edits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The http address of the periphery agent.
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub send_unreachable_alerts: bool,
    #[serde(default)]
    pub send_cpu_alerts: bool,
    #[serde(default)]
    pub send_mem_alerts: bool,
    #[serde(default)]
    pub send_disk_alerts: bool,
    /// Alerts are suppressed while any of these windows is active.
    #[serde(default)]
    pub maintenance_windows: Vec<MaintenanceWindow>,
}
