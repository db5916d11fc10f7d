//! Terminal request bodies. These are not sent through the typed
//! request envelope: execution streams from `/terminal/execute` and
//! interactive sessions go over `/ws/terminal`.

use serde::{Deserialize, Serialize};

/// Execute a command on a named terminal of a server.
///
/// If the terminal does not exist it is created and persists until it
/// exits or is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteTerminalBody {
    /// Server Id or name
    pub server: String,
    pub terminal: String,
    pub command: String,
}

/// Query for an interactive terminal session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectTerminalQuery {
    /// Server Id or name
    pub server: String,
    /// Attached to if it exists, created otherwise.
    pub terminal: String,
    /// Command to start a newly created terminal with, eg. `bash`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<String>,
}
