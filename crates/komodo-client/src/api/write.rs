//! `/write` requests.

use serde::{Deserialize, Serialize};

use super::komodo_request;
use crate::entities::server::Server;
use crate::entities::{NoData, Tag};

/// Partial update of a server's configuration.
/// Only the fields present in `config` are changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateServer {
    /// Id or name
    pub id: String,
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTag {
    pub name: String,
}

/// Delete a terminal and kill its shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteTerminal {
    /// Id or name
    pub server: String,
    pub terminal: String,
}

komodo_request!(Write, KomodoWriteRequest, UpdateServer => Server);
komodo_request!(Write, KomodoWriteRequest, CreateTag => Tag);
komodo_request!(Write, KomodoWriteRequest, DeleteTerminal => NoData);
