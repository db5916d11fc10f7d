//! `/read` requests.

use serde::{Deserialize, Serialize};

use super::komodo_request;
use crate::entities::ResourceQuery;
use crate::entities::server::{Server, ServerListItem};
use crate::entities::stack::{Stack, StackListItem};
use crate::entities::update::{Update, UpdateListItem};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetVersion {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetVersionResponse {
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetUpdate {
    pub id: String,
}

/// Paginated update listing, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListUpdates {
    /// Raw Mongo filter document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<serde_json::Value>,
    #[serde(default)]
    pub page: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListUpdatesResponse {
    pub updates: Vec<UpdateListItem>,
    /// `None` once the last page has been returned.
    #[serde(default)]
    pub next_page: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListServers {
    #[serde(default)]
    pub query: ResourceQuery,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetServer {
    /// Id or name
    pub server: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListStacks {
    #[serde(default)]
    pub query: ResourceQuery,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetStack {
    /// Id or name
    pub stack: String,
}

/// Terminals currently open on a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListTerminals {
    /// Id or name
    pub server: String,
    /// Skip Core's cached list and ask Periphery directly.
    #[serde(default)]
    pub fresh: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerminalInfo {
    pub name: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub stored_size_kb: f64,
}

komodo_request!(Read, KomodoReadRequest, GetVersion => GetVersionResponse);
komodo_request!(Read, KomodoReadRequest, GetUpdate => Update);
komodo_request!(Read, KomodoReadRequest, ListUpdates => ListUpdatesResponse);
komodo_request!(Read, KomodoReadRequest, ListServers => Vec<ServerListItem>);
komodo_request!(Read, KomodoReadRequest, GetServer => Server);
komodo_request!(Read, KomodoReadRequest, ListStacks => Vec<StackListItem>);
komodo_request!(Read, KomodoReadRequest, GetStack => Stack);
komodo_request!(Read, KomodoReadRequest, ListTerminals => Vec<TerminalInfo>);
