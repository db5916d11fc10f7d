//! Komodo Client Library
//!
//! Typed access to the Komodo Core API: the request/response endpoints
//! (`/auth`, `/user`, `/read`, `/write`, `/execute`), the update websocket,
//! terminal execution and server maintenance windows.

pub mod api;
pub mod client;
pub mod config;
pub mod entities;
pub mod error;
pub mod maintenance;
pub mod terminal;
pub mod ws;

pub use client::{Credentials, KomodoClient};
pub use error::{ClientError, ClientResult, ErrorBody};

/// Re-exports of commonly used types
pub mod prelude {
    // Client
    pub use crate::client::{Credentials, KomodoClient};
    pub use crate::error::{ClientError, ClientResult, ErrorBody};

    // Configuration
    pub use crate::config::{ClientConfig, ConfigStore};

    // Api
    pub use crate::api::{ApiPath, KomodoRequest};

    // Entities
    pub use crate::entities::update::{Update, UpdateListItem, UpdateStatus};
    pub use crate::entities::{NoData, ResourceTarget};

    // Websocket
    pub use crate::ws::{UpdateSubscription, UpdateWsEvent, UpdateWsOptions, WsLoginMessage};

    // Terminal
    pub use crate::terminal::{TerminalHistory, TerminalLine, TerminalOutput};

    // Maintenance
    pub use crate::maintenance::{DayOfWeek, MaintenanceScheduleType, MaintenanceWindow};
}
