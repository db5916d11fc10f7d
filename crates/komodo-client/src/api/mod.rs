//! Request definitions for the Komodo Core API.
//!
//! Every call is a `POST` to one of five paths with the body
//! `{"type": "<RequestName>", "params": {...}}`. Each request struct carries
//! its path, its type name and its response type through [`KomodoRequest`].

use serde::Serialize;
use serde::de::DeserializeOwned;

pub mod auth;
pub mod execute;
pub mod read;
pub mod terminal;
pub mod user;
pub mod write;

/// The request/response endpoints exposed by Core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiPath {
    Auth,
    User,
    Read,
    Write,
    Execute,
}

impl ApiPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiPath::Auth => "/auth",
            ApiPath::User => "/user",
            ApiPath::Read => "/read",
            ApiPath::Write => "/write",
            ApiPath::Execute => "/execute",
        }
    }

    pub fn all() -> [ApiPath; 5] {
        [
            ApiPath::Auth,
            ApiPath::User,
            ApiPath::Read,
            ApiPath::Write,
            ApiPath::Execute,
        ]
    }
}

impl std::str::FromStr for ApiPath {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('/').to_lowercase().as_str() {
            "auth" => Ok(ApiPath::Auth),
            "user" => Ok(ApiPath::User),
            "read" => Ok(ApiPath::Read),
            "write" => Ok(ApiPath::Write),
            "execute" => Ok(ApiPath::Execute),
            _ => anyhow::bail!(
                "Unknown api path: {}. Use one of auth, user, read, write, execute",
                s
            ),
        }
    }
}

impl std::fmt::Display for ApiPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed Core request.
pub trait KomodoRequest: Serialize + std::fmt::Debug {
    const PATH: ApiPath;
    /// Request name sent in the `type` field.
    const TYPE: &'static str;
    type Response: DeserializeOwned;
}

/// Requests accepted by `/auth`.
pub trait KomodoAuthRequest: KomodoRequest {}
/// Requests accepted by `/user`.
pub trait KomodoUserRequest: KomodoRequest {}
/// Requests accepted by `/read`.
pub trait KomodoReadRequest: KomodoRequest {}
/// Requests accepted by `/write`.
pub trait KomodoWriteRequest: KomodoRequest {}
/// Requests accepted by `/execute`.
pub trait KomodoExecuteRequest: KomodoRequest {}

/// Body posted for every request.
#[derive(Debug, Serialize)]
pub struct RequestEnvelope<'a, T: Serialize> {
    #[serde(rename = "type")]
    pub request_type: &'a str,
    pub params: &'a T,
}

impl<'a, T: Serialize> RequestEnvelope<'a, T> {
    pub fn new(request_type: &'a str, params: &'a T) -> Self {
        Self {
            request_type,
            params,
        }
    }
}

/// Implements [`KomodoRequest`] and the path marker trait for a request struct.
macro_rules! komodo_request {
    ($path:ident, $marker:ident, $request:ident => $response:ty) => {
        impl $crate::api::KomodoRequest for $request {
            const PATH: $crate::api::ApiPath = $crate::api::ApiPath::$path;
            const TYPE: &'static str = stringify!($request);
            type Response = $response;
        }

        impl $crate::api::$marker for $request {}
    };
}

pub(crate) use komodo_request;
