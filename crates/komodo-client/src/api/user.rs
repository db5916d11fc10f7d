//! `/user` requests: actions on the calling user's own account.

use serde::{Deserialize, Serialize};

use super::komodo_request;
use crate::entities::{NoData, ResourceTarget};

/// Create an api key for the calling user.
/// The secret is only ever returned by this call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateApiKey {
    pub name: String,
    /// Unix ms expiry, 0 for no expiry.
    #[serde(default)]
    pub expires: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateApiKeyResponse {
    pub key: String,
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteApiKey {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushRecentlyViewed {
    pub resource: ResourceTarget,
}

komodo_request!(User, KomodoUserRequest, CreateApiKey => CreateApiKeyResponse);
komodo_request!(User, KomodoUserRequest, DeleteApiKey => NoData);
komodo_request!(User, KomodoUserRequest, PushRecentlyViewed => NoData);
