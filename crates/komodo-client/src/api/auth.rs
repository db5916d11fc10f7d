//! `/auth` requests. These work without credentials, except [`GetUser`].

use serde::{Deserialize, Serialize};

use super::komodo_request;
use crate::entities::User;

/// Which login methods Core has enabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetLoginOptions {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetLoginOptionsResponse {
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub github: bool,
    #[serde(default)]
    pub google: bool,
    #[serde(default)]
    pub oidc: bool,
    #[serde(default)]
    pub registration_disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginLocalUser {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateLocalUser {
    pub username: String,
    pub password: String,
}

/// Exchange a one-time token from an OAuth redirect for a jwt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeForJwt {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwtResponse {
    pub jwt: String,
}

/// The user the credentials belong to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetUser {}

komodo_request!(Auth, KomodoAuthRequest, GetLoginOptions => GetLoginOptionsResponse);
komodo_request!(Auth, KomodoAuthRequest, LoginLocalUser => JwtResponse);
komodo_request!(Auth, KomodoAuthRequest, CreateLocalUser => JwtResponse);
komodo_request!(Auth, KomodoAuthRequest, ExchangeForJwt => JwtResponse);
komodo_request!(Auth, KomodoAuthRequest, GetUser => User);
