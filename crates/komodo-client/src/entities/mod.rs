//! Entities returned by Komodo Core.
//!
//! Only the fields a client acts on are modeled strictly; everything else
//! is defaulted so newer Core versions keep deserializing.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

pub mod server;
pub mod stack;
pub mod update;

/// Unix time in milliseconds, the timestamp unit used throughout Core.
pub fn komodo_timestamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Empty response body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoData {}

/// Reference to the resource an update or permission applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum ResourceTarget {
    System(String),
    Server(String),
    Stack(String),
    Deployment(String),
    Build(String),
    Repo(String),
    Procedure(String),
    Action(String),
    Builder(String),
    Alerter(String),
    ResourceSync(String),
}

impl ResourceTarget {
    pub fn system() -> Self {
        Self::System(String::new())
    }

    /// Variant name, as serialized in the `type` field.
    pub fn variant(&self) -> &'static str {
        match self {
            Self::System(_) => "System",
            Self::Server(_) => "Server",
            Self::Stack(_) => "Stack",
            Self::Deployment(_) => "Deployment",
            Self::Build(_) => "Build",
            Self::Repo(_) => "Repo",
            Self::Procedure(_) => "Procedure",
            Self::Action(_) => "Action",
            Self::Builder(_) => "Builder",
            Self::Alerter(_) => "Alerter",
            Self::ResourceSync(_) => "ResourceSync",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::System(id)
            | Self::Server(id)
            | Self::Stack(id)
            | Self::Deployment(id)
            | Self::Build(id)
            | Self::Repo(id)
            | Self::Procedure(id)
            | Self::Action(id)
            | Self::Builder(id)
            | Self::Alerter(id)
            | Self::ResourceSync(id) => id,
        }
    }
}

impl Default for ResourceTarget {
    fn default() -> Self {
        Self::system()
    }
}

/// Semantic version attached to builds and updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    #[serde(default)]
    pub major: i32,
    #[serde(default)]
    pub minor: i32,
    #[serde(default)]
    pub patch: i32,
}

impl Version {
    pub fn is_none(&self) -> bool {
        self.major == 0 && self.minor == 0 && self.patch == 0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Full resource document: `Resource<Config, Info>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resource<Config, Info> {
    #[serde(
        default,
        rename = "_id",
        alias = "id",
        deserialize_with = "deserialize_id"
    )]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub template: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub updated_at: i64,
    pub info: Info,
    pub config: Config,
}

/// Summary form returned by the `List*` reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceListItem<Info> {
    pub id: String,
    #[serde(default, rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub template: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub info: Info,
}

/// Free-form filter accepted by the `List*` reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub specific: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tag {
    #[serde(
        default,
        rename = "_id",
        alias = "id",
        deserialize_with = "deserialize_id"
    )]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(
        default,
        rename = "_id",
        alias = "id",
        deserialize_with = "deserialize_id"
    )]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub super_admin: bool,
    #[serde(default)]
    pub create_server_permissions: bool,
    #[serde(default)]
    pub create_build_permissions: bool,
    #[serde(default)]
    pub last_update_view: i64,
    #[serde(default)]
    pub updated_at: i64,
}

/// Accepts both a plain string id and Mongo's extended JSON `{"$oid": "..."}`.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Plain(String),
        Oid {
            #[serde(rename = "$oid")]
            oid: String,
        },
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Plain(id)) => id,
        Some(RawId::Oid { oid }) => oid,
        None => String::new(),
    })
}
