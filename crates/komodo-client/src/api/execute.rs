//! `/execute` requests.
//!
//! Executions return an [`Update`] straight away with status `InProgress`;
//! use [`KomodoClient::execute_and_poll`], [`KomodoClient::poll_update_until_complete`]
//! or the update websocket to follow it.

use std::future::Future;

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};

use super::komodo_request;
use crate::KomodoClient;
use crate::entities::update::Update;
use crate::error::ClientResult;

/// `docker compose up`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployStack {
    /// Id or name
    pub stack: String,
    /// Only deploy these services. Empty deploys all.
    #[serde(default)]
    pub services: Vec<String>,
    /// Override the termination max time, used if the stack is taken down first.
    pub stop_time: Option<i32>,
}

/// `docker compose stop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopStack {
    pub stack: String,
    #[serde(default)]
    pub services: Vec<String>,
    pub stop_time: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartStack {
    pub stack: String,
    #[serde(default)]
    pub services: Vec<String>,
}

/// `docker compose pull`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullStack {
    pub stack: String,
    #[serde(default)]
    pub services: Vec<String>,
}

/// Deploy every stack matching `pattern` in parallel.
///
/// The pattern accepts names, ids, wildcards (`foo-*`) and regex, combined
/// with commas or newlines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchDeployStack {
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunBuild {
    pub build: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunProcedure {
    pub procedure: String,
}

/// Admin only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClearRepoCache {}

/// Admin only. Dumps the database to the folder mounted at `/backups`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupCoreDatabase {}

/// Admin only. Pull and redeploy stacks and deployments with updates available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalAutoUpdate {}

/// One result per resource matched by a batch execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", content = "data")]
pub enum BatchExecutionResponseItem {
    Ok(Update),
    Err(BatchExecutionResponseItemErr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchExecutionResponseItemErr {
    pub name: String,
    pub error: crate::error::ErrorBody,
}

pub type BatchExecutionResponse = Vec<BatchExecutionResponseItem>;

/// Response of an execution that can be followed until its updates complete.
/// Used by [`KomodoClient::execute_and_poll`].
pub trait ExecutionResponse: Sized {
    fn poll_until_complete(
        self,
        client: &KomodoClient,
    ) -> impl Future<Output = ClientResult<Self>>;
}

impl ExecutionResponse for Update {
    async fn poll_until_complete(self, client: &KomodoClient) -> ClientResult<Self> {
        client.poll_update_until_complete(self.id).await
    }
}

/// `Ok` items are polled concurrently, `Err` items pass through untouched.
impl ExecutionResponse for BatchExecutionResponse {
    async fn poll_until_complete(self, client: &KomodoClient) -> ClientResult<Self> {
        try_join_all(self.into_iter().map(|item| async move {
            match item {
                BatchExecutionResponseItem::Ok(update) => client
                    .poll_update_until_complete(update.id)
                    .await
                    .map(BatchExecutionResponseItem::Ok),
                err => Ok(err),
            }
        }))
        .await
    }
}

komodo_request!(Execute, KomodoExecuteRequest, DeployStack => Update);
komodo_request!(Execute, KomodoExecuteRequest, StopStack => Update);
komodo_request!(Execute, KomodoExecuteRequest, RestartStack => Update);
komodo_request!(Execute, KomodoExecuteRequest, PullStack => Update);
komodo_request!(Execute, KomodoExecuteRequest, BatchDeployStack => BatchExecutionResponse);
komodo_request!(Execute, KomodoExecuteRequest, RunBuild => Update);
komodo_request!(Execute, KomodoExecuteRequest, RunProcedure => Update);
komodo_request!(Execute, KomodoExecuteRequest, ClearRepoCache => Update);
komodo_request!(Execute, KomodoExecuteRequest, BackupCoreDatabase => Update);
komodo_request!(Execute, KomodoExecuteRequest, GlobalAutoUpdate => Update);
