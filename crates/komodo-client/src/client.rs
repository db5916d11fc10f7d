//! HTTP client for the Komodo Core API.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::api::execute::{BatchExecutionResponse, ExecutionResponse};
use crate::api::read::{GetUpdate, GetVersion};
use crate::api::{
    ApiPath, KomodoAuthRequest, KomodoExecuteRequest, KomodoReadRequest, KomodoRequest,
    KomodoUserRequest, KomodoWriteRequest, RequestEnvelope,
};
use crate::config::{ClientConfig, ConfigStore, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RETRY_TIMEOUT_MS};
use crate::entities::update::Update;
use crate::error::{ClientError, ClientResult, ErrorBody};
use crate::ws::WsLoginMessage;

/// How the client authenticates with Core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Only `/auth` requests succeed without credentials.
    None,
    /// Sent as the `authorization` header.
    Jwt(String),
    /// Sent as the `x-api-key` / `x-api-secret` headers.
    ApiKeys { key: String, secret: String },
}

impl Credentials {
    pub fn api_keys(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::ApiKeys {
            key: key.into(),
            secret: secret.into(),
        }
    }

    pub(crate) fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Credentials::None => request,
            Credentials::Jwt(jwt) => request.header("authorization", jwt),
            Credentials::ApiKeys { key, secret } => request
                .header("x-api-key", key)
                .header("x-api-secret", secret),
        }
    }

    /// First message sent on any websocket. `None` without credentials.
    pub fn login_message(&self) -> Option<WsLoginMessage> {
        match self {
            Credentials::None => None,
            Credentials::Jwt(jwt) => Some(WsLoginMessage::Jwt { jwt: jwt.clone() }),
            Credentials::ApiKeys { key, secret } => Some(WsLoginMessage::ApiKeys {
                key: key.clone(),
                secret: secret.clone(),
            }),
        }
    }
}

/// Client to interface with Komodo Core.
#[derive(Debug, Clone)]
pub struct KomodoClient {
    reqwest: reqwest::Client,
    address: String,
    credentials: Credentials,
    retry_timeout: Duration,
    poll_interval: Duration,
}

impl KomodoClient {
    pub fn new(address: impl Into<String>, credentials: Credentials) -> Self {
        let address: String = address.into();
        Self {
            reqwest: reqwest::Client::default(),
            address: address.trim_end_matches('/').to_string(),
            credentials,
            retry_timeout: Duration::from_millis(DEFAULT_RETRY_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Validates the config and builds a client from it.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        config
            .validate()
            .map_err(|e| ClientError::Config(format!("{e:#}")))?;
        let credentials = config
            .credentials()
            .map_err(|e| ClientError::Config(format!("{e:#}")))?;
        Ok(Self::new(&config.address, credentials)
            .with_retry_timeout(config.retry_timeout())
            .with_poll_interval(config.poll_interval()))
    }

    /// Loads `komodo.toml` from the user config directory, with `KOMODO_*`
    /// environment overrides applied.
    pub fn from_env() -> ClientResult<Self> {
        let config = ConfigStore::from_default_dir()
            .and_then(|store| store.load_with_env())
            .map_err(|e| ClientError::Config(format!("{e:#}")))?;
        Self::from_config(&config)
    }

    /// Add a healthcheck in the initialization pipeline:
    ///
    /// ```ignore
    /// let komodo = KomodoClient::from_env()?.with_healthcheck().await?;
    /// ```
    pub async fn with_healthcheck(self) -> ClientResult<Self> {
        self.health_check().await?;
        Ok(self)
    }

    /// Use a custom reqwest client.
    pub fn set_reqwest(mut self, reqwest: reqwest::Client) -> Self {
        self.reqwest = reqwest;
        self
    }

    pub fn with_retry_timeout(mut self, retry_timeout: Duration) -> Self {
        self.retry_timeout = retry_timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn retry_timeout(&self) -> Duration {
        self.retry_timeout
    }

    /// Send a typed request to its path.
    #[instrument(
        level = "debug",
        skip(self, request),
        fields(path = %R::PATH, request_type = R::TYPE)
    )]
    pub async fn request<R: KomodoRequest>(&self, request: R) -> ClientResult<R::Response> {
        let body = RequestEnvelope::new(R::TYPE, &request);
        let response = self.post(R::PATH.as_str(), &body).await?;
        decode_body(response).await
    }

    /// Send a request by name, with untyped params and response.
    #[instrument(level = "debug", skip(self, params))]
    pub async fn request_raw(
        &self,
        path: ApiPath,
        request_type: &str,
        params: serde_json::Value,
    ) -> ClientResult<serde_json::Value> {
        let body = RequestEnvelope::new(request_type, &params);
        let response = self.post(path.as_str(), &body).await?;
        decode_body(response).await
    }

    /// Call the `/auth` api.
    pub async fn auth<R: KomodoAuthRequest>(&self, request: R) -> ClientResult<R::Response> {
        self.request(request).await
    }

    /// Call the `/user` api.
    pub async fn user<R: KomodoUserRequest>(&self, request: R) -> ClientResult<R::Response> {
        self.request(request).await
    }

    /// Call the `/read` api.
    pub async fn read<R: KomodoReadRequest>(&self, request: R) -> ClientResult<R::Response> {
        self.request(request).await
    }

    /// Call the `/write` api.
    pub async fn write<R: KomodoWriteRequest>(&self, request: R) -> ClientResult<R::Response> {
        self.request(request).await
    }

    /// Call the `/execute` api.
    pub async fn execute<R: KomodoExecuteRequest>(
        &self,
        request: R,
    ) -> ClientResult<R::Response> {
        self.request(request).await
    }

    /// Get the Core version.
    pub async fn core_version(&self) -> ClientResult<String> {
        self.read(GetVersion {}).await.map(|r| r.version)
    }

    /// Send a health check.
    pub async fn health_check(&self) -> ClientResult<()> {
        self.read(GetVersion {}).await.map(|_| ())
    }

    /// Poll an [`Update`] (returned by the `execute` calls) until its status
    /// is `Complete`, then return it.
    pub async fn poll_update_until_complete(
        &self,
        update_id: impl Into<String>,
    ) -> ClientResult<Update> {
        let update_id = update_id.into();
        loop {
            let update = self
                .read(GetUpdate {
                    id: update_id.clone(),
                })
                .await?;
            if update.is_complete() {
                return Ok(update);
            }
            debug!(update_id = %update_id, status = %update.status, "update not complete");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Run an execution, then poll every update it started until complete.
    ///
    /// Batch executions poll each `Ok` item and return `Err` items as is.
    pub async fn execute_and_poll<R>(&self, request: R) -> ClientResult<R::Response>
    where
        R: KomodoExecuteRequest,
        R::Response: ExecutionResponse,
    {
        let response = self.execute(request).await?;
        response.poll_until_complete(self).await
    }

    /// [`execute_and_poll`](Self::execute_and_poll) for a request by name.
    /// The response is a single update, or a batch when Core returns a list.
    pub async fn execute_and_poll_raw(
        &self,
        request_type: &str,
        params: serde_json::Value,
    ) -> ClientResult<serde_json::Value> {
        let response = self
            .request_raw(ApiPath::Execute, request_type, params)
            .await?;
        let polled = if response.is_array() {
            let batch: BatchExecutionResponse =
                serde_json::from_value(response).map_err(ClientError::Decode)?;
            serde_json::to_value(batch.poll_until_complete(self).await?)
        } else {
            let update: Update = serde_json::from_value(response).map_err(ClientError::Decode)?;
            serde_json::to_value(update.poll_until_complete(self).await?)
        };
        polled.map_err(ClientError::Encode)
    }

    /// POST a json body. Any status other than 200 becomes [`ClientError::Api`].
    pub(crate) async fn post(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> ClientResult<reqwest::Response> {
        let url = format!("{}{}", self.address, path);
        let request = self
            .credentials
            .apply(self.reqwest.post(&url))
            .header(CONTENT_TYPE, "application/json")
            .json(body);

        let response = request.send().await.map_err(ClientError::transport)?;
        let status = response.status();
        debug!(url = %url, status = %status, "got response");

        if status == reqwest::StatusCode::OK {
            return Ok(response);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::unreadable_body(status, e))?;
        match serde_json::from_slice::<ErrorBody>(&bytes) {
            Ok(result) => Err(ClientError::Api {
                status: status.as_u16(),
                result,
            }),
            Err(e) => Err(ClientError::unreadable_body(status, e)),
        }
    }
}

async fn decode_body<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ClientError::unreadable_body(status, e))?;
    serde_json::from_slice(&bytes).map_err(ClientError::Decode)
}
