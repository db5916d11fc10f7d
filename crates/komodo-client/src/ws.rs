//! Update websocket with automatic reconnect.
//!
//! Core pushes an [`UpdateListItem`] for every update the user can see on
//! `/ws/update`. The first frame sent after connecting must be a
//! [`WsLoginMessage`]; Core answers `LOGGED_IN` and then starts streaming.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::KomodoClient;
use crate::config::DEFAULT_RETRY_TIMEOUT_MS;
use crate::entities::update::UpdateListItem;
use crate::error::{ClientError, ClientResult};

/// Text frame Core sends once the login message is accepted.
pub const LOGGED_IN: &str = "LOGGED_IN";

pub const UPDATE_WS_PATH: &str = "/ws/update";
pub const TERMINAL_WS_PATH: &str = "/ws/terminal";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum WsLoginMessage {
    Jwt { jwt: String },
    ApiKeys { key: String, secret: String },
}

impl WsLoginMessage {
    pub fn to_json_string(&self) -> ClientResult<String> {
        serde_json::to_string(self).map_err(ClientError::Encode)
    }

    pub fn from_json_str(json: &str) -> ClientResult<Self> {
        serde_json::from_str(json).map_err(ClientError::Decode)
    }
}

/// Websocket url for `path`: `http` becomes `ws`, `https` becomes `wss`.
pub fn websocket_url(address: &str, path: &str) -> String {
    let address = address.trim_end_matches('/');
    let address = match address.strip_prefix("http") {
        Some(rest) => format!("ws{rest}"),
        None => address.to_string(),
    };
    format!("{address}{path}")
}

#[derive(Debug, Clone)]
pub enum UpdateWsEvent {
    /// Socket opened, login message sent.
    Connected,
    /// Core accepted the login.
    LoggedIn,
    Update(Box<UpdateListItem>),
    /// Socket closed, a reconnect follows unless cancelled.
    Closed,
    /// Connection attempt or socket failed, a reconnect follows unless cancelled.
    Error(String),
    /// The subscription stopped for good.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct UpdateWsOptions {
    /// Delay between a disconnect and the next connection attempt.
    pub retry_timeout: Duration,
    pub cancel: CancellationToken,
}

impl Default for UpdateWsOptions {
    fn default() -> Self {
        Self {
            retry_timeout: Duration::from_millis(DEFAULT_RETRY_TIMEOUT_MS),
            cancel: CancellationToken::new(),
        }
    }
}

impl UpdateWsOptions {
    pub fn with_retry_timeout(mut self, retry_timeout: Duration) -> Self {
        self.retry_timeout = retry_timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// A subscription running on a background task.
pub struct UpdateSubscription {
    events: mpsc::UnboundedReceiver<UpdateWsEvent>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl UpdateSubscription {
    /// Next event. `None` once the subscription has stopped.
    pub async fn recv(&mut self) -> Option<UpdateWsEvent> {
        self.events.recv().await
    }

    /// Next update, skipping connection events.
    pub async fn next_update(&mut self) -> Option<UpdateListItem> {
        while let Some(event) = self.events.recv().await {
            if let UpdateWsEvent::Update(update) = event {
                return Some(*update);
            }
        }
        None
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the subscription and wait for the background task to finish.
    pub async fn cancel(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

impl KomodoClient {
    /// Subscribes to the update websocket with an automatic reconnect loop.
    ///
    /// Only returns once `options.cancel` is cancelled, after emitting
    /// [`UpdateWsEvent::Cancelled`].
    pub async fn subscribe_to_updates<F>(&self, options: UpdateWsOptions, mut on_event: F)
    where
        F: FnMut(UpdateWsEvent),
    {
        let url = websocket_url(self.address(), UPDATE_WS_PATH);
        let UpdateWsOptions {
            retry_timeout,
            cancel,
        } = options;

        loop {
            if cancel.is_cancelled() {
                on_event(UpdateWsEvent::Cancelled);
                return;
            }

            match self.run_update_socket(&url, &cancel, &mut on_event).await {
                Ok(true) => on_event(UpdateWsEvent::Closed),
                Ok(false) => {}
                Err(e) => {
                    warn!(url = %url, error = %e, "Update websocket failed");
                    on_event(UpdateWsEvent::Error(e.to_string()));
                }
            }

            if cancel.is_cancelled() {
                continue;
            }

            debug!(delay_ms = retry_timeout.as_millis() as u64, "Reconnecting update websocket");
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(retry_timeout) => {}
            }
        }
    }

    /// Spawn [`subscribe_to_updates`](Self::subscribe_to_updates) on the
    /// runtime and receive its events over a channel.
    ///
    /// Dropping the returned receiver side stops the loop at the next event.
    pub fn subscribe_to_update_channel(&self, options: UpdateWsOptions) -> UpdateSubscription {
        let (tx, events) = mpsc::unbounded_channel();
        let cancel = options.cancel.clone();
        let client = self.clone();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            client
                .subscribe_to_updates(options, move |event| {
                    if tx.send(event).is_err() {
                        task_cancel.cancel();
                    }
                })
                .await;
        });
        UpdateSubscription {
            events,
            cancel,
            handle,
        }
    }

    /// Returns `Ok(false)` when cancelled before a socket was opened.
    async fn run_update_socket<F>(
        &self,
        url: &str,
        cancel: &CancellationToken,
        on_event: &mut F,
    ) -> ClientResult<bool>
    where
        F: FnMut(UpdateWsEvent),
    {
        let (socket, _) = tokio::select! {
            _ = cancel.cancelled() => return Ok(false),
            res = connect_async(url) => res?,
        };
        let (mut ws_tx, mut ws_rx) = socket.split();

        if let Some(login) = self.credentials().login_message() {
            ws_tx.send(Message::Text(login.to_json_string()?)).await?;
        }
        info!(url = %url, "Connected to update websocket");
        on_event(UpdateWsEvent::Connected);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    return Ok(true);
                }
                msg = ws_rx.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = parse_update_frame(&text) {
                            on_event(event);
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(true),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                }
            }
        }
    }
}

/// `LOGGED_IN` or an update. Anything else (eg. a login error Core sends
/// before closing) is logged and dropped.
fn parse_update_frame(text: &str) -> Option<UpdateWsEvent> {
    if text == LOGGED_IN {
        return Some(UpdateWsEvent::LoggedIn);
    }
    match serde_json::from_str::<UpdateListItem>(text) {
        Ok(update) => Some(UpdateWsEvent::Update(Box::new(update))),
        Err(e) => {
            warn!(error = %e, message = %text, "Failed to parse update websocket message");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_url_swaps_scheme() {
        assert_eq!(
            websocket_url("http://localhost:9120", UPDATE_WS_PATH),
            "ws://localhost:9120/ws/update"
        );
        assert_eq!(
            websocket_url("https://komodo.example.com/", UPDATE_WS_PATH),
            "wss://komodo.example.com/ws/update"
        );
    }

    #[test]
    fn login_message_wire_format() {
        let jwt = WsLoginMessage::Jwt {
            jwt: "abc".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&jwt).unwrap(),
            serde_json::json!({"type": "Jwt", "params": {"jwt": "abc"}})
        );

        let keys = WsLoginMessage::from_json_str(
            r#"{"type": "ApiKeys", "params": {"key": "k", "secret": "s"}}"#,
        )
        .unwrap();
        assert_eq!(
            keys,
            WsLoginMessage::ApiKeys {
                key: "k".to_string(),
                secret: "s".to_string()
            }
        );
    }

    #[test]
    fn parse_frames() {
        assert!(matches!(
            parse_update_frame(LOGGED_IN),
            Some(UpdateWsEvent::LoggedIn)
        ));
        let event = parse_update_frame(r#"{"id": "u1", "operation": "RunBuild", "start_ts": 10}"#);
        assert!(matches!(event, Some(UpdateWsEvent::Update(u)) if u.id == "u1"));
        assert!(parse_update_frame("failed to authenticate user using jwt").is_none());
    }
}
