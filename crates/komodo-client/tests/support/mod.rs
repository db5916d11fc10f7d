//! Test helpers: a minimal websocket server standing in for Komodo Core.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

pub struct WsServer {
    listener: TcpListener,
    pub address: String,
}

impl WsServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        Self { listener, address }
    }

    /// Accept one connection, returning the socket and the request uri.
    pub async fn accept(&self) -> (WebSocketStream<TcpStream>, String) {
        let (stream, _) = self.listener.accept().await.unwrap();
        let uri = Arc::new(Mutex::new(String::new()));
        let captured = uri.clone();
        let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            *captured.lock().unwrap() = req.uri().to_string();
            Ok(resp)
        };
        let socket = tokio_tungstenite::accept_hdr_async(stream, callback)
            .await
            .unwrap();
        let uri = uri.lock().unwrap().clone();
        (socket, uri)
    }
}

/// Read the login frame and answer `LOGGED_IN`. Returns the login json.
pub async fn expect_login(socket: &mut WebSocketStream<TcpStream>) -> serde_json::Value {
    let login = match socket.next().await {
        Some(Ok(Message::Text(text))) => serde_json::from_str(&text).unwrap(),
        other => panic!("expected login message, got {other:?}"),
    };
    socket
        .send(Message::Text("LOGGED_IN".to_string()))
        .await
        .unwrap();
    login
}

pub fn update_json(id: &str) -> String {
    serde_json::json!({
        "id": id,
        "operation": "DeployStack",
        "start_ts": 1_700_000_000_000i64,
        "success": true,
        "username": "admin",
        "operator": "user-1",
        "target": {"type": "Stack", "id": "stack-1"},
        "status": "Complete"
    })
    .to_string()
}
