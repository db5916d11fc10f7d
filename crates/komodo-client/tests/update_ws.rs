//! Update websocket subscription against a local websocket server.

mod support;

use std::time::Duration;

use futures_util::SinkExt;
use komodo_client::prelude::*;
use komodo_client::{Credentials, KomodoClient};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use support::{WsServer, expect_login, update_json};

const WAIT: Duration = Duration::from_secs(5);

async fn next_event(subscription: &mut UpdateSubscription) -> UpdateWsEvent {
    timeout(WAIT, subscription.recv())
        .await
        .expect("timed out waiting for event")
        .expect("subscription ended")
}

#[tokio::test]
async fn logs_in_and_streams_updates() {
    let server = WsServer::bind().await;
    let client = KomodoClient::new(&server.address, Credentials::api_keys("key", "secret"));
    let mut subscription = client.subscribe_to_update_channel(UpdateWsOptions::default());

    let (mut socket, uri) = server.accept().await;
    assert_eq!(uri, "/ws/update");
    let login = expect_login(&mut socket).await;
    assert_eq!(
        login,
        serde_json::json!({"type": "ApiKeys", "params": {"key": "key", "secret": "secret"}})
    );
    socket.send(Message::Text(update_json("u1"))).await.unwrap();
    socket.send(Message::Text("not an update".to_string())).await.unwrap();
    socket.send(Message::Text(update_json("u2"))).await.unwrap();

    assert!(matches!(next_event(&mut subscription).await, UpdateWsEvent::Connected));
    assert!(matches!(next_event(&mut subscription).await, UpdateWsEvent::LoggedIn));
    match next_event(&mut subscription).await {
        UpdateWsEvent::Update(update) => {
            assert_eq!(update.id, "u1");
            assert_eq!(update.status, UpdateStatus::Complete);
            assert_eq!(update.target, ResourceTarget::Stack("stack-1".to_string()));
        }
        other => panic!("unexpected event: {other:?}"),
    }
    let update = timeout(WAIT, subscription.next_update()).await.unwrap().unwrap();
    assert_eq!(update.id, "u2");

    subscription.cancel().await;
}

#[tokio::test]
async fn reconnects_after_close() {
    let server = WsServer::bind().await;
    let client = KomodoClient::new(&server.address, Credentials::Jwt("token".to_string()));
    let options = UpdateWsOptions::default().with_retry_timeout(Duration::from_millis(20));
    let mut subscription = client.subscribe_to_update_channel(options);

    let (mut socket, _) = server.accept().await;
    let login = expect_login(&mut socket).await;
    assert_eq!(login["type"], "Jwt");
    socket.close(None).await.unwrap();
    drop(socket);

    assert!(matches!(next_event(&mut subscription).await, UpdateWsEvent::Connected));
    assert!(matches!(next_event(&mut subscription).await, UpdateWsEvent::LoggedIn));
    assert!(matches!(next_event(&mut subscription).await, UpdateWsEvent::Closed));

    // Second connection after the retry timeout.
    let (mut socket, _) = timeout(WAIT, server.accept()).await.unwrap();
    expect_login(&mut socket).await;
    socket.send(Message::Text(update_json("after-reconnect"))).await.unwrap();

    let update = timeout(WAIT, subscription.next_update()).await.unwrap().unwrap();
    assert_eq!(update.id, "after-reconnect");

    subscription.cancel().await;
}

#[tokio::test]
async fn connection_errors_are_reported_and_retried() {
    // Nothing listening on this port.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = KomodoClient::new(address, Credentials::None);
    let options = UpdateWsOptions::default().with_retry_timeout(Duration::from_millis(10));
    let mut subscription = client.subscribe_to_update_channel(options);

    assert!(matches!(next_event(&mut subscription).await, UpdateWsEvent::Error(_)));
    assert!(matches!(next_event(&mut subscription).await, UpdateWsEvent::Error(_)));

    subscription.cancel().await;
}

#[tokio::test]
async fn cancel_emits_cancelled_and_stops() {
    let server = WsServer::bind().await;
    let client = KomodoClient::new(&server.address, Credentials::Jwt("token".to_string()));
    let cancel = tokio_util::sync::CancellationToken::new();
    let options = UpdateWsOptions::default().with_cancel(cancel.clone());

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let task = tokio::spawn(async move {
        client
            .subscribe_to_updates(options, move |event| {
                let _ = tx.send(event);
            })
            .await;
    });

    let (mut socket, _) = server.accept().await;
    expect_login(&mut socket).await;
    assert!(matches!(
        timeout(WAIT, rx.recv()).await.unwrap(),
        Some(UpdateWsEvent::Connected)
    ));

    cancel.cancel();
    timeout(WAIT, task).await.unwrap().unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(matches!(events.last(), Some(UpdateWsEvent::Cancelled)));
}

#[tokio::test]
async fn cancel_during_handshake_does_not_report_closed() {
    // Bound but never accepted, so the websocket handshake stalls.
    let server = WsServer::bind().await;
    let client = KomodoClient::new(&server.address, Credentials::Jwt("token".to_string()));
    let cancel = tokio_util::sync::CancellationToken::new();
    let options = UpdateWsOptions::default().with_cancel(cancel.clone());

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let task = tokio::spawn(async move {
        client
            .subscribe_to_updates(options, move |event| {
                let _ = tx.send(event);
            })
            .await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    timeout(WAIT, task).await.unwrap().unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(
        matches!(events.as_slice(), [UpdateWsEvent::Cancelled]),
        "unexpected events: {events:?}"
    );
    drop(server);
}
