//! `/terminal/execute` streaming.

use komodo_client::api::terminal::ExecuteTerminalBody;
use komodo_client::{ClientError, Credentials, KomodoClient};
use mockito::Matcher;

fn body(command: &str) -> ExecuteTerminalBody {
    ExecuteTerminalBody {
        server: "server-1".to_string(),
        terminal: "main".to_string(),
        command: command.to_string(),
    }
}

#[tokio::test]
async fn collects_lines_and_exit_code() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/terminal/execute")
        .match_header("x-api-key", "k")
        .match_body(Matcher::Json(serde_json::json!({
            "server": "server-1",
            "terminal": "main",
            "command": "ls"
        })))
        .with_status(200)
        .with_body("compose.yaml\r\n.env\n__KOMODO_EXIT_CODE__:0\n")
        .create_async()
        .await;

    let client = KomodoClient::new(server.url(), Credentials::api_keys("k", "s"));
    let output = client.execute_terminal(body("ls")).await.unwrap();

    assert_eq!(output.lines, vec!["compose.yaml", ".env"]);
    assert!(output.success());
    mock.assert_async().await;
}

#[tokio::test]
async fn exit_data_carries_cwd() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/terminal/execute")
        .with_status(200)
        .with_body("oops\n__KOMODO_EXIT_DATA:2:/etc/komodo\n")
        .create_async()
        .await;

    let client = KomodoClient::new(server.url(), Credentials::api_keys("k", "s"));
    let output = client.execute_terminal(body("cd /etc/komodo; false")).await.unwrap();

    let exit = output.exit.unwrap();
    assert_eq!(exit.exit_code(), Some(2));
    assert_eq!(exit.cwd.as_deref(), Some("/etc/komodo"));
}

#[tokio::test]
async fn stream_without_sentinel_has_no_exit() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/terminal/execute")
        .with_status(200)
        .with_body("bye\nunterminated")
        .create_async()
        .await;

    let client = KomodoClient::new(server.url(), Credentials::api_keys("k", "s"));
    let output = client.execute_terminal(body("exit")).await.unwrap();

    assert_eq!(output.lines, vec!["bye", "unterminated"]);
    assert!(output.exit.is_none());
    assert!(!output.success());
}

#[tokio::test]
async fn invalid_utf8_keeps_stream_and_exit_code() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/terminal/execute")
        .with_status(200)
        .with_body(b"caf\xE9\r\nok\n__KOMODO_EXIT_CODE__:0\n".to_vec())
        .create_async()
        .await;

    let client = KomodoClient::new(server.url(), Credentials::api_keys("k", "s"));
    let output = client.execute_terminal(body("cat latin1.txt")).await.unwrap();

    assert_eq!(output.lines, vec!["caf\u{FFFD}", "ok"]);
    assert!(output.success());
}

#[tokio::test]
async fn callback_receives_each_line() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/terminal/execute")
        .with_status(200)
        .with_body("1\n2\n3\n__KOMODO_EXIT_CODE__:0\n")
        .create_async()
        .await;

    let client = KomodoClient::new(server.url(), Credentials::api_keys("k", "s"));
    let mut seen = Vec::new();
    let exit = client
        .execute_terminal_with(body("seq 3"), |line| seen.push(line.to_string()))
        .await
        .unwrap();

    assert_eq!(seen, vec!["1", "2", "3"]);
    assert!(exit.unwrap().success());
}

#[tokio::test]
async fn error_status_is_api_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/terminal/execute")
        .with_status(400)
        .with_body(r#"{"error": "terminals are disabled on this server", "trace": []}"#)
        .create_async()
        .await;

    let client = KomodoClient::new(server.url(), Credentials::api_keys("k", "s"));
    let err = client.execute_terminal(body("ls")).await.unwrap_err();

    assert!(
        matches!(err, ClientError::Api { status: 400, ref result } if result.error.contains("disabled"))
    );
}
