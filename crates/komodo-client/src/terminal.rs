//! Terminal execution and interactive terminal sessions.
//!
//! `/terminal/execute` streams the output of a single command line by line.
//! Periphery appends a sentinel line carrying the exit code (and, on newer
//! versions, the working directory after the command). If the stream closes
//! without it, the shell exited mid command (eg. the command was `exit`).

use std::collections::HashMap;

use futures_util::{SinkExt, Stream, StreamExt, TryStreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead};
use tokio_util::io::StreamReader;
use tracing::{debug, info};

use crate::KomodoClient;
use crate::api::terminal::{ConnectTerminalQuery, ExecuteTerminalBody};
use crate::error::{ClientError, ClientResult};
use crate::ws::{LOGGED_IN, TERMINAL_WS_PATH, websocket_url};

pub const TERMINAL_EXECUTE_PATH: &str = "/terminal/execute";

/// `__KOMODO_EXIT_CODE__:<code>`
pub const KOMODO_EXIT_CODE: &str = "__KOMODO_EXIT_CODE__:";
/// `__KOMODO_EXIT_DATA:<code>:<cwd>`
pub const KOMODO_EXIT_DATA: &str = "__KOMODO_EXIT_DATA:";

/// Leading byte of a websocket frame carrying stdin.
const FRAME_STDIN: u8 = 0x00;
/// Leading byte of a websocket frame carrying a json resize.
const FRAME_RESIZE: u8 = 0xFF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalExit {
    /// Exit code exactly as reported.
    pub code: String,
    /// Working directory after the command, when reported.
    pub cwd: Option<String>,
}

impl TerminalExit {
    pub fn exit_code(&self) -> Option<i32> {
        self.code.trim().parse().ok()
    }

    pub fn success(&self) -> bool {
        self.exit_code() == Some(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalLine {
    Output(String),
    Exit(TerminalExit),
}

impl TerminalLine {
    pub fn parse(line: String) -> Self {
        if let Some(data) = line.strip_prefix(KOMODO_EXIT_DATA) {
            let (code, cwd) = match data.split_once(':') {
                Some((code, cwd)) => (code, Some(cwd.to_string())),
                None => (data, None),
            };
            return TerminalLine::Exit(TerminalExit {
                code: code.to_string(),
                cwd,
            });
        }
        if let Some(code) = line.strip_prefix(KOMODO_EXIT_CODE) {
            return TerminalLine::Exit(TerminalExit {
                code: code.to_string(),
                cwd: None,
            });
        }
        TerminalLine::Output(line)
    }
}

/// Collected result of a terminal execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalOutput {
    pub lines: Vec<String>,
    /// `None` when the stream ended without an exit line.
    pub exit: Option<TerminalExit>,
}

impl TerminalOutput {
    pub fn output(&self) -> String {
        self.lines.join("\n")
    }

    pub fn success(&self) -> bool {
        self.exit.as_ref().is_some_and(TerminalExit::success)
    }
}

/// Streaming body of a `/terminal/execute` response.
pub struct TerminalStreamResponse(pub reqwest::Response);

impl TerminalStreamResponse {
    /// Split the body on LF or CRLF. A final unterminated line is kept.
    ///
    /// Lines are split before decoding, so invalid UTF-8 only affects the
    /// line it appears in (replaced with U+FFFD).
    pub fn into_line_stream(
        self,
    ) -> impl Stream<Item = Result<String, AnyDelimiterCodecError>> {
        FramedRead::new(
            StreamReader::new(self.0.bytes_stream().map_err(std::io::Error::other)),
            AnyDelimiterCodec::new(b"\n".to_vec(), b"\n".to_vec()),
        )
        .map_ok(|line| decode_line(&line))
    }

    pub fn into_terminal_stream(self) -> impl Stream<Item = ClientResult<TerminalLine>> {
        self.into_line_stream()
            .map(|line| line.map(TerminalLine::parse).map_err(ClientError::from))
    }
}

fn decode_line(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

impl KomodoClient {
    /// Executes a command on a server's terminal, returning the raw line stream.
    pub async fn execute_terminal_stream(
        &self,
        body: ExecuteTerminalBody,
    ) -> ClientResult<TerminalStreamResponse> {
        debug!(server = %body.server, terminal = %body.terminal, "executing terminal command");
        let response = self.post(TERMINAL_EXECUTE_PATH, &body).await?;
        Ok(TerminalStreamResponse(response))
    }

    /// Executes a command and calls `on_line` for each output line.
    /// Returns the exit line, if the stream carried one.
    pub async fn execute_terminal_with<F>(
        &self,
        body: ExecuteTerminalBody,
        mut on_line: F,
    ) -> ClientResult<Option<TerminalExit>>
    where
        F: FnMut(&str),
    {
        let stream = self.execute_terminal_stream(body).await?.into_terminal_stream();
        futures_util::pin_mut!(stream);
        let mut exit = None;
        while let Some(line) = stream.next().await {
            match line? {
                TerminalLine::Output(line) => on_line(&line),
                TerminalLine::Exit(e) => exit = Some(e),
            }
        }
        Ok(exit)
    }

    /// Executes a command and collects all of its output.
    pub async fn execute_terminal(
        &self,
        body: ExecuteTerminalBody,
    ) -> ClientResult<TerminalOutput> {
        let mut lines = Vec::new();
        let exit = self
            .execute_terminal_with(body, |line| lines.push(line.to_string()))
            .await?;
        Ok(TerminalOutput { lines, exit })
    }

    /// Open an interactive terminal session over `/ws/terminal`.
    ///
    /// Resolves once Core has accepted the login.
    pub async fn connect_terminal(
        &self,
        query: &ConnectTerminalQuery,
    ) -> ClientResult<TerminalConnection> {
        let url = format!(
            "{}?{}",
            websocket_url(self.address(), TERMINAL_WS_PATH),
            terminal_query_string(query)
        );
        let (mut socket, _) = connect_async(url.as_str()).await?;

        if let Some(login) = self.credentials().login_message() {
            socket.send(Message::Text(login.to_json_string()?)).await?;
        }

        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) if text == LOGGED_IN => break,
                Some(Ok(Message::Text(text))) => {
                    let _ = socket.close(None).await;
                    return Err(ClientError::LoginRejected(text));
                }
                Some(Ok(Message::Close(_))) | None => {
                    return Err(ClientError::LoginRejected(
                        "connection closed before login".to_string(),
                    ));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }

        info!(server = %query.server, terminal = %query.terminal, "Connected to terminal");
        Ok(TerminalConnection { socket })
    }
}

fn terminal_query_string(query: &ConnectTerminalQuery) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    serializer
        .append_pair("server", &query.server)
        .append_pair("terminal", &query.terminal);
    if let Some(init) = &query.init {
        serializer.append_pair("init", init);
    }
    serializer.finish()
}

#[derive(Serialize)]
struct ResizeMessage {
    rows: u16,
    cols: u16,
}

/// A logged in interactive terminal session.
pub struct TerminalConnection {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TerminalConnection {
    /// Write bytes to the terminal's stdin.
    pub async fn send_input(&mut self, input: impl AsRef<[u8]>) -> ClientResult<()> {
        let input = input.as_ref();
        let mut frame = Vec::with_capacity(input.len() + 1);
        frame.push(FRAME_STDIN);
        frame.extend_from_slice(input);
        self.socket.send(Message::Binary(frame)).await?;
        Ok(())
    }

    pub async fn resize(&mut self, rows: u16, cols: u16) -> ClientResult<()> {
        let json =
            serde_json::to_vec(&ResizeMessage { rows, cols }).map_err(ClientError::Encode)?;
        let mut frame = Vec::with_capacity(json.len() + 1);
        frame.push(FRAME_RESIZE);
        frame.extend_from_slice(&json);
        self.socket.send(Message::Binary(frame)).await?;
        Ok(())
    }

    /// Next chunk of terminal output. `None` once the session is closed.
    pub async fn next_output(&mut self) -> Option<ClientResult<Vec<u8>>> {
        loop {
            match self.socket.next().await? {
                Ok(Message::Binary(data)) => return Some(Ok(data)),
                Ok(Message::Text(text)) => return Some(Ok(text.into_bytes())),
                Ok(Message::Ping(data)) => {
                    let _ = self.socket.send(Message::Pong(data)).await;
                }
                Ok(Message::Close(_)) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    pub async fn close(mut self) -> ClientResult<()> {
        self.socket.close(None).await?;
        Ok(())
    }
}

/// One command run on a terminal, with its output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalCommand {
    pub command: String,
    pub output: String,
    pub code: Option<String>,
    pub next_cwd: Option<String>,
}

/// Command history per terminal name.
#[derive(Debug, Clone, Default)]
pub struct TerminalHistory {
    history: HashMap<String, Vec<TerminalCommand>>,
}

impl TerminalHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new command entry. Empty commands are ignored.
    pub fn push_command(&mut self, terminal: &str, command: &str) {
        if command.is_empty() {
            return;
        }
        self.history
            .entry(terminal.to_string())
            .or_default()
            .push(TerminalCommand {
                command: command.to_string(),
                ..Default::default()
            });
    }

    /// Record a line against the terminal's latest command.
    /// Lines for a terminal without commands are dropped.
    pub fn push_line(&mut self, terminal: &str, line: &str) {
        let Some(cmd) = self.history.get_mut(terminal).and_then(|c| c.last_mut()) else {
            return;
        };
        match TerminalLine::parse(line.to_string()) {
            TerminalLine::Exit(exit) => {
                cmd.code = Some(exit.code);
                cmd.next_cwd = exit.cwd;
            }
            TerminalLine::Output(line) => {
                if !cmd.output.is_empty() {
                    cmd.output.push('\n');
                }
                cmd.output.push_str(&line);
            }
        }
    }

    /// `(last known cwd, latest command, earlier commands)`.
    pub fn snapshot(
        &self,
        terminal: &str,
    ) -> (Option<&str>, Option<&TerminalCommand>, &[TerminalCommand]) {
        let commands = self
            .history
            .get(terminal)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let Some((current, previous)) = commands.split_last() else {
            return (None, None, &[]);
        };
        let last_cwd = commands.iter().rev().find_map(|c| c.next_cwd.as_deref());
        (last_cwd, Some(current), previous)
    }

    pub fn terminals(&self) -> impl Iterator<Item = &str> {
        self.history.keys().map(String::as_str)
    }

    pub fn clear(&mut self, terminal: &str) {
        self.history.remove(terminal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_line_strips_cr_and_replaces_invalid_utf8() {
        assert_eq!(decode_line(b"plain"), "plain");
        assert_eq!(decode_line(b"dos line\r"), "dos line");
        assert_eq!(decode_line(b"caf\xE9"), "caf\u{FFFD}");
    }

    #[test]
    fn parse_exit_code_sentinel() {
        let line = TerminalLine::parse("__KOMODO_EXIT_CODE__:0".to_string());
        assert_eq!(
            line,
            TerminalLine::Exit(TerminalExit {
                code: "0".to_string(),
                cwd: None
            })
        );
    }

    #[test]
    fn parse_exit_data_with_cwd() {
        let TerminalLine::Exit(exit) =
            TerminalLine::parse("__KOMODO_EXIT_DATA:127:/home/komodo".to_string())
        else {
            panic!("expected exit line");
        };
        assert_eq!(exit.exit_code(), Some(127));
        assert!(!exit.success());
        assert_eq!(exit.cwd.as_deref(), Some("/home/komodo"));
    }

    #[test]
    fn parse_plain_output() {
        assert_eq!(
            TerminalLine::parse("hello".to_string()),
            TerminalLine::Output("hello".to_string())
        );
    }

    #[test]
    fn terminal_output_success_requires_exit_zero() {
        let mut output = TerminalOutput {
            lines: vec!["a".to_string(), "b".to_string()],
            exit: None,
        };
        assert_eq!(output.output(), "a\nb");
        assert!(!output.success());
        output.exit = Some(TerminalExit {
            code: "0".to_string(),
            cwd: None,
        });
        assert!(output.success());
    }

    #[test]
    fn query_string_is_encoded() {
        let query = ConnectTerminalQuery {
            server: "my server".to_string(),
            terminal: "main".to_string(),
            init: Some("bash -l".to_string()),
        };
        assert_eq!(
            terminal_query_string(&query),
            "server=my+server&terminal=main&init=bash+-l"
        );
    }

    // =========================================================================
    // TerminalHistory
    // =========================================================================

    #[test]
    fn history_collects_output_and_exit() {
        let mut history = TerminalHistory::new();
        history.push_command("main", "ls");
        history.push_line("main", "a.txt");
        history.push_line("main", "b.txt");
        history.push_line("main", "__KOMODO_EXIT_DATA:0:/srv");

        let (cwd, current, previous) = history.snapshot("main");
        let current = current.unwrap();
        assert_eq!(cwd, Some("/srv"));
        assert_eq!(current.output, "a.txt\nb.txt");
        assert_eq!(current.code.as_deref(), Some("0"));
        assert!(previous.is_empty());
    }

    #[test]
    fn history_ignores_empty_commands_and_orphan_lines() {
        let mut history = TerminalHistory::new();
        history.push_command("main", "");
        history.push_line("main", "orphan");
        let (cwd, current, previous) = history.snapshot("main");
        assert!(cwd.is_none());
        assert!(current.is_none());
        assert!(previous.is_empty());
    }

    #[test]
    fn history_keeps_last_known_cwd() {
        let mut history = TerminalHistory::new();
        history.push_command("main", "cd /srv");
        history.push_line("main", "__KOMODO_EXIT_DATA:0:/srv");
        history.push_command("main", "sleep 100");

        let (cwd, current, previous) = history.snapshot("main");
        assert_eq!(cwd, Some("/srv"));
        assert_eq!(current.unwrap().command, "sleep 100");
        assert_eq!(previous.len(), 1);
    }

    #[test]
    fn history_is_per_terminal() {
        let mut history = TerminalHistory::new();
        history.push_command("a", "whoami");
        history.push_command("b", "pwd");
        history.push_line("b", "/root");

        assert_eq!(history.snapshot("a").1.unwrap().output, "");
        assert_eq!(history.snapshot("b").1.unwrap().output, "/root");
        history.clear("a");
        assert_eq!(history.terminals().collect::<Vec<_>>(), vec!["b"]);
    }
}
