#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]
#![allow(
    unused,
    reason = "Not every test binary uses every helper of the mock server"
)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt as _, StreamExt as _};
use herald_realtime::realtime::Identity;
use herald_realtime::ws::Config;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

pub const USER_ID: &str = "player-1";
pub const TOKEN: &str = "t0ken";

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(3);

#[must_use]
pub fn identity() -> Identity {
    Identity::new(USER_ID, TOKEN).unwrap()
}

/// Config with delays small enough for tests.
#[must_use]
pub fn config() -> Config {
    let mut config = Config::default();
    config.reconnect.max_attempts = Some(5);
    config.reconnect.initial_backoff = Duration::from_millis(20);
    config.reconnect.max_backoff = Duration::from_millis(100);
    config
}

/// Inbound envelope as the update service would send it.
#[must_use]
pub fn frame(kind: &str, data: &Value) -> String {
    json!({
        "type": kind,
        "data": data,
        "timestamp": "2024-05-01T10:30:00Z",
        "id": "evt-1",
    })
    .to_string()
}

#[derive(Debug, Clone)]
enum Command {
    Text(String),
    Close(u16, String),
    /// Drop the TCP stream without a close frame
    Drop,
    /// Stop reading, so pings stay unanswered
    Mute,
}

/// In-process WebSocket server standing in for the update service.
///
/// Records the handshake URI of every connection and every text frame the
/// client sends. Commands apply to all connections open at the time.
pub struct MockServer {
    addr: SocketAddr,
    commands: broadcast::Sender<Command>,
    frames: mpsc::UnboundedReceiver<String>,
    uris: Arc<Mutex<Vec<String>>>,
    refusing: Arc<AtomicBool>,
}

impl MockServer {
    /// Start a mock server on a random port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (commands, _) = broadcast::channel::<Command>(100);
        let (frame_tx, frames) = mpsc::unbounded_channel::<String>();
        let uris = Arc::new(Mutex::new(Vec::new()));
        let refusing = Arc::new(AtomicBool::new(false));

        let command_tx = commands.clone();
        let uri_log = Arc::clone(&uris);
        let refuse = Arc::clone(&refusing);

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };

                if refuse.load(Ordering::SeqCst) {
                    drop(stream);
                    continue;
                }

                let log = Arc::clone(&uri_log);
                let record =
                    move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                        log.lock().unwrap().push(request.uri().to_string());
                        Ok(response)
                    };
                let Ok(ws_stream) = tokio_tungstenite::accept_hdr_async(stream, record).await
                else {
                    continue;
                };

                let (mut write, mut read) = ws_stream.split();
                let frame_tx = frame_tx.clone();
                let mut command_rx = command_tx.subscribe();

                tokio::spawn(async move {
                    let mut muted = false;
                    loop {
                        tokio::select! {
                            message = read.next(), if !muted => {
                                match message {
                                    Some(Ok(Message::Text(text))) => {
                                        drop(frame_tx.send(text.to_string()));
                                    }
                                    Some(Ok(_)) => {}
                                    _ => break,
                                }
                            }
                            command = command_rx.recv() => {
                                match command {
                                    Ok(Command::Text(text)) => {
                                        if write.send(Message::Text(text.into())).await.is_err() {
                                            break;
                                        }
                                    }
                                    Ok(Command::Close(code, reason)) => {
                                        let frame = CloseFrame {
                                            code: CloseCode::from(code),
                                            reason: reason.into(),
                                        };
                                        drop(write.send(Message::Close(Some(frame))).await);
                                        break;
                                    }
                                    Ok(Command::Mute) => muted = true,
                                    Ok(Command::Drop) | Err(_) => break,
                                }
                            }
                        }
                    }
                });
            }
        });

        Self {
            addr,
            commands,
            frames,
            uris,
            refusing,
        }
    }

    /// Base URL the client is built from; the client upgrades it to `ws`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}/ws", self.addr)
    }

    /// Push a text frame to every open connection.
    pub fn send(&self, text: &str) {
        drop(self.commands.send(Command::Text(text.to_owned())));
    }

    /// Close every open connection with `code`.
    pub fn close(&self, code: u16, reason: &str) {
        drop(self.commands.send(Command::Close(code, reason.to_owned())));
    }

    /// Drop every open connection without a close frame.
    pub fn drop_connections(&self) {
        drop(self.commands.send(Command::Drop));
    }

    /// Stop reading on every open connection.
    pub fn mute(&self) {
        drop(self.commands.send(Command::Mute));
    }

    /// Fail every handshake from now on.
    pub fn refuse_connections(&self) {
        self.refusing.store(true, Ordering::SeqCst);
    }

    pub fn accept_connections(&self) {
        self.refusing.store(false, Ordering::SeqCst);
    }

    /// Handshake URIs, one per accepted connection.
    #[must_use]
    pub fn uris(&self) -> Vec<String> {
        self.uris.lock().unwrap().clone()
    }

    /// Next text frame sent by the client, parsed as JSON.
    pub async fn next_frame(&mut self) -> Option<Value> {
        let text = timeout(WAIT, self.frames.recv()).await.ok().flatten()?;
        Some(serde_json::from_str(&text).unwrap())
    }

    /// Whether the client stays silent for `quiet`.
    pub async fn is_silent_for(&mut self, quiet: Duration) -> bool {
        timeout(quiet, self.frames.recv()).await.is_err()
    }
}
