//! Shared test harness: an in-process WebSocket server on a random port.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use notify_client::{ClientConfig, ConnectionSettings, DeliveryMode, DispatchSettings};

enum SessionCommand {
    Send(String),
    Close,
}

/// One accepted client connection, controllable from the test body.
pub struct ServerSession {
    commands: mpsc::UnboundedSender<SessionCommand>,
    received: Arc<Mutex<Vec<String>>>,
}

impl ServerSession {
    /// Push a text frame to the client.
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.commands.send(SessionCommand::Send(text.into()));
    }

    /// Close the connection from the server side.
    pub fn close(&self) {
        let _ = self.commands.send(SessionCommand::Close);
    }

    /// Text frames the client has sent to the server so far.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }
}

/// WebSocket echo-less server that hands each accepted connection to the
/// test as a [`ServerSession`].
pub struct TestServer {
    addr: SocketAddr,
    sessions: mpsc::UnboundedReceiver<ServerSession>,
    accept_task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (session_tx, sessions) = mpsc::unbounded_channel();

        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _peer)) = listener.accept().await {
                let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
                    continue;
                };

                let (commands_tx, mut commands_rx) = mpsc::unbounded_channel();
                let received = Arc::new(Mutex::new(Vec::new()));
                let session = ServerSession {
                    commands: commands_tx,
                    received: Arc::clone(&received),
                };
                if session_tx.send(session).is_err() {
                    return;
                }

                tokio::spawn(async move {
                    let (mut write, mut read) = ws.split();
                    loop {
                        tokio::select! {
                            cmd = commands_rx.recv() => match cmd {
                                Some(SessionCommand::Send(text)) => {
                                    if write.send(Message::Text(text.into())).await.is_err() {
                                        return;
                                    }
                                }
                                Some(SessionCommand::Close) | None => {
                                    let _ = write.send(Message::Close(None)).await;
                                    return;
                                }
                            },
                            msg = read.next() => match msg {
                                Some(Ok(Message::Text(text))) => received.lock().push(text.to_string()),
                                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                                Some(Ok(_)) => {}
                            },
                        }
                    }
                });
            }
        });

        Self {
            addr,
            sessions,
            accept_task,
        }
    }

    /// HTTP-style base URL for the client configuration.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Wait for the next accepted client connection.
    pub async fn next_session(&mut self) -> ServerSession {
        tokio::time::timeout(Duration::from_secs(5), self.sessions.recv())
            .await
            .expect("timed out waiting for a client session")
            .expect("accept loop ended")
    }

    /// Assert that no new client connection arrives within `window`.
    pub async fn expect_no_session(&mut self, window: Duration) {
        assert!(
            tokio::time::timeout(window, self.sessions.recv())
                .await
                .is_err(),
            "unexpected new client session"
        );
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

/// TCP listener that accepts and immediately drops every connection, so a
/// WebSocket handshake against it can never succeed. Returns the address,
/// the running accept count, and the accept task handle.
pub async fn start_refusing_server() -> (SocketAddr, Arc<AtomicUsize>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&accepts);
    let task = tokio::spawn(async move {
        while let Ok((stream, _peer)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });

    (addr, accepts, task)
}

/// Client configuration pointed at a test server, with fast reconnection.
pub fn test_config(base_url: String) -> ClientConfig {
    ClientConfig {
        base_url,
        connection: ConnectionSettings {
            reconnect_interval: Duration::from_millis(100),
            max_reconnect_attempts: 5,
        },
        dispatch: DispatchSettings {
            mode: DeliveryMode::Immediate,
            throttle_window: Duration::from_millis(5000),
        },
    }
}

/// Poll `predicate` every 10ms until it holds or `deadline` elapses.
pub async fn wait_until(deadline: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    predicate()
}

/// Well-formed wire frame for a document notification.
pub fn notification_frame(user: &str, document: &str, timestamp: &str) -> String {
    serde_json::json!({
        "Timestamp": timestamp,
        "UserID": user,
        "UserName": format!("User {user}"),
        "DocumentID": document,
        "DocumentTitle": format!("Document {document}"),
    })
    .to_string()
}
