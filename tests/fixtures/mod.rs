//! Shared integration test fixtures.

#![allow(dead_code)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use boardroom::ServerConfig;

/// In-process server under test, one per test on its own port.
pub struct TestServer {
    port: u16,
}

impl TestServer {
    /// Spawn the server and wait for the health endpoint to answer.
    pub async fn start(port: u16) -> Self {
        Self::start_with_sync_timeout(port, 10_000).await
    }

    /// Like `start`, with a custom peer-pull sync deadline.
    pub async fn start_with_sync_timeout(port: u16, sync_timeout_ms: u64) -> Self {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port,
            cors_origin: "*".to_string(),
            sync_timeout_ms,
            log_level: "debug".to_string(),
        };
        tokio::spawn(async move {
            if let Err(e) = boardroom::run(config).await {
                eprintln!("test server error: {e}");
            }
        });

        let client = reqwest::Client::new();
        let url = format!("http://127.0.0.1:{port}/api/health");
        for _ in 0..50 {
            if let Ok(response) = client.get(&url).send().await
                && response.status().is_success()
            {
                return Self { port };
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("test server did not become ready on port {port}");
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }
}

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open a client socket and consume the `connected` greeting, returning
/// the socket and the connection id the server assigned.
pub async fn connect(server: &TestServer) -> (WsClient, String) {
    let (mut ws, _response) = connect_async(server.ws_url()).await.expect("ws connect");
    let greeting = recv_event(&mut ws).await;
    assert_eq!(greeting["type"], "connected");
    let id = greeting["connection_id"]
        .as_str()
        .expect("connection id in greeting")
        .to_string();
    (ws, id)
}

pub async fn send_event(ws: &mut WsClient, event: Value) {
    ws.send(Message::Text(event.to_string().into()))
        .await
        .expect("ws send");
}

/// Receive the next JSON event, skipping non-text frames. Panics after
/// two seconds of silence.
pub async fn recv_event(ws: &mut WsClient) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("socket closed")
            .expect("socket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("invalid json from server");
        }
    }
}

/// Assert no text frame arrives within the grace window.
pub async fn expect_silence(ws: &mut WsClient, window: Duration) {
    match tokio::time::timeout(window, ws.next()).await {
        Err(_) => {}
        Ok(Some(Ok(Message::Text(text)))) => panic!("unexpected event: {text}"),
        Ok(_) => {}
    }
}

/// Send a join and return the server's first reply (`joined` on
/// success, `error` on rejection).
pub async fn join(ws: &mut WsClient, room: &str, name: &str, role: Option<&str>) -> Value {
    let mut payload = serde_json::json!({
        "type": "join",
        "room_id": room,
        "display_name": name,
    });
    if let Some(role) = role {
        payload["requested_role"] = role.into();
    }
    send_event(ws, payload).await;
    recv_event(ws).await
}
