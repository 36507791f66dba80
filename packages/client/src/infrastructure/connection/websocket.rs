//! WebSocket を使った RoomConnector 実装
//!
//! ## 責務
//!
//! - ルームへの WebSocket 接続の確立（バックグラウンドタスク）
//! - 送信キューの書き出しと受信フレームの転送
//! - 意図しない切断の通知（close listener が有効な場合のみ）
//!
//! ## 設計ノート
//!
//! `open` は即座にハンドルを返します。ハンドシェイクが完了する前でも
//! `send` はキューに積まれ、接続後に順番に書き出されます。

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Notify, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use crate::domain::{
    ConnectionError, ConnectionEvent, ConnectionHandle, OpenedConnection, OutboundMessage,
    RoomConnector,
};
use crate::infrastructure::dto::encode_outbound;

/// Commands from the handle to the connection task
enum Outbound {
    Frame(String),
    Close,
}

/// State shared between a handle and its connection task
struct Shared {
    listening: AtomicBool,
    closed: AtomicBool,
    shutdown: Notify,
}

/// WebSocket room connector
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

impl RoomConnector for WebSocketConnector {
    fn open(&self, endpoint: Url) -> OpenedConnection {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            listening: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
        });

        tokio::spawn(run_connection(
            endpoint.clone(),
            outbound_rx,
            event_tx,
            Arc::clone(&shared),
        ));

        let handle = Arc::new(WebSocketConnection {
            endpoint,
            outbound: outbound_tx,
            shared,
        });

        OpenedConnection {
            handle,
            events: event_rx,
        }
    }
}

/// Handle to one WebSocket room connection
pub struct WebSocketConnection {
    endpoint: Url,
    outbound: mpsc::UnboundedSender<Outbound>,
    shared: Arc<Shared>,
}

impl ConnectionHandle for WebSocketConnection {
    fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn send(&self, message: OutboundMessage) -> Result<(), ConnectionError> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(ConnectionError::Closed(self.endpoint.to_string()));
        }
        let text = encode_outbound(&message).map_err(|e| ConnectionError::Encode(e.to_string()))?;
        self.outbound
            .send(Outbound::Frame(text))
            .map_err(|_| ConnectionError::Closed(self.endpoint.to_string()))
    }

    fn detach_close_listener(&self) {
        self.shared.listening.store(false, Ordering::SeqCst);
    }

    fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Wakes a pending handshake; an established connection picks up `Close`.
        self.shared.shutdown.notify_one();
        let _ = self.outbound.send(Outbound::Close);
    }
}

fn notify_closed(
    events: &mpsc::UnboundedSender<ConnectionEvent>,
    shared: &Shared,
    reason: Option<String>,
) {
    if shared.listening.load(Ordering::SeqCst) {
        let _ = events.send(ConnectionEvent::Closed { reason });
    }
}

async fn run_connection(
    endpoint: Url,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    shared: Arc<Shared>,
) {
    let ws_stream = tokio::select! {
        result = connect_async(endpoint.as_str()) => match result {
            Ok((ws_stream, _response)) => ws_stream,
            Err(e) => {
                tracing::warn!("Failed to connect to {}: {}", endpoint, e);
                notify_closed(&events, &shared, Some(e.to_string()));
                return;
            }
        },
        _ = shared.shutdown.notified() => {
            tracing::debug!("Connection to {} closed before the handshake completed", endpoint);
            notify_closed(&events, &shared, None);
            return;
        }
    };

    tracing::info!("Connected to room at {}", endpoint);
    let _ = events.send(ConnectionEvent::Opened);

    let (mut write, mut read) = ws_stream.split();

    let reason = loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(ConnectionEvent::Text(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(data))) => {
                    tracing::debug!("Ignoring {} bytes of binary data", data.len());
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!("Server closed the connection to {}", endpoint);
                    break frame.map(|f| f.reason.as_str().to_owned());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    break Some(e.to_string());
                }
                None => break None,
            },
            command = outbound.recv() => match command {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        tracing::warn!("Failed to send message: {}", e);
                        break Some(e.to_string());
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = write.send(Message::Close(None)).await;
                    let _ = write.close().await;
                    tracing::debug!("Connection to {} closed locally", endpoint);
                    break None;
                }
            },
        }
    };

    shared.closed.store(true, Ordering::SeqCst);
    notify_closed(&events, &shared, reason);
}
