//! In-process RoomConnector 実装
//!
//! サーバー側の振る舞い（ハンドシェイク完了・フレーム送信・切断）を
//! 呼び出し側が直接操作できる接続です。送信されたフレームは
//! 実際のワイヤー形式（JSON）で記録されます。

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::mpsc;
use url::Url;

use crate::domain::{
    ConnectionError, ConnectionEvent, ConnectionHandle, OpenedConnection, OutboundMessage,
    RoomConnector,
};
use crate::infrastructure::dto::encode_outbound;

/// In-process connection; also acts as the remote peer.
pub struct MemoryConnection {
    endpoint: Url,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    sent: Mutex<Vec<String>>,
    listening: AtomicBool,
    closed: AtomicBool,
}

impl MemoryConnection {
    /// Complete the handshake.
    pub fn accept(&self) {
        let _ = self.events.send(ConnectionEvent::Opened);
    }

    /// Push an inbound text frame.
    pub fn push_text(&self, text: impl Into<String>) {
        let _ = self.events.send(ConnectionEvent::Text(text.into()));
    }

    /// Close from the server side.
    pub fn close_remotely(&self, reason: Option<&str>) {
        self.closed.store(true, Ordering::SeqCst);
        if self.listening.load(Ordering::SeqCst) {
            let _ = self.events.send(ConnectionEvent::Closed {
                reason: reason.map(str::to_string),
            });
        }
    }

    /// Frames sent by the client, JSON-encoded.
    pub fn sent_frames(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}

impl ConnectionHandle for MemoryConnection {
    fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn send(&self, message: OutboundMessage) -> Result<(), ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed(self.endpoint.to_string()));
        }
        let text = encode_outbound(&message).map_err(|e| ConnectionError::Encode(e.to_string()))?;
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text);
        Ok(())
    }

    fn detach_close_listener(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.listening.load(Ordering::SeqCst) {
            let _ = self
                .events
                .send(ConnectionEvent::Closed { reason: None });
        }
    }
}

/// Connector handing out [`MemoryConnection`]s and remembering every one opened.
#[derive(Default)]
pub struct MemoryConnector {
    connections: Mutex<Vec<Arc<MemoryConnection>>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every connection opened so far, oldest first.
    pub fn connections(&self) -> Vec<Arc<MemoryConnection>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recently opened connection.
    pub fn latest(&self) -> Option<Arc<MemoryConnection>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl RoomConnector for MemoryConnector {
    fn open(&self, endpoint: Url) -> OpenedConnection {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let connection = Arc::new(MemoryConnection {
            endpoint,
            events: event_tx,
            sent: Mutex::new(Vec::new()),
            listening: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        });
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&connection));

        OpenedConnection {
            handle: connection,
            events: event_rx,
        }
    }
}
