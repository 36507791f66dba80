//! UseCase: ルーム接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectRoomUseCase::execute() メソッド
//! - 接続先エンドポイントの組み立てと、空のルームへの置き換え
//!
//! ### なぜこのテストが必要か
//! - ハンドシェイク完了前にハンドルが返されることを保証する
//! - 新しいルームで世代が進み、古いルーム向けの処理が無効になることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：トークン付きの接続
//! - エッジケース：トークンなしの接続（未認証の接続試行として許容）

use std::sync::Arc;

use tokio::sync::mpsc;
use url::Url;

use crate::domain::{
    ConnectionEvent, ConnectionHandle, Generation, Room, RoomConnector, RoomId, Session,
    WorldRepository, room_endpoint,
};

use super::error::SyncError;

/// A connection requested for a room.
///
/// The handle is live immediately; "connected" is only known once the
/// `events` stream reports `ConnectionEvent::Opened`.
pub struct RoomConnection {
    pub room_id: RoomId,
    pub generation: Generation,
    pub handle: Arc<dyn ConnectionHandle>,
    pub events: mpsc::UnboundedReceiver<ConnectionEvent>,
}

/// ルーム接続のユースケース
pub struct ConnectRoomUseCase {
    /// Repository（ルーム状態ストアの抽象化）
    repository: Arc<dyn WorldRepository>,
    /// RoomConnector（ネットワーク接続の抽象化）
    connector: Arc<dyn RoomConnector>,
    /// ソケットのベースアドレス
    socket_base: Url,
}

impl ConnectRoomUseCase {
    /// 新しい ConnectRoomUseCase を作成
    pub fn new(
        repository: Arc<dyn WorldRepository>,
        connector: Arc<dyn RoomConnector>,
        socket_base: Url,
    ) -> Self {
        Self {
            repository,
            connector,
            socket_base,
        }
    }

    /// ルーム接続を実行
    ///
    /// 既存の接続は呼び出し側が先に切断しておくこと。
    ///
    /// # Returns
    ///
    /// * `Ok(RoomConnection)` - 接続要求済みのハンドル（ハンドシェイクは未完了の可能性あり）
    /// * `Err(SyncError)` - エンドポイントを組み立てられなかった
    pub async fn execute(
        &self,
        room_id: RoomId,
        session: &Session,
    ) -> Result<RoomConnection, SyncError> {
        let endpoint = room_endpoint(&self.socket_base, room_id, session)?;
        if session.token.is_none() {
            tracing::warn!(
                "Connecting to room {} without a session token; the server will treat it as unauthenticated",
                room_id
            );
        }

        tracing::info!("Opening connection to room {} at {}", room_id, endpoint);
        let opened = self.connector.open(endpoint);
        let generation = self.repository.replace_room(Room::new(room_id)).await;

        Ok(RoomConnection {
            room_id,
            generation,
            handle: opened.handle,
            events: opened.events,
        })
    }
}
