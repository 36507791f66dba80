//! UseCase: ルーム切断処理

use std::sync::Arc;

use crate::domain::{ConnectionHandle, Generation, Room, Scene, WorldRepository};

/// ルーム切断のユースケース
pub struct DisconnectRoomUseCase {
    /// Repository（ルーム状態ストアの抽象化）
    repository: Arc<dyn WorldRepository>,
    /// 古いルームのアバターを外すシーン
    scene: Arc<dyn Scene>,
}

impl DisconnectRoomUseCase {
    /// 新しい DisconnectRoomUseCase を作成
    pub fn new(repository: Arc<dyn WorldRepository>, scene: Arc<dyn Scene>) -> Self {
        Self { repository, scene }
    }

    /// ルーム切断を実行
    ///
    /// ハンドルがあれば close listener を外してから閉じる（意図した切断で
    /// 古い close 通知が発火しないように）。ハンドルの有無にかかわらず
    /// ルームは空の初期状態に戻り、新しい世代が返される。
    /// 古いルームの参加者のスプライトと名前ラベルはシーンから外される。
    pub async fn execute(&self, handle: Option<Arc<dyn ConnectionHandle>>) -> Generation {
        if let Some(handle) = handle {
            tracing::info!("Closing connection to {}", handle.endpoint());
            handle.detach_close_listener();
            handle.close();
        }
        let (generation, previous) = self.repository.swap_room(Room::default()).await;
        for participant in previous.participants.values() {
            self.scene.detach(participant.avatar.sprite());
            self.scene.detach(participant.avatar.name_label());
        }
        if !previous.participants.is_empty() {
            tracing::debug!(
                "Detached {} participants of room {}",
                previous.participants.len(),
                previous.id
            );
        }
        generation
    }
}
