//! Repository trait 定義
//!
//! ドメイン層が必要とするルーム状態ストアのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{
    MergeReport, NodeId, Participant, ParticipantId, ParticipantMap, RepositoryError, Room,
    value_object::Generation,
};

/// Snapshot merge applied atomically by [`WorldRepository::commit_participants`].
///
/// Receives the current participant map and returns the replacement map plus
/// a report of what changed.
pub type ParticipantMerge = Box<dyn FnOnce(&ParticipantMap) -> (ParticipantMap, MergeReport) + Send>;

/// World Repository trait
///
/// 現在のルームとその参加者マップを保持するストア。
/// UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。
///
/// ## 世代 (Generation)
///
/// ルームが丸ごと置き換えられるたびに世代が進む。
/// 古い世代で取得された処理結果は `commit_participants` で拒否される。
#[async_trait]
pub trait WorldRepository: Send + Sync {
    /// 現在のルームを取得
    async fn get_room(&self) -> Room;

    /// 現在の世代を取得
    async fn current_generation(&self) -> Generation;

    /// ルームを丸ごと置き換え、新しい世代と置き換え前のルームを返す
    async fn swap_room(&self, room: Room) -> (Generation, Room);

    /// ルームを丸ごと置き換え、新しい世代を返す
    async fn replace_room(&self, room: Room) -> Generation {
        self.swap_room(room).await.0
    }

    /// 参加者を取得
    async fn get_participant(&self, id: ParticipantId) -> Option<Participant>;

    /// シーンノードを所有する参加者を取得（逆引きインデックス）
    async fn owner_of(&self, node: NodeId) -> Option<ParticipantId>;

    /// 参加者マップを置き換える
    ///
    /// `generation` が現在の世代と一致しない場合は `merge` を呼ばずに
    /// `RepositoryError::StaleGeneration` を返す。
    async fn commit_participants(
        &self,
        generation: Generation,
        merge: ParticipantMerge,
    ) -> Result<MergeReport, RepositoryError>;
}
