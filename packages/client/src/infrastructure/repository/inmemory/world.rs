//! InMemory World Repository 実装
//!
//! ドメイン層が定義する WorldRepository trait の具体的な実装。
//! 現在のルーム・世代・シーンノードの逆引きインデックスを 1 つのロックで保持します。
//!
//! 参加者マップの置き換えと逆引きインデックスの再構築は同じロック区間で行われるため、
//! 読み手が中途半端な状態を観測することはありません。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Generation, MergeReport, NodeId, Participant, ParticipantId, ParticipantMap, ParticipantMerge,
    RepositoryError, Room, WorldRepository,
};

#[derive(Default)]
struct WorldState {
    room: Room,
    generation: Generation,
    /// Reverse index: scene node → owning participant
    nodes: HashMap<NodeId, ParticipantId>,
}

impl WorldState {
    fn rebuild_node_index(&mut self) {
        self.nodes = index_nodes(&self.room.participants);
    }
}

fn index_nodes(participants: &ParticipantMap) -> HashMap<NodeId, ParticipantId> {
    participants
        .values()
        .flat_map(|p| {
            [
                (p.avatar.sprite(), p.id),
                (p.avatar.name_label(), p.id),
            ]
        })
        .collect()
}

/// インメモリ World Repository 実装
#[derive(Clone, Default)]
pub struct InMemoryWorldRepository {
    state: Arc<Mutex<WorldState>>,
}

impl InMemoryWorldRepository {
    /// 空のルーム（世代 0）で作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorldRepository for InMemoryWorldRepository {
    async fn get_room(&self) -> Room {
        let state = self.state.lock().await;
        state.room.clone()
    }

    async fn current_generation(&self) -> Generation {
        let state = self.state.lock().await;
        state.generation
    }

    async fn swap_room(&self, room: Room) -> (Generation, Room) {
        let mut state = self.state.lock().await;
        let previous = std::mem::replace(&mut state.room, room);
        state.generation = state.generation.next();
        state.rebuild_node_index();
        tracing::debug!(
            "Room replaced with room {} (generation {})",
            state.room.id,
            state.generation
        );
        (state.generation, previous)
    }

    async fn get_participant(&self, id: ParticipantId) -> Option<Participant> {
        let state = self.state.lock().await;
        state.room.participants.get(&id).cloned()
    }

    async fn owner_of(&self, node: NodeId) -> Option<ParticipantId> {
        let state = self.state.lock().await;
        state.nodes.get(&node).copied()
    }

    async fn commit_participants(
        &self,
        generation: Generation,
        merge: ParticipantMerge,
    ) -> Result<MergeReport, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.generation != generation {
            return Err(RepositoryError::StaleGeneration {
                captured: generation,
                current: state.generation,
            });
        }

        let (participants, report) = merge(&state.room.participants);
        state.room.participants = participants;
        state.rebuild_node_index();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AvatarControl, AvatarId, Point, RoomId, Velocity};

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - ルームの置き換えで世代が進むこと
    // - 世代が一致する場合のみ参加者マップがコミットされること
    // - 逆引きインデックスがコミットと同時に更新されること
    //
    // 【なぜこのテストが必要か】
    // - 古いルーム向けの非同期処理が新しいルームを上書きしないことを保証する
    // ========================================

    struct StillAvatar {
        sprite: NodeId,
        label: NodeId,
    }

    impl AvatarControl for StillAvatar {
        fn sprite(&self) -> NodeId {
            self.sprite
        }
        fn name_label(&self) -> NodeId {
            self.label
        }
        fn position(&self) -> Point {
            Point::default()
        }
        fn move_to(&self, _target: Point, _velocity: Velocity) {}
        fn advance(&self) {}
    }

    fn participant(id: i64) -> Participant {
        Participant {
            id: ParticipantId::new(id),
            display_name: format!("p{}", id),
            avatar_id: AvatarId::new(id * 10),
            avatar: Arc::new(StillAvatar {
                sprite: NodeId::new(id as u64 * 2),
                label: NodeId::new(id as u64 * 2 + 1),
            }),
        }
    }

    fn insert(participants: Vec<Participant>) -> ParticipantMerge {
        Box::new(move |_current: &ParticipantMap| {
            let report = MergeReport {
                added: participants.iter().map(|p| p.id).collect(),
                ..MergeReport::default()
            };
            let map = participants.into_iter().map(|p| (p.id, p)).collect();
            (map, report)
        })
    }

    #[tokio::test]
    async fn test_replace_room_bumps_generation() {
        // テスト項目: ルームを置き換えるたびに世代が進む
        // given (前提条件):
        let repo = InMemoryWorldRepository::new();
        let initial = repo.current_generation().await;

        // when (操作):
        let first = repo.replace_room(Room::new(RoomId::new(1))).await;
        let second = repo.replace_room(Room::default()).await;

        // then (期待する結果):
        assert!(first > initial);
        assert!(second > first);
        assert_eq!(repo.get_room().await.id, RoomId::default());
    }

    #[tokio::test]
    async fn test_commit_participants_with_current_generation() {
        // テスト項目: 現在の世代でコミットすると参加者と逆引きインデックスが反映される
        // given (前提条件):
        let repo = InMemoryWorldRepository::new();
        let generation = repo.replace_room(Room::new(RoomId::new(1))).await;

        // when (操作):
        let report = repo
            .commit_participants(generation, insert(vec![participant(1), participant(2)]))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(report.added.len(), 2);
        assert!(repo.get_participant(ParticipantId::new(1)).await.is_some());
        assert_eq!(
            repo.owner_of(NodeId::new(4)).await,
            Some(ParticipantId::new(2))
        );
        assert_eq!(
            repo.owner_of(NodeId::new(5)).await,
            Some(ParticipantId::new(2))
        );
        assert_eq!(repo.owner_of(NodeId::new(99)).await, None);
    }

    #[tokio::test]
    async fn test_commit_participants_with_stale_generation() {
        // テスト項目: 古い世代のコミットは拒否され、merge は呼ばれない
        // given (前提条件):
        let repo = InMemoryWorldRepository::new();
        let stale = repo.replace_room(Room::new(RoomId::new(1))).await;
        let current = repo.replace_room(Room::new(RoomId::new(2))).await;

        let merge: ParticipantMerge =
            Box::new(|_: &ParticipantMap| -> (ParticipantMap, MergeReport) {
                panic!("merge must not run for a stale generation")
            });

        // when (操作):
        let result = repo.commit_participants(stale, merge).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RepositoryError::StaleGeneration {
                captured: stale,
                current
            })
        );
        assert!(repo.get_room().await.participants.is_empty());
    }

    #[tokio::test]
    async fn test_replace_room_clears_node_index() {
        // テスト項目: ルームを置き換えると逆引きインデックスもクリアされる
        // given (前提条件):
        let repo = InMemoryWorldRepository::new();
        let generation = repo.replace_room(Room::new(RoomId::new(1))).await;
        repo.commit_participants(generation, insert(vec![participant(1)]))
            .await
            .unwrap();

        // when (操作):
        repo.replace_room(Room::default()).await;

        // then (期待する結果):
        assert_eq!(repo.owner_of(NodeId::new(2)).await, None);
        assert!(repo.get_participant(ParticipantId::new(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_swap_room_returns_previous_room() {
        // テスト項目: swap_room は置き換え前のルームを参加者ごと返す
        // given (前提条件):
        let repo = InMemoryWorldRepository::new();
        let generation = repo.replace_room(Room::new(RoomId::new(1))).await;
        repo.commit_participants(generation, insert(vec![participant(1), participant(2)]))
            .await
            .unwrap();

        // when (操作):
        let (next, previous) = repo.swap_room(Room::default()).await;

        // then (期待する結果):
        assert!(next > generation);
        assert_eq!(previous.id, RoomId::new(1));
        assert_eq!(
            previous.participant_ids(),
            vec![ParticipantId::new(1), ParticipantId::new(2)]
        );
        assert!(repo.get_room().await.participants.is_empty());
    }
}
