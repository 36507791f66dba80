//! UseCase: 位置更新の適用
//!
//! サーバーから届いた `{ id, x, y }` を該当参加者のアバターに適用します。
//! 速度は現在位置から目標位置までの距離に比例し、1 フレームあたりの移動量は
//! 距離 / 56 になります（どの距離でもおよそ 56 フレームで到着する）。

use std::sync::Arc;

use crate::domain::{EntityPosition, Velocity, WorldRepository, velocity_towards};

use super::error::SyncError;

/// 位置更新のユースケース
pub struct ApplyPositionUseCase {
    repository: Arc<dyn WorldRepository>,
}

impl ApplyPositionUseCase {
    pub fn new(repository: Arc<dyn WorldRepository>) -> Self {
        Self { repository }
    }

    /// 位置更新を適用
    ///
    /// # Returns
    ///
    /// * `Ok(Some(velocity))` - アバターに設定した速度
    /// * `Ok(None)` - 該当する参加者がいない（まだスナップショットに含まれていない等）
    pub async fn execute(&self, position: EntityPosition) -> Result<Option<Velocity>, SyncError> {
        let Some(participant) = self.repository.get_participant(position.id).await else {
            tracing::debug!("Ignoring position for unknown participant {}", position.id);
            return Ok(None);
        };

        let velocity = velocity_towards(participant.avatar.position(), position.point);
        participant.avatar.move_to(position.point, velocity);
        Ok(Some(velocity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            AvatarControl, AvatarFactory, AvatarId, MergeReport, Participant, ParticipantId,
            ParticipantMap, Point, Room, RoomId, SpriteSheet,
        },
        infrastructure::{render::SpriteAvatarFactory, repository::InMemoryWorldRepository},
    };
    use std::collections::BTreeMap;

    async fn repository_with(id: i64, spawn: Point) -> (Arc<InMemoryWorldRepository>, Arc<dyn AvatarControl>) {
        let repository = Arc::new(InMemoryWorldRepository::new());
        let generation = repository.replace_room(Room::new(RoomId::new(1))).await;
        let avatar = SpriteAvatarFactory::new(spawn).create(
            "alice",
            Arc::new(SpriteSheet {
                image: "alice.png".to_string(),
                frames: BTreeMap::new(),
            }),
            None,
        );
        let participant = Participant {
            id: ParticipantId::new(id),
            display_name: "alice".to_string(),
            avatar_id: AvatarId::new(10),
            avatar: Arc::clone(&avatar),
        };
        repository
            .commit_participants(
                generation,
                Box::new(move |_: &ParticipantMap| {
                    let mut map = ParticipantMap::new();
                    map.insert(participant.id, participant);
                    (map, MergeReport::default())
                }),
            )
            .await
            .unwrap();
        (repository, avatar)
    }

    #[tokio::test]
    async fn test_apply_position_sets_proportional_velocity() {
        // テスト項目: 現在位置 (0, 0) から (112, -56) へは 1 フレームあたり (2, -1) で移動する
        // given (前提条件):
        let (repository, avatar) = repository_with(1, Point::new(0.0, 0.0)).await;
        let usecase = ApplyPositionUseCase::new(repository);

        // when (操作):
        let velocity = usecase
            .execute(EntityPosition {
                id: ParticipantId::new(1),
                point: Point::new(112.0, -56.0),
            })
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(velocity, Some(Velocity::new(2.0, -1.0)));
        avatar.advance();
        assert_eq!(avatar.position(), Point::new(2.0, -1.0));
    }

    #[tokio::test]
    async fn test_apply_position_at_current_point_is_zero() {
        // テスト項目: 目標が現在位置と同じなら速度は 0 になる
        // given (前提条件):
        let (repository, avatar) = repository_with(1, Point::new(30.0, 40.0)).await;
        let usecase = ApplyPositionUseCase::new(repository);

        // when (操作):
        let velocity = usecase
            .execute(EntityPosition {
                id: ParticipantId::new(1),
                point: Point::new(30.0, 40.0),
            })
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(velocity, Some(Velocity::new(0.0, 0.0)));
        avatar.advance();
        assert_eq!(avatar.position(), Point::new(30.0, 40.0));
    }

    #[tokio::test]
    async fn test_apply_position_for_unknown_participant_is_noop() {
        // テスト項目: 未知の参加者 ID の位置更新は何もせずに成功する
        // given (前提条件):
        let (repository, avatar) = repository_with(1, Point::new(0.0, 0.0)).await;
        let usecase = ApplyPositionUseCase::new(repository);

        // when (操作):
        let velocity = usecase
            .execute(EntityPosition {
                id: ParticipantId::new(99),
                point: Point::new(500.0, 500.0),
            })
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(velocity, None);
        avatar.advance();
        assert_eq!(avatar.position(), Point::new(0.0, 0.0));
    }
}
