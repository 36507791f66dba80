//! Scene-level pointer dispatcher.
//!
//! A single handler serves the whole scene. Pointer-downs on an avatar's
//! sprite or name label select the owning participant (looked up through the
//! repository's reverse index); pointer-downs anywhere else become a move
//! request for the selected participant's avatar.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::{AvatarId, NodeId, ParticipantId, Point, WorldRepository};

/// Pointer-down on the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Clicked point in scene coordinates
    pub point: Point,
    /// Display object under the pointer, if any
    pub target: Option<NodeId>,
}

impl PointerEvent {
    /// Click on empty scene space.
    pub fn background(point: Point) -> Self {
        Self {
            point,
            target: None,
        }
    }

    /// Click on a display object.
    pub fn on_node(point: Point, target: NodeId) -> Self {
        Self {
            point,
            target: Some(target),
        }
    }
}

/// What a pointer-down resolved to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerOutcome {
    /// The clicked node belongs to this participant, now selected
    Selected(ParticipantId),
    /// The selected participant's avatar should move to `point`
    MoveRequested {
        participant: ParticipantId,
        avatar: AvatarId,
        point: Point,
    },
    /// Nothing selected, or the selection left the room
    Ignored,
}

pub struct PointerDispatcher {
    repository: Arc<dyn WorldRepository>,
    selected: Mutex<Option<ParticipantId>>,
}

impl PointerDispatcher {
    pub fn new(repository: Arc<dyn WorldRepository>) -> Self {
        Self {
            repository,
            selected: Mutex::new(None),
        }
    }

    pub fn selected(&self) -> Option<ParticipantId> {
        *self.selection()
    }

    pub fn select(&self, participant: Option<ParticipantId>) {
        *self.selection() = participant;
    }

    /// Resolve a pointer-down. Does not send anything.
    pub async fn resolve(&self, event: PointerEvent) -> PointerOutcome {
        if let Some(node) = event.target {
            if let Some(owner) = self.repository.owner_of(node).await {
                self.select(Some(owner));
                tracing::debug!("Selected participant {} via node {}", owner, node.value());
                return PointerOutcome::Selected(owner);
            }
        }

        let Some(selected) = self.selected() else {
            return PointerOutcome::Ignored;
        };
        match self.repository.get_participant(selected).await {
            Some(participant) => PointerOutcome::MoveRequested {
                participant: selected,
                avatar: participant.avatar_id,
                point: event.point,
            },
            None => {
                tracing::debug!("Selected participant {} is no longer in the room", selected);
                PointerOutcome::Ignored
            }
        }
    }

    fn selection(&self) -> MutexGuard<'_, Option<ParticipantId>> {
        self.selected.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            AvatarControl, AvatarFactory, MergeReport, Participant, ParticipantMap, Room, RoomId,
            SpriteSheet,
        },
        infrastructure::{render::SpriteAvatarFactory, repository::InMemoryWorldRepository},
    };
    use std::collections::BTreeMap;

    async fn room_with_alice() -> (Arc<InMemoryWorldRepository>, Arc<dyn AvatarControl>) {
        let repository = Arc::new(InMemoryWorldRepository::new());
        let generation = repository.replace_room(Room::new(RoomId::new(1))).await;
        let avatar = SpriteAvatarFactory::default().create(
            "alice",
            Arc::new(SpriteSheet {
                image: "alice.png".to_string(),
                frames: BTreeMap::new(),
            }),
            None,
        );
        let participant = Participant {
            id: ParticipantId::new(1),
            display_name: "alice".to_string(),
            avatar_id: AvatarId::new(100),
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
    async fn test_click_on_avatar_selects_owner() {
        // テスト項目: スプライトまたは名前ラベルのクリックで所有者が選択される
        // given (前提条件):
        let (repository, avatar) = room_with_alice().await;
        let dispatcher = PointerDispatcher::new(repository);

        // when (操作):
        let by_sprite = dispatcher
            .resolve(PointerEvent::on_node(Point::new(5.0, 5.0), avatar.sprite()))
            .await;
        dispatcher.select(None);
        let by_label = dispatcher
            .resolve(PointerEvent::on_node(Point::new(5.0, 5.0), avatar.name_label()))
            .await;

        // then (期待する結果):
        assert_eq!(by_sprite, PointerOutcome::Selected(ParticipantId::new(1)));
        assert_eq!(by_label, PointerOutcome::Selected(ParticipantId::new(1)));
        assert_eq!(dispatcher.selected(), Some(ParticipantId::new(1)));
    }

    #[tokio::test]
    async fn test_background_click_moves_selected_avatar() {
        // テスト項目: 選択中に背景をクリックすると、選択中のアバター ID で移動要求になる
        // given (前提条件):
        let (repository, _avatar) = room_with_alice().await;
        let dispatcher = PointerDispatcher::new(repository);
        dispatcher.select(Some(ParticipantId::new(1)));

        // when (操作):
        let outcome = dispatcher
            .resolve(PointerEvent::background(Point::new(320.0, 240.0)))
            .await;

        // then (期待する結果):
        assert_eq!(
            outcome,
            PointerOutcome::MoveRequested {
                participant: ParticipantId::new(1),
                avatar: AvatarId::new(100),
                point: Point::new(320.0, 240.0),
            }
        );
    }

    #[tokio::test]
    async fn test_click_without_selection_is_ignored() {
        // テスト項目: 何も選択されていなければ背景クリックは無視される
        // given (前提条件):
        let (repository, _avatar) = room_with_alice().await;
        let dispatcher = PointerDispatcher::new(repository);

        // when (操作):
        let outcome = dispatcher
            .resolve(PointerEvent::on_node(Point::new(1.0, 1.0), NodeId::new(999)))
            .await;

        // then (期待する結果): 未知のノードは背景扱いになり、選択もないので無視
        assert_eq!(outcome, PointerOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_selection_that_left_the_room_is_ignored() {
        // テスト項目: 選択中の参加者がルームから消えていれば移動要求は出ない
        // given (前提条件):
        let (repository, _avatar) = room_with_alice().await;
        let dispatcher = PointerDispatcher::new(repository);
        dispatcher.select(Some(ParticipantId::new(2)));

        // when (操作):
        let outcome = dispatcher
            .resolve(PointerEvent::background(Point::new(1.0, 1.0)))
            .await;

        // then (期待する結果):
        assert_eq!(outcome, PointerOutcome::Ignored);
    }
}
