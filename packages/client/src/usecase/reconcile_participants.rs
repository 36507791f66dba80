//! UseCase: 参加者スナップショットのリコンサイル
//!
//! ## 処理の流れ
//!
//! 1. アバター記述子を持つ参加者のテクスチャを一度だけ読み込みキューに積む
//! 2. 読み込み完了を待つ（唯一の中断点）
//! 3. 世代が変わっていなければ、参加者マップを一括で置き換える
//!    - 既存の参加者は同じ参照のまま引き継ぐ（アバターの同一性を保つ）
//!    - 新しい参加者はアバターを生成してシーンに追加する
//!    - スナップショットから消えた参加者はシーンから外す
//!
//! 同じルーム内で重なった 2 つのリコンサイルは、後に読み込みを終えた方が
//! 参加者の集合を決める（古いスナップショットが勝つことがある）。

use std::sync::Arc;

use crate::domain::{
    AvatarFactory, Generation, IncomingParticipant, MergeReport, Participant, ParticipantMap,
    RepositoryError, ResourceLoader, Scene, SceneNode, SpriteSheet, TextureKey, WorldRepository,
};

use super::error::SyncError;

/// Result of one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The participant map was replaced
    Applied(MergeReport),
    /// The room changed while resources were loading; nothing was applied
    Discarded {
        captured: Generation,
        current: Generation,
    },
}

/// Incoming participant paired with its resolved sprite sheet
struct Resolved {
    participant: IncomingParticipant,
    sheet: Option<Arc<SpriteSheet>>,
}

/// 参加者リコンサイルのユースケース
pub struct ReconcileParticipantsUseCase {
    repository: Arc<dyn WorldRepository>,
    loader: Arc<dyn ResourceLoader>,
    factory: Arc<dyn AvatarFactory>,
    scene: Arc<dyn Scene>,
}

impl ReconcileParticipantsUseCase {
    /// 新しい ReconcileParticipantsUseCase を作成
    pub fn new(
        repository: Arc<dyn WorldRepository>,
        loader: Arc<dyn ResourceLoader>,
        factory: Arc<dyn AvatarFactory>,
        scene: Arc<dyn Scene>,
    ) -> Self {
        Self {
            repository,
            loader,
            factory,
            scene,
        }
    }

    /// リコンサイルを実行
    ///
    /// # Arguments
    ///
    /// * `generation` - スナップショットを受信した時点のルームの世代
    /// * `incoming` - サーバーから届いた参加者の完全なリスト
    pub async fn execute(
        &self,
        generation: Generation,
        incoming: Vec<IncomingParticipant>,
    ) -> Result<ReconcileOutcome, SyncError> {
        // 1. テクスチャを読み込みキューに積む
        for participant in &incoming {
            if let Some(key) = texture_key(participant) {
                if self.loader.enqueue(&key) {
                    tracing::debug!("Enqueued texture '{}'", key);
                }
            }
        }

        // 2. 読み込み完了を待つ
        self.loader.load().await;

        let resolved: Vec<Resolved> = incoming
            .into_iter()
            .map(|participant| {
                let sheet = texture_key(&participant).and_then(|key| self.loader.sprite_sheet(&key));
                Resolved { participant, sheet }
            })
            .collect();

        // 3. 参加者マップを置き換える
        let factory = Arc::clone(&self.factory);
        let scene = Arc::clone(&self.scene);
        let merge = Box::new(move |current: &ParticipantMap| {
            merge_participants(current, resolved, factory.as_ref(), scene.as_ref())
        });

        match self.repository.commit_participants(generation, merge).await {
            Ok(report) => {
                tracing::debug!(
                    "Participants reconciled: {} added, {} kept, {} removed, {} skipped",
                    report.added.len(),
                    report.kept.len(),
                    report.removed.len(),
                    report.skipped.len()
                );
                Ok(ReconcileOutcome::Applied(report))
            }
            Err(RepositoryError::StaleGeneration { captured, current }) => {
                tracing::debug!(
                    "Discarding snapshot for generation {} (current {})",
                    captured,
                    current
                );
                Ok(ReconcileOutcome::Discarded { captured, current })
            }
        }
    }
}

fn texture_key(participant: &IncomingParticipant) -> Option<TextureKey> {
    participant
        .avatar
        .as_ref()
        .and_then(|avatar| avatar.texture.clone())
        .and_then(|texture| TextureKey::new(texture).ok())
}

fn merge_participants(
    current: &ParticipantMap,
    resolved: Vec<Resolved>,
    factory: &dyn AvatarFactory,
    scene: &dyn Scene,
) -> (ParticipantMap, MergeReport) {
    let mut next = ParticipantMap::new();
    let mut report = MergeReport::default();

    for Resolved { participant, sheet } in resolved {
        if next.contains_key(&participant.id) {
            continue;
        }

        if let Some(existing) = current.get(&participant.id) {
            next.insert(participant.id, existing.clone());
            report.kept.push(participant.id);
            continue;
        }

        let (Some(descriptor), Some(sheet)) = (participant.avatar, sheet) else {
            tracing::debug!(
                "Skipping participant {} ({}): no resolved sprite sheet",
                participant.id,
                participant.display_name
            );
            report.skipped.push(participant.id);
            continue;
        };

        let avatar = factory.create(&participant.display_name, sheet, descriptor.script.as_deref());
        scene.attach(SceneNode::avatar_sprite(avatar.sprite()));
        scene.attach(SceneNode::name_label(
            avatar.name_label(),
            participant.display_name.as_str(),
        ));

        report.added.push(participant.id);
        next.insert(
            participant.id,
            Participant {
                id: participant.id,
                display_name: participant.display_name,
                avatar_id: descriptor.id,
                avatar,
            },
        );
    }

    for (id, participant) in current {
        if !next.contains_key(id) {
            scene.detach(participant.avatar.sprite());
            scene.detach(participant.avatar.name_label());
            report.removed.push(*id);
        }
    }

    report.added.sort();
    report.kept.sort();
    report.removed.sort();
    report.skipped.sort();
    (next, report)
}
