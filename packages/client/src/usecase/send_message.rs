//! UseCase: メッセージ送信処理
//!
//! チャットは `{ token, message }`、アバター移動は
//! `{ type: "avatar.position", payload: { id, x, y } }` として送信されます。

use crate::domain::{AvatarId, ConnectionHandle, OutboundMessage, Point, Session};

use super::error::SyncError;

/// チャットメッセージの最大文字数
pub const MAX_CHAT_CHARS: usize = 2096;

/// メッセージ送信のユースケース
#[derive(Debug, Default, Clone, Copy)]
pub struct SendMessageUseCase;

impl SendMessageUseCase {
    pub fn new() -> Self {
        Self
    }

    /// チャットメッセージを送信
    ///
    /// # Returns
    ///
    /// * `Err(SyncError::MessageTooLong)` - 文字数が [`MAX_CHAT_CHARS`] を超えている
    /// * `Err(SyncError::Connection)` - 接続が閉じている
    pub fn chat(
        &self,
        handle: &dyn ConnectionHandle,
        session: &Session,
        text: &str,
    ) -> Result<(), SyncError> {
        let actual = text.chars().count();
        if actual > MAX_CHAT_CHARS {
            return Err(SyncError::MessageTooLong {
                actual,
                max: MAX_CHAT_CHARS,
            });
        }

        handle.send(OutboundMessage::Chat {
            token: session.token.clone(),
            message: text.to_string(),
        })?;
        Ok(())
    }

    /// アバターの移動先を送信
    pub fn avatar_position(
        &self,
        handle: &dyn ConnectionHandle,
        avatar: AvatarId,
        point: Point,
    ) -> Result<(), SyncError> {
        handle.send(OutboundMessage::AvatarPosition { avatar, point })?;
        tracing::debug!("Requested avatar {} to move to ({}, {})", avatar, point.x, point.y);
        Ok(())
    }
}
