//! Value objects of the room synchronization domain.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use super::error::DomainError;

/// Identifier of a room ("world") on the server.
///
/// `RoomId::default()` (0) is the id of the empty room held while disconnected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(i64);

impl RoomId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a participant inside a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(i64);

impl ParticipantId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a participant's avatar, used in outbound move commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvatarId(i64);

impl AvatarId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for AvatarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a display object attached to the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Room generation counter.
///
/// Bumped every time the room is replaced wholesale (connect, disconnect,
/// unsolicited close). Work captured under an older generation is stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A point in scene coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Per-frame displacement applied by the render loop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
}

impl Velocity {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Session token issued by the auth subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: String) -> Result<Self, DomainError> {
        if value.trim().is_empty() {
            return Err(DomainError::EmptyToken);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionToken {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// The current user's session as seen by the room client. Read-only here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<SessionToken>,
}

impl Session {
    pub fn new(token: Option<SessionToken>) -> Self {
        Self { token }
    }

    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

/// Key under which a sprite-sheet resource is enqueued and looked up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureKey(String);

impl TextureKey {
    pub fn new(value: String) -> Result<Self, DomainError> {
        if value.trim().is_empty() {
            return Err(DomainError::EmptyTextureKey);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TextureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the socket endpoint of a room: `<base>/worlds/<roomId>?token=<token>`.
///
/// The token is URL-encoded. Without a token the query is omitted and the
/// server sees an unauthenticated attempt.
pub fn room_endpoint(base: &Url, room_id: RoomId, session: &Session) -> Result<Url, DomainError> {
    let mut endpoint = base.clone();
    endpoint.set_query(None);
    endpoint
        .path_segments_mut()
        .map_err(|_| DomainError::InvalidEndpoint(base.to_string()))?
        .pop_if_empty()
        .push("worlds")
        .push(&room_id.to_string());

    if let Some(token) = &session.token {
        endpoint
            .query_pairs_mut()
            .append_pair("token", token.as_str());
    }

    Ok(endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_rejects_blank() {
        // テスト項目: 空白のみのトークンはエラーになる
        // given (前提条件):
        let value = "   ".to_string();

        // when (操作):
        let result = SessionToken::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(DomainError::EmptyToken));
    }

    #[test]
    fn test_texture_key_rejects_empty() {
        // テスト項目: 空のテクスチャキーはエラーになる
        // given (前提条件):
        let value = String::new();

        // when (操作):
        let result = TextureKey::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(DomainError::EmptyTextureKey));
    }

    #[test]
    fn test_generation_next_is_monotonic() {
        // テスト項目: Generation::next が単調増加する
        // given (前提条件):
        let generation = Generation::default();

        // when (操作):
        let next = generation.next();

        // then (期待する結果):
        assert!(next > generation);
        assert_eq!(next.value(), 1);
    }

    #[test]
    fn test_room_endpoint_with_token() {
        // テスト項目: トークン付きのエンドポイントが組み立てられる
        // given (前提条件):
        let base = Url::parse("ws://127.0.0.1:8080").unwrap();
        let session = Session::new(Some(SessionToken::new("abc def".to_string()).unwrap()));

        // when (操作):
        let endpoint = room_endpoint(&base, RoomId::new(42), &session).unwrap();

        // then (期待する結果): トークンは URL エンコードされる
        assert_eq!(
            endpoint.as_str(),
            "ws://127.0.0.1:8080/worlds/42?token=abc+def"
        );
    }

    #[test]
    fn test_room_endpoint_keeps_base_path() {
        // テスト項目: ベースアドレスのパスが保持される
        // given (前提条件):
        let base = Url::parse("wss://example.com/socket/").unwrap();
        let session = Session::new(Some(SessionToken::new("t0k3n".to_string()).unwrap()));

        // when (操作):
        let endpoint = room_endpoint(&base, RoomId::new(7), &session).unwrap();

        // then (期待する結果):
        assert_eq!(
            endpoint.as_str(),
            "wss://example.com/socket/worlds/7?token=t0k3n"
        );
    }

    #[test]
    fn test_room_endpoint_without_token() {
        // テスト項目: トークンがない場合はクエリなしのエンドポイントになる
        // given (前提条件):
        let base = Url::parse("ws://127.0.0.1:8080").unwrap();

        // when (操作):
        let endpoint = room_endpoint(&base, RoomId::new(1), &Session::anonymous()).unwrap();

        // then (期待する結果):
        assert_eq!(endpoint.as_str(), "ws://127.0.0.1:8080/worlds/1");
        assert!(endpoint.query().is_none());
    }

    #[test]
    fn test_room_endpoint_rejects_cannot_be_a_base() {
        // テスト項目: パスを持てない URL はエラーになる
        // given (前提条件):
        let base = Url::parse("mailto:someone@example.com").unwrap();

        // when (操作):
        let result = room_endpoint(&base, RoomId::new(1), &Session::anonymous());

        // then (期待する結果):
        assert!(matches!(result, Err(DomainError::InvalidEndpoint(_))));
    }
}
