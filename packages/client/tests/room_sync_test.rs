//! Integration tests for the room client against an in-process WebSocket room server.
//!
//! The server is an axum app bound to an ephemeral port. It greets every
//! connection with a participant snapshot, echoes `avatar.position` requests
//! back as position deltas and closes the room when it receives the chat
//! message `"bye"`.

use std::{collections::BTreeMap, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{
        Path, Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::{broadcast, mpsc};
use url::Url;

use hiroba_client::{
    domain::{AvatarControl, ParticipantId, Point, RoomId, Session, SessionToken, SpriteSheet},
    infrastructure::{
        connection::WebSocketConnector,
        render::{HeadlessScene, SpriteAvatarFactory},
        repository::InMemoryWorldRepository,
        resource::InMemoryResourceLoader,
    },
    ui::{PointerEvent, PointerOutcome, RoomSessionController, SessionEvent, SessionPhase},
};

/// Avatar id → participant id, as the server knows them
const AVATARS: [(i64, i64); 2] = [(100, 1), (200, 2)];

#[derive(Debug, Deserialize)]
struct ConnectQuery {
    token: Option<String>,
}

/// What the server observed
#[derive(Debug, Clone, PartialEq)]
enum Observed {
    Connected { room: i64, token: Option<String> },
    Frame(Value),
}

#[derive(Clone)]
struct ServerState {
    observed: mpsc::UnboundedSender<Observed>,
}

struct TestServer {
    addr: SocketAddr,
    observed: mpsc::UnboundedReceiver<Observed>,
}

impl TestServer {
    async fn start() -> Self {
        let (observed_tx, observed) = mpsc::unbounded_channel();
        let app = Router::new()
            .route("/worlds/{room_id}", get(room_handler))
            .with_state(ServerState {
                observed: observed_tx,
            });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, observed }
    }

    fn socket_base(&self) -> Url {
        Url::parse(&format!("ws://{}", self.addr)).unwrap()
    }

    async fn next_observed(&mut self) -> Observed {
        tokio::time::timeout(Duration::from_secs(5), self.observed.recv())
            .await
            .expect("timed out waiting for the server")
            .expect("server channel closed")
    }
}

async fn room_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<i64>,
    Query(query): Query<ConnectQuery>,
    State(state): State<ServerState>,
) -> impl IntoResponse {
    let _ = state.observed.send(Observed::Connected {
        room: room_id,
        token: query.token,
    });
    ws.on_upgrade(move |socket| serve_room(socket, state))
}

async fn serve_room(mut socket: WebSocket, state: ServerState) {
    let snapshot = json!([
        { "id": 1, "displayName": "alice", "avatar": { "id": 100, "texture": "alice.json" } },
        { "id": 2, "displayName": "bob", "avatar": { "id": 200, "texture": "bob.json" } },
        { "id": 3, "displayName": "ghost", "avatar": null }
    ]);
    if socket
        .send(Message::Text(snapshot.to_string().into()))
        .await
        .is_err()
    {
        return;
    }

    while let Some(Ok(message)) = socket.recv().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(frame) = serde_json::from_str::<Value>(text.as_str()) else {
            continue;
        };
        let _ = state.observed.send(Observed::Frame(frame.clone()));

        if frame["type"] == "avatar.position" {
            let payload = &frame["payload"];
            let Some((_, participant)) = AVATARS
                .iter()
                .find(|(avatar, _)| payload["id"].as_i64() == Some(*avatar))
            else {
                continue;
            };
            let (x, y) = (payload["x"].clone(), payload["y"].clone());
            let delta = json!({ "id": participant, "x": x, "y": y });
            if socket
                .send(Message::Text(delta.to_string().into()))
                .await
                .is_err()
            {
                return;
            }
        } else if frame["message"] == "bye" {
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: 1000,
                    reason: "bye".into(),
                })))
                .await;
            return;
        }
    }
}

fn controller(server: &TestServer) -> (RoomSessionController, Arc<HeadlessScene>) {
    let sheet = |image: &str| SpriteSheet {
        image: image.to_string(),
        frames: BTreeMap::new(),
    };
    let scene = Arc::new(HeadlessScene::new());
    let controller = RoomSessionController::new(
        Arc::new(InMemoryWorldRepository::new()),
        Arc::new(WebSocketConnector::new()),
        Arc::new(
            InMemoryResourceLoader::new()
                .with_sheet("alice.json", sheet("alice.png"))
                .with_sheet("bob.json", sheet("bob.png")),
        ),
        Arc::new(SpriteAvatarFactory::default()),
        scene.clone(),
        server.socket_base(),
    );
    (controller, scene)
}

fn session() -> Session {
    Session::new(Some(SessionToken::new("secret token".to_string()).unwrap()))
}

async fn next_event(events: &mut broadcast::Receiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("event channel closed")
}

#[tokio::test]
async fn test_join_room_and_receive_snapshot() {
    // テスト項目: 接続するとトークン付きでルームに入り、スナップショットが参加者マップに反映される
    // given (前提条件):
    let mut server = TestServer::start().await;
    let (controller, scene) = controller(&server);
    let mut events = controller.subscribe();

    // when (操作):
    controller.connect(RoomId::new(5), session()).await.unwrap();

    // then (期待する結果):
    assert_eq!(
        server.next_observed().await,
        Observed::Connected {
            room: 5,
            token: Some("secret token".to_string())
        }
    );
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Connected {
            room: RoomId::new(5)
        }
    );
    match next_event(&mut events).await {
        SessionEvent::ParticipantsChanged { room, report } => {
            assert_eq!(room, RoomId::new(5));
            assert_eq!(report.added, vec![ParticipantId::new(1), ParticipantId::new(2)]);
            assert_eq!(report.skipped, vec![ParticipantId::new(3)]);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(
        controller.room().await.participant_ids(),
        vec![ParticipantId::new(1), ParticipantId::new(2)]
    );
    assert_eq!(scene.len(), 4);
    assert!(matches!(controller.phase(), SessionPhase::Connected { .. }));

    controller.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_click_moves_selected_avatar_through_server() {
    // テスト項目: アバターを選択して背景をクリックすると avatar.position が送信され、
    //             サーバーから返った位置更新でアバターが補間移動を始める
    // given (前提条件):
    let mut server = TestServer::start().await;
    let (controller, _scene) = controller(&server);
    let mut events = controller.subscribe();
    controller.connect(RoomId::new(5), session()).await.unwrap();
    server.next_observed().await;
    next_event(&mut events).await;
    next_event(&mut events).await;
    let bob = controller
        .room()
        .await
        .participants
        .get(&ParticipantId::new(2))
        .cloned()
        .unwrap();

    // when (操作):
    let selected = controller
        .pointer_down(PointerEvent::on_node(Point::new(0.0, 0.0), bob.avatar.sprite()))
        .await
        .unwrap();
    controller
        .pointer_down(PointerEvent::background(Point::new(112.0, 56.0)))
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(selected, PointerOutcome::Selected(ParticipantId::new(2)));
    assert_eq!(
        server.next_observed().await,
        Observed::Frame(json!({
            "type": "avatar.position",
            "payload": { "id": 200, "x": 112.0, "y": 56.0 }
        }))
    );
    match next_event(&mut events).await {
        SessionEvent::PositionApplied {
            participant,
            target,
            velocity,
        } => {
            assert_eq!(participant, ParticipantId::new(2));
            assert_eq!(target, Point::new(112.0, 56.0));
            assert_eq!((velocity.x, velocity.y), (2.0, 1.0));
        }
        other => panic!("unexpected event {:?}", other),
    }

    bob.avatar.advance();
    assert_eq!(bob.avatar.position(), Point::new(2.0, 1.0));

    controller.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_chat_and_server_close() {
    // テスト項目: チャットがトークン付きで届き、サーバーが閉じるとセッションがリセットされる
    // given (前提条件):
    let mut server = TestServer::start().await;
    let (controller, _scene) = controller(&server);
    let mut events = controller.subscribe();
    controller.connect(RoomId::new(8), session()).await.unwrap();
    server.next_observed().await;
    next_event(&mut events).await;
    next_event(&mut events).await;

    // when (操作):
    controller.send_chat("hello").await.unwrap();
    let chat = server.next_observed().await;
    controller.send_chat("bye").await.unwrap();

    // then (期待する結果):
    assert_eq!(
        chat,
        Observed::Frame(json!({ "token": "secret token", "message": "hello" }))
    );
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Closed {
            room: RoomId::new(8),
            reason: Some("bye".to_string())
        }
    );
    assert_eq!(controller.phase(), SessionPhase::Disconnected);
    assert!(controller.room().await.participants.is_empty());
    assert!(controller.endpoint().is_none());
}

#[tokio::test]
async fn test_connect_to_unreachable_server_reports_close() {
    // テスト項目: 到達できないサーバーへの接続は connect 自体は成功し、その後 Closed が通知される
    // given (前提条件):
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let sheetless = RoomSessionController::new(
        Arc::new(InMemoryWorldRepository::new()),
        Arc::new(WebSocketConnector::new()),
        Arc::new(InMemoryResourceLoader::new()),
        Arc::new(SpriteAvatarFactory::default()),
        Arc::new(HeadlessScene::new()),
        Url::parse(&format!("ws://{}", addr)).unwrap(),
    );
    let mut events = sheetless.subscribe();

    // when (操作):
    let result = sheetless.connect(RoomId::new(1), Session::anonymous()).await;

    // then (期待する結果):
    assert!(result.is_ok());
    assert!(matches!(
        next_event(&mut events).await,
        SessionEvent::Closed { room, reason: Some(_) } if room == RoomId::new(1)
    ));
    assert_eq!(sheetless.phase(), SessionPhase::Disconnected);
}
