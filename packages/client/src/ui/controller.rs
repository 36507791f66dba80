//! Room session controller.
//!
//! Owns the room connection and drives the session state machine:
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──Opened──▶ Connected
//!      ▲                        │                      │
//!      └──── disconnect / unsolicited close ───────────┘
//! ```
//!
//! Each connection gets an inbound pump task that classifies frames and
//! routes them to reconciliation (snapshots) or interpolation (positions).
//! Reconciliations run as child tasks of the pump, so disconnecting aborts
//! them together with the pump.
//!
//! Every state-mutating entry point runs through its own
//! [`OperationTracker`], observable with [`RoomSessionController::status`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::{
    sync::{Mutex as AsyncMutex, broadcast, mpsc},
    task::{JoinHandle, JoinSet},
};
use url::Url;

use crate::{
    domain::{
        AvatarFactory, AvatarId, ConnectionEvent, ConnectionHandle, EntityPosition, Generation,
        IncomingParticipant, MergeReport, ParticipantId, Point, ResourceLoader, Room,
        RoomConnector, RoomEvent, RoomId, Scene, Session, Velocity, WorldRepository,
    },
    infrastructure::dto::decode_inbound,
    usecase::{
        ApplyPositionUseCase, ConnectRoomUseCase, DisconnectRoomUseCase, OperationStatus,
        OperationTracker, ReconcileOutcome, ReconcileParticipantsUseCase, RoomConnection,
        SendMessageUseCase, SyncError,
    },
};

use super::pointer::{PointerDispatcher, PointerEvent, PointerOutcome};

const EVENT_CAPACITY: usize = 64;

/// Session state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Disconnected,
    /// Handle stored, handshake not yet completed
    Connecting { room: RoomId, generation: Generation },
    Connected { room: RoomId, generation: Generation },
}

impl SessionPhase {
    pub fn room(&self) -> Option<RoomId> {
        match self {
            Self::Disconnected => None,
            Self::Connecting { room, .. } | Self::Connected { room, .. } => Some(*room),
        }
    }

    fn generation(&self) -> Option<Generation> {
        match self {
            Self::Disconnected => None,
            Self::Connecting { generation, .. } | Self::Connected { generation, .. } => {
                Some(*generation)
            }
        }
    }
}

/// Operations with an independently tracked status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ConnectToRoom,
    DisconnectFromRoom,
    SetParticipantMap,
    SetAvatarPosition,
    SendMessage,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::ConnectToRoom,
        Operation::DisconnectFromRoom,
        Operation::SetParticipantMap,
        Operation::SetAvatarPosition,
        Operation::SendMessage,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Operation::ConnectToRoom => "connect-to-room",
            Operation::DisconnectFromRoom => "disconnect-from-room",
            Operation::SetParticipantMap => "set-participant-map",
            Operation::SetAvatarPosition => "set-avatar-position",
            Operation::SendMessage => "send-message",
        }
    }
}

/// Notifications for the UI layer
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Handshake completed
    Connected { room: RoomId },
    /// The server closed the connection
    Closed {
        room: RoomId,
        reason: Option<String>,
    },
    /// A snapshot was applied to the participant map
    ParticipantsChanged { room: RoomId, report: MergeReport },
    /// A participant's avatar started moving
    PositionApplied {
        participant: ParticipantId,
        target: Point,
        velocity: Velocity,
    },
}

struct Trackers {
    connect: OperationTracker,
    disconnect: OperationTracker,
    reconcile: OperationTracker,
    position: OperationTracker,
    send: OperationTracker,
}

impl Trackers {
    fn new() -> Self {
        Self {
            connect: OperationTracker::new(Operation::ConnectToRoom.id()),
            disconnect: OperationTracker::new(Operation::DisconnectFromRoom.id()),
            reconcile: OperationTracker::new(Operation::SetParticipantMap.id()),
            position: OperationTracker::new(Operation::SetAvatarPosition.id()),
            send: OperationTracker::new(Operation::SendMessage.id()),
        }
    }

    fn get(&self, operation: Operation) -> &OperationTracker {
        match operation {
            Operation::ConnectToRoom => &self.connect,
            Operation::DisconnectFromRoom => &self.disconnect,
            Operation::SetParticipantMap => &self.reconcile,
            Operation::SetAvatarPosition => &self.position,
            Operation::SendMessage => &self.send,
        }
    }
}

#[derive(Default)]
struct SessionState {
    phase: SessionPhase,
    session: Session,
    handle: Option<Arc<dyn ConnectionHandle>>,
    pump: Option<JoinHandle<()>>,
}

struct Inner {
    repository: Arc<dyn WorldRepository>,
    connect_room: ConnectRoomUseCase,
    disconnect_room: DisconnectRoomUseCase,
    reconcile_participants: ReconcileParticipantsUseCase,
    apply_position: ApplyPositionUseCase,
    send_message: SendMessageUseCase,
    pointer: PointerDispatcher,
    trackers: Trackers,
    /// Serializes connect / disconnect / close transitions
    transition: AsyncMutex<()>,
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

/// Orchestrates one client's room session.
#[derive(Clone)]
pub struct RoomSessionController {
    inner: Arc<Inner>,
}

impl RoomSessionController {
    pub fn new(
        repository: Arc<dyn WorldRepository>,
        connector: Arc<dyn RoomConnector>,
        loader: Arc<dyn ResourceLoader>,
        factory: Arc<dyn AvatarFactory>,
        scene: Arc<dyn Scene>,
        socket_base: Url,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let inner = Inner {
            connect_room: ConnectRoomUseCase::new(repository.clone(), connector, socket_base),
            disconnect_room: DisconnectRoomUseCase::new(repository.clone(), scene.clone()),
            reconcile_participants: ReconcileParticipantsUseCase::new(
                repository.clone(),
                loader,
                factory,
                scene,
            ),
            apply_position: ApplyPositionUseCase::new(repository.clone()),
            send_message: SendMessageUseCase::new(),
            pointer: PointerDispatcher::new(repository.clone()),
            trackers: Trackers::new(),
            transition: AsyncMutex::new(()),
            state: Mutex::new(SessionState::default()),
            events,
            repository,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Connect to `room_id`, leaving the current room first.
    ///
    /// Returns once the connection is requested; [`SessionEvent::Connected`]
    /// follows when the handshake completes. Rejected with
    /// [`SyncError::ConnectInProgress`] while a previous handshake is pending.
    pub async fn connect(&self, room_id: RoomId, session: Session) -> Result<(), Arc<SyncError>> {
        let inner = &self.inner;
        inner
            .trackers
            .connect
            .run((room_id, session), |(room_id, session)| {
                inner.connect(room_id, session)
            })
            .await
    }

    /// Close the connection (if any) and reset the room. Idempotent.
    pub async fn disconnect(&self) -> Result<(), Arc<SyncError>> {
        let inner = &self.inner;
        inner
            .trackers
            .disconnect
            .run((), |_| async move {
                let _transition = inner.transition.lock().await;
                inner.teardown().await;
                Ok::<_, SyncError>(())
            })
            .await
    }

    /// Send a chat message with the session token captured at connect.
    pub async fn send_chat(&self, text: &str) -> Result<(), Arc<SyncError>> {
        let inner = &self.inner;
        inner
            .trackers
            .send
            .run(inner.connection(), |(handle, session)| async move {
                let handle = handle.ok_or(SyncError::NotConnected)?;
                inner.send_message.chat(handle.as_ref(), &session, text)
            })
            .await
    }

    /// Ask the server to move `avatar` to `point`.
    pub async fn send_position(&self, avatar: AvatarId, point: Point) -> Result<(), Arc<SyncError>> {
        let inner = &self.inner;
        inner
            .trackers
            .send
            .run(inner.connection(), |(handle, _)| async move {
                let handle = handle.ok_or(SyncError::NotConnected)?;
                inner
                    .send_message
                    .avatar_position(handle.as_ref(), avatar, point)
            })
            .await
    }

    /// Dispatch a scene pointer-down.
    pub async fn pointer_down(&self, event: PointerEvent) -> Result<PointerOutcome, Arc<SyncError>> {
        let outcome = self.inner.pointer.resolve(event).await;
        if let PointerOutcome::MoveRequested { avatar, point, .. } = outcome {
            self.send_position(avatar, point).await?;
        }
        Ok(outcome)
    }

    /// Select the participant whose avatar background clicks move.
    pub fn select(&self, participant: Option<ParticipantId>) {
        self.inner.pointer.select(participant);
    }

    pub fn selected(&self) -> Option<ParticipantId> {
        self.inner.pointer.selected()
    }

    /// Reconcile a participant snapshot against the current room.
    pub async fn reconcile(
        &self,
        incoming: Vec<IncomingParticipant>,
    ) -> Result<ReconcileOutcome, Arc<SyncError>> {
        let generation = self.inner.repository.current_generation().await;
        self.inner.reconcile_at(generation, incoming).await
    }

    /// Start interpolating a participant's avatar towards a new position.
    pub async fn apply_position(
        &self,
        position: EntityPosition,
    ) -> Result<Option<Velocity>, Arc<SyncError>> {
        self.inner.apply_position_update(position).await
    }

    pub async fn room(&self) -> Room {
        self.inner.repository.get_room().await
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.state().phase
    }

    /// Endpoint of the stored connection handle.
    pub fn endpoint(&self) -> Option<Url> {
        self.inner
            .state()
            .handle
            .as_ref()
            .map(|handle| handle.endpoint().clone())
    }

    pub fn status(&self, operation: Operation) -> OperationStatus {
        self.inner.trackers.get(operation).status()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connection(&self) -> (Option<Arc<dyn ConnectionHandle>>, Session) {
        let state = self.state();
        (state.handle.clone(), state.session.clone())
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    async fn connect(self: &Arc<Self>, room_id: RoomId, session: Session) -> Result<(), SyncError> {
        let _transition = self.transition.lock().await;

        let phase = self.state().phase;
        match phase {
            SessionPhase::Connecting { room, .. } => {
                return Err(SyncError::ConnectInProgress(room));
            }
            SessionPhase::Connected { room, .. } => {
                tracing::info!("Leaving room {} before joining room {}", room, room_id);
                let _ = self
                    .trackers
                    .disconnect
                    .run((), |_| async {
                        self.teardown().await;
                        Ok::<_, SyncError>(())
                    })
                    .await;
            }
            SessionPhase::Disconnected => {}
        }

        let RoomConnection {
            room_id,
            generation,
            handle,
            events,
        } = self.connect_room.execute(room_id, &session).await?;

        {
            let mut state = self.state();
            state.phase = SessionPhase::Connecting {
                room: room_id,
                generation,
            };
            state.session = session;
            state.handle = Some(handle);
        }
        let pump = tokio::spawn(pump(Arc::downgrade(self), generation, events));
        self.state().pump = Some(pump);
        Ok(())
    }

    /// Drop the handle, abort the pump and reset the room.
    async fn teardown(&self) -> Generation {
        let (handle, pump) = {
            let mut state = self.state();
            state.phase = SessionPhase::Disconnected;
            state.session = Session::default();
            (state.handle.take(), state.pump.take())
        };
        if let Some(pump) = pump {
            pump.abort();
        }
        let generation = self.disconnect_room.execute(handle).await;
        tracing::info!("Session reset (generation {})", generation);
        generation
    }

    fn handle_opened(&self, generation: Generation) {
        let room = {
            let mut state = self.state();
            match state.phase {
                SessionPhase::Connecting {
                    room,
                    generation: current,
                } if current == generation => {
                    state.phase = SessionPhase::Connected { room, generation };
                    room
                }
                _ => return,
            }
        };
        tracing::info!("Connected to room {}", room);
        self.emit(SessionEvent::Connected { room });
    }

    async fn handle_text(
        self: &Arc<Self>,
        generation: Generation,
        text: &str,
        reconciles: &mut JoinSet<()>,
    ) {
        match decode_inbound(text) {
            Ok(RoomEvent::Snapshot(incoming)) => {
                tracing::debug!("Snapshot with {} participants", incoming.len());
                let inner = Arc::clone(self);
                reconciles.spawn(async move {
                    let _ = inner.reconcile_at(generation, incoming).await;
                });
            }
            Ok(RoomEvent::Position(position)) => {
                let _ = self.apply_position_update(position).await;
            }
            Err(e) => {
                tracing::debug!("Ignoring unrecognized frame ({}): {}", e, text);
            }
        }
    }

    /// Unsolicited close of the connection opened at `generation`.
    async fn handle_closed(&self, generation: Generation, reason: Option<String>) {
        let _transition = self.transition.lock().await;

        let closed = {
            let mut state = self.state();
            if state.phase.generation() != Some(generation) {
                None
            } else {
                let room = state.phase.room();
                state.phase = SessionPhase::Disconnected;
                state.session = Session::default();
                // The pump running this handler finishes on its own
                state.pump.take();
                Some((room, state.handle.take()))
            }
        };
        let Some((room, handle)) = closed else {
            tracing::debug!("Ignoring close of stale connection (generation {})", generation);
            return;
        };

        tracing::warn!(
            "Connection closed by server{}",
            reason
                .as_deref()
                .map(|reason| format!(": {}", reason))
                .unwrap_or_default()
        );
        let _ = self
            .trackers
            .disconnect
            .run(handle, |handle| async move {
                self.disconnect_room.execute(handle).await;
                Ok::<_, SyncError>(())
            })
            .await;
        if let Some(room) = room {
            self.emit(SessionEvent::Closed { room, reason });
        }
    }

    async fn reconcile_at(
        &self,
        generation: Generation,
        incoming: Vec<IncomingParticipant>,
    ) -> Result<ReconcileOutcome, Arc<SyncError>> {
        let outcome = self
            .trackers
            .reconcile
            .run((generation, incoming), |(generation, incoming)| {
                self.reconcile_participants.execute(generation, incoming)
            })
            .await?;

        if let ReconcileOutcome::Applied(report) = &outcome {
            let room = self.repository.get_room().await.id;
            self.emit(SessionEvent::ParticipantsChanged {
                room,
                report: report.clone(),
            });
        }
        Ok(outcome)
    }

    async fn apply_position_update(
        &self,
        position: EntityPosition,
    ) -> Result<Option<Velocity>, Arc<SyncError>> {
        let velocity = self
            .trackers
            .position
            .run(position, |position| self.apply_position.execute(position))
            .await?;

        if let Some(velocity) = velocity {
            self.emit(SessionEvent::PositionApplied {
                participant: position.id,
                target: position.point,
                velocity,
            });
        }
        Ok(velocity)
    }
}

/// Inbound pump for the connection opened at `generation`.
async fn pump(
    inner: Weak<Inner>,
    generation: Generation,
    mut events: mpsc::UnboundedReceiver<ConnectionEvent>,
) {
    let mut reconciles = JoinSet::new();
    loop {
        tokio::select! {
            Some(result) = reconciles.join_next(), if !reconciles.is_empty() => {
                if let Err(e) = result
                    && e.is_panic()
                {
                    tracing::error!("Reconcile task panicked: {}", e);
                }
            }
            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                match event {
                    ConnectionEvent::Opened => inner.handle_opened(generation),
                    ConnectionEvent::Text(text) => {
                        inner.handle_text(generation, &text, &mut reconciles).await;
                    }
                    ConnectionEvent::Closed { reason } => {
                        inner.handle_closed(generation, reason).await;
                        break;
                    }
                }
            }
        }
    }
    tracing::debug!("Inbound pump for generation {} stopped", generation);
}
