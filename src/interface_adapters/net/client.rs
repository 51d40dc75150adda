use crate::domain::state::EntityId;
use crate::domain::{Difficulty, TankKind};
use crate::interface_adapters::http::error_response;
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage, WorldUpdateDto};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids::next_id;
use crate::use_cases::chapter::PLAYER_ID;
use crate::use_cases::{
    ArenaHandle, ArenaTransport, ChapterConfig, ChapterSession, Intent, LocalTransport,
    Transport, TransportError, WorldUpdate,
};

use axum::{
    Error,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, watch};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    #[allow(dead_code)]
    Transport(TransportError),
    WorldUpdatesClosed,
    JoinRequired,
    JoinTimeout,
    UnknownTank,
    ClosedBeforeJoin,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct ArenaQuery {
    // The arena the client wants to play in.
    #[serde(default)]
    arena_id: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct ChapterQuery {
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    tank_type: Option<String>,
}

pub async fn world_update_serializer(
    mut world_rx: broadcast::Receiver<WorldUpdate>,
    world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    world_latest_tx: watch::Sender<Utf8Bytes>,
) {
    // Serialize each world update once and broadcast the shared bytes.
    loop {
        match world_rx.recv().await {
            Ok(update) => {
                let msg = ServerMessage::WorldUpdate(WorldUpdateDto::from(update));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize world update");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                // Store the latest bytes for lag recovery.
                let _ = world_latest_tx.send(bytes.clone());
                let _ = world_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(
                    missed = n,
                    "world serializer lagged; skipping to latest update"
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("world updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_arena_serializer(arena: &ArenaHandle) {
    tokio::spawn(world_update_serializer(
        arena.world_tx.subscribe(),
        arena.world_bytes_tx.clone(),
        arena.world_latest_tx.clone(),
    ));
}

// Per-connection serializer for a chapter session; ends with the session.
fn spawn_session_serializer(
    world_rx: broadcast::Receiver<WorldUpdate>,
    capacity: usize,
) -> (broadcast::Receiver<Utf8Bytes>, watch::Receiver<Utf8Bytes>) {
    let (world_bytes_tx, world_bytes_rx) = broadcast::channel::<Utf8Bytes>(capacity);
    let (world_latest_tx, world_latest_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
    tokio::spawn(world_update_serializer(
        world_rx,
        world_bytes_tx,
        world_latest_tx,
    ));
    (world_bytes_rx, world_latest_rx)
}

pub async fn arena_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ArenaQuery>,
) -> impl IntoResponse {
    let arena_id = query
        .arena_id
        .unwrap_or_else(|| state.default_arena_id.to_string());

    let Some(arena) = state.arena_registry.get_arena(&arena_id).await else {
        return error_response(StatusCode::NOT_FOUND, "arena not found");
    };

    let conn_id = next_id();
    let span = info_span!("conn", conn_id, arena_id = %arena_id, player_id = tracing::field::Empty);
    ws.on_upgrade(move |socket| handle_arena_socket(socket, arena).instrument(span))
}

pub async fn chapter_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChapterQuery>,
) -> impl IntoResponse {
    // Parse once at the boundary; unknown keys never reach the simulation.
    let difficulty = match query.difficulty.as_deref().map(str::parse::<Difficulty>) {
        None => Difficulty::Easy,
        Some(Ok(difficulty)) => difficulty,
        Some(Err(e)) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let kind = match query.tank_type.as_deref().map(str::parse::<TankKind>) {
        None => TankKind::Assault,
        Some(Ok(kind)) => kind,
        Some(Err(e)) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let conn_id = next_id();
    let span = info_span!("conn", conn_id, ?difficulty, player_id = PLAYER_ID);
    ws.on_upgrade(move |socket| handle_chapter_socket(socket, state, difficulty, kind).instrument(span))
}

async fn handle_arena_socket(mut socket: WebSocket, arena: ArenaHandle) {
    let mut ctx = match bootstrap_arena_connection(&mut socket, arena).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(e) => {
            warn!(error = ?e, "failed to bootstrap connection");
            // Handshake failures already sent their own close frame.
            let _ = socket.close().await;
            return;
        }
    };

    tracing::Span::current().record("player_id", ctx.player_id);
    info!(player_id = ctx.player_id, "client connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn handle_chapter_socket(
    mut socket: WebSocket,
    state: Arc<AppState>,
    difficulty: Difficulty,
    kind: TankKind,
) {
    let settings = &state.chapter;
    let config = ChapterConfig::for_difficulty(difficulty, kind)
        .with_seed(rand::random::<u64>())
        .with_bounds(settings.bounds);
    let session = ChapterSession::new(
        config,
        settings.tuning,
        state.audio.clone(),
        state.clock.now_millis(),
    );
    let transport = LocalTransport::spawn(
        session,
        settings.command_channel_capacity,
        settings.world_broadcast_capacity,
        settings.tick_interval,
        state.clock.clone(),
    );
    let (world_bytes_rx, world_latest_rx) =
        spawn_session_serializer(transport.snapshots(), settings.world_broadcast_capacity);

    let identity = ServerMessage::Identity {
        player_id: PLAYER_ID.to_string(),
    };
    if let Err(e) = send_message(&mut socket, &identity).await {
        warn!(error = ?e, "failed to send identity");
        return;
    }

    info!(%kind, "chapter session started");
    let mut ctx = ConnCtx::new(
        PLAYER_ID,
        Box::new(transport),
        false,
        world_bytes_rx,
        world_latest_rx,
    );
    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
    // Dropping the context drops the transport, which ends the chapter task.
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    player_id: EntityId,
    transport: Box<dyn Transport>,
    // Arena players must be removed from the world when the socket goes away.
    leave_on_close: bool,
    world_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    world_latest_rx: watch::Receiver<Utf8Bytes>,
    // Count lag recovery snapshots sent to this client.
    lag_recovery_count: u64,

    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,

    invalid_json: u32,

    last_input_full_log: Instant,
    last_world_lag_log: Instant,
    last_invalid_input_log: Instant,

    close_frame: Option<CloseFrame>,
}

impl ConnCtx {
    fn new(
        player_id: EntityId,
        transport: Box<dyn Transport>,
        leave_on_close: bool,
        world_bytes_rx: broadcast::Receiver<Utf8Bytes>,
        world_latest_rx: watch::Receiver<Utf8Bytes>,
    ) -> Self {
        let now = Instant::now() - LOG_THROTTLE;
        Self {
            player_id,
            transport,
            leave_on_close,
            world_bytes_rx,
            world_latest_rx,
            lag_recovery_count: 0,
            msgs_in: 0,
            msgs_out: 0,
            bytes_in: 0,
            bytes_out: 0,
            invalid_json: 0,
            last_input_full_log: now,
            last_world_lag_log: now,
            last_invalid_input_log: now,
            close_frame: None,
        }
    }
}

#[derive(Debug)]
struct JoinHandshake {
    kind: TankKind,
    bytes_in: u64,
}

async fn bootstrap_arena_connection(
    socket: &mut WebSocket,
    arena: ArenaHandle,
) -> Result<ConnCtx, NetError> {
    // Subscribe to updates *before* doing anything else (awaits) to not miss packets.
    let world_bytes_rx = arena.world_bytes_tx.subscribe();
    let world_latest_rx = arena.world_latest_tx.subscribe();

    let join = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    let player_id = next_id();
    let transport = ArenaTransport::new(player_id, arena);

    let identity_msg = ServerMessage::Identity {
        player_id: player_id.to_string(),
    };
    send_message(socket, &identity_msg).await?;

    // Join happens after identity so the next snapshot already carries the new tank.
    transport
        .send(Intent::Join { kind: join.kind })
        .map_err(NetError::Transport)?;

    let mut ctx = ConnCtx::new(
        player_id,
        Box::new(transport),
        true,
        world_bytes_rx,
        world_latest_rx,
    );
    ctx.msgs_in = 1;
    ctx.bytes_in = join.bytes_in;
    Ok(ctx)
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<JoinHandshake, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        match incoming.map_err(NetError::Ws)? {
            Message::Text(text) => {
                let bytes_in = text.len() as u64;
                let payload = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => payload,
                    Ok(_) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        return Err(NetError::JoinRequired);
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        return Err(NetError::JoinRequired);
                    }
                };

                return match payload.tank_kind() {
                    Ok(kind) => Ok(JoinHandshake { kind, bytes_in }),
                    Err(e) => {
                        let rejected = ServerMessage::Rejected {
                            reason: e.to_string(),
                        };
                        let _ = send_message(socket, &rejected).await;
                        let _ =
                            send_close_with_reason(socket, close_code::POLICY, "unknown tank type")
                                .await;
                        Err(NetError::UnknownTank)
                    }
                };
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

/// Drops intents carrying NaN/inf and clamps chapter movement to the unit range.
fn sanitize_intent(intent: Intent) -> Option<Intent> {
    match intent {
        Intent::Input(mut input) => {
            if !input.move_x.is_finite() || !input.move_y.is_finite() || !input.aim.is_finite() {
                return None;
            }
            input.move_x = input.move_x.clamp(-1.0, 1.0);
            input.move_y = input.move_y.clamp(-1.0, 1.0);
            Some(Intent::Input(input))
        }
        Intent::MoveTo { x, y, angle }
            if !x.is_finite() || !y.is_finite() || !angle.is_finite() =>
        {
            None
        }
        Intent::Shoot { angle, speed } if !angle.is_finite() || !speed.is_finite() => None,
        other => Some(other),
    }
}

async fn forward_intent(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    intent: Intent,
) -> Result<LoopControl, NetError> {
    let player_id = ctx.player_id;
    let Some(intent) = sanitize_intent(intent) else {
        if should_log(&mut ctx.last_invalid_input_log) {
            warn!(player_id, "invalid input values (NaN/inf); dropping");
        }
        return Ok(LoopControl::Continue);
    };

    match ctx.transport.send(intent) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(TransportError::Full) => {
            if should_log(&mut ctx.last_input_full_log) {
                warn!(player_id, "input channel full; dropping input");
            }
            Ok(LoopControl::Continue)
        }
        Err(TransportError::Unsupported(intent)) => {
            let rejected = ServerMessage::Rejected {
                reason: format!("{intent} is not available in this mode"),
            };
            match send_message(socket, &rejected).await {
                Ok(bytes) => {
                    ctx.msgs_out += 1;
                    ctx.bytes_out += bytes as u64;
                    Ok(LoopControl::Continue)
                }
                Err(_) => Ok(LoopControl::Disconnect),
            }
        }
        Err(e) => Err(NetError::Transport(e)),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming_ws(socket, incoming, ctx).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            world_msg = ctx.world_bytes_rx.recv() => {
                match world_msg {
                    Ok(bytes) => match forward_world_bytes(bytes, socket, ctx).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut ctx.last_world_lag_log) {
                            warn!(missed = n, "world updates lagged; sending snapshot");
                        }

                        // Resync strategy: send the latest world snapshot.
                        let latest = ctx.world_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            ctx.lag_recovery_count += 1;
                            match forward_world_bytes(latest, socket, ctx).await {
                                LoopControl::Continue => false,
                                LoopControl::Disconnect => true,
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::WorldUpdatesClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    disconnect_cleanup(ctx);

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    let player_id = ctx.player_id;
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(_)) => {
                        // Ignore repeated Join packets to keep the session stable.
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(player_id, "duplicate join ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(message) => match message.into_intent() {
                        Ok(intent) => forward_intent(socket, ctx, intent).await,
                        Err(e) => {
                            debug!(player_id, error = %e, "unmappable client message");
                            Ok(LoopControl::Continue)
                        }
                    },
                    Err(parse_err) => {
                        ctx.invalid_json += 1;
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(
                                player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if ctx.invalid_json > MAX_INVALID_JSON {
                            ctx.close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_world_bytes(
    world_msg: Utf8Bytes,
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> LoopControl {
    let bytes_len = world_msg.len();
    match socket
        .send(Message::Text(world_msg))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send world update");
            LoopControl::Disconnect
        }
    }
}

fn disconnect_cleanup(ctx: &ConnCtx) {
    let player_id = ctx.player_id;
    if ctx.leave_on_close {
        if let Err(e) = ctx.transport.send(Intent::Leave) {
            warn!(player_id, error = %e, "failed to remove player on disconnect");
        }
    }

    debug!(
        player_id,
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_json = ctx.invalid_json,
        lag_recovery_count = ctx.lag_recovery_count,
        "connection stats"
    );
    info!(player_id, "client disconnected");
}
