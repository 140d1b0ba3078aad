use crate::domain::PlayerId;
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids::next_id;
use crate::use_cases::{
    JoinOutcome, SessionEngine, SessionEvent, SessionHandle, SessionStatus, SessionUpdate,
};

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::broadcast;
use tracing::{Instrument, debug, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const WELCOME_MESSAGE: &str = "welcome; send join to find an opponent";

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct ConnectQuery {
    // Optional player id when the client has a preassigned identity.
    #[serde(default)]
    player_id: Option<PlayerId>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.player_id))
}

struct ConnCtx {
    player_id: PlayerId,
    engine: Arc<SessionEngine>,

    msgs_in: u64,
    msgs_out: u64,
    invalid_json: u32,

    last_drop_log: Instant,
    last_invalid_log: Instant,
    last_lag_log: Instant,

    close_frame: Option<CloseFrame>,
}

impl ConnCtx {
    fn new(player_id: PlayerId, engine: Arc<SessionEngine>) -> Self {
        let throttled = Instant::now() - LOG_THROTTLE;
        Self {
            player_id,
            engine,
            msgs_in: 0,
            msgs_out: 0,
            invalid_json: 0,
            last_drop_log: throttled,
            last_invalid_log: throttled,
            last_lag_log: throttled,
            close_frame: None,
        }
    }
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    requested_player_id: Option<PlayerId>,
) {
    // If an upstream service assigns player ids, prefer it; otherwise
    // generate a process-unique one.
    let player_id = requested_player_id.unwrap_or_else(next_id);
    let span = info_span!("conn", player_id);
    serve_connection(socket, state, player_id).instrument(span).await;
}

async fn serve_connection(mut socket: WebSocket, state: Arc<AppState>, player_id: PlayerId) {
    info!("client connected");

    let mut ctx = ConnCtx::new(player_id, state.engine.clone());
    if let Err(e) = run_connection(&mut socket, &mut ctx).await {
        warn!(error = ?e, "connection ended with error");
    }

    if let Some(frame) = ctx.close_frame.take() {
        let _ = socket.send(Message::Close(Some(frame))).await;
    }
    if let Err(e) = socket.close().await {
        debug!(error = ?e, "socket close error");
    }

    // Withdraw from the queue or record a leave with the player's session;
    // whichever applies.
    ctx.engine.leave(player_id).await;

    debug!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        invalid_json = ctx.invalid_json,
        "connection stats"
    );
    info!("client disconnected");
}

enum SessionEnd {
    /// The match reached a terminal state; the connection may join again.
    MatchOver,
    SocketClosed,
}

async fn run_connection(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let welcome = ServerMessage::Welcome {
        message: WELCOME_MESSAGE.to_string(),
        player_id: ctx.player_id,
    };
    send_message(socket, &welcome).await?;
    ctx.msgs_out += 1;

    loop {
        let Some(handle) = await_assignment(socket, ctx).await? else {
            return Ok(());
        };
        match run_session_loop(socket, ctx, handle).await? {
            SessionEnd::MatchOver => continue,
            SessionEnd::SocketClosed => return Ok(()),
        }
    }
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

enum ParseOutcome {
    Message(ClientMessage),
    Skip,
    Disconnect,
}

fn parse_client_message(text: &str, ctx: &mut ConnCtx) -> ParseOutcome {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => ParseOutcome::Message(msg),
        Err(parse_err) => {
            ctx.invalid_json += 1;
            if should_log(&mut ctx.last_invalid_log) {
                warn!(
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
                ParseOutcome::Disconnect
            } else {
                ParseOutcome::Skip
            }
        }
    }
}

/// Pulls one client message from the socket; `Ok(None)` means the peer went
/// away.
async fn recv_client_message(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> Result<Option<ClientMessage>, NetError> {
    loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) => {
                ctx.msgs_in += 1;
                match parse_client_message(&text, ctx) {
                    ParseOutcome::Message(msg) => return Ok(Some(msg)),
                    ParseOutcome::Skip => continue,
                    ParseOutcome::Disconnect => return Ok(None),
                }
            }
            Some(Ok(Message::Binary(_))) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                return Ok(None);
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) => return Ok(None),
            Some(Err(e)) => {
                warn!(error = %e, "websocket recv error");
                return Ok(None);
            }
            None => return Ok(None),
        }
    }
}

/// Idle/queued stage: waits for a join intent and resolves it into a session.
///
/// `Ok(None)` means the socket closed before an assignment landed.
async fn await_assignment(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> Result<Option<SessionHandle>, NetError> {
    loop {
        let Some(msg) = recv_client_message(socket, ctx).await? else {
            return Ok(None);
        };
        match msg {
            ClientMessage::Join => {}
            ClientMessage::Move(_) => {
                if should_log(&mut ctx.last_drop_log) {
                    warn!("move intent without a seat; dropping");
                }
                continue;
            }
        }

        let mut paired_rx = match ctx.engine.join(ctx.player_id).await {
            JoinOutcome::AlreadyInSession { handle } | JoinOutcome::Paired { handle } => {
                return Ok(Some(handle));
            }
            JoinOutcome::Queued { paired_rx } => paired_rx,
        };

        // Queued: keep serving the socket while the pairing resolves.
        loop {
            tokio::select! {
                paired = &mut paired_rx => {
                    match paired {
                        Ok(handle) => return Ok(Some(handle)),
                        // A newer join for this id took over the queue entry.
                        Err(_) => break,
                    }
                }
                msg = recv_client_message(socket, ctx) => {
                    match msg? {
                        None => return Ok(None),
                        Some(ClientMessage::Join) => {
                            // Already queued; joining again changes nothing.
                            debug!("redundant join while queued");
                        }
                        Some(ClientMessage::Move(_)) => {
                            if should_log(&mut ctx.last_drop_log) {
                                warn!("move intent while queued; dropping");
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Seated stage: forwards intents into the session and session output back to
/// the client until the match ends or the socket closes.
async fn run_session_loop(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    handle: SessionHandle,
) -> Result<SessionEnd, NetError> {
    // Subscribe before attaching so no update is missed.
    let mut update_rx = handle.update_tx.subscribe();
    let latest_rx = handle.latest_tx.subscribe();
    let mut status_rx = handle.status_tx.subscribe();

    let Some(side) = handle.side_of(ctx.player_id) else {
        // A handle for a session this player has no seat in is an internal
        // inconsistency; degrade to "not assigned".
        warn!(session_id = handle.session_id, "no seat in resolved session");
        return Ok(SessionEnd::MatchOver);
    };

    let assigned = ServerMessage::PlayerAssigned {
        side: side.into(),
        player_id: ctx.player_id,
    };
    send_message(socket, &assigned).await?;
    ctx.msgs_out += 1;
    info!(session_id = handle.session_id, side = ?side, "seat assigned");

    if handle
        .input_tx
        .send(SessionEvent::Connect {
            player_id: ctx.player_id,
        })
        .await
        .is_err()
    {
        debug!(session_id = handle.session_id, "session task gone before connect");
    }

    let mut last_status = SessionStatus::Waiting;
    loop {
        // Handle the current lifecycle value before waiting for changes.
        let status = status_rx.borrow_and_update().clone();
        if status != last_status {
            match &status {
                SessionStatus::Waiting => {}
                SessionStatus::Starting => {
                    send_message(socket, &ServerMessage::MatchStarting).await?;
                    ctx.msgs_out += 1;
                }
                SessionStatus::Active => {}
                SessionStatus::Ended { winner, reason } => {
                    // Updates queued before the terminal status carry the
                    // forfeit notice and the final snapshot; flush them first.
                    loop {
                        match update_rx.try_recv() {
                            Ok(update) => forward_update(socket, ctx, update).await?,
                            Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                                if should_log(&mut ctx.last_lag_log) {
                                    warn!(missed, "session updates lagged before match end");
                                }
                                let snapshot = latest_rx.borrow().clone();
                                send_message(socket, &ServerMessage::StateSnapshot(snapshot.into()))
                                    .await?;
                                ctx.msgs_out += 1;
                            }
                            Err(_) => break,
                        }
                    }
                    let ended = ServerMessage::MatchEnded {
                        winner: *winner,
                        reason: (*reason).into(),
                    };
                    send_message(socket, &ended).await?;
                    ctx.msgs_out += 1;
                    return Ok(SessionEnd::MatchOver);
                }
            }
            last_status = status;
        }

        tokio::select! {
            msg = recv_client_message(socket, ctx) => {
                match msg? {
                    None => return Ok(SessionEnd::SocketClosed),
                    Some(ClientMessage::Join) => {
                        // Idempotent: re-affirm the current assignment.
                        let reaffirm = ServerMessage::PlayerAssigned {
                            side: side.into(),
                            player_id: ctx.player_id,
                        };
                        send_message(socket, &reaffirm).await?;
                        ctx.msgs_out += 1;
                    }
                    Some(ClientMessage::Move(payload)) => {
                        forward_move(ctx, &handle, payload.direction.into());
                    }
                }
            }

            update = update_rx.recv() => {
                match update {
                    Ok(update) => forward_update(socket, ctx, update).await?,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        if should_log(&mut ctx.last_lag_log) {
                            warn!(missed, "session updates lagged; resyncing from latest snapshot");
                        }
                        let snapshot = latest_rx.borrow().clone();
                        send_message(socket, &ServerMessage::StateSnapshot(snapshot.into())).await?;
                        ctx.msgs_out += 1;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // The terminal status arrives on the watch; nothing to
                        // forward from here anymore.
                        debug!(session_id = handle.session_id, "update stream closed");
                        return Ok(SessionEnd::MatchOver);
                    }
                }
            }

            changed = status_rx.changed() => {
                if changed.is_err() {
                    debug!(session_id = handle.session_id, "status channel closed");
                    return Ok(SessionEnd::MatchOver);
                }
            }
        }
    }
}

async fn forward_update(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    update: SessionUpdate,
) -> Result<(), NetError> {
    let msg = match update {
        SessionUpdate::Snapshot(snapshot) => ServerMessage::StateSnapshot(snapshot.into()),
        SessionUpdate::OpponentLeft { side } => ServerMessage::OpponentLeft { side: side.into() },
    };
    send_message(socket, &msg).await?;
    ctx.msgs_out += 1;
    Ok(())
}

fn forward_move(ctx: &mut ConnCtx, handle: &SessionHandle, direction: crate::domain::MoveDirection) {
    let event = SessionEvent::Move {
        player_id: ctx.player_id,
        direction,
    };
    match handle.input_tx.try_send(event) {
        Ok(()) => {}
        Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
            if should_log(&mut ctx.last_drop_log) {
                warn!("session input channel full; dropping move");
            }
        }
        Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
            // The match is over; the terminal status will surface shortly.
            debug!("session input channel closed; dropping move");
        }
    }
}
