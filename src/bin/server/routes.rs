//! HTTP handlers: one endpoint per room command, a snapshot query and an event stream.
//!
//! The caller's participant id lives in the session cookie. Admin checks happen in the
//! registry against the room's current admin.

use crate::hub::Hub;
use crate::AppState;
use actix_session::Session;
use actix_web::{
    get, post,
    web::{Data, Json, Path},
    HttpResponse,
};
use bracket_rooms::{
    Command, ErrorKind, MatchId, OrganizeOptions, Outcome, ParticipantId, RoomCode, RoomError,
    RoomSnapshot,
};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

const SESSION_KEY: &str = "participant_id";

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
    rooms: usize,
}

/// A snapshot plus who the caller is in it.
#[derive(Serialize)]
struct RoomView<'a> {
    participant_id: Option<ParticipantId>,
    room: &'a RoomSnapshot,
}

#[derive(Deserialize)]
struct CreateRoomBody {
    #[serde(default = "default_capacity")]
    capacity: usize,
    name: String,
    #[serde(default)]
    avatar: String,
}

fn default_capacity() -> usize {
    8
}

#[derive(Deserialize)]
struct JoinRoomBody {
    name: String,
    #[serde(default)]
    avatar: String,
}

#[derive(Deserialize)]
struct ReportWinnerBody {
    match_id: MatchId,
    winner_id: ParticipantId,
}

/// Path segment: room code (e.g. /api/rooms/{code})
#[derive(Deserialize)]
struct RoomPath {
    code: RoomCode,
}

fn error_response(e: &RoomError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string(), "kind": e.kind() });
    match e.kind() {
        ErrorKind::Validation => HttpResponse::BadRequest().json(body),
        ErrorKind::NotFound => HttpResponse::NotFound().json(body),
        ErrorKind::Authorization => HttpResponse::Forbidden().json(body),
        ErrorKind::State => HttpResponse::Conflict().json(body),
        ErrorKind::InvalidWinner => HttpResponse::UnprocessableEntity().json(body),
    }
}

fn no_identity() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({
        "error": "Create or join a room first",
        "kind": ErrorKind::Authorization,
    }))
}

fn session_participant(session: &Session) -> Option<ParticipantId> {
    match session.get::<ParticipantId>(SESSION_KEY) {
        Ok(id) => id,
        Err(e) => {
            log::warn!("Unreadable session: {e}");
            None
        }
    }
}

/// The caller's id, minting and remembering a fresh one on first contact.
fn identify(session: &Session) -> ParticipantId {
    if let Some(id) = session_participant(session) {
        return id;
    }
    let id = Uuid::new_v4();
    if let Err(e) = session.insert(SESSION_KEY, id) {
        log::warn!("Failed to store participant id in session: {e}");
    }
    id
}

fn room_response(state: &AppState, code: &str, caller: Option<ParticipantId>, outcome: Outcome) -> HttpResponse {
    match outcome {
        Outcome::Updated(room) => HttpResponse::Ok().json(RoomView {
            participant_id: caller,
            room: &room,
        }),
        Outcome::Unchanged => match state.registry.snapshot(code) {
            Some(room) => HttpResponse::Ok().json(RoomView {
                participant_id: caller,
                room: &room,
            }),
            None => HttpResponse::NoContent().finish(),
        },
        Outcome::Closed => HttpResponse::Ok().json(serde_json::json!({ "closed": true, "code": code })),
    }
}

/// Run a command for the session's participant, loading the room from the store if needed.
fn command_response(
    state: &AppState,
    code: &str,
    caller: ParticipantId,
    command: Command,
) -> HttpResponse {
    let code = state.load(code);
    match state.run(&code, command) {
        Ok(outcome) => room_response(state, &code, Some(caller), outcome),
        Err(e) => error_response(&e),
    }
}

#[get("/api/health")]
pub async fn api_health(state: Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "bracket-rooms",
        rooms: state.registry.len(),
    })
}

/// Create a room; the caller becomes its admin.
#[post("/api/rooms")]
pub async fn api_create_room(state: Data<AppState>, session: Session, body: Json<CreateRoomBody>) -> HttpResponse {
    let caller = identify(&session);
    match state.create(body.capacity, caller, body.name.trim(), body.avatar.as_str()) {
        Ok(room) => {
            HttpResponse::Ok().json(RoomView {
                participant_id: Some(caller),
                room: &room,
            })
        }
        Err(e) => error_response(&e),
    }
}

/// Current room state.
#[get("/api/rooms/{code}")]
pub async fn api_get_room(state: Data<AppState>, session: Session, path: Path<RoomPath>) -> HttpResponse {
    let code = state.load(&path.code);
    match state.registry.snapshot(&code) {
        Some(room) => HttpResponse::Ok().json(RoomView {
            participant_id: session_participant(&session),
            room: &room,
        }),
        None => error_response(&RoomError::NotFound(code)),
    }
}

#[post("/api/rooms/{code}/join")]
pub async fn api_join_room(
    state: Data<AppState>,
    session: Session,
    path: Path<RoomPath>,
    body: Json<JoinRoomBody>,
) -> HttpResponse {
    let caller = identify(&session);
    let command = Command::Join {
        participant_id: caller,
        name: body.name.trim().to_string(),
        avatar: body.avatar.clone(),
    };
    command_response(&state, &path.code, caller, command)
}

#[post("/api/rooms/{code}/leave")]
pub async fn api_leave_room(state: Data<AppState>, session: Session, path: Path<RoomPath>) -> HttpResponse {
    let Some(caller) = session_participant(&session) else {
        return no_identity();
    };
    command_response(&state, &path.code, caller, Command::Leave { participant_id: caller })
}

/// Build (or rebuild) the bracket. Body is optional; defaults to pairwise without double duty.
#[post("/api/rooms/{code}/organize")]
pub async fn api_organize(
    state: Data<AppState>,
    session: Session,
    path: Path<RoomPath>,
    body: Option<Json<OrganizeOptions>>,
) -> HttpResponse {
    let Some(caller) = session_participant(&session) else {
        return no_identity();
    };
    let options = body.map(Json::into_inner).unwrap_or_default();
    command_response(&state, &path.code, caller, Command::Organize { requester: caller, options })
}

#[post("/api/rooms/{code}/shuffle")]
pub async fn api_shuffle(state: Data<AppState>, session: Session, path: Path<RoomPath>) -> HttpResponse {
    let Some(caller) = session_participant(&session) else {
        return no_identity();
    };
    command_response(&state, &path.code, caller, Command::Shuffle { requester: caller })
}

#[post("/api/rooms/{code}/start")]
pub async fn api_start(state: Data<AppState>, session: Session, path: Path<RoomPath>) -> HttpResponse {
    let Some(caller) = session_participant(&session) else {
        return no_identity();
    };
    command_response(&state, &path.code, caller, Command::Start { requester: caller })
}

#[post("/api/rooms/{code}/winner")]
pub async fn api_report_winner(
    state: Data<AppState>,
    session: Session,
    path: Path<RoomPath>,
    body: Json<ReportWinnerBody>,
) -> HttpResponse {
    let Some(caller) = session_participant(&session) else {
        return no_identity();
    };
    let command = Command::ReportWinner {
        requester: caller,
        match_id: body.match_id,
        winner_id: body.winner_id,
    };
    command_response(&state, &path.code, caller, command)
}

/// Marks the participant connected while their event stream is open.
struct Presence {
    state: Data<AppState>,
    code: RoomCode,
    participant_id: Option<ParticipantId>,
}

impl Presence {
    fn enter(state: Data<AppState>, code: RoomCode, participant_id: Option<ParticipantId>) -> Self {
        if let Some(id) = participant_id {
            state.set_connected(&code, id, true);
        }
        Self {
            state,
            code,
            participant_id,
        }
    }
}

impl Drop for Presence {
    fn drop(&mut self) {
        if let Some(id) = self.participant_id {
            self.state.set_connected(&self.code, id, false);
        }
    }
}

/// Server-sent events: the current snapshot, then one frame per change.
#[get("/api/rooms/{code}/events")]
pub async fn api_room_events(state: Data<AppState>, session: Session, path: Path<RoomPath>) -> HttpResponse {
    let code = state.load(&path.code);
    // Subscribe before reading: a close after this point ends the stream, one before it
    // leaves no room and the channel is released again.
    let rx = state.hub.subscribe(&code);
    let Some(first) = state.registry.snapshot(&code).as_ref().and_then(Hub::state_frame) else {
        drop(rx);
        state.hub.release(&code);
        return error_response(&RoomError::NotFound(code));
    };
    let presence = Presence::enter(state.clone(), code.clone(), session_participant(&session));

    let updates = stream::unfold((rx, presence), |(mut rx, presence)| async move {
        loop {
            match rx.recv().await {
                Ok(frame) => return Some((Ok::<_, actix_web::Error>(frame), (rx, presence))),
                // Every frame carries the full room, so skipping ahead loses nothing.
                Err(RecvError::Lagged(skipped)) => {
                    log::debug!("Room {}: stream skipped {skipped} frame(s)", presence.code);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });
    let events = stream::once(async move { Ok::<_, actix_web::Error>(first) }).chain(updates);

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(events)
}
