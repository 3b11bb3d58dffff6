//! Web gateway for bracket rooms: REST commands, server-sent events for live state.
//! Run with: cargo run --bin server
//! Settings come from the environment, see config.rs (HOST, PORT, DATA_DIR, ...).

mod config;
mod hub;
mod routes;

use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{web::Data, App, HttpServer};
use bracket_rooms::registry::code;
use bracket_rooms::{
    Command, JsonDirStore, MemoryStore, Outcome, ParticipantId, RoomCode, RoomError,
    RoomRegistry, RoomSnapshot, RoomStore,
};
use chrono::{DateTime, Utc};
use config::Config;
use hub::Hub;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Shared by all workers: live rooms, their event channels and the snapshot store.
pub struct AppState {
    registry: RoomRegistry,
    hub: Hub,
    store: Box<dyn RoomStore>,
    /// Recently closed codes. Writes for them that arrive late are dropped.
    closed: Mutex<HashMap<RoomCode, DateTime<Utc>>>,
}

impl AppState {
    fn new(hub: Hub, store: Box<dyn RoomStore>) -> Self {
        Self {
            registry: RoomRegistry::new(),
            hub,
            store,
            closed: Mutex::new(HashMap::new()),
        }
    }

    fn create(
        &self,
        capacity: usize,
        admin_id: ParticipantId,
        name: &str,
        avatar: &str,
    ) -> Result<RoomSnapshot, RoomError> {
        let room = self.registry.create(capacity, admin_id, name, avatar)?;
        self.closed_codes().remove(&room.code);
        self.persist(&room);
        Ok(room)
    }

    /// Execute a command, then publish and persist the result outside the room lock.
    fn run(&self, code: &str, command: Command) -> Result<Outcome, RoomError> {
        let outcome = self.registry.execute(code, command)?;
        match &outcome {
            Outcome::Updated(room) => {
                self.hub.room_state(room);
                self.persist(room);
            }
            Outcome::Closed => self.discard(&code::normalize(code)),
            Outcome::Unchanged => {}
        }
        Ok(outcome)
    }

    /// Held across the store call so a write can't land between a close and its removal.
    fn closed_codes(&self) -> std::sync::MutexGuard<'_, HashMap<RoomCode, DateTime<Utc>>> {
        self.closed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, room: &RoomSnapshot) {
        let closed = self.closed_codes();
        if closed.contains_key(&room.code) {
            log::debug!("Room {}: dropping revision {} written after close", room.code, room.revision);
            return;
        }
        if let Err(e) = self.store.store(&room.code, room) {
            log::error!("Room {}: failed to persist revision {}: {e}", room.code, room.revision);
        }
    }

    fn discard(&self, code: &str) {
        self.hub.close(code);
        let mut closed = self.closed_codes();
        closed.insert(code.to_string(), Utc::now());
        if let Err(e) = self.store.remove(code) {
            log::error!("Room {code}: failed to remove stored snapshot: {e}");
        }
    }

    /// Forget tombstones set before `cutoff`.
    fn prune_closed(&self, cutoff: DateTime<Utc>) {
        self.closed_codes().retain(|_, at| *at >= cutoff);
    }

    /// Normalized code, with the room pulled back from the store if this process
    /// doesn't hold it (e.g. after a restart).
    fn load(&self, raw: &str) -> RoomCode {
        let code = code::normalize(raw);
        if self.registry.snapshot(&code).is_some() {
            return code;
        }
        match self.store.load(&code) {
            Ok(Some(snapshot)) => match self.registry.restore(snapshot) {
                Ok(_) => log::info!("Room {code} loaded from store"),
                Err(e) => log::warn!("Room {code}: stored snapshot rejected: {e}"),
            },
            Ok(None) => {}
            Err(e) => log::error!("Room {code}: failed to load snapshot: {e}"),
        }
        code
    }

    fn set_connected(&self, code: &str, participant_id: ParticipantId, connected: bool) {
        let command = Command::SetConnected {
            participant_id,
            connected,
        };
        if let Err(e) = self.run(code, command) {
            log::debug!("Room {code}: presence update ignored: {e}");
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();
    let store: Box<dyn RoomStore> = match &config.data_dir {
        Some(dir) => {
            let store = JsonDirStore::open(dir).map_err(std::io::Error::other)?;
            log::info!("Persisting rooms in {}", store.dir().display());
            Box::new(store)
        }
        None => Box::new(MemoryStore::new()),
    };
    let state = Data::new(AppState::new(Hub::new(config.broadcast_capacity), store));

    // Background task: sweep rooms nobody has touched for a while
    let state_cleanup = state.clone();
    let (interval_every, max_idle) = (config.cleanup_interval, config.room_idle);
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(interval_every);
        loop {
            interval.tick().await;
            let now = Utc::now();
            for code in state_cleanup.registry.purge_inactive(now, max_idle) {
                state_cleanup.discard(&code);
            }
            state_cleanup.prune_closed(now - max_idle);
        }
    });

    // Sessions only carry the participant id; a fixed key keeps them valid across restarts.
    let key = config.session_key();
    let secure_cookies = config.secure_cookies;
    log::info!("Starting server at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), key.clone())
                    .cookie_secure(secure_cookies)
                    .build(),
            )
            .service(routes::api_health)
            .service(routes::api_create_room)
            .service(routes::api_get_room)
            .service(routes::api_join_room)
            .service(routes::api_leave_room)
            .service(routes::api_organize)
            .service(routes::api_shuffle)
            .service(routes::api_start)
            .service(routes::api_report_winner)
            .service(routes::api_room_events)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn state() -> AppState {
        AppState::new(Hub::new(4), Box::new(MemoryStore::new()))
    }

    #[test]
    fn late_write_after_close_is_dropped() {
        let state = state();
        let admin = Uuid::new_v4();
        let room = state.create(4, admin, "A", "").unwrap();
        assert!(state.store.load(&room.code).unwrap().is_some());

        let leave = Command::Leave { participant_id: admin };
        assert!(matches!(state.run(&room.code, leave), Ok(Outcome::Closed)));
        state.persist(&room);
        assert!(state.store.load(&room.code).unwrap().is_none());

        let code = state.load(&room.code);
        assert!(state.registry.snapshot(&code).is_none());
    }

    #[test]
    fn tombstones_expire_and_reused_codes_persist() {
        let state = state();
        let admin = Uuid::new_v4();
        let room = state.create(4, admin, "A", "").unwrap();
        state.discard(&room.code);
        state.persist(&room);
        assert!(state.store.load(&room.code).unwrap().is_none());

        state.prune_closed(Utc::now() + chrono::Duration::seconds(1));
        state.persist(&room);
        assert_eq!(state.store.load(&room.code).unwrap(), Some(room));
    }
}
