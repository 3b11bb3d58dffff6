//! Per-room fan-out of snapshots to open event streams.

use actix_web::web::Bytes;
use bracket_rooms::{RoomCode, RoomSnapshot};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

/// Message pushed to every stream attached to a room.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Event<'a> {
    RoomState { room: &'a RoomSnapshot },
    RoomClosed { code: &'a str },
}

/// One broadcast channel of pre-encoded server-sent-event frames per room.
pub struct Hub {
    channels: RwLock<HashMap<RoomCode, broadcast::Sender<Bytes>>>,
    capacity: usize,
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    pub fn subscribe(&self, code: &str) -> broadcast::Receiver<Bytes> {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(code.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn room_state(&self, room: &RoomSnapshot) {
        self.send(&room.code, &Event::RoomState { room });
    }

    /// Tell streams the room is gone, then end them.
    pub fn close(&self, code: &str) {
        self.send(code, &Event::RoomClosed { code });
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        channels.remove(code);
    }

    /// Drop the channel for `code` if nobody is subscribed to it.
    pub fn release(&self, code: &str) {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        if channels.get(code).is_some_and(|tx| tx.receiver_count() == 0) {
            channels.remove(code);
        }
    }

    /// Encoded `room_state` frame, for the first message of a new stream.
    pub fn state_frame(room: &RoomSnapshot) -> Option<Bytes> {
        frame(&Event::RoomState { room })
    }

    fn send(&self, code: &str, event: &Event<'_>) {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = channels.get(code) else {
            return;
        };
        if let Some(bytes) = frame(event) {
            // No receivers is fine: nobody is watching.
            let _ = tx.send(bytes);
        }
    }
}

fn frame(event: &Event<'_>) -> Option<Bytes> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Bytes::from(format!("data: {json}\n\n"))),
        Err(e) => {
            log::warn!("Failed to encode event: {e}");
            None
        }
    }
}
