//! Integration tests for the room registry: commands, concurrency, cleanup, restore.

use bracket_rooms::registry::code;
use bracket_rooms::{
    Command, Identity, JsonDirStore, OrganizeOptions, Outcome, ParticipantId, RoomError,
    RoomRegistry, RoomSnapshot, RoomStore,
};
use chrono::{Duration, Utc};
use std::sync::{Arc, Barrier};
use std::thread;
use uuid::Uuid;

fn join(registry: &RoomRegistry, code: &str, name: &str) -> ParticipantId {
    let id = Uuid::new_v4();
    let command = Command::Join {
        participant_id: id,
        name: name.to_string(),
        avatar: String::new(),
    };
    registry.execute(code, command).unwrap();
    id
}

/// Registry with a started pairwise room of `n` participants, seeded in join order.
fn started_room(n: usize) -> (RoomRegistry, String, Vec<ParticipantId>) {
    let registry = RoomRegistry::with_permuter(Identity);
    let admin = Uuid::new_v4();
    let code = registry.create(20, admin, "Admin", "").unwrap().code;
    let mut ids = vec![admin];
    for i in 1..n {
        ids.push(join(&registry, &code, &format!("P{i}")));
    }
    let organize = Command::Organize {
        requester: admin,
        options: OrganizeOptions::default(),
    };
    registry.execute(&code, organize).unwrap();
    registry.execute(&code, Command::Start { requester: admin }).unwrap();
    (registry, code, ids)
}

fn updated(outcome: Outcome) -> RoomSnapshot {
    match outcome {
        Outcome::Updated(room) => room,
        other => panic!("expected an update, got {other:?}"),
    }
}

#[test]
fn create_returns_a_well_formed_code() {
    let registry = RoomRegistry::new();
    let admin = Uuid::new_v4();
    let room = registry.create(4, admin, "Ana", "ana.png").unwrap();
    assert!(code::is_well_formed(&room.code));
    assert_eq!(room.admin_id, admin);
    assert_eq!(room.participants.len(), 1);
    assert_eq!(registry.snapshot(&room.code), Some(room.clone()));
    assert_eq!(registry.codes(), vec![room.code]);

    assert_eq!(
        registry.create(21, Uuid::new_v4(), "Bo", ""),
        Err(RoomError::InvalidCapacity(21))
    );
    assert_eq!(registry.len(), 1);
}

#[test]
fn room_of_two_rejects_a_third() {
    let registry = RoomRegistry::new();
    let code = registry.create(2, Uuid::new_v4(), "A", "").unwrap().code;
    join(&registry, &code, "B");
    let third = Command::Join {
        participant_id: Uuid::new_v4(),
        name: "C".to_string(),
        avatar: String::new(),
    };
    assert_eq!(registry.execute(&code, third), Err(RoomError::RoomFull));
    assert_eq!(registry.snapshot(&code).unwrap().participants.len(), 2);
}

#[test]
fn codes_are_matched_case_insensitively() {
    let registry = RoomRegistry::new();
    let code = registry.create(4, Uuid::new_v4(), "A", "").unwrap().code;
    join(&registry, &format!("  {}  ", code.to_lowercase()), "B");
    assert_eq!(registry.snapshot(&code.to_lowercase()).unwrap().participants.len(), 2);
}

#[test]
fn departed_admin_returns_as_a_regular_participant() {
    let registry = RoomRegistry::new();
    let admin = Uuid::new_v4();
    let code = registry.create(4, admin, "A", "").unwrap().code;
    let second = join(&registry, &code, "B");
    join(&registry, &code, "C");

    let room = updated(registry.execute(&code, Command::Leave { participant_id: admin }).unwrap());
    assert_eq!(room.admin_id, second);
    assert_eq!(room.participants.iter().filter(|p| p.is_admin).count(), 1);

    let back = Command::Join {
        participant_id: admin,
        name: "A".to_string(),
        avatar: String::new(),
    };
    let room = updated(registry.execute(&code, back).unwrap());
    assert_eq!(room.admin_id, second);
    assert_eq!(room.participants.len(), 3);
    assert_eq!(room.participants.last().unwrap().id, admin);
    assert!(!room.participants.last().unwrap().is_admin);

    let organize = Command::Organize {
        requester: admin,
        options: OrganizeOptions::default(),
    };
    assert_eq!(registry.execute(&code, organize), Err(RoomError::Unauthorized));
}

#[test]
fn revision_moves_only_on_committed_changes() {
    let registry = RoomRegistry::new();
    let admin = Uuid::new_v4();
    let code = registry.create(4, admin, "A", "").unwrap().code;
    let other = join(&registry, &code, "B");
    assert_eq!(registry.snapshot(&code).unwrap().revision, 1);

    let rejected = Command::Start { requester: other };
    assert_eq!(registry.execute(&code, rejected), Err(RoomError::Unauthorized));
    let noop = Command::SetConnected {
        participant_id: other,
        connected: true,
    };
    assert_eq!(registry.execute(&code, noop), Ok(Outcome::Unchanged));
    assert_eq!(registry.snapshot(&code).unwrap().revision, 1);

    let away = Command::SetConnected {
        participant_id: other,
        connected: false,
    };
    let room = updated(registry.execute(&code, away).unwrap());
    assert_eq!(room.revision, 2);
    assert!(!room.participants[1].is_connected);
}

#[test]
fn repeated_result_does_not_advance_twice() {
    let (registry, code, ids) = started_room(4);
    let active = registry.snapshot(&code).unwrap().active_match_id.unwrap();
    let report = Command::ReportWinner {
        requester: ids[0],
        match_id: active,
        winner_id: ids[1],
    };
    let room = updated(registry.execute(&code, report.clone()).unwrap());
    assert_ne!(room.active_match_id, Some(active));

    assert_eq!(registry.execute(&code, report), Err(RoomError::MatchNotActive));
    assert_eq!(registry.snapshot(&code).unwrap(), room);
}

#[test]
fn concurrent_reports_for_one_match_succeed_once() {
    let (registry, code, ids) = started_room(8);
    let registry = Arc::new(registry);
    let active = registry.snapshot(&code).unwrap().active_match_id.unwrap();
    let before = registry.snapshot(&code).unwrap().revision;

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let (registry, barrier, code) = (Arc::clone(&registry), Arc::clone(&barrier), code.clone());
            let command = Command::ReportWinner {
                requester: ids[0],
                match_id: active,
                winner_id: ids[i % 2],
            };
            thread::spawn(move || {
                barrier.wait();
                registry.execute(&code, command)
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| *e == RoomError::MatchNotActive));
    assert_eq!(registry.snapshot(&code).unwrap().revision, before + 1);
}

#[test]
fn rooms_work_independently_across_threads() {
    let registry = Arc::new(RoomRegistry::new());
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let code = registry.create(20, Uuid::new_v4(), "A", "").unwrap().code;
                for i in 0..10 {
                    join(&registry, &code, &format!("P{i}"));
                }
                code
            })
        })
        .collect();
    for handle in handles {
        let code = handle.join().unwrap();
        assert_eq!(registry.snapshot(&code).unwrap().participants.len(), 11);
    }
    assert_eq!(registry.len(), 6);
}

#[test]
fn last_leave_closes_the_room() {
    let registry = RoomRegistry::new();
    let admin = Uuid::new_v4();
    let code = registry.create(4, admin, "A", "").unwrap().code;

    assert_eq!(
        registry.execute(&code, Command::Leave { participant_id: admin }),
        Ok(Outcome::Closed)
    );
    assert!(registry.snapshot(&code).is_none());
    assert!(registry.is_empty());

    assert_eq!(
        registry.execute(&code, Command::Leave { participant_id: admin }),
        Ok(Outcome::Unchanged)
    );
    let late = Command::Join {
        participant_id: admin,
        name: "A".to_string(),
        avatar: String::new(),
    };
    assert_eq!(registry.execute(&code, late), Err(RoomError::NotFound(code)));
}

#[test]
fn leaving_an_unknown_participant_changes_nothing() {
    let registry = RoomRegistry::new();
    let code = registry.create(4, Uuid::new_v4(), "A", "").unwrap().code;
    let stranger = Command::Leave {
        participant_id: Uuid::new_v4(),
    };
    assert_eq!(registry.execute(&code, stranger), Ok(Outcome::Unchanged));
    assert_eq!(registry.snapshot(&code).unwrap().revision, 0);
}

#[test]
fn purge_removes_only_idle_rooms() {
    let registry = RoomRegistry::new();
    let code = registry.create(4, Uuid::new_v4(), "A", "").unwrap().code;
    let idle = Duration::minutes(10);

    assert!(registry.purge_inactive(Utc::now(), idle).is_empty());
    assert_eq!(registry.len(), 1);

    let later = Utc::now() + Duration::minutes(11);
    assert_eq!(registry.purge_inactive(later, idle), vec![code.clone()]);
    assert!(registry.snapshot(&code).is_none());
    assert_eq!(
        registry.execute(&code, Command::Start { requester: Uuid::new_v4() }),
        Err(RoomError::NotFound(code))
    );
}

#[test]
fn restore_brings_a_room_back() {
    let (registry, code, ids) = started_room(5);
    let active = registry.snapshot(&code).unwrap().active_match_id.unwrap();
    let report = Command::ReportWinner {
        requester: ids[0],
        match_id: active,
        winner_id: ids[0],
    };
    let saved = updated(registry.execute(&code, report).unwrap());

    let fresh = RoomRegistry::new();
    assert_eq!(fresh.restore(saved.clone()).unwrap(), saved);
    let next = saved.active_match_id.unwrap();
    let report = Command::ReportWinner {
        requester: ids[0],
        match_id: next,
        winner_id: ids[2],
    };
    let room = updated(fresh.execute(&code, report).unwrap());
    assert_eq!(room.revision, saved.revision + 1);
}

#[test]
fn restore_keeps_a_live_room() {
    let registry = RoomRegistry::new();
    let admin = Uuid::new_v4();
    let old = registry.create(4, admin, "A", "").unwrap();
    join(&registry, &old.code, "B");

    let live = registry.restore(old.clone()).unwrap();
    assert_eq!(live.participants.len(), 2);
    assert_eq!(registry.snapshot(&old.code), Some(live));
}

#[test]
fn stored_snapshots_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonDirStore::open(dir.path()).unwrap();
    let (registry, code, ids) = started_room(3);
    let snapshot = registry.snapshot(&code).unwrap();
    store.store(&code, &snapshot).unwrap();
    drop(registry);

    let reopened = JsonDirStore::open(dir.path()).unwrap();
    let loaded = reopened.load(&code).unwrap().unwrap();
    assert_eq!(loaded, snapshot);

    let registry = RoomRegistry::new();
    registry.restore(loaded).unwrap();
    let room = registry.snapshot(&code).unwrap();
    assert!(room.started);
    assert_eq!(room.admin_id, ids[0]);
}
