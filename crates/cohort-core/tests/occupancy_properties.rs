//! End-to-end occupancy behaviour against an on-disk store.

use cohort_core::registration::{edit, lookup, register_new};
use cohort_core::{
    ActionKind, CardId, CohortError, FullName, OccupancyEngine, Outcome, RejectReason, RoomId,
    ScanResult, Store,
};
use tempfile::TempDir;

const ROOM: RoomId = RoomId(1);
const CAPACITY: u32 = 19;

fn open_store() -> (TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("db.sqlite3")).unwrap();
    (dir, store)
}

fn name(first: &str, last: &str) -> FullName {
    FullName::parse(first, last).unwrap()
}

#[test]
fn register_enter_exit_round_trip() {
    let (_dir, mut store) = open_store();
    let engine = OccupancyEngine::new(ROOM, CAPACITY);
    let card = CardId(1234);

    register_new(&mut store, card, &name("Ada", "Lovelace")).unwrap();
    let member = lookup(&store, card).unwrap().unwrap();
    assert_eq!(member.first_name, "Ada");
    assert_eq!(member.last_name, "Lovelace");
    assert_eq!(member.room, None);

    let entered = engine.process_scan(&mut store, &member, 0).unwrap();
    assert_eq!(entered, Outcome::Entered(name("Ada", "Lovelace")));
    let member = lookup(&store, card).unwrap().unwrap();
    assert_eq!(member.room, Some(ROOM));

    let occupied = store.occupied_count().unwrap();
    let exited = engine.process_scan(&mut store, &member, occupied).unwrap();
    assert_eq!(exited, Outcome::Exited(name("Ada", "Lovelace")));
    assert_eq!(lookup(&store, card).unwrap().unwrap().room, None);

    let actions = store.actions_for_member(card).unwrap();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0].kind, ActionKind::Enter);
    assert_eq!(actions[1].kind, ActionKind::Exit);
    assert!(actions[0].id < actions[1].id);
    assert!(actions[0].time <= actions[1].time);
}

#[test]
fn twentieth_member_is_turned_away() {
    let (_dir, mut store) = open_store();
    let engine = OccupancyEngine::new(ROOM, CAPACITY);

    for card in 1..=20 {
        register_new(&mut store, CardId(card), &name("Member", &card.to_string())).unwrap();
    }
    for card in 1..=19 {
        let result = engine.handle_card(&mut store, CardId(card)).unwrap();
        assert!(matches!(result, ScanResult::Known(Outcome::Entered(_))));
    }
    assert_eq!(store.occupied_count().unwrap(), 19);

    for _ in 0..2 {
        assert_eq!(
            engine.handle_card(&mut store, CardId(20)).unwrap(),
            ScanResult::Known(Outcome::Rejected(RejectReason::NoSpots))
        );
    }
    assert_eq!(store.occupied_count().unwrap(), 19);
    assert!(store.actions_for_member(CardId(20)).unwrap().is_empty());
    assert_eq!(lookup(&store, CardId(20)).unwrap().unwrap().room, None);

    // Someone leaving frees a spot.
    engine.handle_card(&mut store, CardId(3)).unwrap();
    assert!(matches!(
        engine.handle_card(&mut store, CardId(20)).unwrap(),
        ScanResult::Known(Outcome::Entered(_))
    ));
    assert_eq!(store.occupied_count().unwrap(), 19);
}

#[test]
fn edit_leaves_room_and_history_alone() {
    let (_dir, mut store) = open_store();
    let engine = OccupancyEngine::new(ROOM, CAPACITY);
    let card = CardId(42);

    register_new(&mut store, card, &name("Ada", "Byron")).unwrap();
    engine.handle_card(&mut store, card).unwrap();
    let before = lookup(&store, card).unwrap().unwrap();
    let history = store.actions_for_member(card).unwrap();

    edit(&mut store, &before, &name("Ada", "Lovelace")).unwrap();

    let after = lookup(&store, card).unwrap().unwrap();
    assert_eq!(after.last_name, "Lovelace");
    assert_eq!(after.room, before.room);
    assert!(after.registration_dt >= before.registration_dt);
    assert_eq!(store.actions_for_member(card).unwrap(), history);
}

#[test]
fn duplicate_card_is_refused() {
    let (_dir, mut store) = open_store();
    register_new(&mut store, CardId(7), &name("Ada", "Lovelace")).unwrap();
    let original = lookup(&store, CardId(7)).unwrap().unwrap();

    let err = register_new(&mut store, CardId(7), &name("Grace", "Hopper")).unwrap_err();
    assert!(matches!(err, CohortError::DuplicateCard(CardId(7))));
    assert!(err.is_contract_violation());
    assert_eq!(lookup(&store, CardId(7)).unwrap().unwrap(), original);
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.sqlite3");
    let engine = OccupancyEngine::new(ROOM, CAPACITY);
    {
        let mut store = Store::open(&path).unwrap();
        register_new(&mut store, CardId(1), &name("Ada", "Lovelace")).unwrap();
        engine.handle_card(&mut store, CardId(1)).unwrap();
    }

    let mut store = Store::open(&path).unwrap();
    assert_eq!(store.occupied_count().unwrap(), 1);
    assert_eq!(
        engine.handle_card(&mut store, CardId(1)).unwrap(),
        ScanResult::Known(Outcome::Exited(name("Ada", "Lovelace")))
    );
    assert_eq!(store.actions_for_member(CardId(1)).unwrap().len(), 2);
}
