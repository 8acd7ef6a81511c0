//! Durable storage for members and their actions.
//!
//! Backed by a single SQLite file with two tables:
//!
//! ```text
//! members(card_id PK, first_name, last_name, registration_dt, room_id NULL)
//! actions(id PK AUTOINCREMENT, member_id -> members.card_id,
//!         action_type_id {0 = enter, 1 = exit}, room_id, time)
//! ```
//!
//! Reads go through [`Store`]. Anything that writes goes through a
//! [`StoreTx`], which rolls back when dropped without [`StoreTx::commit`].

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use thiserror::Error;
use tracing::{debug, info};

use crate::types::{Action, CardId, FullName, Member, NewAction, RoomId};

/// Current schema version, tracked in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS members (
    card_id         INTEGER PRIMARY KEY NOT NULL,
    first_name      TEXT NOT NULL,
    last_name       TEXT NOT NULL,
    registration_dt TEXT NOT NULL,
    room_id         INTEGER
);

CREATE TABLE IF NOT EXISTS actions (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    member_id       INTEGER REFERENCES members(card_id),
    action_type_id  INTEGER NOT NULL CHECK (action_type_id IN (0, 1)),
    room_id         INTEGER NOT NULL,
    time            TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_members_room ON members(room_id);
CREATE INDEX IF NOT EXISTS idx_actions_member ON actions(member_id, id);
";

const MEMBER_COLUMNS: &str = "card_id, first_name, last_name, registration_dt, room_id";
const ACTION_COLUMNS: &str = "id, member_id, action_type_id, room_id, time";

/// Errors raised by the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database file could not be opened or created.
    #[error("failed to open store at {}: {source}", path.display())]
    OpenError {
        /// Resolved store path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// The database file exists but cannot be written.
    #[error("store at {} is read-only", .0.display())]
    ReadOnly(PathBuf),

    /// The parent directory of the database file could not be created.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirError {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The database was written by a newer version of cohort.
    #[error("store schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema {
        /// Version found in the file.
        found: i32,
        /// Highest version this build understands.
        supported: i32,
    },

    /// A member with this card already exists.
    #[error("card {0} is already registered")]
    DuplicateCard(CardId),

    /// No member holds this card.
    #[error("no member registered with card {0}")]
    MemberNotFound(CardId),

    /// Any other SQLite failure.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Specialized result for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Handle to the member/action database.
///
/// One handle is opened per run and passed explicitly to whoever needs it.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (creating if absent) the store at `path`.
    ///
    /// Parent directories are created. The schema is applied on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created, is read-only, or holds
    /// an unsupported schema.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDirError {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        if let Ok(metadata) = std::fs::metadata(&path) {
            if metadata.permissions().readonly() {
                return Err(StoreError::ReadOnly(path));
            }
        }

        info!(path = %path.display(), "opening store");
        let conn = Connection::open(&path).map_err(|source| StoreError::OpenError {
            path: path.clone(),
            source,
        })?;
        Self::init(conn, Some(path))
    }

    /// Open a private in-memory store. Used by tests and dry runs.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;

        let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                found: version,
                supported: SCHEMA_VERSION,
            });
        }
        conn.execute_batch(SCHEMA)?;
        if version < SCHEMA_VERSION {
            debug!(from = version, to = SCHEMA_VERSION, "migrated store schema");
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }

        Ok(Self { conn, path })
    }

    /// Path of the backing file, `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Start a write transaction.
    ///
    /// The transaction takes SQLite's write lock immediately, so reads made
    /// through it cannot be invalidated by another writer before commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be taken.
    pub fn begin(&mut self) -> StoreResult<StoreTx<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(StoreTx { tx })
    }

    /// Find the member holding `card_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_member(&self, card_id: CardId) -> StoreResult<Option<Member>> {
        find_member(&self.conn, card_id)
    }

    /// Number of members currently inside.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn occupied_count(&self) -> StoreResult<u32> {
        occupied_count(&self.conn)
    }

    /// Members currently inside, by last then first name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn members_inside(&self) -> StoreResult<Vec<Member>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE room_id IS NOT NULL
             ORDER BY last_name, first_name"
        ))?;
        let members = stmt
            .query_map([], member_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(members)
    }

    /// Actions of one member, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn actions_for_member(&self, card_id: CardId) -> StoreResult<Vec<Action>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ACTION_COLUMNS} FROM actions WHERE member_id = ?1 ORDER BY id"
        ))?;
        let actions = stmt
            .query_map([card_id], action_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(actions)
    }

    /// Total number of recorded actions.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn action_count(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM actions", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

/// An open write transaction.
///
/// Dropping it without calling [`StoreTx::commit`] rolls everything back.
#[derive(Debug)]
pub struct StoreTx<'a> {
    tx: rusqlite::Transaction<'a>,
}

impl StoreTx<'_> {
    /// Find the member holding `card_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_member(&self, card_id: CardId) -> StoreResult<Option<Member>> {
        find_member(&self.tx, card_id)
    }

    /// Number of members currently inside.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn occupied_count(&self) -> StoreResult<u32> {
        occupied_count(&self.tx)
    }

    /// Insert a new member, outside, registered at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateCard`] if the card is already taken.
    pub fn insert_member(
        &self,
        card_id: CardId,
        name: &FullName,
        now: DateTime<Utc>,
    ) -> StoreResult<Member> {
        if find_member(&self.tx, card_id)?.is_some() {
            return Err(StoreError::DuplicateCard(card_id));
        }
        self.tx
            .execute(
                "INSERT INTO members (card_id, first_name, last_name, registration_dt, room_id)
                 VALUES (?1, ?2, ?3, ?4, NULL)",
                params![card_id, name.first, name.last, now],
            )
            .map_err(|e| match e.sqlite_error_code() {
                Some(ErrorCode::ConstraintViolation) => StoreError::DuplicateCard(card_id),
                _ => StoreError::Sqlite(e),
            })?;

        Ok(Member {
            card_id,
            first_name: name.first.clone(),
            last_name: name.last.clone(),
            registration_dt: now,
            room: None,
        })
    }

    /// Overwrite a member's names and registration time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MemberNotFound`] if no member holds the card.
    pub fn update_member_name(
        &self,
        card_id: CardId,
        name: &FullName,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let changed = self.tx.execute(
            "UPDATE members SET first_name = ?2, last_name = ?3, registration_dt = ?4
             WHERE card_id = ?1",
            params![card_id, name.first, name.last, now],
        )?;
        if changed == 0 {
            return Err(StoreError::MemberNotFound(card_id));
        }
        Ok(())
    }

    /// Set or clear the room a member is in.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MemberNotFound`] if no member holds the card.
    pub fn set_member_room(&self, card_id: CardId, room: Option<RoomId>) -> StoreResult<()> {
        let changed = self.tx.execute(
            "UPDATE members SET room_id = ?2 WHERE card_id = ?1",
            params![card_id, room],
        )?;
        if changed == 0 {
            return Err(StoreError::MemberNotFound(card_id));
        }
        Ok(())
    }

    /// Append an action and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert_action(&self, action: &NewAction) -> StoreResult<Action> {
        self.tx.execute(
            "INSERT INTO actions (member_id, action_type_id, room_id, time)
             VALUES (?1, ?2, ?3, ?4)",
            params![action.member_id, action.kind, action.room, action.time],
        )?;
        Ok(Action {
            id: self.tx.last_insert_rowid(),
            member_id: action.member_id,
            kind: action.kind,
            room: action.room,
            time: action.time,
        })
    }

    /// Make every change in this transaction durable.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite fails to commit; nothing is applied then.
    pub fn commit(self) -> StoreResult<()> {
        self.tx.commit()?;
        Ok(())
    }
}

fn find_member(conn: &Connection, card_id: CardId) -> StoreResult<Option<Member>> {
    debug!(%card_id, "looking up member");
    let member = conn
        .query_row(
            &format!("SELECT {MEMBER_COLUMNS} FROM members WHERE card_id = ?1"),
            [card_id],
            member_from_row,
        )
        .optional()?;
    Ok(member)
}

fn occupied_count(conn: &Connection) -> StoreResult<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM members WHERE room_id IS NOT NULL",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<Member> {
    Ok(Member {
        card_id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        registration_dt: row.get(3)?,
        room: row.get(4)?,
    })
}

fn action_from_row(row: &Row<'_>) -> rusqlite::Result<Action> {
    Ok(Action {
        id: row.get(0)?,
        member_id: row.get(1)?,
        kind: row.get(2)?,
        room: row.get(3)?,
        time: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActionKind;
    use tempfile::tempdir;

    fn ada() -> FullName {
        FullName::parse("Ada", "Lovelace").unwrap()
    }

    fn store_with_member(card: u64) -> Store {
        let mut store = Store::open_in_memory().unwrap();
        let tx = store.begin().unwrap();
        tx.insert_member(CardId(card), &ada(), Utc::now()).unwrap();
        tx.commit().unwrap();
        store
    }

    #[test]
    fn test_insert_and_find_member() {
        let store = store_with_member(1234);
        let member = store.find_member(CardId(1234)).unwrap().unwrap();
        assert_eq!(member.first_name, "Ada");
        assert_eq!(member.last_name, "Lovelace");
        assert_eq!(member.room, None);
        assert!(store.find_member(CardId(9)).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_card_rejected() {
        let mut store = store_with_member(1234);
        let tx = store.begin().unwrap();
        let err = tx
            .insert_member(CardId(1234), &FullName::parse("Grace", "Hopper").unwrap(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCard(CardId(1234))));
        drop(tx);

        let member = store.find_member(CardId(1234)).unwrap().unwrap();
        assert_eq!(member.first_name, "Ada");
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let mut store = store_with_member(1);
        {
            let tx = store.begin().unwrap();
            tx.set_member_room(CardId(1), Some(RoomId(1))).unwrap();
            tx.insert_action(&NewAction {
                member_id: CardId(1),
                kind: ActionKind::Enter,
                room: RoomId(1),
                time: Utc::now(),
            })
            .unwrap();
        }
        assert_eq!(store.occupied_count().unwrap(), 0);
        assert_eq!(store.action_count().unwrap(), 0);
    }

    #[test]
    fn test_occupancy_and_actions() {
        let mut store = store_with_member(1);
        let tx = store.begin().unwrap();
        tx.set_member_room(CardId(1), Some(RoomId(1))).unwrap();
        let first = tx
            .insert_action(&NewAction {
                member_id: CardId(1),
                kind: ActionKind::Enter,
                room: RoomId(1),
                time: Utc::now(),
            })
            .unwrap();
        let second = tx
            .insert_action(&NewAction {
                member_id: CardId(1),
                kind: ActionKind::Exit,
                room: RoomId(1),
                time: Utc::now(),
            })
            .unwrap();
        tx.commit().unwrap();

        assert!(second.id > first.id);
        assert_eq!(store.occupied_count().unwrap(), 1);
        assert_eq!(store.members_inside().unwrap().len(), 1);

        let actions = store.actions_for_member(CardId(1)).unwrap();
        let kinds: Vec<_> = actions.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ActionKind::Enter, ActionKind::Exit]);
    }

    #[test]
    fn test_update_unknown_member() {
        let mut store = Store::open_in_memory().unwrap();
        let tx = store.begin().unwrap();
        assert!(matches!(
            tx.set_member_room(CardId(5), None).unwrap_err(),
            StoreError::MemberNotFound(CardId(5))
        ));
        assert!(matches!(
            tx.update_member_name(CardId(5), &ada(), Utc::now())
                .unwrap_err(),
            StoreError::MemberNotFound(CardId(5))
        ));
    }

    #[test]
    fn test_open_creates_file_and_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("db.sqlite3");
        {
            let mut store = Store::open(&path).unwrap();
            assert_eq!(store.path(), Some(path.as_path()));
            let tx = store.begin().unwrap();
            tx.insert_member(CardId(77), &ada(), Utc::now()).unwrap();
            tx.commit().unwrap();
        }
        assert!(path.exists());

        let reopened = Store::open(&path).unwrap();
        assert!(reopened.find_member(CardId(77)).unwrap().is_some());
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.sqlite3");
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
                .unwrap();
        }
        assert!(matches!(
            Store::open(&path).unwrap_err(),
            StoreError::UnsupportedSchema { .. }
        ));
    }

    #[test]
    fn test_large_card_ids_round_trip() {
        let card = CardId(584_190_923_415);
        let store = store_with_member(card.0);
        assert_eq!(store.find_member(card).unwrap().unwrap().card_id, card);
    }
}
