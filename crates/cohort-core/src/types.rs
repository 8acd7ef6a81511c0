//! Shared domain types.
//!
//! Members are keyed by the integer read from their RFID card. Actions are the
//! append-only audit trail of every enter and exit.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier read from an RFID tag. Primary key of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u64);

impl CardId {
    /// Largest id the store can hold (SQLite integers are signed 64-bit).
    pub const MAX: Self = Self(i64::MAX.unsigned_abs());
}

/// A card id that is not a number the store can hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardIdError {
    /// Not an unsigned integer.
    #[error("card id {0:?} is not an unsigned integer")]
    NotANumber(String),

    /// Larger than [`CardId::MAX`].
    #[error("card id {0} is larger than {max}", max = CardId::MAX)]
    OutOfRange(u64),
}

impl TryFrom<u64> for CardId {
    type Error = CardIdError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        if raw > Self::MAX.0 {
            return Err(CardIdError::OutOfRange(raw));
        }
        Ok(Self(raw))
    }
}

impl FromStr for CardId {
    type Err = CardIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let raw: u64 = s
            .parse()
            .map_err(|_| CardIdError::NotANumber(s.to_string()))?;
        Self::try_from(raw)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for CardId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = i64::try_from(self.0)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        Ok(ToSqlOutput::from(value))
    }
}

impl FromSql for CardId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_i64()?;
        u64::try_from(raw)
            .map(Self)
            .map_err(|_| FromSqlError::OutOfRange(raw))
    }
}

/// Identifier of the tracked room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u32);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for RoomId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for RoomId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        u32::column_result(value).map(Self)
    }
}

/// A member's first and last name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullName {
    /// Given name.
    pub first: String,
    /// Family name.
    pub last: String,
}

impl FullName {
    /// Build a name from raw operator input.
    ///
    /// Surrounding whitespace is trimmed. Returns `None` when either part is
    /// blank.
    #[must_use]
    pub fn parse(first: &str, last: &str) -> Option<Self> {
        let first = first.trim();
        let last = last.trim();
        if first.is_empty() || last.is_empty() {
            return None;
        }
        Some(Self {
            first: first.to_string(),
            last: last.to_string(),
        })
    }
}

impl fmt::Display for FullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first, self.last)
    }
}

/// A registered card holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Card that identifies this member. Never changes.
    pub card_id: CardId,

    /// Given name.
    pub first_name: String,

    /// Family name.
    pub last_name: String,

    /// When the member registered, or last had their details edited (UTC).
    pub registration_dt: DateTime<Utc>,

    /// Room the member is currently in. `None` while outside.
    pub room: Option<RoomId>,
}

impl Member {
    /// Whether the member is currently inside.
    #[inline]
    #[must_use]
    pub const fn is_inside(&self) -> bool {
        self.room.is_some()
    }

    /// The member's name as a [`FullName`].
    #[must_use]
    pub fn name(&self) -> FullName {
        FullName {
            first: self.first_name.clone(),
            last: self.last_name.clone(),
        }
    }
}

/// Kind of an audit action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// The member entered the room.
    Enter,
    /// The member left the room.
    Exit,
}

impl ActionKind {
    /// Stored discriminant: `0` for enter, `1` for exit.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Enter => 0,
            Self::Exit => 1,
        }
    }

    /// Inverse of [`ActionKind::code`].
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Enter),
            1 => Some(Self::Exit),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enter => f.write_str("enter"),
            Self::Exit => f.write_str("exit"),
        }
    }
}

impl ToSql for ActionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for ActionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_i64()?;
        Self::from_code(code).ok_or(FromSqlError::OutOfRange(code))
    }
}

/// One recorded enter or exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Sequential id assigned by the store. Increases with time.
    pub id: i64,

    /// Card of the member who moved.
    pub member_id: CardId,

    /// Whether they entered or left.
    pub kind: ActionKind,

    /// Room entered or left.
    pub room: RoomId,

    /// When it happened (UTC).
    pub time: DateTime<Utc>,
}

/// An action that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAction {
    /// Card of the member who moved.
    pub member_id: CardId,
    /// Whether they entered or left.
    pub kind: ActionKind,
    /// Room entered or left.
    pub room: RoomId,
    /// When it happened (UTC).
    pub time: DateTime<Utc>,
}
