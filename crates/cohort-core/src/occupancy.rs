//! Occupancy state machine.
//!
//! Each member is either outside (`room == None`) or inside the tracked room.
//! A scan moves an inside member out unconditionally, and moves an outside
//! member in only while the room has free spots:
//!
//! ```text
//! Outside --scan, occupied <  capacity--> Inside
//! Outside --scan, occupied >= capacity--> Outside   (rejected, nothing written)
//! Inside  --scan-------------------------> Outside
//! ```
//!
//! Every accepted transition updates the member and appends one [`Action`]
//! in a single store transaction.
//!
//! [`Action`]: crate::types::Action

use std::fmt;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::RoomConfig;
use crate::error::Result;
use crate::storage::{Store, StoreTx};
use crate::types::{ActionKind, CardId, FullName, Member, NewAction, RoomId};

/// Why a scan was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The room is at capacity.
    NoSpots,
}

/// What a scan should do to a member, before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Move the member into the room.
    Enter(RoomId),
    /// Move the member out of the room they are in.
    Exit(RoomId),
    /// Leave the member where they are.
    Reject(RejectReason),
}

/// Result of one processed scan, ready to show to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The member is now inside.
    Entered(FullName),
    /// The member is now outside.
    Exited(FullName),
    /// Nothing changed.
    Rejected(RejectReason),
}

/// Result of handling a raw card id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    /// The card belongs to a member and the scan was processed.
    Known(Outcome),
    /// No member holds this card. Nothing was written.
    UnknownCard(CardId),
}

/// Applies scans to members of one room with a fixed capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupancyEngine {
    room: RoomId,
    capacity: u32,
}

impl OccupancyEngine {
    /// Create an engine for `room` holding at most `capacity` members.
    #[must_use]
    pub const fn new(room: RoomId, capacity: u32) -> Self {
        Self { room, capacity }
    }

    /// Create an engine from the room section of the configuration.
    #[must_use]
    pub const fn from_config(config: &RoomConfig) -> Self {
        Self::new(config.room_id(), config.capacity)
    }

    /// The tracked room.
    #[must_use]
    pub const fn room(&self) -> RoomId {
        self.room
    }

    /// Maximum simultaneous occupancy.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Decide what a scan does to `member` when `occupied` members are inside.
    ///
    /// Exiting is never blocked by capacity.
    #[must_use]
    pub const fn decide(&self, member: &Member, occupied: u32) -> Transition {
        match member.room {
            Some(room) => Transition::Exit(room),
            None if occupied >= self.capacity => Transition::Reject(RejectReason::NoSpots),
            None => Transition::Enter(self.room),
        }
    }

    /// Apply a scan of `member` given a caller-computed occupancy count.
    ///
    /// The member update and its action commit together or not at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails; nothing is written in that case.
    pub fn process_scan(
        &self,
        store: &mut Store,
        member: &Member,
        occupied: u32,
    ) -> Result<Outcome> {
        let tx = store.begin()?;
        let outcome = self.apply(&tx, member, occupied)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Look up `card_id` and apply a scan.
    ///
    /// Lookup, occupancy count, decision and writes all happen inside one
    /// write-locked transaction, so the count the decision uses is the count
    /// at commit time.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails; nothing is written in that case.
    pub fn handle_card(&self, store: &mut Store, card_id: CardId) -> Result<ScanResult> {
        let tx = store.begin()?;
        let Some(member) = tx.find_member(card_id)? else {
            return Ok(ScanResult::UnknownCard(card_id));
        };
        let occupied = tx.occupied_count()?;
        let outcome = self.apply(&tx, &member, occupied)?;
        tx.commit()?;
        Ok(ScanResult::Known(outcome))
    }

    fn apply(&self, tx: &StoreTx<'_>, member: &Member, occupied: u32) -> Result<Outcome> {
        let card_id = member.card_id;
        match self.decide(member, occupied) {
            Transition::Enter(room) => {
                tx.set_member_room(card_id, Some(room))?;
                let action = tx.insert_action(&NewAction {
                    member_id: card_id,
                    kind: ActionKind::Enter,
                    room,
                    time: Utc::now(),
                })?;
                info!(%card_id, action_id = action.id, occupied = occupied + 1, "member entered");
                Ok(Outcome::Entered(member.name()))
            }
            Transition::Exit(room) => {
                tx.set_member_room(card_id, None)?;
                let action = tx.insert_action(&NewAction {
                    member_id: card_id,
                    kind: ActionKind::Exit,
                    room,
                    time: Utc::now(),
                })?;
                info!(%card_id, action_id = action.id, "member exited");
                Ok(Outcome::Exited(member.name()))
            }
            Transition::Reject(reason) => {
                warn!(%card_id, occupied, capacity = self.capacity, ?reason, "entry rejected");
                Ok(Outcome::Rejected(reason))
            }
        }
    }
}

/// How full the room looks to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyLevel {
    /// Below the busy threshold.
    Available,
    /// At or above the busy threshold but not full.
    Busy,
    /// At capacity.
    Full,
}

/// Occupied spots against capacity, as reported before each scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OccupancyStatus {
    /// Members currently inside.
    pub occupied: u32,
    /// Maximum simultaneous occupancy.
    pub capacity: u32,
    /// Percentage of capacity from which the room counts as busy.
    pub busy_threshold_percent: u8,
}

impl OccupancyStatus {
    /// Build a status report.
    #[must_use]
    pub const fn new(occupied: u32, capacity: u32, busy_threshold_percent: u8) -> Self {
        Self {
            occupied,
            capacity,
            busy_threshold_percent,
        }
    }

    /// Read the current count from `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the count cannot be read.
    pub fn current(store: &Store, room: &RoomConfig) -> Result<Self> {
        Ok(Self::new(
            store.occupied_count()?,
            room.capacity,
            room.busy_threshold_percent,
        ))
    }

    /// Spots still available.
    #[must_use]
    pub const fn free(&self) -> u32 {
        self.capacity.saturating_sub(self.occupied)
    }

    /// Colour band for the current count.
    #[must_use]
    pub fn level(&self) -> OccupancyLevel {
        if self.occupied >= self.capacity {
            OccupancyLevel::Full
        } else if u64::from(self.occupied) * 100
            >= u64::from(self.capacity) * u64::from(self.busy_threshold_percent)
        {
            OccupancyLevel::Busy
        } else {
            OccupancyLevel::Available
        }
    }
}

impl fmt::Display for OccupancyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.level() == OccupancyLevel::Full {
            write!(f, "{} occupied, no free spots", self.occupied)
        } else {
            write!(f, "{} occupied, {} free spots", self.occupied, self.free())
        }
    }
}
