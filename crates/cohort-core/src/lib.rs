//! # cohort-core
//!
//! Core business logic for the cohort RFID occupancy tracker.
//!
//! This crate provides:
//! - The occupancy state machine that moves members in and out of the room
//! - Member registration and edits, with a confirm-or-retry name flow
//! - SQLite persistence for members and their enter/exit audit trail
//! - The card reader abstraction and a line-oriented reader implementation
//! - Configuration loading, saving, and validation
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`occupancy`] - Enter/exit/reject decisions, applied atomically
//! - [`registration`] - Creating and editing members
//! - [`session`] - Tracker and register loops tying reader, store and operator
//! - [`storage`] - SQLite store for members and actions
//! - [`reader`] - Card reader trait, scoped release guard, line reader
//! - [`operator`] - Typed notices and questions for the person at the reader
//! - [`config`] - Application configuration
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared domain types

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod occupancy;
pub mod operator;
pub mod reader;
pub mod registration;
pub mod session;
pub mod storage;
pub mod types;

// Re-export primary types for convenience
pub use config::{
    default_config_path, Config, ConfigError, ConfigResult, ReaderConfig, RoomConfig,
    StoreConfig, DEFAULT_BUSY_THRESHOLD_PERCENT, DEFAULT_CAPACITY, DEFAULT_STORE_PATH,
};
pub use error::{CohortError, Result};
pub use occupancy::{
    OccupancyEngine, OccupancyLevel, OccupancyStatus, Outcome, RejectReason, ScanResult,
    Transition,
};
pub use operator::{Confirmation, Notice, Operator, Question};
pub use reader::{CardReader, CardScan, LineReader, ReaderError, ReaderGuard, ReaderResult};
pub use registration::{NameEntry, NameInput};
pub use session::{run_registration, run_tracker};
pub use storage::{Store, StoreError, StoreResult, StoreTx};
pub use types::{Action, ActionKind, CardId, CardIdError, FullName, Member, NewAction, RoomId};
