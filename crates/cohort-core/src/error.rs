//! Unified error types for the cohort core library.
//!
//! This module provides a unified error type [`CohortError`] that covers all
//! failure modes across the system. Each module also has its own specific error
//! type ([`ConfigError`], [`StoreError`], [`ReaderError`]) for internal use.
//!
//! Not every unhappy path is an error. An unknown card and a full room are
//! normal scan outcomes ([`ScanResult::UnknownCard`] and
//! [`Outcome::Rejected`]) and never reach this type.
//!
//! # Example
//!
//! ```rust
//! use cohort_core::error::{CohortError, Result};
//! use cohort_core::CardId;
//!
//! fn refuse(card: CardId) -> Result<()> {
//!     Err(CohortError::DuplicateCard(card))
//! }
//!
//! let err = refuse(CardId(1234)).unwrap_err();
//! assert!(err.is_contract_violation());
//! ```
//!
//! [`ConfigError`]: crate::config::ConfigError
//! [`StoreError`]: crate::storage::StoreError
//! [`ReaderError`]: crate::reader::ReaderError
//! [`ScanResult::UnknownCard`]: crate::occupancy::ScanResult::UnknownCard
//! [`Outcome::Rejected`]: crate::occupancy::Outcome::Rejected

use std::path::PathBuf;
use thiserror::Error;

use crate::types::CardId;

/// The unified error type for all cohort operations.
#[derive(Debug, Error)]
pub enum CohortError {
    // =========================================================================
    // MEMBER ERRORS
    // =========================================================================
    /// A registration targeted a card that is already registered.
    #[error("Card {0} is already registered. Look the card up before registering it.")]
    DuplicateCard(CardId),

    /// A member disappeared between lookup and update.
    #[error("No member registered with card {0}")]
    MemberNotFound(CardId),

    // =========================================================================
    // STORE ERRORS
    // =========================================================================
    /// The store could not be opened, read, or committed to.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    // =========================================================================
    // READER ERRORS
    // =========================================================================
    /// The card reader failed or could not be opened.
    #[error("Card reader failure: {0}")]
    HardwareFailure(String),

    /// The card reader stopped producing scans.
    #[error("Card reader disconnected. Check the cable and restart cohort.")]
    ReaderDisconnected,

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // I/O ERRORS
    // =========================================================================
    /// A low-level I/O error occurred, typically talking to the operator.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for cohort operations.
pub type Result<T> = std::result::Result<T, CohortError>;

impl CohortError {
    /// Returns `true` if this error comes from the durable store.
    #[inline]
    #[must_use]
    pub const fn is_store_error(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Returns `true` if this error comes from the card reader.
    #[inline]
    #[must_use]
    pub const fn is_hardware_error(&self) -> bool {
        matches!(self, Self::HardwareFailure(_) | Self::ReaderDisconnected)
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns `true` if the caller broke the lookup-before-write contract.
    #[inline]
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(self, Self::DuplicateCard(_) | Self::MemberNotFound(_))
    }

    /// Returns `true` if the session can carry on after reporting this error.
    ///
    /// Only operator I/O hiccups qualify. Store and reader failures stop the
    /// session so no scan is decided on an inconsistent count.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::IoError(e) if e.kind() == std::io::ErrorKind::Interrupted)
    }

    /// Process exit status for this error, following `sysexits.h`.
    #[inline]
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            // EX_SOFTWARE - internal contract broken
            Self::DuplicateCard(_) | Self::MemberNotFound(_) => 70,

            // EX_UNAVAILABLE - reader hardware
            Self::HardwareFailure(_) | Self::ReaderDisconnected => 69,

            // EX_CANTCREAT - store cannot be opened or written
            Self::StoreUnavailable(_) => 73,

            // EX_CONFIG
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_) => {
                78
            }

            // EX_IOERR
            Self::IoError(_) => 74,
        }
    }

    /// Returns a machine-readable error code for logs.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateCard(_) => "DUPLICATE_CARD",
            Self::MemberNotFound(_) => "MEMBER_NOT_FOUND",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::HardwareFailure(_) => "HARDWARE_FAILURE",
            Self::ReaderDisconnected => "READER_DISCONNECTED",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::config::ConfigError> for CohortError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path.into()),
            ConfigError::ReadError { path, source } => Self::IoError(std::io::Error::new(
                source.kind(),
                format!("Failed to read {path}: {source}"),
            )),
            ConfigError::WriteError { path, source } => Self::IoError(std::io::Error::new(
                source.kind(),
                format!("Failed to write {path}: {source}"),
            )),
            ConfigError::ParseError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::SerializeError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

impl From<crate::storage::StoreError> for CohortError {
    fn from(err: crate::storage::StoreError) -> Self {
        use crate::storage::StoreError;
        match err {
            StoreError::DuplicateCard(card) => Self::DuplicateCard(card),
            StoreError::MemberNotFound(card) => Self::MemberNotFound(card),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<crate::reader::ReaderError> for CohortError {
    fn from(err: crate::reader::ReaderError) -> Self {
        use crate::reader::ReaderError;
        match err {
            ReaderError::Disconnected => Self::ReaderDisconnected,
            ReaderError::OpenFailed { device, source } => {
                Self::HardwareFailure(format!("cannot open {}: {source}", device.display()))
            }
            ReaderError::ReadFailed(source) => Self::HardwareFailure(source.to_string()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
