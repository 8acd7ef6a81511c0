//! RFID card reader abstraction.
//!
//! A [`CardReader`] blocks until a card is presented and returns its id along
//! with any text stored on the tag. Readers hold hardware, so sessions wrap
//! them in a [`ReaderGuard`], which releases the device however the session
//! ends.
//!
//! [`LineReader`] covers keyboard-wedge and serial readers, which emit one
//! line per scan:
//!
//! ```text
//! 584190923415
//! 584190923415<TAB>payload text
//! 584190923415,payload text
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ReaderConfig;
use crate::types::CardId;

/// Errors raised by a card reader.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// The reader device could not be opened.
    #[error("failed to open reader device {}: {source}", device.display())]
    OpenFailed {
        /// Device path.
        device: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Reading from the device failed.
    #[error("reader I/O failed: {0}")]
    ReadFailed(#[source] io::Error),

    /// The device stopped producing data, or was already released.
    #[error("reader disconnected")]
    Disconnected,
}

/// Specialized result for reader operations.
pub type ReaderResult<T> = std::result::Result<T, ReaderError>;

/// One card presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardScan {
    /// Id of the card.
    pub card_id: CardId,
    /// Text stored on the tag, empty when there is none.
    pub text: String,
}

/// A source of card scans.
pub trait CardReader {
    /// Block until a card is scanned.
    ///
    /// # Errors
    ///
    /// Returns an error on hardware failure or disconnect.
    fn read(&mut self) -> ReaderResult<CardScan>;

    /// Release the underlying hardware. Called once by [`ReaderGuard`].
    fn release(&mut self) {}
}

impl<R: CardReader + ?Sized> CardReader for Box<R> {
    fn read(&mut self) -> ReaderResult<CardScan> {
        (**self).read()
    }

    fn release(&mut self) {
        (**self).release();
    }
}

/// Owns a reader for the length of a session and releases it on drop.
///
/// Drop runs on normal return, on `?` propagation and while unwinding, so the
/// device is always handed back.
#[derive(Debug)]
pub struct ReaderGuard<R: CardReader> {
    reader: R,
}

impl<R: CardReader> ReaderGuard<R> {
    /// Take ownership of `reader`.
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: CardReader> Deref for ReaderGuard<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.reader
    }
}

impl<R: CardReader> DerefMut for ReaderGuard<R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.reader
    }
}

impl<R: CardReader> Drop for ReaderGuard<R> {
    fn drop(&mut self) {
        self.reader.release();
    }
}

/// Parse one reader line into a scan.
///
/// Returns `None` for blank lines and lines whose id is not an unsigned
/// integer the store can hold (see [`CardId::MAX`]).
#[must_use]
pub fn parse_scan(line: &str) -> Option<CardScan> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (id, text) = line.split_once(['\t', ',']).unwrap_or((line, ""));
    let card_id: CardId = id.parse().ok()?;
    Some(CardScan {
        card_id,
        text: text.trim().to_string(),
    })
}

enum LineSource {
    Stdin(io::Stdin),
    Device(BufReader<File>),
    Buffered(Box<dyn BufRead + Send>),
}

impl LineSource {
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        match self {
            // Stdin is locked per line so operator prompts can share it.
            Self::Stdin(stdin) => stdin.read_line(buf),
            Self::Device(device) => device.read_line(buf),
            Self::Buffered(reader) => reader.read_line(buf),
        }
    }
}

/// Reader for devices that emit one line of text per scan.
pub struct LineReader {
    source: Option<LineSource>,
    name: String,
}

impl fmt::Debug for LineReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineReader")
            .field("name", &self.name)
            .field("open", &self.source.is_some())
            .finish()
    }
}

impl LineReader {
    /// Read scans typed into standard input (keyboard-wedge readers).
    #[must_use]
    pub fn stdin() -> Self {
        Self {
            source: Some(LineSource::Stdin(io::stdin())),
            name: "stdin".to_string(),
        }
    }

    /// Open a serial or HID device node.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::OpenFailed`] if the device cannot be opened.
    pub fn open(device: &Path) -> ReaderResult<Self> {
        let file = File::open(device).map_err(|source| ReaderError::OpenFailed {
            device: device.to_path_buf(),
            source,
        })?;
        Ok(Self {
            source: Some(LineSource::Device(BufReader::new(file))),
            name: device.display().to_string(),
        })
    }

    /// Read scans from any buffered source, such as a pipe or a test fixture.
    pub fn from_buf_read(reader: impl BufRead + Send + 'static) -> Self {
        Self {
            source: Some(LineSource::Buffered(Box::new(reader))),
            name: "buffer".to_string(),
        }
    }

    /// Open the reader described by the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured device cannot be opened.
    pub fn from_config(config: &ReaderConfig) -> ReaderResult<Self> {
        match &config.device {
            Some(device) => Self::open(device),
            None => Ok(Self::stdin()),
        }
    }

    /// Whether the reader still holds its device.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.source.is_some()
    }
}

impl CardReader for LineReader {
    fn read(&mut self) -> ReaderResult<CardScan> {
        let source = self.source.as_mut().ok_or(ReaderError::Disconnected)?;
        let mut line = String::new();
        loop {
            line.clear();
            let read = source.read_line(&mut line).map_err(ReaderError::ReadFailed)?;
            if read == 0 {
                return Err(ReaderError::Disconnected);
            }
            if let Some(scan) = parse_scan(&line) {
                debug!(card_id = %scan.card_id, reader = %self.name, "card scanned");
                return Ok(scan);
            }
            if !line.trim().is_empty() {
                warn!(line = line.trim(), reader = %self.name, "ignoring malformed scan");
            }
        }
    }

    fn release(&mut self) {
        if self.source.take().is_some() {
            info!(reader = %self.name, "card reader released");
        }
    }
}
