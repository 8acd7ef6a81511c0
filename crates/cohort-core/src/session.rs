//! Operator sessions: the tracker loop and the registration desk.
//!
//! Both take ownership of a [`CardReader`] and hold it in a [`ReaderGuard`]
//! for their whole run, so the reader is released on every exit path.

use std::convert::Infallible;

use tracing::{error, info};

use crate::config::RoomConfig;
use crate::error::{CohortError, Result};
use crate::occupancy::{OccupancyEngine, OccupancyStatus, ScanResult};
use crate::operator::{Confirmation, Notice, Operator};
use crate::reader::{CardReader, ReaderGuard};
use crate::registration;
use crate::storage::Store;

/// Run tracker mode until a fatal error.
///
/// Each iteration reports occupancy, waits for a card, and applies it. Unknown
/// cards may be registered on the spot; the new member still has to scan
/// again to enter.
///
/// # Errors
///
/// Only returns on failure: a store error, a reader failure or disconnect, or
/// an operator I/O error. The reader has been released by then.
pub fn run_tracker<R, O>(
    reader: R,
    store: &mut Store,
    room: &RoomConfig,
    operator: &mut O,
) -> Result<Infallible>
where
    R: CardReader,
    O: Operator + ?Sized,
{
    let mut reader = ReaderGuard::new(reader);
    let engine = OccupancyEngine::from_config(room);
    info!(room = %engine.room(), capacity = engine.capacity(), "tracking occupancy");
    operator.notify(Notice::TrackingStarted);

    loop {
        if let Err(err) = track_one(&mut *reader, store, &engine, room, operator) {
            if err.is_recoverable() {
                continue;
            }
            error!(error = %err, code = err.error_code(), "tracker stopped");
            return Err(err);
        }
    }
}

fn track_one<R, O>(
    reader: &mut R,
    store: &mut Store,
    engine: &OccupancyEngine,
    room: &RoomConfig,
    operator: &mut O,
) -> Result<()>
where
    R: CardReader + ?Sized,
    O: Operator + ?Sized,
{
    operator.notify(Notice::Occupancy(OccupancyStatus::current(store, room)?));
    operator.notify(Notice::AwaitingScan);
    let scan = reader.read()?;
    operator.notify(Notice::CardScanned(scan.card_id));

    match engine.handle_card(store, scan.card_id)? {
        ScanResult::Known(outcome) => operator.notify(Notice::Scan(outcome)),
        ScanResult::UnknownCard(card_id) => {
            info!(%card_id, "unknown card scanned");
            operator.notify(Notice::UnknownCard(card_id));
            if operator.confirm(Confirmation::RegisterUnknown(card_id))? {
                registration::enroll(store, operator, card_id)?;
            }
        }
    }
    Ok(())
}

/// Run register mode until the operator stops.
///
/// Known cards are shown and may be edited; unknown cards become new members.
///
/// # Errors
///
/// Returns an error on store, reader, or operator failure. The reader has
/// been released by then.
pub fn run_registration<R, O>(reader: R, store: &mut Store, operator: &mut O) -> Result<()>
where
    R: CardReader,
    O: Operator + ?Sized,
{
    let mut reader = ReaderGuard::new(reader);
    info!("registering members");
    operator.notify(Notice::RegistrationStarted);

    loop {
        register_one(&mut *reader, store, operator).map_err(|err: CohortError| {
            error!(error = %err, code = err.error_code(), "registration stopped");
            err
        })?;
        if !operator.confirm(Confirmation::RegisterAnother)? {
            info!("registration finished");
            return Ok(());
        }
    }
}

fn register_one<R, O>(reader: &mut R, store: &mut Store, operator: &mut O) -> Result<()>
where
    R: CardReader + ?Sized,
    O: Operator + ?Sized,
{
    operator.notify(Notice::AwaitingScan);
    let scan = reader.read()?;
    operator.notify(Notice::CardScanned(scan.card_id));

    match registration::lookup(store, scan.card_id)? {
        Some(member) => {
            operator.notify(Notice::AlreadyRegistered(member.clone()));
            if operator.confirm(Confirmation::EditMember)? {
                let name = registration::collect_name(operator)?;
                let updated = registration::edit(store, &member, &name)?;
                operator.notify(Notice::MemberUpdated(updated));
            }
        }
        None => {
            registration::enroll(store, operator, scan.card_id)?;
        }
    }
    Ok(())
}
