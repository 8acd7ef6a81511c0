//! Subcommand handlers.

use std::io::Write;

use anyhow::Context;
use chrono_tz::Tz;
use cohort_core::{
    run_registration, run_tracker, Action, CardId, CohortError, Member, OccupancyLevel,
    OccupancyStatus, Store,
};
use colored::Colorize;
use serde::Serialize;

use crate::cli::{Cli, Command};
use crate::state::AppState;
use crate::terminal::{self, TerminalOperator};

/// Snapshot of the room for `cohort status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Counts against capacity.
    #[serde(flatten)]
    pub status: OccupancyStatus,
    /// Spots still free.
    pub free: u32,
    /// Colour band.
    pub level: OccupancyLevel,
    /// Members currently inside, by last then first name.
    pub inside: Vec<Member>,
}

impl StatusReport {
    /// Read the current state of the configured room.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn collect(state: &AppState) -> cohort_core::Result<Self> {
        let status = OccupancyStatus::current(&state.store, &state.config.room)?;
        Ok(Self {
            status,
            free: status.free(),
            level: status.level(),
            inside: state.store.members_inside()?,
        })
    }
}

/// A member and their actions for `cohort history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryReport {
    /// The card holder.
    pub member: Member,
    /// Enter and exit actions, oldest first.
    pub actions: Vec<Action>,
}

impl HistoryReport {
    /// Look up `card_id`. `None` if no member holds it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn collect(store: &Store, card_id: CardId) -> cohort_core::Result<Option<Self>> {
        let Some(member) = store.find_member(card_id)? else {
            return Ok(None);
        };
        let actions = store.actions_for_member(card_id)?;
        Ok(Some(Self { member, actions }))
    }
}

/// Run the parsed command to completion.
///
/// # Errors
///
/// Returns the failure that ended the command. Domain failures are wrapped
/// [`CohortError`]s so the caller can pick an exit code.
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut state = AppState::new(cli)?;
    let mut out = std::io::stdout();

    match &cli.command {
        Command::Register => register(&mut state),
        Command::Tracker => tracker(&mut state),
        Command::Status { json } => status(&state, *json, &mut out),
        Command::History { card_id, json } => history(&state, *card_id, *json, &mut out),
    }
}

fn announce_store(state: &AppState) {
    if let Some(path) = state.store.path() {
        println!("{}", format!("📂 Opening db {}...", path.display()).cyan());
    }
}

fn register(state: &mut AppState) -> anyhow::Result<()> {
    announce_store(state);
    let reader = state.open_reader()?;
    let mut operator = TerminalOperator::stdio(state.config.timezone);

    run_registration(reader, &mut state.store, &mut operator).context("registration stopped")
}

fn tracker(state: &mut AppState) -> anyhow::Result<()> {
    announce_store(state);
    let reader = state.open_reader()?;
    let mut operator = TerminalOperator::stdio(state.config.timezone);

    let err = match run_tracker(reader, &mut state.store, &state.config.room, &mut operator) {
        Ok(never) => match never {},
        Err(err) => err,
    };
    Err(anyhow::Error::new(err).context("tracker stopped"))
}

/// Print the current occupancy.
///
/// # Errors
///
/// Returns an error if the store cannot be read or `out` cannot be written.
pub fn status(state: &AppState, json: bool, out: &mut impl Write) -> anyhow::Result<()> {
    let report = StatusReport::collect(state)?;

    if json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "{}", terminal::render_occupancy(&report.status))?;
    for member in &report.inside {
        writeln!(
            out,
            "  {} {} ({})",
            member.first_name, member.last_name, member.card_id
        )?;
    }
    Ok(())
}

/// Print a member and their history.
///
/// # Errors
///
/// Returns an error if the card is not registered, the store cannot be read,
/// or `out` cannot be written.
pub fn history(
    state: &AppState,
    card_id: CardId,
    json: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let Some(report) = HistoryReport::collect(&state.store, card_id)? else {
        anyhow::bail!("card {card_id} is not registered");
    };

    if json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    let timezone: Tz = state.config.timezone;
    let location = if report.member.is_inside() { "inside" } else { "outside" };
    writeln!(out, "💳 Card {card_id}, currently {location}")?;
    writeln!(out, "{}", terminal::member_details(&report.member, timezone))?;
    if report.actions.is_empty() {
        writeln!(out, "No recorded actions")?;
    }
    for action in &report.actions {
        writeln!(out, "{}", terminal::render_action(action, timezone))?;
    }
    Ok(())
}

/// Process exit code for a failed command.
///
/// Domain failures use their own code, anything else is a generic failure.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<CohortError>()
        .map_or(1, CohortError::exit_code)
}
