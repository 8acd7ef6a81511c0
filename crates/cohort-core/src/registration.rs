//! Member registration and edits.
//!
//! Names are collected with a small state machine so the confirm-or-retry
//! loop can be driven and tested without a terminal:
//!
//! ```text
//! PromptName --names--> Confirm --yes--> Done
//!     ^                    |
//!     +--------no----------+
//! ```

use chrono::Utc;
use tracing::info;

use crate::error::Result;
use crate::operator::{Confirmation, Notice, Operator, Question};
use crate::storage::Store;
use crate::types::{CardId, FullName, Member};

/// Progress of name entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameEntry {
    /// Waiting for first and last name.
    PromptName,
    /// Waiting for the operator to confirm these names.
    Confirm(FullName),
    /// Names confirmed.
    Done(FullName),
}

/// Input that moves [`NameEntry`] forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameInput {
    /// Raw first and last name as typed.
    Entered {
        /// Given name.
        first: String,
        /// Family name.
        last: String,
    },
    /// Answer to "is this correct?".
    Confirmed(bool),
}

impl NameEntry {
    /// Apply one input.
    ///
    /// Blank names keep the machine in [`NameEntry::PromptName`]. Inputs that
    /// do not fit the current state leave it unchanged.
    #[must_use]
    pub fn advance(self, input: NameInput) -> Self {
        match (self, input) {
            (Self::PromptName, NameInput::Entered { first, last }) => {
                FullName::parse(&first, &last).map_or(Self::PromptName, Self::Confirm)
            }
            (Self::Confirm(name), NameInput::Confirmed(true)) => Self::Done(name),
            (Self::Confirm(_), NameInput::Confirmed(false)) => Self::PromptName,
            (state, _) => state,
        }
    }
}

/// Ask the operator for a name until they confirm it.
///
/// # Errors
///
/// Returns an error if the operator's answers cannot be read.
pub fn collect_name<O: Operator + ?Sized>(operator: &mut O) -> Result<FullName> {
    let mut state = NameEntry::PromptName;
    loop {
        state = match state {
            NameEntry::PromptName => {
                let first = operator.ask(Question::FirstName)?;
                let last = operator.ask(Question::LastName)?;
                NameEntry::PromptName.advance(NameInput::Entered { first, last })
            }
            NameEntry::Confirm(name) => {
                let correct = operator.confirm(Confirmation::NameCorrect)?;
                NameEntry::Confirm(name).advance(NameInput::Confirmed(correct))
            }
            NameEntry::Done(name) => return Ok(name),
        };
    }
}

/// Find the member holding `card_id`.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn lookup(store: &Store, card_id: CardId) -> Result<Option<Member>> {
    Ok(store.find_member(card_id)?)
}

/// Create a member for `card_id`, outside and registered now.
///
/// # Errors
///
/// Returns [`CohortError::DuplicateCard`] if the card is already registered;
/// the existing member is left untouched.
///
/// [`CohortError::DuplicateCard`]: crate::error::CohortError::DuplicateCard
pub fn register_new(store: &mut Store, card_id: CardId, name: &FullName) -> Result<Member> {
    let tx = store.begin()?;
    let member = tx.insert_member(card_id, name, Utc::now())?;
    tx.commit()?;
    info!(%card_id, "member registered");
    Ok(member)
}

/// Replace a member's names and bump their registration time.
///
/// Room and actions are not touched.
///
/// # Errors
///
/// Returns [`CohortError::MemberNotFound`] if the member no longer exists.
///
/// [`CohortError::MemberNotFound`]: crate::error::CohortError::MemberNotFound
pub fn edit(store: &mut Store, member: &Member, name: &FullName) -> Result<Member> {
    let now = Utc::now();
    let tx = store.begin()?;
    tx.update_member_name(member.card_id, name, now)?;
    tx.commit()?;
    info!(card_id = %member.card_id, "member details updated");
    Ok(Member {
        first_name: name.first.clone(),
        last_name: name.last.clone(),
        registration_dt: now,
        ..member.clone()
    })
}

/// Create a member for an unknown card, asking the operator for their name.
///
/// # Errors
///
/// Returns an error if the operator cannot be read or the store fails.
pub fn enroll<O: Operator + ?Sized>(
    store: &mut Store,
    operator: &mut O,
    card_id: CardId,
) -> Result<Member> {
    operator.notify(Notice::CreatingMember);
    let name = collect_name(operator)?;
    let member = register_new(store, card_id, &name)?;
    operator.notify(Notice::MemberRegistered(member.clone()));
    Ok(member)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CohortError;
    use crate::occupancy::OccupancyEngine;
    use crate::operator::testing::ScriptedOperator;
    use crate::types::{ActionKind, RoomId};

    fn ada() -> FullName {
        FullName::parse("Ada", "Lovelace").unwrap()
    }

    #[test]
    fn test_state_machine_happy_path() {
        let state = NameEntry::PromptName.advance(NameInput::Entered {
            first: "Ada".into(),
            last: "Lovelace".into(),
        });
        assert_eq!(state, NameEntry::Confirm(ada()));
        assert_eq!(
            state.advance(NameInput::Confirmed(true)),
            NameEntry::Done(ada())
        );
    }

    #[test]
    fn test_state_machine_decline_and_blank() {
        assert_eq!(
            NameEntry::Confirm(ada()).advance(NameInput::Confirmed(false)),
            NameEntry::PromptName
        );
        assert_eq!(
            NameEntry::PromptName.advance(NameInput::Entered {
                first: "  ".into(),
                last: "Lovelace".into(),
            }),
            NameEntry::PromptName
        );
        assert_eq!(
            NameEntry::PromptName.advance(NameInput::Confirmed(true)),
            NameEntry::PromptName
        );
        assert_eq!(
            NameEntry::Done(ada()).advance(NameInput::Confirmed(false)),
            NameEntry::Done(ada())
        );
    }

    #[test]
    fn test_collect_name_retries_until_confirmed() {
        let mut operator =
            ScriptedOperator::new(&["Ada", "Byron", "", "x", "Ada", "Lovelace"], &[false, true]);
        let name = collect_name(&mut operator).unwrap();
        assert_eq!(name, ada());
        assert_eq!(operator.asked.len(), 6);
        assert_eq!(operator.confirmed.len(), 2);
    }

    #[test]
    fn test_register_then_lookup() {
        let mut store = Store::open_in_memory().unwrap();
        assert!(lookup(&store, CardId(1234)).unwrap().is_none());

        let member = register_new(&mut store, CardId(1234), &ada()).unwrap();
        let found = lookup(&store, CardId(1234)).unwrap().unwrap();
        assert_eq!(found, member);
        assert_eq!(found.room, None);
    }

    #[test]
    fn test_duplicate_registration_keeps_original() {
        let mut store = Store::open_in_memory().unwrap();
        let original = register_new(&mut store, CardId(1234), &ada()).unwrap();

        let err = register_new(
            &mut store,
            CardId(1234),
            &FullName::parse("Grace", "Hopper").unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, CohortError::DuplicateCard(CardId(1234))));
        assert_eq!(lookup(&store, CardId(1234)).unwrap().unwrap(), original);
    }

    #[test]
    fn test_edit_changes_only_names_and_timestamp() {
        let mut store = Store::open_in_memory().unwrap();
        let member = register_new(&mut store, CardId(1), &ada()).unwrap();
        let engine = OccupancyEngine::new(RoomId(1), 19);
        engine.process_scan(&mut store, &member, 0).unwrap();
        let inside = lookup(&store, CardId(1)).unwrap().unwrap();

        let renamed = FullName::parse("Augusta", "King").unwrap();
        let edited = edit(&mut store, &inside, &renamed).unwrap();

        let stored = lookup(&store, CardId(1)).unwrap().unwrap();
        assert_eq!(stored, edited);
        assert_eq!(stored.first_name, "Augusta");
        assert_eq!(stored.last_name, "King");
        assert_eq!(stored.room, Some(RoomId(1)));
        assert!(stored.registration_dt >= inside.registration_dt);

        let actions = store.actions_for_member(CardId(1)).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, ActionKind::Enter);
    }

    #[test]
    fn test_enroll_notifies_and_stores() {
        let mut store = Store::open_in_memory().unwrap();
        let mut operator = ScriptedOperator::new(&["Ada", "Lovelace"], &[true]);

        let member = enroll(&mut store, &mut operator, CardId(55)).unwrap();
        assert_eq!(member.name(), ada());
        assert_eq!(
            operator.notices,
            vec![Notice::CreatingMember, Notice::MemberRegistered(member)]
        );
    }
}
