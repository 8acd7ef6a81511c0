//! The person standing at the reader.
//!
//! Sessions never print or read text directly. They send typed [`Notice`]s and
//! ask typed [`Question`]s and [`Confirmation`]s through an [`Operator`], which
//! decides how to render them.

use std::io;

use crate::occupancy::{OccupancyStatus, Outcome};
use crate::types::{CardId, Member};

/// Something worth telling the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Tracker mode started.
    TrackingStarted,
    /// Register mode started.
    RegistrationStarted,
    /// Occupancy before the next scan.
    Occupancy(OccupancyStatus),
    /// Waiting for a card.
    AwaitingScan,
    /// A card was read.
    CardScanned(CardId),
    /// A known card was processed.
    Scan(Outcome),
    /// A card that no member holds was read.
    UnknownCard(CardId),
    /// Register mode read a card that is already taken.
    AlreadyRegistered(Member),
    /// A new member is about to be created.
    CreatingMember,
    /// A new member was stored.
    MemberRegistered(Member),
    /// An existing member's details were changed.
    MemberUpdated(Member),
}

/// Free-text questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Question {
    /// Ask for a given name.
    FirstName,
    /// Ask for a family name.
    LastName,
}

/// Yes/no questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Are the names just entered correct?
    NameCorrect,
    /// Edit the member shown above?
    EditMember,
    /// Register another card?
    RegisterAnother,
    /// Register this unknown card as a new member?
    RegisterUnknown(CardId),
}

/// Operator-facing surface.
pub trait Operator {
    /// Show a notice.
    fn notify(&mut self, notice: Notice);

    /// Ask a free-text question and return the raw answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be read.
    fn ask(&mut self, question: Question) -> io::Result<String>;

    /// Ask a yes/no question.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be read.
    fn confirm(&mut self, confirmation: Confirmation) -> io::Result<bool>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted operator for session and registration tests.

    use std::collections::VecDeque;
    use std::io;

    use super::{Confirmation, Notice, Operator, Question};

    /// Answers questions from a script and records every notice.
    #[derive(Debug, Default)]
    pub struct ScriptedOperator {
        pub answers: VecDeque<String>,
        pub confirmations: VecDeque<bool>,
        pub notices: Vec<Notice>,
        pub asked: Vec<Question>,
        pub confirmed: Vec<Confirmation>,
    }

    impl ScriptedOperator {
        pub fn new(answers: &[&str], confirmations: &[bool]) -> Self {
            Self {
                answers: answers.iter().map(ToString::to_string).collect(),
                confirmations: confirmations.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl Operator for ScriptedOperator {
        fn notify(&mut self, notice: Notice) {
            self.notices.push(notice);
        }

        fn ask(&mut self, question: Question) -> io::Result<String> {
            self.asked.push(question);
            self.answers
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
        }

        fn confirm(&mut self, confirmation: Confirmation) -> io::Result<bool> {
            self.confirmed.push(confirmation);
            self.confirmations
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
        }
    }
}
