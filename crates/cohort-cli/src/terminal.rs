//! Terminal rendering of operator notices and prompts.

use std::io::{self, BufRead, Write};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cohort_core::{
    Action, Confirmation, Member, Notice, OccupancyLevel, OccupancyStatus, Operator, Outcome,
    Question, RejectReason,
};
use colored::{ColoredString, Colorize};
use tracing::warn;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// Operator at a terminal: coloured lines out, typed answers in.
pub struct TerminalOperator<W: Write> {
    out: W,
    /// `None` reads from process stdin, shared with a stdin card reader.
    input: Option<Box<dyn BufRead>>,
    timezone: Tz,
}

impl TerminalOperator<io::Stdout> {
    /// Operator on the process's stdin and stdout.
    #[must_use]
    pub fn stdio(timezone: Tz) -> Self {
        Self {
            out: io::stdout(),
            input: None,
            timezone,
        }
    }
}

impl<W: Write> TerminalOperator<W> {
    /// Operator on arbitrary streams.
    pub fn new(input: impl BufRead + 'static, out: W, timezone: Tz) -> Self {
        Self {
            out,
            input: Some(Box::new(input)),
            timezone,
        }
    }

    /// Give back the output stream.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn say(&mut self, text: &ColoredString) {
        if let Err(err) = writeln!(self.out, "{text}") {
            warn!(error = %err, "failed to write to terminal");
        }
    }

    fn prompt(&mut self, text: &ColoredString) -> io::Result<String> {
        write!(self.out, "{text} ")?;
        self.out.flush()?;

        let mut line = String::new();
        let read = match self.input.as_mut() {
            Some(input) => input.read_line(&mut line)?,
            None => io::stdin().read_line(&mut line)?,
        };
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "operator input closed",
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl<W: Write> Operator for TerminalOperator<W> {
    fn notify(&mut self, notice: Notice) {
        let text = render_notice(&notice, self.timezone);
        self.say(&text);
    }

    fn ask(&mut self, question: Question) -> io::Result<String> {
        let text = match question {
            Question::FirstName => "❓ What is your first name?",
            Question::LastName => "❓ What is your last name?",
        };
        self.prompt(&text.normal())
    }

    fn confirm(&mut self, confirmation: Confirmation) -> io::Result<bool> {
        let text = format!("{} [y/N]:", confirmation_text(confirmation));
        loop {
            let answer = self.prompt(&text.normal())?;
            match parse_confirmation(&answer) {
                Some(yes) => return Ok(yes),
                None => self.say(&"Error: invalid input".red()),
            }
        }
    }
}

/// Interpret a yes/no answer. Empty means no; anything unrecognised is `None`.
#[must_use]
pub fn parse_confirmation(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "" | "n" | "no" => Some(false),
        _ => None,
    }
}

fn confirmation_text(confirmation: Confirmation) -> String {
    match confirmation {
        Confirmation::NameCorrect => "❓ Is the information above correct?".to_string(),
        Confirmation::EditMember => "❓ Want to edit the above information?".to_string(),
        Confirmation::RegisterAnother => "❓ Do you want to register another member?".to_string(),
        Confirmation::RegisterUnknown(card_id) => {
            format!("❓ Want to register {card_id} as a new member?")
        }
    }
}

/// Render one notice as a coloured line (or block).
#[must_use]
pub fn render_notice(notice: &Notice, timezone: Tz) -> ColoredString {
    match notice {
        Notice::TrackingStarted => "📋 Tracking occupancy".magenta(),
        Notice::RegistrationStarted => "🆕 Registering new members".magenta(),
        Notice::Occupancy(status) => render_occupancy(status),
        Notice::AwaitingScan => "💳 Please scan your card...".blue(),
        Notice::CardScanned(card_id) => format!("💳 Card number {card_id} scanned").green(),
        Notice::Scan(Outcome::Entered(name)) => format!("👋 Hello {name}!").green(),
        Notice::Scan(Outcome::Exited(name)) => format!("👋 Bye {name}!").red(),
        Notice::Scan(Outcome::Rejected(RejectReason::NoSpots)) => {
            "🛑 NO AVAILABLE SPOTS!".red().bold()
        }
        Notice::UnknownCard(card_id) => {
            format!("❗ Card {card_id} not found in database!").red()
        }
        Notice::AlreadyRegistered(member) => format!(
            "💳 Card {} already registered to\n{}",
            member.card_id,
            member_details(member, timezone)
        )
        .red(),
        Notice::CreatingMember => "🆕 Creating a new member".green(),
        Notice::MemberRegistered(member) => format!(
            "✅ Registered {} {} with card {}",
            member.first_name, member.last_name, member.card_id
        )
        .green(),
        Notice::MemberUpdated(member) => format!(
            "✅ Updated card {}\n{}",
            member.card_id,
            member_details(member, timezone)
        )
        .green(),
    }
}

/// Occupancy line, coloured by how full the room is.
#[must_use]
pub fn render_occupancy(status: &OccupancyStatus) -> ColoredString {
    match status.level() {
        OccupancyLevel::Full => "🛑 NO AVAILABLE SPOTS!".red().bold(),
        OccupancyLevel::Busy => format!("🪑 {status}").yellow(),
        OccupancyLevel::Available => format!("🪑 {status}").green(),
    }
}

/// Name and registration time of a member.
#[must_use]
pub fn member_details(member: &Member, timezone: Tz) -> String {
    format!(
        "First Name: {}\nLast Name:  {}\n⌚ Registration time: {}",
        member.first_name,
        member.last_name,
        local_time(member.registration_dt, timezone)
    )
}

/// One history row.
#[must_use]
pub fn render_action(action: &Action, timezone: Tz) -> String {
    format!(
        "#{:<6} {:<5} room {} at {}",
        action.id,
        action.kind,
        action.room,
        local_time(action.time, timezone)
    )
}

/// Format a stored UTC timestamp in the operator's timezone.
#[must_use]
pub fn local_time(time: DateTime<Utc>, timezone: Tz) -> String {
    time.with_timezone(&timezone).format(TIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cohort_core::{ActionKind, CardId, FullName, RoomId};
    use std::io::Cursor;

    fn member() -> Member {
        Member {
            card_id: CardId(1234),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            registration_dt: Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
            room: None,
        }
    }

    fn operator(input: &str) -> TerminalOperator<Vec<u8>> {
        TerminalOperator::new(Cursor::new(input.to_string()), Vec::new(), Tz::UTC)
    }

    fn output(operator: TerminalOperator<Vec<u8>>) -> String {
        String::from_utf8(operator.into_inner()).unwrap()
    }

    #[test]
    fn test_parse_confirmation() {
        assert_eq!(parse_confirmation("y"), Some(true));
        assert_eq!(parse_confirmation(" YES "), Some(true));
        assert_eq!(parse_confirmation("n"), Some(false));
        assert_eq!(parse_confirmation(""), Some(false));
        assert_eq!(parse_confirmation("maybe"), None);
    }

    #[test]
    fn test_confirm_reasks_on_invalid_input() {
        let mut op = operator("maybe\ny\n");
        assert!(op.confirm(Confirmation::RegisterAnother).unwrap());

        let out = output(op);
        assert_eq!(out.matches("register another member?").count(), 2);
        assert!(out.contains("Error: invalid input"));
    }

    #[test]
    fn test_confirm_defaults_to_no() {
        let mut op = operator("\n");
        assert!(!op.confirm(Confirmation::RegisterUnknown(CardId(77))).unwrap());
        assert!(output(op).contains("register 77 as a new member?"));
    }

    #[test]
    fn test_ask_returns_raw_answer() {
        let mut op = operator("  Ada \r\n");
        assert_eq!(op.ask(Question::FirstName).unwrap(), "  Ada ");
    }

    #[test]
    fn test_closed_input_is_eof() {
        let mut op = operator("");
        let err = op.ask(Question::LastName).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_scan_greetings() {
        let name = FullName::parse("Ada", "Lovelace").unwrap();
        let hello = render_notice(&Notice::Scan(Outcome::Entered(name.clone())), Tz::UTC);
        let bye = render_notice(&Notice::Scan(Outcome::Exited(name)), Tz::UTC);

        assert!(hello.to_string().contains("👋 Hello Ada Lovelace!"));
        assert!(bye.to_string().contains("👋 Bye Ada Lovelace!"));
    }

    #[test]
    fn test_occupancy_lines() {
        let free = render_occupancy(&OccupancyStatus::new(3, 19, 75));
        assert!(free.to_string().contains("3 occupied, 16 free spots"));

        let full = render_occupancy(&OccupancyStatus::new(19, 19, 75));
        assert!(full.to_string().contains("NO AVAILABLE SPOTS"));
    }

    #[test]
    fn test_registration_time_in_configured_timezone() {
        let details = member_details(&member(), chrono_tz::Europe::Berlin);
        assert!(details.contains("First Name: Ada"));
        assert!(details.contains("2024-01-15 13:00:00 CET"));
    }

    #[test]
    fn test_notify_writes_line() {
        let mut op = operator("");
        op.notify(Notice::AlreadyRegistered(member()));
        let out = output(op);
        assert!(out.contains("Card 1234 already registered to"));
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn test_render_action() {
        let action = Action {
            id: 7,
            member_id: CardId(1234),
            kind: ActionKind::Exit,
            room: RoomId(1),
            time: Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
        };
        let line = render_action(&action, Tz::UTC);
        assert!(line.starts_with("#7"));
        assert!(line.contains("exit"));
        assert!(line.contains("2024-01-15 12:00:00 UTC"));
    }
}
