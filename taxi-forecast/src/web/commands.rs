//! Chat-style commands and their canned replies.

use chrono::DateTime;
use chrono_tz::Tz;

use crate::domain::ReportMode;

pub const BUTTON_NOW: &str = "📊 Next 3 Hours";
pub const BUTTON_TOMORROW: &str = "📅 Tomorrow Schedule";

/// Something a user can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Report(ReportMode),
    Status,
    /// Drop cached upstream payloads.
    Refresh,
    Help,
    Start,
}

impl Command {
    /// Recognise a button label or a slash command. Slash commands may
    /// carry an `@botname` suffix and trailing arguments.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        match text {
            BUTTON_NOW => return Some(Command::Report(ReportMode::Now)),
            BUTTON_TOMORROW => return Some(Command::Report(ReportMode::Tomorrow)),
            _ => {}
        }

        let word = text.strip_prefix('/')?.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word);
        match name.to_ascii_lowercase().as_str() {
            "report" | "now" => Some(Command::Report(ReportMode::Now)),
            "tomorrow" => Some(Command::Report(ReportMode::Tomorrow)),
            "status" => Some(Command::Status),
            "refresh" => Some(Command::Refresh),
            "help" => Some(Command::Help),
            "start" => Some(Command::Start),
            _ => None,
        }
    }
}

pub fn start_text() -> String {
    format!(
        "🚖 Taxi demand forecast, Luxembourg\n\n\
         Arrivals that bring taxi customers:\n  \
         ✈️ Flights (Airport)\n  \
         🚆 Trains (Gare Centrale)\n\n\
         Send \"{BUTTON_NOW}\" or \"{BUTTON_TOMORROW}\" for a forecast."
    )
}

pub fn help_text() -> String {
    format!(
        "🚖 Commands\n\n\
         {BUTTON_NOW} — flights and trains arriving soon\n\
         {BUTTON_TOMORROW} — tomorrow's arrivals by time block\n\n\
         /start — introduction\n\
         /report, /now — same as {BUTTON_NOW}\n\
         /tomorrow — same as {BUTTON_TOMORROW}\n\
         /status — health check\n\
         /refresh — drop cached upstream data"
    )
}

pub fn status_text(now: DateTime<Tz>, cached_entries: u64) -> String {
    format!(
        "✅ Running\n\
         🕐 {}\n\
         📡 Flights: airport arrivals board\n\
         📡 Trains: HAFAS live board, GTFS timetable fallback\n\
         🗄 Cached responses: {cached_entries}",
        now.format("%Y-%m-%d %H:%M:%S %Z")
    )
}

pub fn refresh_text(cleared: u64) -> String {
    format!("🔄 Cache cleared ({cleared} cached responses dropped)")
}
