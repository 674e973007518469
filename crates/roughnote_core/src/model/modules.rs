//! Optional behavior bundles attachable to an [`Entry`](super::entry::Entry).
//!
//! Every module is owned by exactly one entry and serialized inline under its
//! own field name. Field names follow the persisted camelCase slot format.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// The eleven module kinds an entry may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Tasks,
    Counter,
    Timer,
    Stopwatch,
    Reminder,
    Routine,
    Photo,
    Pdf,
    Birthday,
    Link,
    Expense,
}

impl ModuleKind {
    pub const ALL: [ModuleKind; 11] = [
        Self::Tasks,
        Self::Counter,
        Self::Timer,
        Self::Stopwatch,
        Self::Reminder,
        Self::Routine,
        Self::Photo,
        Self::Pdf,
        Self::Birthday,
        Self::Link,
        Self::Expense,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Counter => "counter",
            Self::Timer => "timer",
            Self::Stopwatch => "stopwatch",
            Self::Reminder => "reminder",
            Self::Routine => "routine",
            Self::Photo => "photo",
            Self::Pdf => "pdf",
            Self::Birthday => "birthday",
            Self::Link => "link",
            Self::Expense => "expense",
        }
    }

    /// Case-insensitive lookup by stable name.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
    }
}

/// Day names as stored in routine `days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl From<Weekday> for DayOfWeek {
    fn from(value: Weekday) -> Self {
        match value {
            Weekday::Sun => Self::Sun,
            Weekday::Mon => Self::Mon,
            Weekday::Tue => Self::Tue,
            Weekday::Wed => Self::Wed,
            Weekday::Thu => Self::Thu,
            Weekday::Fri => Self::Fri,
            Weekday::Sat => Self::Sat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatOption {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskListModule {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterHistory {
    pub value: i64,
    pub timestamp: DateTime<Utc>,
}

/// Counter with a newest-first change log capped at [`CounterModule::HISTORY_LIMIT`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CounterModule {
    pub count: i64,
    #[serde(default)]
    pub history: Vec<CounterHistory>,
}

impl CounterModule {
    pub const HISTORY_LIMIT: usize = 20;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerModule {
    /// Unix epoch milliseconds.
    pub end_time: i64,
    /// Seconds.
    pub duration: u64,
    #[serde(default)]
    pub is_ringing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_interaction: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopwatchModule {
    pub is_running: bool,
    /// Unix epoch milliseconds of the last start; 0 when reset.
    pub start_time: i64,
    /// Accumulated milliseconds across completed runs.
    pub elapsed_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderModule {
    /// RFC 3339 instant, or a zone-less `YYYY-MM-DDTHH:MM[:SS]` local wall time.
    pub remind_at: String,
    #[serde(default)]
    pub repeat: RepeatOption,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_interaction: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_notified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineModule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub days: Vec<DayOfWeek>,
    /// `HH:mm`, local wall time.
    pub start_time: String,
    /// `HH:mm`, local wall time.
    pub end_time: String,
    /// Minutes before `start_time` to alert.
    #[serde(default)]
    pub remind_before: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_interaction: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_notified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    /// Legacy display name; superseded by the entry topic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

impl RoutineModule {
    pub fn parsed_start_time(&self) -> Option<NaiveTime> {
        parse_clock_time(&self.start_time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    pub id: String,
    pub data_url: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhotoModule {
    pub photos: Vec<FileAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PdfModule {
    pub pdfs: Vec<FileAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkModule {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BirthdayModule {
    pub name: String,
    /// `YYYY-MM-DD`.
    pub dob: String,
    /// One of 1, 2 or 7.
    pub notify_days_before: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_notified_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<FileAttachment>,
}

impl BirthdayModule {
    pub const NOTIFY_DAYS_CHOICES: [u32; 3] = [1, 2, 7];

    pub fn parsed_dob(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.dob.trim(), "%Y-%m-%d").ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseItem {
    pub id: String,
    pub amount: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseModule {
    pub items: Vec<ExpenseItem>,
    pub currency: String,
    /// `YYYY-MM-DD`.
    pub date: String,
}

/// Parses an `HH:mm` wall-clock time.
pub fn parse_clock_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

#[cfg(test)]
mod tests {
    use super::{parse_clock_time, DayOfWeek, ModuleKind, RepeatOption, TimerModule};
    use chrono::Weekday;

    #[test]
    fn module_kind_parse_is_case_insensitive() {
        assert_eq!(ModuleKind::parse(" PDF "), Some(ModuleKind::Pdf));
        assert_eq!(ModuleKind::parse("code"), None);
    }

    #[test]
    fn day_of_week_uses_short_names() {
        let json = serde_json::to_string(&DayOfWeek::from(Weekday::Mon)).unwrap();
        assert_eq!(json, "\"Mon\"");
    }

    #[test]
    fn clock_time_rejects_garbage() {
        assert!(parse_clock_time("09:00").is_some());
        assert!(parse_clock_time("9am").is_none());
        assert!(parse_clock_time("25:00").is_none());
    }

    #[test]
    fn timer_defaults_is_ringing_when_missing() {
        let timer: TimerModule =
            serde_json::from_str(r#"{"endTime": 10, "duration": 60}"#).unwrap();
        assert!(!timer.is_ringing);
        assert_eq!(RepeatOption::default(), RepeatOption::None);
    }
}
