//! Entry domain model.
//!
//! # Responsibility
//! - Define the unit of storage: one note-like record plus optional modules.
//! - Validate the shape invariants enforced on every store write.
//!
//! # Invariants
//! - `id` and `created_at` are assigned once by the store and never change.
//! - An entry without any module has a non-blank `topic`.
//! - A present module is internally well-formed (see [`Entry::validate`]).

use super::modules::{
    BirthdayModule, CounterModule, ExpenseModule, LinkModule, ModuleKind, PdfModule, PhotoModule,
    ReminderModule, RoutineModule, StopwatchModule, TaskListModule, TimerModule,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque entry identifier. UUID v4 text for entries created by this crate.
pub type EntryId = String;

/// Editor payload for a new entry: everything except identity and creation time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub show_timestamp: bool,
    #[serde(flatten)]
    pub modules: EntryModules,
}

impl NewEntry {
    pub fn note(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }
}

/// Record of optional modules. Modules coexist; none excludes another.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntryModules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<TaskListModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter: Option<CounterModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopwatch: Option<StopwatchModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<ReminderModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routine: Option<RoutineModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<PhotoModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf: Option<PdfModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<BirthdayModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense: Option<ExpenseModule>,
}

impl EntryModules {
    /// Returns whether the module of `kind` is attached.
    pub fn has(&self, kind: ModuleKind) -> bool {
        match kind {
            ModuleKind::Tasks => self.tasks.is_some(),
            ModuleKind::Counter => self.counter.is_some(),
            ModuleKind::Timer => self.timer.is_some(),
            ModuleKind::Stopwatch => self.stopwatch.is_some(),
            ModuleKind::Reminder => self.reminder.is_some(),
            ModuleKind::Routine => self.routine.is_some(),
            ModuleKind::Photo => self.photo.is_some(),
            ModuleKind::Pdf => self.pdf.is_some(),
            ModuleKind::Birthday => self.birthday.is_some(),
            ModuleKind::Link => self.link.is_some(),
            ModuleKind::Expense => self.expense.is_some(),
        }
    }

    /// Attached module kinds in declaration order.
    pub fn kinds(&self) -> Vec<ModuleKind> {
        ModuleKind::ALL
            .into_iter()
            .filter(|kind| self.has(*kind))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        ModuleKind::ALL.into_iter().all(|kind| !self.has(kind))
    }
}

/// Canonical stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    pub created_at: DateTime<Utc>,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub show_timestamp: bool,
    #[serde(flatten)]
    pub modules: EntryModules,
    /// Fields this crate does not model (for example the legacy `code`
    /// module). Carried through unchanged so rewrites never drop them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entry {
    /// Materializes an editor payload with the given identity.
    pub fn from_new(id: EntryId, created_at: DateTime<Utc>, data: NewEntry) -> Self {
        Self {
            id,
            created_at,
            topic: data.topic,
            description: data.description,
            show_timestamp: data.show_timestamp,
            modules: data.modules,
            extra: Map::new(),
        }
    }

    /// Checks shape invariants required before persistence.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        if self.topic.trim().is_empty() && self.modules.is_empty() {
            return Err(EntryValidationError::BlankTopic);
        }

        if let Some(routine) = &self.modules.routine {
            if routine.days.is_empty() {
                return Err(EntryValidationError::RoutineWithoutDays);
            }
            if routine.parsed_start_time().is_none() {
                return Err(EntryValidationError::InvalidClockTime(
                    routine.start_time.clone(),
                ));
            }
            if super::modules::parse_clock_time(&routine.end_time).is_none() {
                return Err(EntryValidationError::InvalidClockTime(
                    routine.end_time.clone(),
                ));
            }
        }

        if let Some(birthday) = &self.modules.birthday {
            if birthday.parsed_dob().is_none() {
                return Err(EntryValidationError::InvalidBirthDate(birthday.dob.clone()));
            }
            if !BirthdayModule::NOTIFY_DAYS_CHOICES.contains(&birthday.notify_days_before) {
                return Err(EntryValidationError::InvalidNotifyDaysBefore(
                    birthday.notify_days_before,
                ));
            }
        }

        Ok(())
    }
}

/// Shape violations rejected on add/update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValidationError {
    BlankTopic,
    RoutineWithoutDays,
    InvalidClockTime(String),
    InvalidBirthDate(String),
    InvalidNotifyDaysBefore(u32),
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTopic => write!(f, "entry without modules needs a topic"),
            Self::RoutineWithoutDays => write!(f, "routine must repeat on at least one day"),
            Self::InvalidClockTime(value) => write!(f, "invalid HH:mm time `{value}`"),
            Self::InvalidBirthDate(value) => write!(f, "invalid YYYY-MM-DD birth date `{value}`"),
            Self::InvalidNotifyDaysBefore(value) => {
                write!(f, "notify days before must be 1, 2 or 7, got {value}")
            }
        }
    }
}

impl Error for EntryValidationError {}
