//! Entry store: the authoritative entry list of the active identity.
//!
//! # Responsibility
//! - Hold the in-memory list and mirror it to the identity's slot.
//! - Provide add/update/delete and the per-module mutators.
//!
//! # Invariants
//! - The list is newest-first by insertion.
//! - Every effective mutation re-serializes the full list.
//! - A stale id or an absent module makes a mutator a silent no-op.
//! - Counter history holds at most [`CounterModule::HISTORY_LIMIT`] records,
//!   newest first.

use crate::clock::Clock;
use crate::model::entry::{Entry, EntryValidationError, NewEntry};
use crate::model::identity::Identity;
use crate::model::modules::{CounterHistory, CounterModule, StopwatchModule};
use crate::repo::entry_slots::{load_entries, save_entries};
use crate::repo::kv_repo::{KvError, KvStore};
use chrono::Utc;
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Validation(EntryValidationError),
    Kv(KvError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Kv(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Kv(err) => Some(err),
        }
    }
}

impl From<EntryValidationError> for StoreError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<KvError> for StoreError {
    fn from(value: KvError) -> Self {
        Self::Kv(value)
    }
}

/// One counter step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterStep {
    Increment,
    Decrement,
}

impl CounterStep {
    fn delta(self) -> i64 {
        match self {
            Self::Increment => 1,
            Self::Decrement => -1,
        }
    }
}

/// Modules whose `last_notified` stamp is written by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifiedModule {
    Reminder,
    Routine,
}

/// Entry list of one identity, mirrored to durable storage.
pub struct EntryStore<S: KvStore, C: Clock> {
    kv: S,
    clock: C,
    identity: Identity,
    entries: Vec<Entry>,
}

impl<S: KvStore, C: Clock> EntryStore<S, C> {
    /// Opens the store for `identity`, loading its slot.
    pub fn open(kv: S, clock: C, identity: Identity) -> StoreResult<Self> {
        let entries = load_entries(&kv, &identity)?;
        info!(
            "event=store_open module=store status=ok identity={} count={}",
            identity.kind(),
            entries.len()
        );
        Ok(Self {
            kv,
            clock,
            identity,
            entries,
        })
    }

    /// Discards in-memory state and reloads from the slot of `identity`.
    pub fn load(&mut self, identity: Identity) -> StoreResult<&[Entry]> {
        self.entries = load_entries(&self.kv, &identity)?;
        info!(
            "event=store_load module=store status=ok identity={} count={}",
            identity.kind(),
            self.entries.len()
        );
        self.identity = identity;
        Ok(&self.entries)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Creates an entry from an editor payload and prepends it.
    ///
    /// A blank topic on an entry with modules becomes `Entry from <date>`.
    pub fn add(&mut self, data: NewEntry) -> StoreResult<Entry> {
        let now = self.clock.now();
        let mut entry = Entry::from_new(
            Uuid::new_v4().to_string(),
            now.with_timezone(&Utc),
            data,
        );
        entry.topic = entry.topic.trim().to_string();
        if entry.topic.is_empty() && !entry.modules.is_empty() {
            entry.topic = format!("Entry from {}", now.format("%-m/%-d/%Y"));
        }
        entry.validate()?;

        self.entries.insert(0, entry.clone());
        self.persist()?;
        debug!(
            "event=entry_add module=store status=ok id={} modules={}",
            entry.id,
            entry.modules.kinds().len()
        );
        Ok(entry)
    }

    /// Replaces the stored entry with the same id. Absent ids are ignored.
    ///
    /// `id` and `created_at` of the stored entry are preserved.
    pub fn update(&mut self, entry: Entry) -> StoreResult<()> {
        entry.validate()?;
        let Some(slot) = self.entries.iter_mut().find(|e| e.id == entry.id) else {
            debug!(
                "event=entry_update module=store status=skipped reason=not_found id={}",
                entry.id
            );
            return Ok(());
        };
        let created_at = slot.created_at;
        *slot = entry;
        slot.created_at = created_at;
        self.persist()
    }

    pub fn delete(&mut self, id: &str) -> StoreResult<()> {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        if self.entries.len() == before {
            return Ok(());
        }
        debug!("event=entry_delete module=store status=ok id={id}");
        self.persist()
    }

    pub fn mutate_counter(&mut self, id: &str, step: CounterStep) -> StoreResult<()> {
        let timestamp = self.clock.now().with_timezone(&Utc);
        self.modify(id, |entry| {
            let Some(counter) = entry.modules.counter.as_mut() else {
                return false;
            };
            counter.count += step.delta();
            counter.history.insert(
                0,
                CounterHistory {
                    value: counter.count,
                    timestamp,
                },
            );
            counter.history.truncate(CounterModule::HISTORY_LIMIT);
            true
        })
    }

    pub fn reset_counter(&mut self, id: &str) -> StoreResult<()> {
        let timestamp = self.clock.now().with_timezone(&Utc);
        self.modify(id, |entry| {
            let Some(counter) = entry.modules.counter.as_mut() else {
                return false;
            };
            counter.count = 0;
            counter.history = vec![CounterHistory {
                value: 0,
                timestamp,
            }];
            true
        })
    }

    pub fn toggle_task(&mut self, id: &str, task_id: &str) -> StoreResult<()> {
        self.modify(id, |entry| {
            let Some(list) = entry.modules.tasks.as_mut() else {
                return false;
            };
            match list.tasks.iter_mut().find(|task| task.id == task_id) {
                Some(task) => {
                    task.completed = !task.completed;
                    true
                }
                None => false,
            }
        })
    }

    /// Flips the stopwatch between running and paused.
    pub fn toggle_stopwatch(&mut self, id: &str) -> StoreResult<()> {
        let now_ms = self.clock.now().timestamp_millis();
        self.modify(id, |entry| {
            let Some(stopwatch) = entry.modules.stopwatch.as_mut() else {
                return false;
            };
            if stopwatch.is_running {
                pause(stopwatch, now_ms);
            } else {
                stopwatch.is_running = true;
                stopwatch.start_time = now_ms;
            }
            true
        })
    }

    /// Pauses a running stopwatch. Already paused stopwatches are untouched.
    pub fn pause_stopwatch(&mut self, id: &str) -> StoreResult<()> {
        let now_ms = self.clock.now().timestamp_millis();
        self.modify(id, |entry| match entry.modules.stopwatch.as_mut() {
            Some(stopwatch) if stopwatch.is_running => {
                pause(stopwatch, now_ms);
                true
            }
            _ => false,
        })
    }

    /// Starts a paused stopwatch. Already running stopwatches are untouched.
    pub fn start_stopwatch(&mut self, id: &str) -> StoreResult<()> {
        let now_ms = self.clock.now().timestamp_millis();
        self.modify(id, |entry| match entry.modules.stopwatch.as_mut() {
            Some(stopwatch) if !stopwatch.is_running => {
                stopwatch.is_running = true;
                stopwatch.start_time = now_ms;
                true
            }
            _ => false,
        })
    }

    pub fn reset_stopwatch(&mut self, id: &str) -> StoreResult<()> {
        self.modify(id, |entry| match entry.modules.stopwatch.as_mut() {
            Some(stopwatch) => {
                *stopwatch = StopwatchModule::default();
                true
            }
            None => false,
        })
    }

    pub fn mark_timer_ringing(&mut self, id: &str) -> StoreResult<()> {
        self.modify(id, |entry| match entry.modules.timer.as_mut() {
            Some(timer) if !timer.is_ringing => {
                timer.is_ringing = true;
                true
            }
            _ => false,
        })
    }

    pub fn mark_notified(&mut self, id: &str, module: NotifiedModule) -> StoreResult<()> {
        let stamp = self.clock.now().with_timezone(&Utc);
        self.modify(id, |entry| {
            let last_notified = match module {
                NotifiedModule::Reminder => entry
                    .modules
                    .reminder
                    .as_mut()
                    .map(|reminder| &mut reminder.last_notified),
                NotifiedModule::Routine => entry
                    .modules
                    .routine
                    .as_mut()
                    .map(|routine| &mut routine.last_notified),
            };
            match last_notified {
                Some(slot) => {
                    *slot = Some(stamp);
                    true
                }
                None => false,
            }
        })
    }

    pub fn mark_birthday_notified(&mut self, id: &str, year: i32) -> StoreResult<()> {
        self.modify(id, |entry| match entry.modules.birthday.as_mut() {
            Some(birthday) => {
                birthday.last_notified_year = Some(year);
                true
            }
            None => false,
        })
    }

    /// Moves a reminder to its next occurrence and clears `last_notified`.
    pub fn reschedule_reminder(&mut self, id: &str, remind_at: String) -> StoreResult<()> {
        self.modify(id, |entry| match entry.modules.reminder.as_mut() {
            Some(reminder) => {
                reminder.remind_at = remind_at;
                reminder.last_notified = None;
                true
            }
            None => false,
        })
    }

    fn modify<F>(&mut self, id: &str, apply: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Entry) -> bool,
    {
        let changed = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .map(apply)
            .unwrap_or(false);
        if changed {
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&self) -> StoreResult<()> {
        let written = save_entries(&self.kv, &self.identity, &self.entries)?;
        if !written {
            debug!(
                "event=entries_save module=store status=skipped reason=empty_over_absent identity={}",
                self.identity.kind()
            );
        }
        Ok(())
    }
}

fn pause(stopwatch: &mut StopwatchModule, now_ms: i64) {
    stopwatch.elapsed_time += (now_ms - stopwatch.start_time).max(0);
    stopwatch.is_running = false;
}
