//! Per-tick notification trigger evaluation.
//!
//! # Responsibility
//! - Decide which timer, reminder, routine and birthday modules fire now.
//! - Post the alert and stamp notification state back through the store.
//!
//! # Invariants
//! - [`NotificationEvaluator::evaluate`] is pure; only `tick` has effects.
//! - Every fire stamps state that blocks the same occurrence from firing again:
//!   `is_ringing` for timers, `last_notified` for reminders and routines,
//!   `last_notified_year` for birthdays.
//! - A tick with notifications gated off evaluates nothing and stamps nothing.

use super::alert::{Alert, AlertSink, NotificationGate};
use super::schedule::{
    is_same_local_day, next_occurrence, parse_remind_at, routine_alert_time, upcoming_birthday,
    REMIND_AT_WRITE_FORMAT,
};
use crate::clock::Clock;
use crate::model::entry::{Entry, EntryId};
use crate::model::modules::{
    BirthdayModule, DayOfWeek, ModuleKind, ReminderModule, RepeatOption, RoutineModule,
    TimerModule,
};
use crate::repo::kv_repo::KvStore;
use crate::service::entry_store::{EntryStore, NotifiedModule, StoreResult};
use chrono::{DateTime, Datelike, FixedOffset};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// What a repeating reminder does after it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderRepeatPolicy {
    /// Fire once ever; `repeat` is stored but never advanced.
    #[default]
    FireOnce,
    /// Advance `remind_at` to the next occurrence and clear `last_notified`.
    Rearm,
}

/// State change recorded for a fired trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEffect {
    MarkTimerRinging,
    MarkNotified(NotifiedModule),
    MarkBirthdayNotified(i32),
    RescheduleReminder(String),
}

/// One module whose alert condition is newly satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub entry_id: EntryId,
    pub module: ModuleKind,
    pub alert: Alert,
    pub effect: TriggerEffect,
}

/// Summary of one applied tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub scanned: usize,
    pub fired: usize,
    pub posted: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationEvaluator {
    policy: ReminderRepeatPolicy,
}

impl NotificationEvaluator {
    pub fn new(policy: ReminderRepeatPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ReminderRepeatPolicy {
        self.policy
    }

    /// Scans `entries` once and returns every trigger satisfied at `now`.
    pub fn evaluate(&self, entries: &[Entry], now: &DateTime<FixedOffset>) -> Vec<Trigger> {
        let mut triggers = Vec::new();
        for entry in entries {
            if let Some(timer) = &entry.modules.timer {
                triggers.extend(timer_trigger(entry, timer, now));
            }
            if let Some(reminder) = &entry.modules.reminder {
                triggers.extend(self.reminder_trigger(entry, reminder, now));
            }
            if let Some(routine) = &entry.modules.routine {
                triggers.extend(routine_trigger(entry, routine, now));
            }
            if let Some(birthday) = &entry.modules.birthday {
                triggers.extend(birthday_trigger(entry, birthday, now));
            }
        }
        triggers
    }

    /// Runs one tick: evaluate, post alerts, stamp state.
    pub fn tick<S, C, A>(
        &self,
        store: &mut EntryStore<S, C>,
        gate: &NotificationGate,
        sink: &mut A,
    ) -> StoreResult<TickReport>
    where
        S: KvStore,
        C: Clock,
        A: AlertSink,
    {
        if !gate.allows() {
            return Ok(TickReport::default());
        }

        let started_at = Instant::now();
        let now = store.clock().now();
        let triggers = self.evaluate(store.entries(), &now);
        let mut report = TickReport {
            scanned: store.entries().len(),
            ..TickReport::default()
        };

        for trigger in triggers {
            if gate.post(sink, &trigger.alert) {
                report.posted += 1;
            }
            report.fired += 1;
            apply_effect(store, &trigger.entry_id, trigger.effect)?;
            info!(
                "event=trigger_fired module=notify status=ok id={} kind={}",
                trigger.entry_id,
                trigger.module.as_str()
            );
        }

        debug!(
            "event=tick module=notify status=ok scanned={} fired={} duration_us={}",
            report.scanned,
            report.fired,
            started_at.elapsed().as_micros()
        );
        Ok(report)
    }

    fn reminder_trigger(
        &self,
        entry: &Entry,
        reminder: &ReminderModule,
        now: &DateTime<FixedOffset>,
    ) -> Option<Trigger> {
        if reminder.last_notified.is_some() {
            return None;
        }
        let Some(remind_at) = parse_remind_at(&reminder.remind_at, now) else {
            debug!(
                "event=reminder_parse module=notify status=skipped id={} value_len={}",
                entry.id,
                reminder.remind_at.len()
            );
            return None;
        };
        let now_local = now.naive_local();
        if now_local < remind_at {
            return None;
        }

        let effect = match (self.policy, reminder.repeat) {
            (ReminderRepeatPolicy::Rearm, repeat) if repeat != RepeatOption::None => {
                match next_occurrence(remind_at, repeat, now_local) {
                    Some(next) => TriggerEffect::RescheduleReminder(
                        next.format(REMIND_AT_WRITE_FORMAT).to_string(),
                    ),
                    None => TriggerEffect::MarkNotified(NotifiedModule::Reminder),
                }
            }
            _ => TriggerEffect::MarkNotified(NotifiedModule::Reminder),
        };

        Some(Trigger {
            entry_id: entry.id.clone(),
            module: ModuleKind::Reminder,
            alert: Alert {
                title: format!("Reminder: {}", entry.topic),
                body: description_or(entry, "This is your reminder."),
                require_interaction: reminder.require_interaction.unwrap_or(false),
            },
            effect,
        })
    }
}

fn timer_trigger(entry: &Entry, timer: &TimerModule, now: &DateTime<FixedOffset>) -> Option<Trigger> {
    if timer.is_ringing || now.timestamp_millis() < timer.end_time {
        return None;
    }
    Some(Trigger {
        entry_id: entry.id.clone(),
        module: ModuleKind::Timer,
        alert: Alert {
            title: format!("Timer Finished: {}", entry.topic),
            body: description_or(entry, "Your timer is done!"),
            require_interaction: timer.require_interaction.unwrap_or(false),
        },
        effect: TriggerEffect::MarkTimerRinging,
    })
}

fn routine_trigger(
    entry: &Entry,
    routine: &RoutineModule,
    now: &DateTime<FixedOffset>,
) -> Option<Trigger> {
    let today = DayOfWeek::from(now.weekday());
    if !routine.days.contains(&today) {
        return None;
    }
    if routine
        .last_notified
        .as_ref()
        .is_some_and(|stamp| is_same_local_day(stamp, now))
    {
        return None;
    }
    let start = routine.parsed_start_time()?;
    if now.naive_local() < routine_alert_time(now.date_naive(), start, routine.remind_before) {
        return None;
    }

    let body = if routine.remind_before > 0 {
        format!(
            "Routine: {} starts in {} minutes at {}.",
            entry.topic, routine.remind_before, routine.start_time
        )
    } else {
        format!(
            "It's time for your routine: {} at {}.",
            entry.topic, routine.start_time
        )
    };

    Some(Trigger {
        entry_id: entry.id.clone(),
        module: ModuleKind::Routine,
        alert: Alert {
            title: "Routine Reminder".to_string(),
            body,
            require_interaction: routine.require_interaction.unwrap_or(false),
        },
        effect: TriggerEffect::MarkNotified(NotifiedModule::Routine),
    })
}

fn birthday_trigger(
    entry: &Entry,
    birthday: &BirthdayModule,
    now: &DateTime<FixedOffset>,
) -> Option<Trigger> {
    let dob = birthday.parsed_dob()?;
    let next = upcoming_birthday(dob, now);
    let window = i64::from(birthday.notify_days_before);
    if next.days_until < 0 || next.days_until > window {
        return None;
    }
    if birthday.last_notified_year == Some(next.year()) {
        return None;
    }

    let name = &birthday.name;
    let body = match next.days_until {
        0 => format!("It's {name}'s birthday! They are turning {} today.", next.age),
        1 => format!("{name} is turning {} in 1 day!", next.age),
        days => format!("{name} is turning {} in {days} days!", next.age),
    };

    Some(Trigger {
        entry_id: entry.id.clone(),
        module: ModuleKind::Birthday,
        alert: Alert {
            title: format!("Birthday Reminder: {name}"),
            body,
            require_interaction: false,
        },
        effect: TriggerEffect::MarkBirthdayNotified(next.year()),
    })
}

fn description_or(entry: &Entry, fallback: &str) -> String {
    entry
        .description
        .as_deref()
        .filter(|text| !text.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn apply_effect<S: KvStore, C: Clock>(
    store: &mut EntryStore<S, C>,
    id: &str,
    effect: TriggerEffect,
) -> StoreResult<()> {
    match effect {
        TriggerEffect::MarkTimerRinging => store.mark_timer_ringing(id),
        TriggerEffect::MarkNotified(module) => store.mark_notified(id, module),
        TriggerEffect::MarkBirthdayNotified(year) => store.mark_birthday_notified(id, year),
        TriggerEffect::RescheduleReminder(remind_at) => store.reschedule_reminder(id, remind_at),
    }
}
