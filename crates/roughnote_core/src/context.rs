//! Process-lifetime application context.
//!
//! # Responsibility
//! - Read persisted settings and the session identity once at startup.
//! - Hand them down explicitly instead of through globals.
//!
//! # Invariants
//! - A missing or malformed settings slot yields [`Settings::default`].
//! - `tick_interval_ms` is never below [`MIN_TICK_INTERVAL_MS`].

use crate::model::identity::{Identity, User, SESSION_KEY, SETTINGS_KEY};
use crate::notify::evaluator::ReminderRepeatPolicy;
use crate::repo::kv_repo::{read_json, write_json, KvResult, KvStore, SlotRead};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;
pub const MIN_TICK_INTERVAL_MS: u64 = 100;

/// User preferences that affect core behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub notifications_enabled: bool,
    #[serde(default)]
    pub reminder_repeat_policy: ReminderRepeatPolicy,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notifications_enabled: false,
            reminder_repeat_policy: ReminderRepeatPolicy::default(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl Settings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(MIN_TICK_INTERVAL_MS))
    }
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

/// Startup snapshot of settings and identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    pub settings: Settings,
    pub identity: Identity,
}

impl AppContext {
    /// Reads settings and the session slot.
    pub fn load<S: KvStore + ?Sized>(store: &S) -> KvResult<Self> {
        let mut settings = match read_json::<Settings, _>(store, SETTINGS_KEY)? {
            SlotRead::Present(settings) => settings,
            SlotRead::Absent => Settings::default(),
            SlotRead::Malformed(reason) => {
                warn!("event=settings_load module=context status=malformed error={reason}");
                Settings::default()
            }
        };
        settings.tick_interval_ms = settings.tick_interval_ms.max(MIN_TICK_INTERVAL_MS);

        let user = read_json::<User, _>(store, SESSION_KEY)?.into_option();
        let identity = Identity::from_user(user.as_ref());

        debug!(
            "event=context_load module=context status=ok identity={} notifications_enabled={}",
            identity.kind(),
            settings.notifications_enabled
        );
        Ok(Self { settings, identity })
    }

    pub fn save_settings<S: KvStore + ?Sized>(&self, store: &S) -> KvResult<()> {
        write_json(store, SETTINGS_KEY, &self.settings)
    }
}
