//! Core domain logic for roughnote.
//! This crate is the single source of truth for entry, identity and
//! notification invariants.

pub mod clock;
pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod search;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{AppContext, Settings};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::entry::{Entry, EntryId, EntryModules, EntryValidationError, NewEntry};
pub use model::identity::{Identity, User};
pub use model::modules::ModuleKind;
pub use notify::alert::{Alert, AlertError, AlertSink, LogAlertSink, NotificationGate, Permission};
pub use notify::evaluator::{
    NotificationEvaluator, ReminderRepeatPolicy, TickReport, Trigger, TriggerEffect,
};
pub use notify::runner::refresh_and_tick;
pub use repo::kv_repo::{KvError, KvResult, KvStore, SqliteKvStore};
pub use search::query::{search_entries, EntryQuery};
pub use service::auth_service::{AuthResponse, AuthService};
pub use service::entry_store::{CounterStep, EntryStore, NotifiedModule, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
