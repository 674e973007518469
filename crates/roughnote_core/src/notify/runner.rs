//! One polling step against the latest persisted state.
//!
//! Entries are written by other processes, so every step re-reads the
//! session, settings and entry slot before evaluating. The full-list write
//! that stamps a trigger then starts from the current slot contents.

use super::alert::{AlertSink, NotificationGate};
use super::evaluator::{NotificationEvaluator, TickReport};
use crate::clock::Clock;
use crate::context::AppContext;
use crate::repo::kv_repo::KvStore;
use crate::service::entry_store::{EntryStore, StoreResult};
use log::debug;

/// Reloads session identity, settings and entries, then runs one tick.
pub fn refresh_and_tick<S, C, A>(
    store: &mut EntryStore<S, C>,
    sink: &mut A,
) -> StoreResult<TickReport>
where
    S: KvStore,
    C: Clock,
    A: AlertSink,
{
    let context = AppContext::load(store.kv())?;
    store.load(context.identity)?;

    let gate = NotificationGate::new(context.settings.notifications_enabled, &*sink);
    let evaluator = NotificationEvaluator::new(context.settings.reminder_repeat_policy);
    debug!(
        "event=tick_refresh module=notify status=ok identity={} policy={:?} gate_open={}",
        store.identity().kind(),
        evaluator.policy(),
        gate.allows()
    );
    evaluator.tick(store, &gate, sink)
}
