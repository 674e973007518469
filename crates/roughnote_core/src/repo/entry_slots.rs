//! Identity-scoped entry list slots and the guest-to-account merge.
//!
//! # Responsibility
//! - Read and write the full entry list of one identity.
//! - Move guest entries into an account slot on first sign-in.
//!
//! # Invariants
//! - Reads fail soft: absent or malformed slots load as an empty list.
//! - An empty list is never written over a slot that does not exist yet.
//! - On merge, account entries win id collisions and the guest slot is removed.
//! - A merge never overwrites a slot it could not parse.

use crate::model::entry::Entry;
use crate::model::identity::{Identity, ENTRIES_KEY_PREFIX};
use crate::repo::kv_repo::{read_json, write_json, KvResult, KvStore, SlotRead};
use log::{info, warn};
use std::collections::HashSet;

/// Loads the entry list for `identity`.
///
/// Malformed content is logged and treated as empty. Only storage transport
/// failures surface as errors.
pub fn load_entries<S: KvStore + ?Sized>(store: &S, identity: &Identity) -> KvResult<Vec<Entry>> {
    let key = identity.entries_key();
    match read_json::<Vec<Entry>, _>(store, &key)? {
        SlotRead::Present(entries) => Ok(entries),
        SlotRead::Absent => Ok(Vec::new()),
        SlotRead::Malformed(reason) => {
            warn!(
                "event=entries_load module=repo status=malformed identity={} error={}",
                identity.kind(),
                reason
            );
            Ok(Vec::new())
        }
    }
}

/// Writes the full entry list for `identity`.
///
/// Returns `false` when the write was skipped by the empty-over-absent guard.
pub fn save_entries<S: KvStore + ?Sized>(
    store: &S,
    identity: &Identity,
    entries: &[Entry],
) -> KvResult<bool> {
    let key = identity.entries_key();
    if entries.is_empty() && store.get(&key)?.is_none() {
        return Ok(false);
    }
    write_json(store, &key, entries)?;
    Ok(true)
}

/// Merges the guest slot into the account slot of `email`.
///
/// Migrated guest entries are placed ahead of the existing account entries.
/// Returns the number of entries moved. If either slot is malformed, both
/// are left untouched and nothing is migrated.
pub fn migrate_guest_entries<S: KvStore + ?Sized>(store: &S, email: &str) -> KvResult<usize> {
    let guest_key = Identity::Guest.entries_key();
    let account = Identity::account(email);

    let guest_entries = match read_json::<Vec<Entry>, _>(store, &guest_key)? {
        SlotRead::Present(entries) if !entries.is_empty() => entries,
        SlotRead::Present(_) | SlotRead::Absent => return Ok(0),
        SlotRead::Malformed(reason) => {
            warn!("event=guest_migrate module=repo status=skipped reason=malformed_guest_slot error={reason}");
            return Ok(0);
        }
    };

    let account_key = account.entries_key();
    let account_entries = match read_json::<Vec<Entry>, _>(store, &account_key)? {
        SlotRead::Present(entries) => entries,
        SlotRead::Absent => Vec::new(),
        SlotRead::Malformed(reason) => {
            warn!(
                "event=guest_migrate module=repo status=skipped reason=malformed_account_slot error={}",
                reason
            );
            return Ok(0);
        }
    };
    let account_ids: HashSet<&str> = account_entries.iter().map(|e| e.id.as_str()).collect();

    let mut merged: Vec<Entry> = guest_entries
        .into_iter()
        .filter(|entry| !account_ids.contains(entry.id.as_str()))
        .collect();
    let moved = merged.len();
    merged.extend(account_entries.iter().cloned());

    write_json(store, &account_key, &merged)?;
    store.remove(&guest_key)?;

    info!("event=guest_migrate module=repo status=ok moved={moved}");
    Ok(moved)
}

/// Moves an entry slot keyed by a pre-normalization email onto the
/// normalized account key of `email`.
///
/// Returns `true` when the slot was moved. An existing account slot is never
/// replaced; in that case the legacy slot stays where it is.
pub fn adopt_legacy_account_slot<S: KvStore + ?Sized>(
    store: &S,
    legacy_email: &str,
    email: &str,
) -> KvResult<bool> {
    let legacy_key = format!("{ENTRIES_KEY_PREFIX}{legacy_email}");
    let account_key = Identity::account(email).entries_key();
    if legacy_key == account_key || store.get(&account_key)?.is_some() {
        return Ok(false);
    }
    let Some(raw) = store.get(&legacy_key)? else {
        return Ok(false);
    };

    store.set(&account_key, &raw)?;
    store.remove(&legacy_key)?;
    info!("event=legacy_slot_adopt module=repo status=ok bytes={}", raw.len());
    Ok(true)
}
