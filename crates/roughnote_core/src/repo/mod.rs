//! Persistence contracts over durable key-value slots.
//!
//! # Responsibility
//! - Define the slot access trait and its SQLite implementation.
//! - Own slot key layout and the guest merge over those slots.
//!
//! # Invariants
//! - Callers above this layer never see raw JSON.

pub mod entry_slots;
pub mod kv_repo;
