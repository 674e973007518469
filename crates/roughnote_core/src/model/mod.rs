//! Entry-centric domain model.
//!
//! # Responsibility
//! - Define the stored entry record and its optional modules.
//! - Define the identity that scopes which slot an entry list lives in.
//!
//! # Invariants
//! - Modules compose on one record; there is no per-kind entry variant.

pub mod entry;
pub mod identity;
pub mod modules;
