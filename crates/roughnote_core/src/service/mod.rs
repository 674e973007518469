//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate slot access into entry and account use-cases.
//! - Keep callers decoupled from slot keys and JSON encoding.

pub mod auth_service;
pub mod entry_store;
