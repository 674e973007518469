//! In-memory entry filtering and keyword search.
//!
//! # Responsibility
//! - Expose list narrowing by module kind and free text.
//! - Keep matching rules inside core so every caller agrees on them.

pub mod query;
