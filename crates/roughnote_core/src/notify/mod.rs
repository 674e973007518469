//! Polling notification evaluation.
//!
//! # Responsibility
//! - Evaluate timer, reminder, routine and birthday triggers once per tick.
//! - Deliver alerts through a permission-gated platform sink.
//!
//! # Invariants
//! - A tick is a synchronous O(n) scan over the active entry list.

pub mod alert;
pub mod evaluator;
pub mod runner;
pub mod schedule;
