//! Batched, bounded-concurrency execution of reconciliation plans with retry,
//! pacing, and cooperative cancellation.

pub mod controller;
pub mod outcome;
pub mod retry;
