//! Pure reconciliation primitives: graph snapshots, decided actions, and the
//! planning algorithm that turns current state into an ordered action list.

pub mod action;
pub mod plan;
pub mod snapshot;
