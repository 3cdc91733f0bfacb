//! Aggregate planning: statement plans for writes, composed SQL for reads.
//!
//! # Responsibility
//! - Turn a nested payload into an ordered, side-effect-free statement plan.
//! - Build keyed update/delete statements for single-entity mutation.
//! - Compose the grouped JSON read that reconstructs one aggregate.
//!
//! # Invariants
//! - Column lists come from static declarations, never from payload keys.
//! - Planning never touches the store, so a failed attempt can be re-planned
//!   and resubmitted safely.

pub mod fields;
pub mod read;
pub mod write;
