//! Domain model of the resume aggregate.
//!
//! # Responsibility
//! - Define the nested create payload and the reconstructed read model.
//! - Declare each entity table and its writable columns once.
//!
//! # Invariants
//! - The model is storage-agnostic; SQL lives in `plan` and `repo`.

pub mod category;
pub mod resume;
