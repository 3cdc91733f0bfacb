//! Repository layer over the SQLite store.
//!
//! # Responsibility
//! - Expose use-case oriented persistence for the resume aggregate.
//! - Keep SQL execution details behind repository boundaries.
//!
//! # Invariants
//! - Aggregate writes go through the statement runner as one transaction.
//! - Repository APIs return semantic errors (`Validation`, `Transaction`)
//!   in addition to transport errors.

pub mod resume_repo;
pub mod user_repo;
