//! Async use-case services.
//!
//! # Responsibility
//! - Expose the aggregate create/read and single-entity mutation contracts.
//! - Bridge async callers to blocking repositories through the pool.
//!
//! # Invariants
//! - Services never bypass repository validation or transaction contracts.
//! - No service retries a failed call; callers resubmit from scratch.

pub mod resume_service;
