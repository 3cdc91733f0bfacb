//! Core persistence engine for the resume aggregate.
//! This crate owns the write/read planning and every storage invariant.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod plan;
pub mod repo;
pub mod service;
pub mod statement;

pub use config::{ConfigError, CoreConfig};
pub use db::{ConnectionPool, PoolError};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::category::{ChildCategory, UnknownCategory};
pub use model::resume::{
    NewResume, ResumeAggregate, ResumeId, ResumeValidationError, RowId, UserId,
};
pub use plan::fields::FieldPatch;
pub use repo::resume_repo::{RepoError, RepoResult, ResumeRepository, SqliteResumeRepository};
pub use service::resume_service::{ResumeService, ResumeServiceError, ServiceResult};
pub use statement::runner::TxError;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
