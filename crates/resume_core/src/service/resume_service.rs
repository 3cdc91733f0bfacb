//! Resume use-case service.
//!
//! # Responsibility
//! - Validate payloads before a connection is checked out.
//! - Run each call on its own pooled connection.
//! - Translate repository errors into the caller-facing taxonomy.
//!
//! # Invariants
//! - A failed create leaves no row of the attempt visible.
//! - `NotFound` covers both a missing root row and a root missing a
//!   mandatory 1:1 child.

use crate::db::{ConnectionPool, PoolError};
use crate::model::category::ChildCategory;
use crate::model::resume::{
    NewResume, ResumeAggregate, ResumeId, ResumeValidationError, RowId, UserId,
};
use crate::plan::fields::FieldPatch;
use crate::repo::resume_repo::{RepoError, ResumeRepository, SqliteResumeRepository};
use crate::repo::user_repo::SqliteUserRepository;
use crate::statement::runner::TxError;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ResumeServiceError>;

/// Caller-facing error for resume use-cases.
#[derive(Debug)]
pub enum ResumeServiceError {
    /// Payload or patch violates the caller contract; nothing was issued.
    Validation(ResumeValidationError),
    /// Aggregate write failed and was rolled back as a whole.
    TransactionFailure(TxError),
    /// No reconstructable aggregate for this id.
    NotFound(ResumeId),
    /// Other persistence failure.
    Repo(RepoError),
    /// Connection checkout or worker failure.
    Pool(PoolError),
}

impl Display for ResumeServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "invalid resume input: {err}"),
            Self::TransactionFailure(err) => write!(f, "resume transaction failed: {err}"),
            Self::NotFound(id) => write!(f, "resume not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Pool(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ResumeServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::TransactionFailure(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Repo(err) => Some(err),
            Self::Pool(err) => Some(err),
        }
    }
}

impl From<RepoError> for ResumeServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::Transaction(err) => Self::TransactionFailure(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ResumeValidationError> for ResumeServiceError {
    fn from(value: ResumeValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<PoolError> for ResumeServiceError {
    fn from(value: PoolError) -> Self {
        Self::Pool(value)
    }
}

/// Async facade over the resume repositories.
///
/// Cheap to clone; clones share one pool.
#[derive(Clone)]
pub struct ResumeService {
    pool: ConnectionPool,
}

impl ResumeService {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Creates the whole aggregate atomically and returns its resume id.
    ///
    /// Also sets the owner's verified flag in the same transaction.
    pub async fn create_aggregate(
        &self,
        owner_id: UserId,
        payload: NewResume,
    ) -> ServiceResult<ResumeId> {
        if let Err(err) = payload.validate() {
            warn!(
                "event=resume_create module=service status=rejected owner_id={} reason={}",
                owner_id, err
            );
            return Err(err.into());
        }

        self.pool
            .run(move |conn| -> ServiceResult<ResumeId> {
                let mut repo = SqliteResumeRepository::try_new(conn)?;
                Ok(repo.create_resume(owner_id, &payload)?)
            })
            .await
    }

    /// Reconstructs one aggregate by resume id.
    pub async fn get_aggregate_by_id(&self, id: ResumeId) -> ServiceResult<ResumeAggregate> {
        self.pool
            .run(move |conn| -> ServiceResult<ResumeAggregate> {
                let repo = SqliteResumeRepository::try_new(conn)?;
                repo.get_resume(id)?
                    .ok_or(ResumeServiceError::NotFound(id))
            })
            .await
    }

    /// Partially updates one row; returns affected rows (0 for unknown ids).
    pub async fn update_child(
        &self,
        category: ChildCategory,
        id: RowId,
        fields: FieldPatch,
    ) -> ServiceResult<usize> {
        self.pool
            .run(move |conn| -> ServiceResult<usize> {
                let repo = SqliteResumeRepository::try_new(conn)?;
                Ok(repo.update_child(category, id, &fields)?)
            })
            .await
    }

    /// Deletes one row; returns affected rows (0 for unknown ids).
    pub async fn delete_child(&self, category: ChildCategory, id: RowId) -> ServiceResult<usize> {
        self.pool
            .run(move |conn| -> ServiceResult<usize> {
                let repo = SqliteResumeRepository::try_new(conn)?;
                Ok(repo.delete_child(category, id)?)
            })
            .await
    }

    /// Deletes a resume and, by cascade, every dependent row.
    pub async fn delete_resume(&self, id: ResumeId) -> ServiceResult<usize> {
        self.delete_child(ChildCategory::Resume, id).await
    }

    /// Registers an owner with an unverified meta row.
    pub async fn register_user(&self, email: impl Into<String>) -> ServiceResult<UserId> {
        let email = email.into();
        self.pool
            .run(move |conn| -> ServiceResult<UserId> {
                Ok(SqliteUserRepository::new(conn).create_user(&email)?)
            })
            .await
    }

    /// Returns the owner registered under `email`, if any.
    pub async fn find_user_by_email(
        &self,
        email: impl Into<String>,
    ) -> ServiceResult<Option<UserId>> {
        let email = email.into();
        self.pool
            .run(move |conn| -> ServiceResult<Option<UserId>> {
                Ok(SqliteUserRepository::new(conn).find_user_by_email(&email)?)
            })
            .await
    }

    /// Returns the owner registered under `email`, registering it first when
    /// unknown.
    pub async fn find_or_register_user(
        &self,
        email: impl Into<String>,
    ) -> ServiceResult<UserId> {
        let email = email.into();
        match self.find_user_by_email(email.as_str()).await? {
            Some(user_id) => Ok(user_id),
            None => self.register_user(email).await,
        }
    }

    /// Returns the owner's verified flag, or `None` for an unknown user.
    pub async fn is_user_verified(&self, user_id: UserId) -> ServiceResult<Option<bool>> {
        self.pool
            .run(move |conn| -> ServiceResult<Option<bool>> {
                Ok(SqliteUserRepository::new(conn).is_verified(user_id)?)
            })
            .await
    }
}
