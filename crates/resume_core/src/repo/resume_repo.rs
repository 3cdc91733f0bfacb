//! Resume aggregate repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Create whole aggregates atomically through the statement runner.
//! - Reconstruct aggregates with one composed read.
//! - Apply keyed single-entity updates and deletes.
//!
//! # Invariants
//! - Write paths validate before any statement is issued.
//! - Reads reject persisted JSON that does not match the model instead of
//!   masking it.
//! - Single-entity mutators never re-check aggregate invariants.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::category::ChildCategory;
use crate::model::resume::{
    NewResume, Resume, ResumeAggregate, ResumeId, ResumeValidationError, RowId, UserId,
};
use crate::plan::fields::FieldPatch;
use crate::plan::read::compose_aggregate_sql;
use crate::plan::write::{plan_create, plan_delete, plan_update};
use crate::statement::runner::{run_plan, TxError};
use crate::statement::{CapturedIds, IdSlot, Statement, StatementError, StatementOutcome};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for resume persistence and reconstruction.
#[derive(Debug)]
pub enum RepoError {
    /// Payload or patch rejected before touching the store.
    Validation(ResumeValidationError),
    /// Aggregate write rolled back.
    Transaction(TxError),
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to the read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Transaction(err) => write!(f, "resume transaction rolled back: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "resume repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted resume data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Transaction(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ResumeValidationError> for RepoError {
    fn from(value: ResumeValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<TxError> for RepoError {
    fn from(value: TxError) -> Self {
        Self::Transaction(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<StatementError> for RepoError {
    fn from(value: StatementError) -> Self {
        match value {
            StatementError::Sqlite(err) => Self::from(err),
            StatementError::UnboundSlot(slot) => Self::InvalidData(format!(
                "single-entity statement references id slot `{}`",
                slot.as_str()
            )),
        }
    }
}

/// Repository interface for the resume aggregate.
pub trait ResumeRepository {
    /// Creates the whole aggregate in one transaction; returns the resume id.
    fn create_resume(&mut self, owner_id: UserId, payload: &NewResume) -> RepoResult<ResumeId>;
    /// Reconstructs one aggregate; `None` when the root or a mandatory 1:1
    /// child is missing.
    fn get_resume(&self, id: ResumeId) -> RepoResult<Option<ResumeAggregate>>;
    /// Applies a partial update to one row; returns affected rows.
    fn update_child(
        &self,
        category: ChildCategory,
        id: RowId,
        patch: &FieldPatch,
    ) -> RepoResult<usize>;
    /// Deletes one row by key; returns affected rows.
    fn delete_child(&self, category: ChildCategory, id: RowId) -> RepoResult<usize>;
}

/// SQLite-backed resume repository.
pub struct SqliteResumeRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteResumeRepository<'conn> {
    /// Wraps a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    fn execute_single(&self, statement: &Statement) -> RepoResult<usize> {
        match statement.execute(self.conn, &CapturedIds::default())? {
            StatementOutcome::Affected(rows) => Ok(rows),
            StatementOutcome::Inserted(_) => Ok(1),
        }
    }
}

impl ResumeRepository for SqliteResumeRepository<'_> {
    fn create_resume(&mut self, owner_id: UserId, payload: &NewResume) -> RepoResult<ResumeId> {
        let plan = plan_create(owner_id, payload)?;
        let outcome = run_plan(self.conn, &plan)?;
        let resume_id = outcome.captured.get(IdSlot::Resume).ok_or_else(|| {
            RepoError::InvalidData("committed plan captured no resume id".to_string())
        })?;

        info!(
            "event=resume_create module=repo status=ok resume_id={} owner_id={} statements={}",
            resume_id, owner_id, outcome.statements
        );
        Ok(resume_id)
    }

    fn get_resume(&self, id: ResumeId) -> RepoResult<Option<ResumeAggregate>> {
        let raw = self
            .conn
            .query_row(&compose_aggregate_sql(), [id], |row| {
                Ok(RawAggregateRow {
                    id: row.get("id")?,
                    user_id: row.get("user_id")?,
                    title: row.get("title")?,
                    content: row.get("content")?,
                    resume_info: row.get("resume_info")?,
                    educations: row.get("educations")?,
                    careers: row.get("careers")?,
                    activities: row.get("activities")?,
                    awards: row.get("awards")?,
                    my_video: row.get("my_video")?,
                    helper_video: row.get("helper_video")?,
                    preference: row.get("preference")?,
                })
            })
            .optional()?;

        match raw {
            Some(raw) => Ok(Some(raw.into_aggregate()?)),
            None => {
                debug!(
                    "event=resume_get module=repo status=not_found resume_id={}",
                    id
                );
                Ok(None)
            }
        }
    }

    fn update_child(
        &self,
        category: ChildCategory,
        id: RowId,
        patch: &FieldPatch,
    ) -> RepoResult<usize> {
        let statement = plan_update(category, id, patch)?;
        let affected = self.execute_single(&statement)?;
        debug!(
            "event=child_update module=repo status=ok category={} id={} fields={} affected={}",
            category,
            id,
            patch.len(),
            affected
        );
        Ok(affected)
    }

    fn delete_child(&self, category: ChildCategory, id: RowId) -> RepoResult<usize> {
        let affected = self.execute_single(&plan_delete(category, id))?;
        debug!(
            "event=child_delete module=repo status=ok category={} id={} affected={}",
            category, id, affected
        );
        Ok(affected)
    }
}

/// Composed row before JSON decoding.
struct RawAggregateRow {
    id: ResumeId,
    user_id: UserId,
    title: String,
    content: Option<String>,
    resume_info: String,
    educations: String,
    careers: String,
    activities: String,
    awards: String,
    my_video: String,
    helper_video: String,
    preference: String,
}

impl RawAggregateRow {
    fn into_aggregate(self) -> RepoResult<ResumeAggregate> {
        Ok(ResumeAggregate {
            id: self.id,
            user_id: self.user_id,
            resume: Resume {
                title: self.title,
                content: self.content,
            },
            resume_info: decode("resume_info", &self.resume_info)?,
            educations: decode("educations", &self.educations)?,
            careers: decode("careers", &self.careers)?,
            activities: decode("activities", &self.activities)?,
            awards: decode("awards", &self.awards)?,
            my_video: decode("my_video", &self.my_video)?,
            helper_video: decode("helper_video", &self.helper_video)?,
            preference: decode("preference", &self.preference)?,
        })
    }
}

fn decode<T: DeserializeOwned>(column: &str, text: &str) -> RepoResult<T> {
    serde_json::from_str(text)
        .map_err(|err| RepoError::InvalidData(format!("cannot decode `{column}`: {err}")))
}
