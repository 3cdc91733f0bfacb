//! Owner bookkeeping needed by the aggregate write path.
//!
//! # Invariants
//! - Every user row has exactly one `user_metas` row, created with it.
//! - `is_verified` only ever moves from false to true through resume
//!   creation.

use super::resume_repo::{RepoError, RepoResult};
use crate::model::resume::{ResumeValidationError, UserId};
use log::info;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    /// Inserts a user and its unverified meta row in one transaction.
    pub fn create_user(&mut self, email: &str) -> RepoResult<UserId> {
        let email = email.trim();
        if email.is_empty() {
            return Err(RepoError::Validation(ResumeValidationError::EmptyField {
                entity: "user",
                field: "email",
                index: None,
            }));
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("INSERT INTO users (email) VALUES (?1);", [email])?;
        let user_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO user_metas (user_id, is_verified) VALUES (?1, 0);",
            [user_id],
        )?;
        tx.commit()?;

        info!("event=user_create module=repo status=ok user_id={}", user_id);
        Ok(user_id)
    }

    /// Looks up an owner by email; surrounding whitespace is ignored.
    pub fn find_user_by_email(&self, email: &str) -> RepoResult<Option<UserId>> {
        let user_id = self
            .conn
            .query_row(
                "SELECT id FROM users WHERE email = ?1;",
                [email.trim()],
                |row| row.get::<_, UserId>(0),
            )
            .optional()?;
        Ok(user_id)
    }

    /// Returns the verified flag, or `None` for an unknown user.
    pub fn is_verified(&self, user_id: UserId) -> RepoResult<Option<bool>> {
        let flag = self
            .conn
            .query_row(
                "SELECT is_verified FROM user_metas WHERE user_id = ?1;",
                [user_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        flag.map(|value| match value {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(RepoError::InvalidData(format!(
                "invalid is_verified value `{other}` in user_metas.is_verified"
            ))),
        })
        .transpose()
    }
}
