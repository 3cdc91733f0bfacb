//! Transactional execution of statement plans.
//!
//! # Invariants
//! - Steps run strictly in plan order inside one `IMMEDIATE` transaction.
//! - Commit happens only after every step succeeded; any failure drops the
//!   transaction, which rolls back every effect of the attempt.
//! - Captured ids live only for the duration of one `run_plan` call.

use super::{CapturedIds, IdSlot, PlanStep, StatementError, StatementOutcome, StatementPlan};
use crate::db::DbError;
use log::{debug, error, info};
use rusqlite::{Connection, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type TxResult<T> = Result<T, TxError>;

/// Failure of a plan; the whole attempt has been rolled back.
#[derive(Debug)]
pub enum TxError {
    /// Opening or committing the transaction failed.
    Db(DbError),
    /// Step `index` failed against `table`.
    Statement {
        index: usize,
        table: &'static str,
        source: rusqlite::Error,
    },
    /// Step `index` read a slot that no capture step had filled.
    UnboundSlot { index: usize, slot: IdSlot },
    /// Capture step `index` had no preceding insert to read from.
    CaptureWithoutInsert { index: usize, slot: IdSlot },
}

impl TxError {
    /// Plan step at which the attempt stopped, if a step failed.
    pub fn step_index(&self) -> Option<usize> {
        match self {
            Self::Db(_) => None,
            Self::Statement { index, .. }
            | Self::UnboundSlot { index, .. }
            | Self::CaptureWithoutInsert { index, .. } => Some(*index),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Db(_) => "tx_db_failed",
            Self::Statement { .. } => "tx_statement_failed",
            Self::UnboundSlot { .. } => "tx_unbound_slot",
            Self::CaptureWithoutInsert { .. } => "tx_capture_without_insert",
        }
    }
}

impl Display for TxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Statement {
                index,
                table,
                source,
            } => write!(f, "step {index} on `{table}` failed: {source}"),
            Self::UnboundSlot { index, slot } => write!(
                f,
                "step {index} reads id slot `{}` before it was captured",
                slot.as_str()
            ),
            Self::CaptureWithoutInsert { index, slot } => write!(
                f,
                "step {index} captures id slot `{}` without a preceding insert",
                slot.as_str()
            ),
        }
    }
}

impl Error for TxError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Statement { source, .. } => Some(source),
            Self::UnboundSlot { .. } | Self::CaptureWithoutInsert { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for TxError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Summary of a committed plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutcome {
    pub captured: CapturedIds,
    pub statements: usize,
    pub affected_rows: usize,
}

/// Runs `plan` as one atomic unit on `conn`.
///
/// # Errors
/// Returns the first failing step; nothing from the attempt is visible
/// afterwards.
pub fn run_plan(conn: &mut Connection, plan: &StatementPlan) -> TxResult<TxOutcome> {
    let started_at = Instant::now();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut outcome = TxOutcome {
        captured: CapturedIds::default(),
        statements: 0,
        affected_rows: 0,
    };
    let mut last_insert_id: Option<i64> = None;

    for (index, step) in plan.steps().iter().enumerate() {
        let result = match step {
            PlanStep::Execute(statement) => match statement.execute(&tx, &outcome.captured) {
                Ok(StatementOutcome::Inserted(id)) => {
                    last_insert_id = Some(id);
                    outcome.affected_rows += 1;
                    Ok(())
                }
                Ok(StatementOutcome::Affected(rows)) => {
                    outcome.affected_rows += rows;
                    Ok(())
                }
                Err(StatementError::UnboundSlot(slot)) => Err(TxError::UnboundSlot { index, slot }),
                Err(StatementError::Sqlite(source)) => Err(TxError::Statement {
                    index,
                    table: statement.table(),
                    source,
                }),
            },
            PlanStep::Capture(slot) => match last_insert_id {
                Some(id) => {
                    outcome.captured.set(*slot, id);
                    debug!(
                        "event=tx_capture module=tx status=ok step={} slot={}",
                        index,
                        slot.as_str()
                    );
                    Ok(())
                }
                None => Err(TxError::CaptureWithoutInsert { index, slot: *slot }),
            },
        };

        if let Err(err) = result {
            // Dropping `tx` rolls the attempt back.
            drop(tx);
            error!(
                "event=tx_rollback module=tx status=error step={} steps={} duration_ms={} error_code={} error={}",
                index,
                plan.steps().len(),
                started_at.elapsed().as_millis(),
                err.error_code(),
                err
            );
            return Err(err);
        }

        if matches!(step, PlanStep::Execute(_)) {
            outcome.statements += 1;
        }
    }

    if let Err(err) = tx.commit() {
        let err = TxError::from(err);
        error!(
            "event=tx_commit module=tx status=error steps={} duration_ms={} error_code={} error={}",
            plan.steps().len(),
            started_at.elapsed().as_millis(),
            err.error_code(),
            err
        );
        return Err(err);
    }

    info!(
        "event=tx_commit module=tx status=ok steps={} statements={} affected_rows={} duration_ms={}",
        plan.steps().len(),
        outcome.statements,
        outcome.affected_rows,
        started_at.elapsed().as_millis()
    );
    Ok(outcome)
}
