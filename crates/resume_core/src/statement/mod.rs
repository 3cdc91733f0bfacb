//! Statement primitives and ordered statement plans.
//!
//! # Responsibility
//! - Represent one parameterized write as data: SQL text plus bound params.
//! - Represent identifier propagation as explicit capture steps.
//!
//! # Invariants
//! - Building a statement or plan has no side effect.
//! - A slot parameter resolves only after a capture step filled that slot.
//!
//! # See also
//! - `runner` for transactional execution of a `StatementPlan`.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod runner;

/// Propagation slot holding an id generated earlier in the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdSlot {
    /// Generated `resumes.id`.
    Resume,
    /// Generated `preferences.id`.
    Preference,
}

impl IdSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resume => "resume",
            Self::Preference => "preference",
        }
    }
}

/// Ids captured while a plan runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapturedIds {
    resume: Option<i64>,
    preference: Option<i64>,
}

impl CapturedIds {
    pub fn get(&self, slot: IdSlot) -> Option<i64> {
        match slot {
            IdSlot::Resume => self.resume,
            IdSlot::Preference => self.preference,
        }
    }

    pub fn set(&mut self, slot: IdSlot, id: i64) {
        match slot {
            IdSlot::Resume => self.resume = Some(id),
            IdSlot::Preference => self.preference = Some(id),
        }
    }
}

/// Bound statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Value known when the plan is built.
    Value(Value),
    /// Value read from a propagation slot at execution time.
    Slot(IdSlot),
}

impl From<Value> for Param {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<IdSlot> for Param {
    fn from(slot: IdSlot) -> Self {
        Self::Slot(slot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Produces a store-generated row id.
    Insert,
    /// Update/delete by key; produces an affected-row count.
    Mutate,
}

/// Result of executing one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementOutcome {
    Inserted(i64),
    Affected(usize),
}

/// Failure of a single statement.
#[derive(Debug)]
pub enum StatementError {
    /// A slot parameter had no captured id.
    UnboundSlot(IdSlot),
    Sqlite(rusqlite::Error),
}

impl Display for StatementError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnboundSlot(slot) => write!(f, "id slot `{}` was not captured", slot.as_str()),
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StatementError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnboundSlot(_) => None,
            Self::Sqlite(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for StatementError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// One parameterized write against a single table.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    kind: StatementKind,
    table: &'static str,
    sql: String,
    params: Vec<Param>,
}

impl Statement {
    pub fn insert(table: &'static str, sql: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            kind: StatementKind::Insert,
            table,
            sql: sql.into(),
            params,
        }
    }

    pub fn mutate(table: &'static str, sql: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            kind: StatementKind::Mutate,
            table,
            sql: sql.into(),
            params,
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Target table, used for diagnostics.
    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Whether any parameter reads `slot`.
    pub fn references(&self, slot: IdSlot) -> bool {
        self.params.iter().any(|param| *param == Param::Slot(slot))
    }

    /// Resolves slot parameters against `captured`.
    pub fn bind(&self, captured: &CapturedIds) -> Result<Vec<Value>, StatementError> {
        self.params
            .iter()
            .map(|param| match param {
                Param::Value(value) => Ok(value.clone()),
                Param::Slot(slot) => captured
                    .get(*slot)
                    .map(Value::Integer)
                    .ok_or(StatementError::UnboundSlot(*slot)),
            })
            .collect()
    }

    /// Executes this statement on `conn`.
    ///
    /// Inside a plan this is called by the runner with the transaction's
    /// connection; single-entity mutators call it directly.
    pub fn execute(
        &self,
        conn: &Connection,
        captured: &CapturedIds,
    ) -> Result<StatementOutcome, StatementError> {
        let values = self.bind(captured)?;
        let affected = conn.execute(&self.sql, params_from_iter(values))?;
        Ok(match self.kind {
            StatementKind::Insert => StatementOutcome::Inserted(conn.last_insert_rowid()),
            StatementKind::Mutate => StatementOutcome::Affected(affected),
        })
    }
}

/// Step of a statement plan.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanStep {
    Execute(Statement),
    /// Stores the id generated by the preceding insert into the slot.
    Capture(IdSlot),
}

/// Ordered steps that must commit or roll back together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementPlan {
    steps: Vec<PlanStep>,
}

impl StatementPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: Statement) -> &mut Self {
        self.steps.push(PlanStep::Execute(statement));
        self
    }

    pub fn capture(&mut self, slot: IdSlot) -> &mut Self {
        self.steps.push(PlanStep::Capture(slot));
        self
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.steps.iter().filter_map(|step| match step {
            PlanStep::Execute(statement) => Some(statement),
            PlanStep::Capture(_) => None,
        })
    }

    pub fn statement_count(&self) -> usize {
        self.statements().count()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
