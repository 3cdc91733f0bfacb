//! Aggregate write planner.
//!
//! Turns a validated `NewResume` into the ordered statement plan:
//! root insert, capture of the resume id, dependent inserts bound to that
//! slot, preference insert, capture of the preference id, preference child
//! inserts bound to the second slot, and finally the owner's verified flag.

use super::fields::{patch_columns, FieldMapping, FieldPatch};
use crate::model::category::ChildCategory;
use crate::model::resume::{NewResume, ResumeValidationError, RowId, UserId};
use crate::statement::{IdSlot, Param, Statement, StatementPlan};
use rusqlite::types::Value;

/// Plans the atomic creation of one aggregate.
///
/// # Errors
/// Returns the payload's validation error; no plan is produced for an
/// invalid payload.
pub fn plan_create(
    owner_id: UserId,
    payload: &NewResume,
) -> Result<StatementPlan, ResumeValidationError> {
    payload.validate()?;

    let mut plan = StatementPlan::new();
    plan.push(insert_record(
        &payload.resume,
        Param::Value(Value::Integer(owner_id)),
    ))
    .capture(IdSlot::Resume)
    .push(insert_child(&payload.resume_info, IdSlot::Resume));

    for education in &payload.educations {
        plan.push(insert_child(education, IdSlot::Resume));
    }
    for career in &payload.careers {
        plan.push(insert_child(career, IdSlot::Resume));
    }
    for activity in &payload.activities {
        plan.push(insert_child(activity, IdSlot::Resume));
    }
    for award in &payload.awards {
        plan.push(insert_child(award, IdSlot::Resume));
    }

    plan.push(insert_video(
        ChildCategory::MyVideo,
        &payload.my_video.url,
    ))
    .push(insert_video(
        ChildCategory::HelperVideo,
        &payload.helper_video.url,
    ))
    .push(insert_child(&payload.preference, IdSlot::Resume))
    .capture(IdSlot::Preference);

    for job in &payload.preference.preference_jobs {
        plan.push(insert_child(job, IdSlot::Preference));
    }
    for location in &payload.preference.preference_locations {
        plan.push(insert_child(location, IdSlot::Preference));
    }

    plan.push(mark_owner_verified(owner_id));
    Ok(plan)
}

/// Builds the keyed partial update for one row.
///
/// An empty patch still matches the row so the affected count reports
/// whether the key exists.
pub fn plan_update(
    category: ChildCategory,
    id: RowId,
    patch: &FieldPatch,
) -> Result<Statement, ResumeValidationError> {
    let columns = patch_columns(category, patch)?;
    let table = category.table();

    if columns.is_empty() {
        return Ok(Statement::mutate(
            table,
            format!("UPDATE {table} SET id = id WHERE id = ?1;"),
            vec![Param::Value(Value::Integer(id))],
        ));
    }

    let assignments = columns
        .iter()
        .enumerate()
        .map(|(position, (name, _))| format!("{name} = ?{}", position + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let key_position = columns.len() + 1;
    let mut params: Vec<Param> = columns
        .into_iter()
        .map(|(_, value)| Param::Value(value))
        .collect();
    params.push(Param::Value(Value::Integer(id)));

    Ok(Statement::mutate(
        table,
        format!("UPDATE {table} SET {assignments} WHERE id = ?{key_position};"),
        params,
    ))
}

/// Builds the keyed delete for one row. Deleting a resume cascades.
pub fn plan_delete(category: ChildCategory, id: RowId) -> Statement {
    let table = category.table();
    Statement::mutate(
        table,
        format!("DELETE FROM {table} WHERE id = ?1;"),
        vec![Param::Value(Value::Integer(id))],
    )
}

fn insert_sql(category: ChildCategory) -> String {
    let columns = category.columns();
    let names = columns
        .iter()
        .map(|column| column.name)
        .chain(std::iter::once(category.parent_key()))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len() + 1)
        .map(|position| format!("?{position}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({names}) VALUES ({placeholders});",
        category.table()
    )
}

fn insert_record<T: FieldMapping>(record: &T, parent: Param) -> Statement {
    let mut params: Vec<Param> = record
        .bind_values()
        .into_iter()
        .map(Param::Value)
        .collect();
    params.push(parent);
    Statement::insert(T::CATEGORY.table(), insert_sql(T::CATEGORY), params)
}

fn insert_child<T: FieldMapping>(record: &T, slot: IdSlot) -> Statement {
    insert_record(record, Param::Slot(slot))
}

// `Video` serves two tables, so it is bound by hand.
fn insert_video(category: ChildCategory, url: &str) -> Statement {
    Statement::insert(
        category.table(),
        insert_sql(category),
        vec![
            Param::Value(Value::Text(url.to_string())),
            Param::Slot(IdSlot::Resume),
        ],
    )
}

// Upsert: an owner without a meta row still ends up verified.
fn mark_owner_verified(owner_id: UserId) -> Statement {
    Statement::mutate(
        "user_metas",
        "INSERT INTO user_metas (user_id, is_verified) VALUES (?1, 1)
         ON CONFLICT(user_id) DO UPDATE SET is_verified = 1;",
        vec![Param::Value(Value::Integer(owner_id))],
    )
}
