//! Static field bindings between model records and table columns.
//!
//! # Invariants
//! - `bind_values` yields exactly one value per `CATEGORY.columns()` entry,
//!   in declaration order.
//! - Partial updates accept only declared columns with matching value kinds.

use crate::model::category::{ChildCategory, ColumnKind};
use crate::model::resume::{
    Activity, Award, Career, Education, Preference, PreferenceJob, PreferenceLocation, Resume,
    ResumeInfo, ResumeValidationError,
};
use rusqlite::types::Value;

/// Partial field set for a keyed update, as received from callers.
pub type FieldPatch = serde_json::Map<String, serde_json::Value>;

/// Record that maps onto the declared columns of one category.
pub trait FieldMapping {
    const CATEGORY: ChildCategory;

    fn bind_values(&self) -> Vec<Value>;
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn opt_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, text)
}

fn opt_integer(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

impl FieldMapping for Resume {
    const CATEGORY: ChildCategory = ChildCategory::Resume;

    fn bind_values(&self) -> Vec<Value> {
        vec![text(&self.title), opt_text(self.content.as_deref())]
    }
}

impl FieldMapping for ResumeInfo {
    const CATEGORY: ChildCategory = ChildCategory::ResumeInfo;

    fn bind_values(&self) -> Vec<Value> {
        vec![
            text(&self.name),
            opt_text(self.birthday.as_deref()),
            opt_text(self.phone_number.as_deref()),
            opt_text(self.email.as_deref()),
            opt_text(self.sido.as_deref()),
            opt_text(self.sigungu.as_deref()),
            opt_integer(self.disability_level),
            opt_text(self.disability_type.as_deref()),
            opt_text(self.sex.as_deref()),
        ]
    }
}

impl FieldMapping for Education {
    const CATEGORY: ChildCategory = ChildCategory::Education;

    fn bind_values(&self) -> Vec<Value> {
        vec![text(&self.kind), text(&self.school_name)]
    }
}

impl FieldMapping for Career {
    const CATEGORY: ChildCategory = ChildCategory::Career;

    fn bind_values(&self) -> Vec<Value> {
        vec![text(&self.company), opt_text(self.department.as_deref())]
    }
}

impl FieldMapping for Activity {
    const CATEGORY: ChildCategory = ChildCategory::Activity;

    fn bind_values(&self) -> Vec<Value> {
        vec![
            text(&self.organization),
            opt_text(self.description.as_deref()),
        ]
    }
}

impl FieldMapping for Award {
    const CATEGORY: ChildCategory = ChildCategory::Award;

    fn bind_values(&self) -> Vec<Value> {
        vec![text(&self.institute), opt_text(self.started_at.as_deref())]
    }
}

/// Only the scalar columns; jobs and locations are separate rows.
impl FieldMapping for Preference {
    const CATEGORY: ChildCategory = ChildCategory::Preference;

    fn bind_values(&self) -> Vec<Value> {
        vec![text(&self.employ_type), opt_integer(self.salary)]
    }
}

impl FieldMapping for PreferenceJob {
    const CATEGORY: ChildCategory = ChildCategory::PreferenceJob;

    fn bind_values(&self) -> Vec<Value> {
        vec![text(&self.name)]
    }
}

impl FieldMapping for PreferenceLocation {
    const CATEGORY: ChildCategory = ChildCategory::PreferenceLocation;

    fn bind_values(&self) -> Vec<Value> {
        vec![text(&self.sido), opt_text(self.sigungu.as_deref())]
    }
}

/// Converts a caller patch into `(column, value)` pairs in declaration order.
///
/// # Errors
/// - Unknown keys, non-scalar values, kind mismatches, null or blank values
///   for required columns, and negative integers.
pub fn patch_columns(
    category: ChildCategory,
    patch: &FieldPatch,
) -> Result<Vec<(&'static str, Value)>, ResumeValidationError> {
    let entity = category.as_str();

    if let Some(unknown) = patch.keys().find(|key| category.column(key).is_none()) {
        return Err(ResumeValidationError::UnknownField {
            entity,
            field: unknown.clone(),
        });
    }

    let mut columns = Vec::with_capacity(patch.len());
    for spec in category.columns() {
        let Some(raw) = patch.get(spec.name) else {
            continue;
        };
        let type_error = || ResumeValidationError::FieldType {
            entity,
            field: spec.name,
            expected: spec.kind.as_str(),
        };

        let value = match (spec.kind, raw) {
            (_, serde_json::Value::Null) if spec.required => {
                return Err(ResumeValidationError::EmptyField {
                    entity,
                    field: spec.name,
                    index: None,
                });
            }
            (_, serde_json::Value::Null) => Value::Null,
            (ColumnKind::Text, serde_json::Value::String(value)) => {
                if spec.required && value.trim().is_empty() {
                    return Err(ResumeValidationError::EmptyField {
                        entity,
                        field: spec.name,
                        index: None,
                    });
                }
                Value::Text(value.clone())
            }
            (ColumnKind::Integer, serde_json::Value::Number(number)) => {
                let value = number.as_i64().ok_or_else(type_error)?;
                if value < 0 {
                    return Err(ResumeValidationError::NegativeValue {
                        entity,
                        field: spec.name,
                        value,
                    });
                }
                Value::Integer(value)
            }
            _ => return Err(type_error()),
        };
        columns.push((spec.name, value));
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::{patch_columns, FieldMapping, FieldPatch};
    use crate::model::category::ChildCategory;
    use crate::model::resume::{ResumeInfo, ResumeValidationError};
    use rusqlite::types::Value;
    use serde_json::json;

    fn patch(value: serde_json::Value) -> FieldPatch {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn bind_values_match_declared_columns() {
        let info = ResumeInfo {
            name: "Park".to_string(),
            disability_level: Some(3),
            ..ResumeInfo::default()
        };
        let values = info.bind_values();
        assert_eq!(values.len(), ResumeInfo::CATEGORY.columns().len());
        assert_eq!(values[0], Value::Text("Park".to_string()));
        assert_eq!(values[6], Value::Integer(3));
        assert_eq!(values[8], Value::Null);
    }

    #[test]
    fn patch_keeps_declaration_order_and_allows_null_optional() {
        let columns = patch_columns(
            ChildCategory::Award,
            &patch(json!({ "started_at": null, "institute": "IEEE" })),
        )
        .unwrap();
        assert_eq!(
            columns,
            vec![
                ("institute", Value::Text("IEEE".to_string())),
                ("started_at", Value::Null),
            ]
        );
    }

    #[test]
    fn patch_rejects_undeclared_columns() {
        let err = patch_columns(
            ChildCategory::Award,
            &patch(json!({ "resume_id": 3 })),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ResumeValidationError::UnknownField {
                entity: "award",
                field: "resume_id".to_string(),
            }
        );
    }

    #[test]
    fn patch_rejects_kind_mismatch_and_blank_required() {
        let err = patch_columns(
            ChildCategory::Preference,
            &patch(json!({ "salary": "a lot" })),
        )
        .unwrap_err();
        assert!(matches!(err, ResumeValidationError::FieldType { field: "salary", .. }));

        let err = patch_columns(
            ChildCategory::MyVideo,
            &patch(json!({ "url": " " })),
        )
        .unwrap_err();
        assert!(matches!(err, ResumeValidationError::EmptyField { field: "url", .. }));
    }
}
