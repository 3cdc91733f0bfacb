//! Resume aggregate: create payload, read model and payload validation.
//!
//! # Responsibility
//! - Define the nested shape written by `create_aggregate`.
//! - Define the reconstructed shape returned by `get_aggregate_by_id`.
//! - Reject malformed payloads before any statement is planned.
//!
//! # Invariants
//! - A payload always carries exactly one resume info, two videos and one
//!   preference; collections may be empty.
//! - `ResumeAggregate::to_payload` yields a value equal to the payload it
//!   was created from.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-generated primary key of a `resumes` row.
pub type ResumeId = i64;
/// Primary key of a `users` row.
pub type UserId = i64;
/// Primary key of any dependent row.
pub type RowId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resume {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// Personal, contact and demographic fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeInfo {
    pub name: String,
    pub birthday: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    /// Province-level region.
    pub sido: Option<String>,
    /// District-level region.
    pub sigungu: Option<String>,
    pub disability_level: Option<i64>,
    pub disability_type: Option<String>,
    pub sex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    /// Serialized as `type` to match the column name.
    #[serde(rename = "type")]
    pub kind: String,
    pub school_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Career {
    pub company: String,
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub organization: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub institute: String,
    #[serde(default)]
    pub started_at: Option<String>,
}

/// Video reference; shared by `my_video` and `helper_video`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceJob {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceLocation {
    pub sido: String,
    #[serde(default)]
    pub sigungu: Option<String>,
}

/// Preference block with its own job/location children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference {
    pub employ_type: String,
    #[serde(default)]
    pub salary: Option<i64>,
    #[serde(default)]
    pub preference_jobs: Vec<PreferenceJob>,
    #[serde(default)]
    pub preference_locations: Vec<PreferenceLocation>,
}

/// Full nested payload accepted by `create_aggregate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewResume {
    pub resume: Resume,
    pub resume_info: ResumeInfo,
    #[serde(default)]
    pub educations: Vec<Education>,
    #[serde(default)]
    pub careers: Vec<Career>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub awards: Vec<Award>,
    pub my_video: Video,
    pub helper_video: Video,
    pub preference: Preference,
}

/// Persisted record: database id plus the payload fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stored<T> {
    pub id: RowId,
    #[serde(flatten)]
    pub record: T,
}

/// Persisted preference with its persisted children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPreference {
    pub id: RowId,
    pub employ_type: String,
    #[serde(default)]
    pub salary: Option<i64>,
    #[serde(default)]
    pub preference_jobs: Vec<Stored<PreferenceJob>>,
    #[serde(default)]
    pub preference_locations: Vec<Stored<PreferenceLocation>>,
}

/// Aggregate reconstructed from storage.
///
/// Collections are in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeAggregate {
    pub id: ResumeId,
    pub user_id: UserId,
    pub resume: Resume,
    pub resume_info: Stored<ResumeInfo>,
    pub educations: Vec<Stored<Education>>,
    pub careers: Vec<Stored<Career>>,
    pub activities: Vec<Stored<Activity>>,
    pub awards: Vec<Stored<Award>>,
    pub my_video: Stored<Video>,
    pub helper_video: Stored<Video>,
    pub preference: StoredPreference,
}

impl ResumeAggregate {
    /// Drops storage ids, yielding the create-payload shape.
    pub fn to_payload(&self) -> NewResume {
        fn records<T: Clone>(items: &[Stored<T>]) -> Vec<T> {
            items.iter().map(|item| item.record.clone()).collect()
        }

        NewResume {
            resume: self.resume.clone(),
            resume_info: self.resume_info.record.clone(),
            educations: records(&self.educations),
            careers: records(&self.careers),
            activities: records(&self.activities),
            awards: records(&self.awards),
            my_video: self.my_video.record.clone(),
            helper_video: self.helper_video.record.clone(),
            preference: Preference {
                employ_type: self.preference.employ_type.clone(),
                salary: self.preference.salary,
                preference_jobs: records(&self.preference.preference_jobs),
                preference_locations: records(&self.preference.preference_locations),
            },
        }
    }
}

/// Caller contract violation detected before planning or mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeValidationError {
    /// A required text field is empty or whitespace-only.
    EmptyField {
        entity: &'static str,
        field: &'static str,
        index: Option<usize>,
    },
    /// A numeric field that must not be negative.
    NegativeValue {
        entity: &'static str,
        field: &'static str,
        value: i64,
    },
    /// Partial update names a column the entity does not declare.
    UnknownField { entity: &'static str, field: String },
    /// Partial update value does not match the column kind.
    FieldType {
        entity: &'static str,
        field: &'static str,
        expected: &'static str,
    },
}

impl Display for ResumeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField {
                entity,
                field,
                index: Some(index),
            } => write!(f, "{entity}[{index}].{field} must not be empty"),
            Self::EmptyField {
                entity,
                field,
                index: None,
            } => write!(f, "{entity}.{field} must not be empty"),
            Self::NegativeValue {
                entity,
                field,
                value,
            } => write!(f, "{entity}.{field} must not be negative, got {value}"),
            Self::UnknownField { entity, field } => {
                write!(f, "{entity} has no writable field `{field}`")
            }
            Self::FieldType {
                entity,
                field,
                expected,
            } => write!(f, "{entity}.{field} expects a {expected} value"),
        }
    }
}

impl Error for ResumeValidationError {}

type ValidationResult = Result<(), ResumeValidationError>;

fn require_text(
    entity: &'static str,
    field: &'static str,
    index: Option<usize>,
    value: &str,
) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ResumeValidationError::EmptyField {
            entity,
            field,
            index,
        });
    }
    Ok(())
}

fn require_non_negative(
    entity: &'static str,
    field: &'static str,
    value: Option<i64>,
) -> ValidationResult {
    match value {
        Some(value) if value < 0 => Err(ResumeValidationError::NegativeValue {
            entity,
            field,
            value,
        }),
        _ => Ok(()),
    }
}

impl NewResume {
    /// Checks every required field of the aggregate.
    ///
    /// Runs before planning, so a rejected payload never reaches the store.
    pub fn validate(&self) -> ValidationResult {
        require_text("resume", "title", None, &self.resume.title)?;

        require_text("resume_info", "name", None, &self.resume_info.name)?;
        require_non_negative(
            "resume_info",
            "disability_level",
            self.resume_info.disability_level,
        )?;

        for (index, education) in self.educations.iter().enumerate() {
            require_text("educations", "type", Some(index), &education.kind)?;
            require_text(
                "educations",
                "school_name",
                Some(index),
                &education.school_name,
            )?;
        }
        for (index, career) in self.careers.iter().enumerate() {
            require_text("careers", "company", Some(index), &career.company)?;
        }
        for (index, activity) in self.activities.iter().enumerate() {
            require_text(
                "activities",
                "organization",
                Some(index),
                &activity.organization,
            )?;
        }
        for (index, award) in self.awards.iter().enumerate() {
            require_text("awards", "institute", Some(index), &award.institute)?;
        }

        require_text("my_video", "url", None, &self.my_video.url)?;
        require_text("helper_video", "url", None, &self.helper_video.url)?;

        let preference = &self.preference;
        require_text("preference", "employ_type", None, &preference.employ_type)?;
        require_non_negative("preference", "salary", preference.salary)?;
        for (index, job) in preference.preference_jobs.iter().enumerate() {
            require_text("preference_jobs", "name", Some(index), &job.name)?;
        }
        for (index, location) in preference.preference_locations.iter().enumerate() {
            require_text("preference_locations", "sido", Some(index), &location.sido)?;
        }

        Ok(())
    }
}
