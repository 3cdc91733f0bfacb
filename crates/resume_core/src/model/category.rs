//! Entity categories of the resume aggregate and their column tables.
//!
//! # Responsibility
//! - Name every table of the aggregate exactly once.
//! - Declare the writable columns of each table statically.
//!
//! # Invariants
//! - SQL is only ever built from these declarations, never from caller keys.
//! - Column order here is the bind order used by the write planner.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Storage type of one declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
}

impl ColumnKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
        }
    }
}

/// One writable column of an entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Required columns reject null and blank text.
    pub required: bool,
}

const fn text(name: &'static str, required: bool) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnKind::Text,
        required,
    }
}

const fn integer(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnKind::Integer,
        required: false,
    }
}

const RESUME_COLUMNS: &[ColumnSpec] = &[text("title", true), text("content", false)];
const RESUME_INFO_COLUMNS: &[ColumnSpec] = &[
    text("name", true),
    text("birthday", false),
    text("phone_number", false),
    text("email", false),
    text("sido", false),
    text("sigungu", false),
    integer("disability_level"),
    text("disability_type", false),
    text("sex", false),
];
const EDUCATION_COLUMNS: &[ColumnSpec] = &[text("type", true), text("school_name", true)];
const CAREER_COLUMNS: &[ColumnSpec] = &[text("company", true), text("department", false)];
const ACTIVITY_COLUMNS: &[ColumnSpec] =
    &[text("organization", true), text("description", false)];
const AWARD_COLUMNS: &[ColumnSpec] = &[text("institute", true), text("started_at", false)];
const VIDEO_COLUMNS: &[ColumnSpec] = &[text("url", true)];
const PREFERENCE_COLUMNS: &[ColumnSpec] = &[text("employ_type", true), integer("salary")];
const PREFERENCE_JOB_COLUMNS: &[ColumnSpec] = &[text("name", true)];
const PREFERENCE_LOCATION_COLUMNS: &[ColumnSpec] = &[text("sido", true), text("sigungu", false)];

/// Addressable table of the aggregate.
///
/// `Resume` addresses the root row; every other variant is a dependent
/// table keyed by its own `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildCategory {
    Resume,
    ResumeInfo,
    Education,
    Career,
    Activity,
    Award,
    MyVideo,
    HelperVideo,
    Preference,
    PreferenceJob,
    PreferenceLocation,
}

impl ChildCategory {
    pub const ALL: [ChildCategory; 11] = [
        Self::Resume,
        Self::ResumeInfo,
        Self::Education,
        Self::Career,
        Self::Activity,
        Self::Award,
        Self::MyVideo,
        Self::HelperVideo,
        Self::Preference,
        Self::PreferenceJob,
        Self::PreferenceLocation,
    ];

    /// Stable snake_case name, also accepted by `FromStr`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resume => "resume",
            Self::ResumeInfo => "resume_info",
            Self::Education => "education",
            Self::Career => "career",
            Self::Activity => "activity",
            Self::Award => "award",
            Self::MyVideo => "my_video",
            Self::HelperVideo => "helper_video",
            Self::Preference => "preference",
            Self::PreferenceJob => "preference_job",
            Self::PreferenceLocation => "preference_location",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Self::Resume => "resumes",
            Self::ResumeInfo => "resume_infos",
            Self::Education => "educations",
            Self::Career => "careers",
            Self::Activity => "activities",
            Self::Award => "awards",
            Self::MyVideo => "my_videos",
            Self::HelperVideo => "helper_videos",
            Self::Preference => "preferences",
            Self::PreferenceJob => "preference_jobs",
            Self::PreferenceLocation => "preference_locations",
        }
    }

    /// Writable columns, excluding `id` and the parent key.
    pub fn columns(self) -> &'static [ColumnSpec] {
        match self {
            Self::Resume => RESUME_COLUMNS,
            Self::ResumeInfo => RESUME_INFO_COLUMNS,
            Self::Education => EDUCATION_COLUMNS,
            Self::Career => CAREER_COLUMNS,
            Self::Activity => ACTIVITY_COLUMNS,
            Self::Award => AWARD_COLUMNS,
            Self::MyVideo | Self::HelperVideo => VIDEO_COLUMNS,
            Self::Preference => PREFERENCE_COLUMNS,
            Self::PreferenceJob => PREFERENCE_JOB_COLUMNS,
            Self::PreferenceLocation => PREFERENCE_LOCATION_COLUMNS,
        }
    }

    /// Foreign key column pointing at the owning row.
    pub fn parent_key(self) -> &'static str {
        match self {
            Self::Resume => "user_id",
            Self::PreferenceJob | Self::PreferenceLocation => "preference_id",
            _ => "resume_id",
        }
    }

    pub fn column(self, name: &str) -> Option<&'static ColumnSpec> {
        self.columns().iter().find(|column| column.name == name)
    }
}

impl Display for ChildCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category name not known to the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl Display for UnknownCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown resume category `{}`", self.0)
    }
}

impl Error for UnknownCategory {}

impl FromStr for ChildCategory {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| UnknownCategory(value.to_string()))
    }
}
