//! Aggregate read composer.
//!
//! Each category contributes one fragment: a subquery filtered by the
//! requested resume id (`?1`) that aggregates its rows into a JSON object
//! (1:1 children) or a JSON array (1:N children), grouped by the owning key.
//! The preference fragment first aggregates its own jobs and locations by
//! preference id. The composer joins every fragment back onto the root row.
//!
//! # Invariants
//! - 1:1 fragments are inner-joined: a missing mandatory child drops the
//!   root row, so reconstruction reports not-found.
//! - 1:N fragments are left-joined and default to `[]`.
//! - Array elements follow row `id` order via ordered aggregates, which
//!   needs SQLite 3.44 or newer (the bundled build).

use crate::model::category::ChildCategory;

/// Row count of a category per owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Per-category aggregation joined onto the root row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadFragment {
    pub category: ChildCategory,
    pub cardinality: Cardinality,
    /// Name of the JSON column in the composed row.
    pub output: &'static str,
    alias: &'static str,
}

pub const FRAGMENTS: [ReadFragment; 8] = [
    fragment(ChildCategory::ResumeInfo, Cardinality::One, "resume_info", "ri"),
    fragment(ChildCategory::Education, Cardinality::Many, "educations", "ed"),
    fragment(ChildCategory::Career, Cardinality::Many, "careers", "ca"),
    fragment(ChildCategory::Activity, Cardinality::Many, "activities", "ac"),
    fragment(ChildCategory::Award, Cardinality::Many, "awards", "aw"),
    fragment(ChildCategory::MyVideo, Cardinality::One, "my_video", "mv"),
    fragment(ChildCategory::HelperVideo, Cardinality::One, "helper_video", "hv"),
    fragment(ChildCategory::Preference, Cardinality::One, "preference", "pr"),
];

const fn fragment(
    category: ChildCategory,
    cardinality: Cardinality,
    output: &'static str,
    alias: &'static str,
) -> ReadFragment {
    ReadFragment {
        category,
        cardinality,
        output,
        alias,
    }
}

impl ReadFragment {
    /// Subquery yielding `(resume_id, <output>)` for the resume bound to `?1`.
    pub fn subquery_sql(&self) -> String {
        if self.category == ChildCategory::Preference {
            return preference_subquery();
        }

        let table = self.category.table();
        let object = json_object_sql(self.category, "t");
        match self.cardinality {
            // Bare columns of a MIN() aggregate come from the MIN row, so a
            // duplicated 1:1 child resolves to its oldest row.
            Cardinality::One => format!(
                "SELECT t.resume_id AS resume_id, MIN(t.id) AS first_id, {object} AS {output}
                 FROM {table} AS t
                 WHERE t.resume_id = ?1
                 GROUP BY t.resume_id",
                output = self.output
            ),
            Cardinality::Many => format!(
                "SELECT t.resume_id AS resume_id,
                        json_group_array({object} ORDER BY t.id) AS {output}
                 FROM {table} AS t
                 WHERE t.resume_id = ?1
                 GROUP BY t.resume_id",
                output = self.output
            ),
        }
    }

    fn join_sql(&self) -> String {
        let join = match self.cardinality {
            Cardinality::One => "INNER JOIN",
            Cardinality::Many => "LEFT JOIN",
        };
        format!(
            "{join} ({subquery}) AS {alias} ON {alias}.resume_id = r.id",
            subquery = self.subquery_sql(),
            alias = self.alias
        )
    }

    fn select_sql(&self) -> String {
        match self.cardinality {
            Cardinality::One => format!("{}.{} AS {}", self.alias, self.output, self.output),
            Cardinality::Many => format!(
                "COALESCE({}.{}, '[]') AS {}",
                self.alias, self.output, self.output
            ),
        }
    }
}

/// Composes the single query reconstructing one aggregate.
///
/// Binds the resume id as `?1`; yields at most one row with columns `id`,
/// `user_id`, `title`, `content` and one JSON text column per fragment.
pub fn compose_aggregate_sql() -> String {
    let selects = FRAGMENTS
        .iter()
        .map(ReadFragment::select_sql)
        .collect::<Vec<_>>()
        .join(",\n    ");
    let joins = FRAGMENTS
        .iter()
        .map(ReadFragment::join_sql)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "SELECT
    r.id AS id,
    r.user_id AS user_id,
    r.title AS title,
    r.content AS content,
    {selects}
FROM resumes AS r
{joins}
WHERE r.id = ?1;"
    )
}

/// `json_object('id', t.id, 'col', t.col, ...)` over declared columns.
fn json_object_sql(category: ChildCategory, alias: &str) -> String {
    let pairs = std::iter::once("id")
        .chain(category.columns().iter().map(|column| column.name))
        .map(|name| format!("'{name}', {alias}.{name}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("json_object({pairs})")
}

fn many_by_preference(category: ChildCategory, output: &str) -> String {
    let object = json_object_sql(category, "t");
    format!(
        "SELECT t.preference_id AS preference_id,
                json_group_array({object} ORDER BY t.id) AS {output}
         FROM {table} AS t
         WHERE t.preference_id IN (SELECT id FROM preferences WHERE resume_id = ?1)
         GROUP BY t.preference_id",
        table = category.table()
    )
}

fn preference_subquery() -> String {
    let jobs = many_by_preference(ChildCategory::PreferenceJob, "preference_jobs");
    let locations = many_by_preference(ChildCategory::PreferenceLocation, "preference_locations");
    // json() restores the JSON subtype lost when crossing the subquery boundary.
    format!(
        "SELECT p.resume_id AS resume_id, MIN(p.id) AS first_id,
                json_object(
                    'id', p.id,
                    'employ_type', p.employ_type,
                    'salary', p.salary,
                    'preference_jobs', json(COALESCE(pj.preference_jobs, '[]')),
                    'preference_locations', json(COALESCE(pl.preference_locations, '[]'))
                ) AS preference
         FROM preferences AS p
         LEFT JOIN ({jobs}) AS pj ON pj.preference_id = p.id
         LEFT JOIN ({locations}) AS pl ON pl.preference_id = p.id
         WHERE p.resume_id = ?1
         GROUP BY p.resume_id"
    )
}
