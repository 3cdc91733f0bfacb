use resume_core::db::open_db_in_memory;
use resume_core::model::resume::{
    Activity, Award, Career, Education, Preference, PreferenceJob, PreferenceLocation, Resume,
    ResumeInfo, Video,
};
use resume_core::repo::user_repo::SqliteUserRepository;
use resume_core::{
    ChildCategory, FieldPatch, NewResume, RepoError, ResumeRepository, ResumeValidationError,
    SqliteResumeRepository, TxError, UserId,
};
use rusqlite::Connection;
use serde_json::json;

const DEPENDENT_TABLES: [&str; 11] = [
    "resume_infos",
    "educations",
    "careers",
    "activities",
    "awards",
    "my_videos",
    "helper_videos",
    "preferences",
    "preference_jobs",
    "preference_locations",
    "user_metas",
];

fn payload() -> NewResume {
    NewResume {
        resume: Resume {
            title: "warehouse operations".to_string(),
            content: Some("five years of inventory work".to_string()),
        },
        resume_info: ResumeInfo {
            name: "Lee Minji".to_string(),
            birthday: Some("1990-04-02".to_string()),
            phone_number: Some("010-0000-0000".to_string()),
            email: Some("minji@example.com".to_string()),
            sido: Some("Seoul".to_string()),
            sigungu: Some("Mapo".to_string()),
            disability_level: Some(2),
            disability_type: Some("hearing".to_string()),
            sex: Some("F".to_string()),
        },
        educations: vec![
            Education {
                kind: "high_school".to_string(),
                school_name: "Mapo High".to_string(),
            },
            Education {
                kind: "college".to_string(),
                school_name: "Seoul College".to_string(),
            },
        ],
        careers: vec![Career {
            company: "Logis Co".to_string(),
            department: Some("inbound".to_string()),
        }],
        activities: Vec::new(),
        awards: vec![Award {
            institute: "City Hall".to_string(),
            started_at: Some("2021-11".to_string()),
        }],
        my_video: Video {
            url: "https://videos.example/minji.mp4".to_string(),
        },
        helper_video: Video {
            url: "https://videos.example/helper.mp4".to_string(),
        },
        preference: Preference {
            employ_type: "full_time".to_string(),
            salary: Some(2800),
            preference_jobs: vec![PreferenceJob {
                name: "picker".to_string(),
            }],
            preference_locations: vec![
                PreferenceLocation {
                    sido: "Seoul".to_string(),
                    sigungu: Some("Mapo".to_string()),
                },
                PreferenceLocation {
                    sido: "Gyeonggi".to_string(),
                    sigungu: None,
                },
            ],
        },
    }
}

fn setup() -> (Connection, UserId) {
    let mut conn = open_db_in_memory().unwrap();
    let owner = SqliteUserRepository::new(&mut conn)
        .create_user("owner@example.com")
        .unwrap();
    (conn, owner)
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn verified(conn: &mut Connection, owner: UserId) -> Option<bool> {
    SqliteUserRepository::new(conn).is_verified(owner).unwrap()
}

fn patch(value: serde_json::Value) -> FieldPatch {
    value.as_object().cloned().unwrap()
}

#[test]
fn create_then_get_reconstructs_the_payload() {
    let (mut conn, owner) = setup();
    let mut repo = SqliteResumeRepository::try_new(&mut conn).unwrap();

    let resume_id = repo.create_resume(owner, &payload()).unwrap();
    let aggregate = repo.get_resume(resume_id).unwrap().unwrap();

    assert_eq!(aggregate.id, resume_id);
    assert_eq!(aggregate.user_id, owner);
    assert_eq!(aggregate.educations.len(), 2);
    assert_eq!(aggregate.careers.len(), 1);
    assert!(aggregate.activities.is_empty());
    assert_eq!(aggregate.awards.len(), 1);
    assert_eq!(aggregate.preference.preference_jobs.len(), 1);
    assert_eq!(aggregate.preference.preference_locations.len(), 2);
    assert_eq!(aggregate.educations[0].record.school_name, "Mapo High");
    assert_eq!(aggregate.educations[1].record.school_name, "Seoul College");
    assert_eq!(aggregate.to_payload(), payload());
}

#[test]
fn dependents_reference_the_generated_ids() {
    let (mut conn, owner) = setup();
    let resume_id = SqliteResumeRepository::try_new(&mut conn)
        .unwrap()
        .create_resume(owner, &payload())
        .unwrap();

    for table in [
        "resume_infos",
        "educations",
        "careers",
        "awards",
        "my_videos",
        "helper_videos",
        "preferences",
    ] {
        let mismatched: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE resume_id <> ?1;"),
                [resume_id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(mismatched, 0, "{table} rows point at another resume");
    }

    let preference_id: i64 = conn
        .query_row(
            "SELECT id FROM preferences WHERE resume_id = ?1;",
            [resume_id],
            |row| row.get(0),
        )
        .unwrap();
    for table in ["preference_jobs", "preference_locations"] {
        let linked: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE preference_id = ?1;"),
                [preference_id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(linked, count(&conn, table));
    }
    let owner_of_resume: i64 = conn
        .query_row(
            "SELECT user_id FROM resumes WHERE id = ?1;",
            [resume_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(owner_of_resume, owner);
}

#[test]
fn create_marks_owner_verified_and_is_idempotent() {
    let (mut conn, owner) = setup();
    assert_eq!(verified(&mut conn, owner), Some(false));

    SqliteResumeRepository::try_new(&mut conn)
        .unwrap()
        .create_resume(owner, &payload())
        .unwrap();
    assert_eq!(verified(&mut conn, owner), Some(true));

    SqliteResumeRepository::try_new(&mut conn)
        .unwrap()
        .create_resume(owner, &payload())
        .unwrap();
    assert_eq!(verified(&mut conn, owner), Some(true));
    assert_eq!(count(&conn, "resumes"), 2);
}

#[test]
fn create_verifies_owner_without_meta_row() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO users (id, email) VALUES (5, 'bare@example.com');",
        [],
    )
    .unwrap();
    assert_eq!(verified(&mut conn, 5), None);

    SqliteResumeRepository::try_new(&mut conn)
        .unwrap()
        .create_resume(5, &payload())
        .unwrap();

    assert_eq!(verified(&mut conn, 5), Some(true));
    assert_eq!(count(&conn, "user_metas"), 1);
}

#[test]
fn find_user_by_email_returns_registered_owner() {
    let (mut conn, owner) = setup();
    let mut users = SqliteUserRepository::new(&mut conn);

    assert_eq!(
        users.find_user_by_email(" owner@example.com ").unwrap(),
        Some(owner)
    );
    assert_eq!(users.find_user_by_email("nobody@example.com").unwrap(), None);

    let err = users.create_user("owner@example.com").unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
    assert_eq!(count(&conn, "users"), 1);
}

#[test]
fn failure_in_any_dependent_insert_rolls_back_everything() {
    for table in DEPENDENT_TABLES {
        let (mut conn, owner) = setup();
        // The verified-flag upsert may take either path.
        for event in ["INSERT", "UPDATE"] {
            conn.execute_batch(&format!(
                "CREATE TRIGGER fail_{table}_{event} BEFORE {event} ON {table}
                 BEGIN SELECT RAISE(ABORT, 'injected failure'); END;"
            ))
            .unwrap();
        }

        let err = SqliteResumeRepository::try_new(&mut conn)
            .unwrap()
            .create_resume(owner, &payload())
            .unwrap_err();

        match err {
            RepoError::Transaction(TxError::Statement { table: failed, .. }) => {
                assert_eq!(failed, table)
            }
            other => panic!("unexpected error for {table}: {other}"),
        }
        assert_eq!(count(&conn, "resumes"), 0, "root row survived {table} failure");
        for dependent in &DEPENDENT_TABLES[..DEPENDENT_TABLES.len() - 1] {
            assert_eq!(count(&conn, dependent), 0, "{dependent} row survived");
        }
        assert_eq!(verified(&mut conn, owner), Some(false));
    }
}

#[test]
fn missing_owner_fails_the_root_insert() {
    let mut conn = open_db_in_memory().unwrap();
    let err = SqliteResumeRepository::try_new(&mut conn)
        .unwrap()
        .create_resume(404, &payload())
        .unwrap_err();

    assert!(matches!(
        err,
        RepoError::Transaction(TxError::Statement {
            index: 0,
            table: "resumes",
            ..
        })
    ));
    assert_eq!(count(&conn, "resumes"), 0);
}

#[test]
fn invalid_payload_is_rejected_before_any_write() {
    let (mut conn, owner) = setup();
    let mut invalid = payload();
    invalid.preference.preference_locations[1].sido = " ".to_string();

    let err = SqliteResumeRepository::try_new(&mut conn)
        .unwrap()
        .create_resume(owner, &invalid)
        .unwrap_err();

    assert!(matches!(
        err,
        RepoError::Validation(ResumeValidationError::EmptyField {
            entity: "preference_locations",
            field: "sido",
            index: Some(1),
        })
    ));
    assert_eq!(count(&conn, "resumes"), 0);
    assert_eq!(verified(&mut conn, owner), Some(false));
}

#[test]
fn get_unknown_or_incomplete_resume_returns_none() {
    let (mut conn, owner) = setup();
    let mut repo = SqliteResumeRepository::try_new(&mut conn).unwrap();
    assert!(repo.get_resume(999).unwrap().is_none());

    let resume_id = repo.create_resume(owner, &payload()).unwrap();
    drop(repo);
    conn.execute("DELETE FROM resume_infos WHERE resume_id = ?1;", [resume_id])
        .unwrap();

    let repo = SqliteResumeRepository::try_new(&mut conn).unwrap();
    assert!(repo.get_resume(resume_id).unwrap().is_none());
}

#[test]
fn duplicated_one_to_one_child_resolves_to_oldest_row() {
    let (mut conn, owner) = setup();
    let resume_id = SqliteResumeRepository::try_new(&mut conn)
        .unwrap()
        .create_resume(owner, &payload())
        .unwrap();
    conn.execute(
        "INSERT INTO my_videos (resume_id, url) VALUES (?1, 'https://videos.example/late.mp4');",
        [resume_id],
    )
    .unwrap();

    let aggregate = SqliteResumeRepository::try_new(&mut conn)
        .unwrap()
        .get_resume(resume_id)
        .unwrap()
        .unwrap();
    assert_eq!(aggregate.my_video.record.url, "https://videos.example/minji.mp4");
}

#[test]
fn resumes_of_one_owner_stay_separate() {
    let (mut conn, owner) = setup();
    let mut repo = SqliteResumeRepository::try_new(&mut conn).unwrap();

    let mut second_payload = payload();
    second_payload.resume.title = "night shift".to_string();
    second_payload.educations.clear();
    second_payload.preference.preference_jobs.clear();

    let first = repo.create_resume(owner, &payload()).unwrap();
    let second = repo.create_resume(owner, &second_payload).unwrap();

    let first = repo.get_resume(first).unwrap().unwrap();
    let second = repo.get_resume(second).unwrap().unwrap();
    assert_eq!(first.to_payload(), payload());
    assert_eq!(second.to_payload(), second_payload);
    assert!(second.preference.preference_jobs.is_empty());
}

#[test]
fn update_child_changes_only_named_fields() {
    let (mut conn, owner) = setup();
    let mut repo = SqliteResumeRepository::try_new(&mut conn).unwrap();
    let resume_id = repo.create_resume(owner, &payload()).unwrap();
    let award_id = repo.get_resume(resume_id).unwrap().unwrap().awards[0].id;

    let affected = repo
        .update_child(
            ChildCategory::Award,
            award_id,
            &patch(json!({ "institute": "Ministry of Labor" })),
        )
        .unwrap();
    assert_eq!(affected, 1);

    let award = &repo.get_resume(resume_id).unwrap().unwrap().awards[0];
    assert_eq!(award.record.institute, "Ministry of Labor");
    assert_eq!(award.record.started_at.as_deref(), Some("2021-11"));
}

#[test]
fn update_resume_root_and_preference_scalars() {
    let (mut conn, owner) = setup();
    let mut repo = SqliteResumeRepository::try_new(&mut conn).unwrap();
    let resume_id = repo.create_resume(owner, &payload()).unwrap();
    let preference_id = repo.get_resume(resume_id).unwrap().unwrap().preference.id;

    repo.update_child(
        ChildCategory::Resume,
        resume_id,
        &patch(json!({ "content": null })),
    )
    .unwrap();
    repo.update_child(
        ChildCategory::Preference,
        preference_id,
        &patch(json!({ "salary": 3100 })),
    )
    .unwrap();

    let aggregate = repo.get_resume(resume_id).unwrap().unwrap();
    assert_eq!(aggregate.resume.content, None);
    assert_eq!(aggregate.preference.salary, Some(3100));
    assert_eq!(aggregate.preference.preference_locations.len(), 2);
}

#[test]
fn empty_patch_reports_whether_the_row_exists() {
    let (mut conn, owner) = setup();
    let mut repo = SqliteResumeRepository::try_new(&mut conn).unwrap();
    let resume_id = repo.create_resume(owner, &payload()).unwrap();
    let career_id = repo.get_resume(resume_id).unwrap().unwrap().careers[0].id;

    let empty = FieldPatch::new();
    assert_eq!(
        repo.update_child(ChildCategory::Career, career_id, &empty)
            .unwrap(),
        1
    );
    assert_eq!(
        repo.update_child(ChildCategory::Career, career_id + 100, &empty)
            .unwrap(),
        0
    );
}

#[test]
fn unknown_ids_affect_zero_rows() {
    let (mut conn, _owner) = setup();
    let repo = SqliteResumeRepository::try_new(&mut conn).unwrap();

    assert_eq!(
        repo.update_child(
            ChildCategory::Award,
            12345,
            &patch(json!({ "institute": "nobody" }))
        )
        .unwrap(),
        0
    );
    assert_eq!(repo.delete_child(ChildCategory::Award, 12345).unwrap(), 0);
}

#[test]
fn invalid_patch_is_rejected() {
    let (mut conn, owner) = setup();
    let mut repo = SqliteResumeRepository::try_new(&mut conn).unwrap();
    let resume_id = repo.create_resume(owner, &payload()).unwrap();
    let job_id = repo.get_resume(resume_id).unwrap().unwrap().preference.preference_jobs[0].id;

    let err = repo
        .update_child(
            ChildCategory::PreferenceJob,
            job_id,
            &patch(json!({ "preference_id": 1 })),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ResumeValidationError::UnknownField { .. })
    ));

    let err = repo
        .update_child(
            ChildCategory::ResumeInfo,
            job_id,
            &patch(json!({ "disability_level": -1 })),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ResumeValidationError::NegativeValue { value: -1, .. })
    ));
}

#[test]
fn delete_child_removes_one_collection_item() {
    let (mut conn, owner) = setup();
    let mut repo = SqliteResumeRepository::try_new(&mut conn).unwrap();
    let resume_id = repo.create_resume(owner, &payload()).unwrap();
    let first_education = repo.get_resume(resume_id).unwrap().unwrap().educations[0].id;

    assert_eq!(
        repo.delete_child(ChildCategory::Education, first_education)
            .unwrap(),
        1
    );

    let aggregate = repo.get_resume(resume_id).unwrap().unwrap();
    assert_eq!(aggregate.educations.len(), 1);
    assert_eq!(aggregate.educations[0].record.school_name, "Seoul College");
}

#[test]
fn deleting_mandatory_child_makes_aggregate_unreadable() {
    let (mut conn, owner) = setup();
    let mut repo = SqliteResumeRepository::try_new(&mut conn).unwrap();
    let resume_id = repo.create_resume(owner, &payload()).unwrap();
    let helper_id = repo.get_resume(resume_id).unwrap().unwrap().helper_video.id;

    repo.delete_child(ChildCategory::HelperVideo, helper_id)
        .unwrap();
    assert!(repo.get_resume(resume_id).unwrap().is_none());
}

#[test]
fn deleting_resume_cascades_to_every_dependent() {
    let (mut conn, owner) = setup();
    let resume_id = SqliteResumeRepository::try_new(&mut conn)
        .unwrap()
        .create_resume(owner, &payload())
        .unwrap();

    let affected = SqliteResumeRepository::try_new(&mut conn)
        .unwrap()
        .delete_child(ChildCategory::Resume, resume_id)
        .unwrap();
    assert_eq!(affected, 1);

    for table in &DEPENDENT_TABLES[..DEPENDENT_TABLES.len() - 1] {
        assert_eq!(count(&conn, table), 0, "{table} rows survived the cascade");
    }
    assert_eq!(count(&conn, "user_metas"), 1);
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let mut conn = Connection::open_in_memory().unwrap();
    let err = match SqliteResumeRepository::try_new(&mut conn) {
        Ok(_) => panic!("unmigrated connection accepted"),
        Err(err) => err,
    };
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn create_user_rejects_blank_email() {
    let mut conn = open_db_in_memory().unwrap();
    let err = SqliteUserRepository::new(&mut conn)
        .create_user("  ")
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(count(&conn, "users"), 0);
}

#[test]
fn activity_rows_are_read_back_in_order() {
    let (mut conn, owner) = setup();
    let mut with_activities = payload();
    with_activities.activities = vec![
        Activity {
            organization: "Food bank".to_string(),
            description: None,
        },
        Activity {
            organization: "Library".to_string(),
            description: Some("weekend shelving".to_string()),
        },
    ];

    let mut repo = SqliteResumeRepository::try_new(&mut conn).unwrap();
    let resume_id = repo.create_resume(owner, &with_activities).unwrap();
    let aggregate = repo.get_resume(resume_id).unwrap().unwrap();
    assert_eq!(aggregate.to_payload(), with_activities);
}
