// Integration tests for the sample-table demonstrations on SQLite

use migrun_core::Migrator;
use migrun_store::samples::{render_samples, sqlite, Approach, NewSample};
use migrun_store::{embedded_scripts, Dialect, SqliteSession};

fn migrated_file_db(dir: &tempfile::TempDir) -> SqliteSession {
    let mut session = SqliteSession::open(dir.path().join("samples.db")).unwrap();
    Migrator::new(embedded_scripts(Dialect::Sqlite).unwrap())
        .apply_pending(&mut session)
        .unwrap();
    session
}

#[test]
fn test_every_approach_inserts_selects_and_renders() {
    let dir = tempfile::tempdir().unwrap();
    let session = migrated_file_db(&dir);

    for approach in Approach::ALL {
        let mut access = sqlite::access(&session, approach);
        assert_eq!(access.approach(), approach);

        let inserted = access
            .insert(&NewSample::named("Test Sample").with_description("Test Description"))
            .unwrap();
        assert_eq!(inserted, 1);

        let returned = access
            .insert_returning(&NewSample::named("Test Sample Returning").with_int_example(5))
            .unwrap();
        assert!(returned.id > 0);
        assert_eq!(returned.name, "Test Sample Returning");
        assert_eq!(returned.int_example, Some(5));

        let rows = access.select_all().unwrap();
        let text = render_samples(approach.label(), &rows).unwrap();
        assert!(text.starts_with(&format!("Samples from {}:\n", approach.label())));
        assert!(text.contains("Test Sample Returning"));
    }

    // Two seeded rows plus two per approach
    let rows = sqlite::access(&session, Approach::Mapped).select_all().unwrap();
    assert_eq!(rows.len(), 6);
    let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[test]
fn test_timestamps_are_defaulted_by_the_table() {
    let dir = tempfile::tempdir().unwrap();
    let session = migrated_file_db(&dir);
    let before = chrono::Utc::now() - chrono::Duration::seconds(5);

    let row = sqlite::access(&session, Approach::Raw)
        .insert_returning(&NewSample::named("stamped"))
        .unwrap();

    assert!(row.created_at >= before);
    assert_eq!(row.created_at, row.updated_at);
    assert!(row.deleted_at.is_none());
}

#[test]
fn test_each_approach_on_its_own_session_sees_committed_rows() {
    let dir = tempfile::tempdir().unwrap();
    migrated_file_db(&dir).close().unwrap();

    // Given: one session per approach on the same file, each closed after use
    let mut seen = Vec::new();
    for approach in Approach::ALL {
        let session = SqliteSession::open(dir.path().join("samples.db")).unwrap();
        {
            let mut access = sqlite::access(&session, approach);
            access
                .insert(&NewSample::named(format!("via {}", approach.label())))
                .unwrap();
            seen.push(access.select_all().unwrap().len());
        }
        session.close().unwrap();
    }

    // Then: the later session reads what the earlier one committed
    assert_eq!(seen, vec![3, 4]);
    let session = SqliteSession::open(dir.path().join("samples.db")).unwrap();
    let names: Vec<String> = sqlite::access(&session, Approach::Raw)
        .select_all()
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert!(names.contains(&"via raw".to_string()));
    assert!(names.contains(&"via mapped".to_string()));
}
