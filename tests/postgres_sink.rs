use bubble_migrate::config::{Settings, Target};
use bubble_migrate::identity::ResolverBuilder;
use bubble_migrate::migrator;
use bubble_migrate::models::{Relation, UserRecord};
use bubble_migrate::sink::{PostgresSink, Sink};
use bubble_migrate::source::RawRecord;
use bubble_migrate::test_support::{TestDatabase, TestDatabaseError};
use bubble_migrate::transform::{Transform, UserTransformer};
use bubble_migrate::verify;
use std::fs;

async fn start_database(test: &str) -> Option<TestDatabase> {
    match TestDatabase::new().await {
        Ok(db) => Some(db),
        Err(TestDatabaseError::Container(err)) => {
            eprintln!("skipping {test}: no container runtime ({err})");
            None
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    }
}

fn user(email: &str, collabs: &str) -> UserRecord {
    let rows = vec![RawRecord::from_pairs([
        ("email", email),
        ("Collabs", collabs),
        ("consent", "yes"),
    ])];
    let resolver = ResolverBuilder::new().register_emails(&rows).build();
    UserTransformer::new(&resolver)
        .apply(&rows[0])
        .expect("user record")
}

#[tokio::test]
async fn postgres_sink_skips_existing_rows() {
    let Some(db) = start_database("postgres_sink_skips_existing_rows").await else {
        return;
    };

    let mut sink = PostgresSink::from_pool(db.pool().clone(), 2);
    let rows = vec![
        user("a@example.com", "film"),
        user("b@example.com", ""),
        user("c@example.com", "music, art"),
    ];

    let first = sink.insert(&rows).await;
    assert_eq!(first.written, 3);
    assert_eq!(first.conflicts, 0);

    let second = sink.insert(&rows).await;
    assert_eq!(second.written, 0);
    assert_eq!(second.conflicts, 3);
    assert_eq!(db.count("users").await.expect("count"), 3);

    let collaborators: Vec<String> =
        sqlx::query_scalar("SELECT collaborators FROM users WHERE email = $1")
            .bind("c@example.com")
            .fetch_one(db.pool())
            .await
            .expect("user row");
    assert_eq!(collaborators, vec!["music", "art"]);

    db.close().await;
}

#[tokio::test]
async fn direct_migration_is_idempotent() {
    let Some(db) = start_database("direct_migration_is_idempotent").await else {
        return;
    };

    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join(Relation::Users.file_name()),
        "email,Age,consent\nzoe@example.com,33,yes\n",
    )
    .expect("users export");
    fs::write(
        dir.path().join(Relation::Likes.file_name()),
        "Sender,Receiver,Creation Date\nzoe,yan,\"Jul 20, 2023 1:00 pm\"\nyan,zoe,\n",
    )
    .expect("likes export");
    fs::write(
        dir.path().join(Relation::MetUps.file_name()),
        "Creator,User 2\nzoe,yan\nyan,zoe\n",
    )
    .expect("met-ups export");

    let target = Target::Direct {
        database_url: db.database_url().to_string(),
    };
    let settings = Settings {
        export_dir: dir.path().to_path_buf(),
        batch_size: 10,
    };

    let first = migrator::run(&target, &settings).await.expect("first run");
    assert_eq!(first.write_totals().failed, 0);
    assert_eq!(first.write_totals().written, 6, "1 user, 2 placeholders, 2 likes, 1 met-up");

    let second = migrator::run(&target, &settings).await.expect("second run");
    assert_eq!(second.write_totals().written, 0);
    assert_eq!(second.write_totals().conflicts, 6);

    let counts = verify::row_counts(db.pool()).await.expect("row counts");
    let count_of = |relation: Relation| {
        counts
            .iter()
            .find(|(r, _)| *r == relation)
            .map(|(_, n)| *n)
            .unwrap_or_default()
    };
    assert_eq!(count_of(Relation::Users), 3);
    assert_eq!(count_of(Relation::Likes), 2);
    assert_eq!(count_of(Relation::MetUps), 1);
    assert_eq!(count_of(Relation::Messages), 0);

    let reported = verify::verify_target(db.database_url())
        .await
        .expect("verify connects through shared options");
    assert_eq!(reported, counts);

    db.close().await;
}
