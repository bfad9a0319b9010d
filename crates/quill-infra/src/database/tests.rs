use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
use uuid::Uuid;

use quill_core::domain::{Post, PostStatus, Touch};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, PostRepository};

use crate::database::entity::{category, post};
use crate::database::postgres_repo::PostgresPostRepository;

fn post_model(id: Uuid) -> post::Model {
    let now = Utc::now();
    post::Model {
        id,
        user_id: Uuid::new_v4(),
        category_id: None,
        title: "Test Post".to_owned(),
        slug: "test-post".to_owned(),
        excerpt: None,
        content: "Content".to_owned(),
        featured_image: None,
        thumbnail: None,
        og_image: None,
        reading_time: 1,
        meta_title: None,
        meta_description: None,
        canonical_url: None,
        status: post::Status::Scheduled,
        published_at: None,
        scheduled_at: Some(now.into()),
        view_count: 3,
        like_count: 0,
        comment_count: 0,
        allow_comments: true,
        created_at: now.into(),
        updated_at: now.into(),
        deleted_at: None,
    }
}

fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
}

#[tokio::test]
async fn test_find_post_by_id() {
    let post_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![post_model(post_id)]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let result: Option<Post> = repo.find_by_id(post_id).await.unwrap();

    let post = result.unwrap();
    assert_eq!(post.title, "Test Post");
    assert_eq!(post.id, post_id);
    assert_eq!(post.status, PostStatus::Scheduled);
    assert!(post.scheduled_at.is_some());
    assert_eq!(post.view_count, 3);
}

#[tokio::test]
async fn test_find_missing_post() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![Vec::<post::Model>::new()])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_slug_exists_counts_rows() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[count_row(1)]])
        .append_query_results([[count_row(0)]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    assert!(repo.slug_exists("hello-world", None).await.unwrap());
    assert!(
        !repo
            .slug_exists("hello-world", Some(Uuid::new_v4()))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_soft_delete_of_missing_post_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    assert!(matches!(
        repo.delete(Uuid::new_v4()).await,
        Err(RepoError::NotFound)
    ));
}

#[tokio::test]
async fn test_category_exists() {
    let id = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![category::Model {
            id,
            name: "News".to_owned(),
            slug: "news".to_owned(),
        }]])
        .append_query_results([Vec::<category::Model>::new()])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    assert!(repo.category_exists(id).await.unwrap());
    assert!(!repo.category_exists(Uuid::new_v4()).await.unwrap());
}

#[tokio::test]
async fn test_count_engagement() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[count_row(7)]])
        .append_query_results([[count_row(2)]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let counts = repo.count_engagement(Uuid::new_v4()).await.unwrap();
    assert_eq!(counts.like_count, 7);
    assert_eq!(counts.comment_count, 2);
}

#[tokio::test]
async fn test_update_leaves_counters_to_their_own_writers() {
    let post_id = Uuid::new_v4();
    let mut stored = post_model(post_id);
    stored.like_count = 5;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![stored]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let mut stale: Post = post_model(post_id).into();
    stale.excerpt = Some("Short".to_owned());
    stale.like_count = 0;

    let updated = repo.update(stale, Touch::Bump).await.unwrap();
    assert_eq!(updated.like_count, 5);

    let log = repo.db.into_transaction_log();
    let sql = &log[0].statements()[0].sql;
    let assignments = sql.split(" WHERE ").next().unwrap();
    assert!(assignments.contains("\"excerpt\""));
    for column in ["view_count", "like_count", "comment_count", "created_at", "deleted_at"] {
        assert!(
            !assignments.contains(&format!("\"{column}\"")),
            "{column} written by update: {assignments}"
        );
    }
    assert!(sql.contains("\"deleted_at\" IS NULL"));
}
