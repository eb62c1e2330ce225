//! Runs against a live PostgreSQL when `DATABASE_URL` is set; skipped otherwise.

use serde_json::{Value, json};
use uuid::Uuid;

use shareplate_server::data::document_store::{
    DocumentData, DocumentQuery, DocumentStore, Precondition, StoreError,
};
use shareplate_server::data::postgres_store::PostgresDocumentStore;
use shareplate_server::infrastructure::database::{create_pool, run_migrations};

async fn store() -> Option<PostgresDocumentStore> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set, skipping postgres store test");
            return None;
        }
    };
    let pool = create_pool(&url).await.expect("connect to postgres");
    run_migrations(&pool).await.expect("migrations");
    Some(PostgresDocumentStore::new(pool))
}

fn data(value: Value) -> DocumentData {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn fresh_collection() -> String {
    format!("test_{}", Uuid::new_v4().simple())
}

#[tokio::test]
async fn conditional_update_bumps_revision_and_rejects_stale_writes() {
    let Some(store) = store().await else { return };
    let posts = fresh_collection();

    let doc = store
        .create(&posts, data(json!({ "foodName": "Idli", "likes": 0, "likedBy": [] })))
        .await
        .expect("create");
    assert_eq!(doc.revision, 1);

    let liked = store
        .update(
            &posts,
            &doc.id,
            data(json!({ "likes": 1, "likedBy": ["u1"] })),
            Precondition::Revision(1),
        )
        .await
        .expect("update at current revision");
    assert_eq!(liked.revision, 2);
    assert_eq!(liked.u64_field("likes"), 1);
    assert_eq!(liked.str_field("foodName"), "Idli");

    let err = store
        .update(&posts, &doc.id, data(json!({ "likes": 5 })), Precondition::Revision(1))
        .await
        .expect_err("stale revision");
    assert!(matches!(
        err,
        StoreError::RevisionMismatch { expected: 1, actual: 2, .. }
    ));

    let err = store
        .update(&posts, "no-such-doc", data(json!({ "likes": 1 })), Precondition::None)
        .await
        .expect_err("missing document");
    assert!(matches!(err, StoreError::NotFound { .. }));

    let current = store.get(&posts, &doc.id).await.expect("get").expect("present");
    assert_eq!(current.revision, 2);
    assert_eq!(current.string_list("likedBy"), vec!["u1".to_string()]);
    assert!(store.get(&posts, "no-such-doc").await.expect("get").is_none());
}

#[tokio::test]
async fn list_filters_orders_newest_first_and_limits() {
    let Some(store) = store().await else { return };
    let donations = fresh_collection();

    for (user, food, at) in [
        ("u1", "Rice", "2024-03-01T10:00:00Z"),
        ("u2", "Dal", "2024-03-02T10:00:00Z"),
        ("u1", "Roti", "2024-03-03T10:00:00Z"),
        ("u1", "Curd", "2024-03-04T10:00:00Z"),
    ] {
        store
            .create(
                &donations,
                data(json!({ "user_id": user, "food_name": food, "created_at": at })),
            )
            .await
            .expect("create");
    }

    let query = DocumentQuery::new()
        .filter_eq("user_id", "u1")
        .order_desc("created_at")
        .limit(2);
    let found = store.list(&donations, &query).await.expect("list");
    let foods: Vec<String> = found.iter().map(|d| d.str_field("food_name")).collect();
    assert_eq!(foods, vec!["Curd", "Roti"]);

    let all = store
        .list(&donations, &DocumentQuery::new())
        .await
        .expect("list all");
    assert_eq!(all.len(), 4);

    // collections never leak into each other
    let other = store
        .list(&fresh_collection(), &DocumentQuery::new())
        .await
        .expect("list empty");
    assert!(other.is_empty());
}
