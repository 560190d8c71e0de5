//! Shared test fixtures.
//!
//! Every test gets its own in-memory database with migrations applied.

use catalog_core::{NewUser, User};

use crate::{Database, DbConfig};

/// Creates an isolated in-memory database with the schema in place.
pub async fn test_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

/// Creates a user named `username` with email `{username}@example.com`.
pub async fn seed_user(db: &Database, username: &str) -> User {
    db.users()
        .create(&NewUser::new(
            username,
            format!("{username}@example.com"),
            "not-a-real-hash",
        ))
        .await
        .expect("seed user")
}

/// Row count of `table`. Only call with a literal table name.
pub async fn count_rows(db: &Database, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .expect("count rows")
}

/// Category ids currently joined to `product_id`.
pub async fn join_rows(db: &Database, product_id: i64) -> Vec<i64> {
    sqlx::query_scalar("SELECT category_id FROM product_categories WHERE product_id = ?1")
        .bind(product_id)
        .fetch_all(db.pool())
        .await
        .expect("join rows")
}
