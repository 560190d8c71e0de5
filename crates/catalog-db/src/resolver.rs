//! # Category Resolver
//!
//! Resolves category names to rows inside the caller's transaction.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    resolve(name, policy)                                │
//! │                                                                         │
//! │  SELECT ... FROM categories WHERE name = ?                             │
//! │       │                                                                 │
//! │       ├── found        → Existing row, created = false                 │
//! │       │                                                                 │
//! │       └── not found                                                    │
//! │             ├── policy Create → INSERT, created = true                 │
//! │             └── policy Skip   → None                                   │
//! │                                                                         │
//! │  Any other error → propagated, caller's transaction rolls back         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrent Writers
//! Two transactions may both miss on the same name and both insert. The
//! `UNIQUE(name)` index lets exactly one win; the other gets
//! [`DbError::UniqueViolation`] and rolls back. No retry happens here.

use std::fmt;
use std::str::FromStr;

use catalog_core::validation::normalize_category_names;
use catalog_core::Category;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};

pub(crate) const CATEGORY_COLUMNS: &str = "id, name, description, created_at, updated_at";

// =============================================================================
// Policy
// =============================================================================

/// What to do with a category name that has no row yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCategoryPolicy {
    /// Insert a new category with that name.
    #[default]
    Create,

    /// Leave the name out of the resolved set.
    Skip,
}

impl fmt::Display for MissingCategoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingCategoryPolicy::Create => write!(f, "create"),
            MissingCategoryPolicy::Skip => write!(f, "skip"),
        }
    }
}

impl FromStr for MissingCategoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" => Ok(MissingCategoryPolicy::Create),
            "skip" | "ignore" => Ok(MissingCategoryPolicy::Skip),
            other => Err(format!(
                "Unknown missing-category policy: '{}'. Valid options: create, skip",
                other
            )),
        }
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// A category name resolved to its row.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub category: Category,
    /// True when this call inserted the row.
    pub created: bool,
}

/// Looks a category up by its unique name.
pub async fn find(conn: &mut SqliteConnection, name: &str) -> DbResult<Option<Category>> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE name = ?1");
    let category = sqlx::query_as::<_, Category>(&sql)
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(category)
}

/// Inserts a category row and returns it as stored.
pub(crate) async fn insert(
    conn: &mut SqliteConnection,
    name: &str,
    description: Option<&str>,
) -> DbResult<Category> {
    let now = Utc::now();
    let sql = format!(
        "INSERT INTO categories (name, description, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?3) RETURNING {CATEGORY_COLUMNS}"
    );

    let category = sqlx::query_as::<_, Category>(&sql)
        .bind(name)
        .bind(description)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| DbError::from(e).with_unique_value("name", name))?;

    Ok(category)
}

/// Resolves one name. `None` only under [`MissingCategoryPolicy::Skip`].
pub async fn resolve(
    conn: &mut SqliteConnection,
    name: &str,
    policy: MissingCategoryPolicy,
) -> DbResult<Option<Resolved>> {
    if let Some(category) = find(conn, name).await? {
        return Ok(Some(Resolved {
            category,
            created: false,
        }));
    }

    match policy {
        MissingCategoryPolicy::Create => {
            let category = insert(conn, name, None).await?;
            debug!(id = category.id, name = %category.name, "Created category during resolution");
            Ok(Some(Resolved {
                category,
                created: true,
            }))
        }
        MissingCategoryPolicy::Skip => {
            debug!(name = %name, "Skipping unknown category");
            Ok(None)
        }
    }
}

/// Normalizes `names` and resolves each one in order.
///
/// The result has no duplicates; skipped names are simply absent.
pub async fn resolve_all<S: AsRef<str>>(
    conn: &mut SqliteConnection,
    names: &[S],
    policy: MissingCategoryPolicy,
) -> DbResult<Vec<Resolved>> {
    let names = normalize_category_names(names)?;
    let mut resolved = Vec::with_capacity(names.len());

    for name in &names {
        if let Some(r) = resolve(conn, name, policy).await? {
            resolved.push(r);
        }
    }

    Ok(resolved)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{count_rows, seed_user, test_db};
    use crate::{Database, DbConfig};
    use catalog_core::NewProduct;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "create".parse::<MissingCategoryPolicy>().unwrap(),
            MissingCategoryPolicy::Create
        );
        assert_eq!(
            " Skip ".parse::<MissingCategoryPolicy>().unwrap(),
            MissingCategoryPolicy::Skip
        );
        assert!("sometimes".parse::<MissingCategoryPolicy>().is_err());
        assert_eq!(MissingCategoryPolicy::default().to_string(), "create");
    }

    #[tokio::test]
    async fn test_resolve_creates_then_finds() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let first = resolve(&mut conn, "tea", MissingCategoryPolicy::Create)
            .await
            .unwrap()
            .unwrap();
        assert!(first.created);

        let second = resolve(&mut conn, "tea", MissingCategoryPolicy::Create)
            .await
            .unwrap()
            .unwrap();
        assert!(!second.created);
        assert_eq!(first.category, second.category);
    }

    #[tokio::test]
    async fn test_resolve_skip_leaves_store_untouched() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let none = resolve(&mut conn, "ghost", MissingCategoryPolicy::Skip)
            .await
            .unwrap();
        assert!(none.is_none());
        assert!(find(&mut conn, "ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_all_dedupes_and_skips() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        insert(&mut conn, "known", None).await.unwrap();

        let resolved = resolve_all(
            &mut conn,
            &["known", " unknown ", "known", ""],
            MissingCategoryPolicy::Skip,
        )
        .await
        .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].category.name, "known");

        let resolved = resolve_all(
            &mut conn,
            &["known", " unknown "],
            MissingCategoryPolicy::Create,
        )
        .await
        .unwrap();
        let names: Vec<_> = resolved.iter().map(|r| r.category.name.as_str()).collect();
        assert_eq!(names, vec!["known", "unknown"]);
        assert!(!resolved[0].created);
        assert!(resolved[1].created);
    }

    #[tokio::test]
    async fn test_insert_duplicate_is_unique_violation() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        insert(&mut conn, "tea", None).await.unwrap();

        let err = insert(&mut conn, "tea", Some("again")).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { ref field, ref value } if field == "name" && value == "tea"
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_share_new_categories() {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "catalog-race-{}-{}.db",
            std::process::id(),
            stamp
        ));

        let db = Database::new(DbConfig::new(&path).max_connections(5))
            .await
            .unwrap();
        let owner_id = seed_user(&db, "ada").await.id;

        let mut handles = Vec::new();
        for i in 0..20 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.products()
                    .create(&NewProduct::new(owner_id, format!("Mug {i}")), &["tea", "mugs"])
                    .await
            }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                // The name constraint may turn a lost race into an error
                Err(DbError::UniqueViolation { ref field, .. }) if field == "name" => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert!(created >= 1);
        assert_eq!(count_rows(&db, "categories").await, 2);
        assert_eq!(count_rows(&db, "products").await, created);
        assert_eq!(count_rows(&db, "product_categories").await, created * 2);

        let duplicates: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM (SELECT product_id, category_id FROM product_categories \
             GROUP BY product_id, category_id HAVING COUNT(*) > 1)",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(duplicates, 0);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}
