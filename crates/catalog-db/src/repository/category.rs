//! # Category Repository
//!
//! Explicit category management. Categories are also created implicitly by
//! the [`resolver`](crate::resolver) when products name them.
//!
//! Deleting a category removes its `product_categories` rows through
//! `ON DELETE CASCADE`; the products themselves stay.

use catalog_core::validation::validate_category_name;
use catalog_core::{Category, NewCategory, Page, PageRequest};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::{begin, finish};
use crate::resolver::{self, CATEGORY_COLUMNS};

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Gets a category by ID. `Ok(None)` when absent.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Category>> {
        let mut conn = self.pool.acquire().await?;
        find_by_id(&mut conn, id).await
    }

    /// Gets a category by its unique name, ignoring surrounding whitespace.
    /// `Ok(None)` when absent.
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Category>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        let mut conn = self.pool.acquire().await?;
        resolver::find(&mut conn, name).await
    }

    /// Lists categories, newest first, with the total count.
    pub async fn list(&self, offset: u32, limit: u32) -> DbResult<Page<Category>> {
        let page = PageRequest::new(offset, limit);
        debug!(offset = page.offset, limit = page.limit, "Listing categories");

        let mut tx = begin(&self.pool).await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&mut *tx)
            .await?;

        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories \
             ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2"
        );
        let items = sqlx::query_as::<_, Category>(&sql)
            .bind(page.limit as i64)
            .bind(page.offset as i64)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Page::new(items, total, page))
    }

    /// Creates a category.
    ///
    /// ## Returns
    /// * `Ok(Category)` - The stored row
    /// * `Err(DbError::UniqueViolation)` - Name already taken
    /// * `Err(DbError::Validation)` - Blank or over-long name
    pub async fn create(&self, category: &NewCategory) -> DbResult<Category> {
        let name = validate_category_name(&category.name)?;
        debug!(name = %name, "Creating category");

        let mut tx = begin(&self.pool).await?;
        let result = create_in(&mut tx, &name, category.description.as_deref()).await;
        finish(tx, result, "category.create").await
    }

    /// Overwrites a category's name and description.
    ///
    /// ## Returns
    /// * `Ok(Category)` - The stored row
    /// * `Err(DbError::NotFound)` - No category with that id
    /// * `Err(DbError::UniqueViolation)` - New name already taken
    pub async fn update(&self, category: &Category) -> DbResult<Category> {
        let name = validate_category_name(&category.name)?;
        debug!(id = category.id, name = %name, "Updating category");

        let mut tx = begin(&self.pool).await?;
        let result = update_in(&mut tx, category.id, &name, category.description.as_deref()).await;
        finish(tx, result, "category.update").await
    }

    /// Deletes a category and detaches it from every product.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Nothing was deleted
    pub async fn delete(&self, category: &Category) -> DbResult<()> {
        debug!(id = category.id, name = %category.name, "Deleting category");

        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(category.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", category.id));
        }

        Ok(())
    }
}

async fn create_in(
    conn: &mut SqliteConnection,
    name: &str,
    description: Option<&str>,
) -> DbResult<Category> {
    let inserted = resolver::insert(conn, name, description).await?;

    find_by_id(conn, inserted.id)
        .await?
        .ok_or_else(|| DbError::not_found("Category", inserted.id))
}

async fn update_in(
    conn: &mut SqliteConnection,
    id: i64,
    name: &str,
    description: Option<&str>,
) -> DbResult<Category> {
    let result = sqlx::query(
        "UPDATE categories SET name = ?2, description = ?3, updated_at = ?4 WHERE id = ?1",
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).with_unique_value("name", name))?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Category", id));
    }

    find_by_id(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Category", id))
}

async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Category>> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1");
    let category = sqlx::query_as::<_, Category>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(category)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{count_rows, seed_user, test_db};
    use catalog_core::NewProduct;

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;
        let repo = db.categories();

        let tea = repo
            .create(&NewCategory::new("  tea ").description("Loose leaf"))
            .await
            .unwrap();
        assert_eq!(tea.name, "tea");
        assert_eq!(tea.description.as_deref(), Some("Loose leaf"));

        assert_eq!(repo.get_by_id(tea.id).await.unwrap(), Some(tea.clone()));
        assert_eq!(repo.get_by_name("tea").await.unwrap(), Some(tea.clone()));
        assert_eq!(repo.get_by_name(" tea  ").await.unwrap(), Some(tea));
        assert!(repo.get_by_name("   ").await.unwrap().is_none());
        assert!(repo.get_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_blank_and_duplicate() {
        let db = test_db().await;
        let repo = db.categories();

        let err = repo.create(&NewCategory::new("   ")).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));

        repo.create(&NewCategory::new("tea")).await.unwrap();
        let err = repo.create(&NewCategory::new("tea")).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { ref field, ref value } if field == "name" && value == "tea"
        ));
        assert_eq!(count_rows(&db, "categories").await, 1);
    }

    #[tokio::test]
    async fn test_update() {
        let db = test_db().await;
        let repo = db.categories();

        let mut tea = repo.create(&NewCategory::new("tea")).await.unwrap();
        repo.create(&NewCategory::new("coffee")).await.unwrap();

        tea.name = "green tea".to_string();
        tea.description = Some("Unoxidised".to_string());
        let updated = repo.update(&tea).await.unwrap();
        assert_eq!(updated.id, tea.id);
        assert_eq!(updated.name, "green tea");
        assert_eq!(updated.created_at, tea.created_at);
        assert!(updated.updated_at >= tea.updated_at);

        tea.name = "coffee".to_string();
        let err = repo.update(&tea).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(
            repo.get_by_id(tea.id).await.unwrap().unwrap().name,
            "green tea"
        );
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let db = test_db().await;
        let repo = db.categories();

        let tea = repo.create(&NewCategory::new("tea")).await.unwrap();
        repo.delete(&tea).await.unwrap();

        assert!(repo.update(&tea).await.unwrap_err().is_not_found());
        assert!(repo.delete(&tea).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_detaches_products() {
        let db = test_db().await;
        let ada = seed_user(&db, "ada").await;

        let product = db
            .products()
            .create(&NewProduct::new(ada.id, "Teapot"), &["tea", "kitchen"])
            .await
            .unwrap();
        let tea = db.categories().get_by_name("tea").await.unwrap().unwrap();

        db.categories().delete(&tea).await.unwrap();

        let reloaded = db.products().get_by_slug(&product.slug).await.unwrap().unwrap();
        assert_eq!(reloaded.category_names(), vec!["kitchen"]);
        assert!(db
            .products()
            .list_by_category("tea", 0, 20)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_list_pages_newest_first() {
        let db = test_db().await;
        let repo = db.categories();

        for name in ["a", "b", "c"] {
            repo.create(&NewCategory::new(name)).await.unwrap();
        }

        let page = repo.list(0, 2).await.unwrap();
        assert_eq!(page.total_count, 3);
        let names: Vec<_> = page.items.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["c", "b"]);
        assert!(page.has_more());

        let rest = repo.list(2, 2).await.unwrap();
        assert_eq!(rest.items.len(), 1);
        assert_eq!(rest.items[0].name, "a");
    }
}
