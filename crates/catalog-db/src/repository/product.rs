//! # Product Repository
//!
//! Products, their owner and their category set.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              create(product, ["tea", "mugs"])                           │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │   ├── INSERT INTO products ... RETURNING        (slug must be unique)  │
//! │   ├── resolve "tea"  → existing row                                    │
//! │   ├── resolve "mugs" → not found → INSERT INTO categories              │
//! │   ├── attach(product, tea)                                             │
//! │   ├── attach(product, mugs)                                            │
//! │   └── reload product + categories + owner                              │
//! │  COMMIT            (any error above → ROLLBACK, nothing persists)      │
//! │                                                                         │
//! │              update(product, ["mugs", "gifts"])                         │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │   ├── UPDATE products SET slug, title, ... , updated_at                │
//! │   ├── resolve names under the configured MissingCategoryPolicy         │
//! │   ├── set_associations(product, {mugs, gifts})                         │
//! │   │     current {tea, mugs} → detach tea, keep mugs, attach gifts      │
//! │   └── reload                                                           │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Read Path
//! Reads fetch product rows first, then hydrate the whole batch with one
//! query for categories and one for owners, as selected by [`Include`].
//! Listings run the count and the page query in one read transaction so the
//! total matches the snapshot the page came from.

use std::collections::{BTreeSet, HashMap};

use catalog_core::validation::{
    normalize_category_names, validate_new_product, validate_product_update, validate_slug,
};
use catalog_core::{
    slugify, Category, NewProduct, Page, PageRequest, Product, ProductUpdate, User,
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::{begin, finish};
use crate::repository::user;
use crate::repository::Include;
use crate::resolver::{self, MissingCategoryPolicy};

/// Columns of `products`, for INSERT/UPDATE ... RETURNING.
const PRODUCT_FIELDS: &str =
    "id, slug, title, description, image, owner_id, created_at, updated_at";

/// Same columns qualified with the `p` alias, for joins.
const PRODUCT_COLUMNS: &str =
    "p.id, p.slug, p.title, p.description, p.image, p.owner_id, p.created_at, p.updated_at";

/// A bare `products` row, before hydration.
#[derive(Debug, Clone, FromRow)]
struct ProductRow {
    id: i64,
    slug: String,
    title: String,
    description: Option<String>,
    image: Option<String>,
    owner_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self, owner: Option<User>, categories: Vec<Category>) -> Product {
        Product {
            id: self.id,
            slug: self.slug,
            title: self.title,
            description: self.description,
            image: self.image,
            owner_id: self.owner_id,
            owner,
            categories,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CategoryLink {
    product_id: i64,
    #[sqlx(flatten)]
    category: Category,
}

/// What [`set_associations`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationDiff {
    pub attached: Vec<i64>,
    pub detached: Vec<i64>,
    pub kept: usize,
}

impl AssociationDiff {
    pub fn is_unchanged(&self) -> bool {
        self.attached.is_empty() && self.detached.is_empty()
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let created = repo.create(&NewProduct::new(owner_id, "Blue Mug"), &["kitchen"]).await?;
/// let page = repo.list_by_category("kitchen", 0, 20).await?;
///
/// // Skip owner hydration for a listing that does not show it
/// let page = repo.including(Include::CATEGORIES).list(0, 20).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    include: Include,
    missing_categories: MissingCategoryPolicy,
}

impl ProductRepository {
    /// Creates a new ProductRepository that eager-loads everything and
    /// creates unknown categories on update.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository {
            pool,
            include: Include::ALL,
            missing_categories: MissingCategoryPolicy::default(),
        }
    }

    /// Sets which associations reads populate.
    pub fn including(mut self, include: Include) -> Self {
        self.include = include;
        self
    }

    /// Sets what `update` does with category names that do not exist.
    ///
    /// `create` always creates them.
    pub fn missing_categories(mut self, policy: MissingCategoryPolicy) -> Self {
        self.missing_categories = policy;
        self
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Gets a product by its slug.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found, hydrated per [`Include`]
    /// * `Ok(None)` - No product with that slug
    pub async fn get_by_slug(&self, slug: &str) -> DbResult<Option<Product>> {
        debug!(slug = %slug, "Fetching product by slug");

        let mut conn = self.pool.acquire().await?;
        let row = find_row_by_slug(&mut conn, slug, None).await?;
        hydrate_one(&mut conn, row, self.include).await
    }

    /// Gets a product by slug, only if `owner_id` owns it.
    ///
    /// A product that exists but belongs to someone else is `Ok(None)`.
    pub async fn get_owned_by_slug(&self, owner_id: i64, slug: &str) -> DbResult<Option<Product>> {
        debug!(owner_id, slug = %slug, "Fetching owned product by slug");

        let mut conn = self.pool.acquire().await?;
        let row = find_row_by_slug(&mut conn, slug, Some(owner_id)).await?;
        hydrate_one(&mut conn, row, self.include).await
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Creates a product and associates it with `category_names`.
    ///
    /// Unknown names become new categories. Runs in one transaction.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The stored product, hydrated
    /// * `Err(DbError::UniqueViolation)` - Slug already taken
    /// * `Err(DbError::ForeignKeyViolation)` - Owner does not exist
    /// * `Err(DbError::Validation)` - Blank title, bad category name
    pub async fn create<S: AsRef<str>>(
        &self,
        product: &NewProduct,
        category_names: &[S],
    ) -> DbResult<Product> {
        validate_new_product(product)?;
        let names = normalize_category_names(category_names)?;

        debug!(
            slug = %product.slug,
            owner_id = product.owner_id,
            categories = names.len(),
            "Creating product"
        );

        let mut tx = begin(&self.pool).await?;
        let result = create_in(&mut tx, product, &names, self.include).await;
        finish(tx, result, "product.create").await
    }

    /// Overwrites a product's scalar fields and replaces its category set.
    ///
    /// The owner is never changed. When the title differs from the stored
    /// one the slug is re-derived from it, so assigning `title` directly
    /// behaves like [`ProductUpdate::title`]. Names that do not resolve are handled per
    /// [`MissingCategoryPolicy`]. Runs in one transaction.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The stored product, hydrated
    /// * `Err(DbError::NotFound)` - The product no longer exists
    /// * `Err(DbError::UniqueViolation)` - New slug already taken
    pub async fn update<S: AsRef<str>>(
        &self,
        product: &ProductUpdate,
        category_names: &[S],
    ) -> DbResult<Product> {
        validate_product_update(product)?;
        let names = normalize_category_names(category_names)?;

        debug!(
            id = product.id,
            slug = %product.slug,
            categories = names.len(),
            "Updating product"
        );

        let mut tx = begin(&self.pool).await?;
        let result = update_in(
            &mut tx,
            product,
            &names,
            self.missing_categories,
            self.include,
        )
        .await;
        finish(tx, result, "product.update").await
    }

    /// Deletes a product. Its category associations go with it; the
    /// categories themselves stay.
    ///
    /// Scoped to the record's owner: a row with the same id but a different
    /// owner is not touched.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Nothing was deleted
    pub async fn delete(&self, product: &Product) -> DbResult<()> {
        debug!(id = product.id, slug = %product.slug, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1 AND owner_id = ?2")
            .bind(product.id)
            .bind(product.owner_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.slug));
        }

        Ok(())
    }

    // =========================================================================
    // Listings
    // =========================================================================

    /// Lists all products, newest first.
    ///
    /// `total_count` covers every product, not just this page.
    pub async fn list(&self, offset: u32, limit: u32) -> DbResult<Page<Product>> {
        let page = PageRequest::new(offset, limit);
        debug!(offset = page.offset, limit = page.limit, "Listing products");

        let mut tx = begin(&self.pool).await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&mut *tx)
            .await?;

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             ORDER BY p.created_at DESC, p.id DESC LIMIT ?1 OFFSET ?2"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(page.limit as i64)
            .bind(page.offset as i64)
            .fetch_all(&mut *tx)
            .await?;

        let items = hydrate(&mut tx, rows, self.include).await?;
        tx.commit().await?;

        Ok(Page::new(items, total, page))
    }

    /// Lists the products in the category called `name`, newest first.
    ///
    /// `name` is trimmed the same way names are on create and update.
    ///
    /// ## Returns
    /// * `Ok(Page)` - Possibly empty when the category has no products
    /// * `Err(DbError::NotFound)` - No category with that name
    pub async fn list_by_category(
        &self,
        name: &str,
        offset: u32,
        limit: u32,
    ) -> DbResult<Page<Product>> {
        let name = name.trim();
        let page = PageRequest::new(offset, limit);
        debug!(category = %name, offset = page.offset, limit = page.limit, "Listing products by category");

        let mut tx = begin(&self.pool).await?;

        let category = resolver::find(&mut tx, name)
            .await?
            .ok_or_else(|| DbError::not_found("Category", name))?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM product_categories WHERE category_id = ?1")
                .bind(category.id)
                .fetch_one(&mut *tx)
                .await?;

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             INNER JOIN product_categories pc ON pc.product_id = p.id \
             WHERE pc.category_id = ?1 \
             ORDER BY p.created_at DESC, p.id DESC LIMIT ?2 OFFSET ?3"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(category.id)
            .bind(page.limit as i64)
            .bind(page.offset as i64)
            .fetch_all(&mut *tx)
            .await?;

        let items = hydrate(&mut tx, rows, self.include).await?;
        tx.commit().await?;

        Ok(Page::new(items, total, page))
    }

    /// Lists the products owned by `username`, newest first.
    ///
    /// ## Returns
    /// * `Ok(Page)` - Possibly empty when the user owns nothing
    /// * `Err(DbError::NotFound)` - No user with that username
    pub async fn list_by_owner(
        &self,
        username: &str,
        offset: u32,
        limit: u32,
    ) -> DbResult<Page<Product>> {
        let page = PageRequest::new(offset, limit);
        debug!(owner = %username, offset = page.offset, limit = page.limit, "Listing products by owner");

        let mut tx = begin(&self.pool).await?;

        let owner = user::find_by_username(&mut tx, username)
            .await?
            .ok_or_else(|| DbError::not_found("User", username))?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE owner_id = ?1")
            .bind(owner.id)
            .fetch_one(&mut *tx)
            .await?;

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.owner_id = ?1 \
             ORDER BY p.created_at DESC, p.id DESC LIMIT ?2 OFFSET ?3"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(owner.id)
            .bind(page.limit as i64)
            .bind(page.offset as i64)
            .fetch_all(&mut *tx)
            .await?;

        let items = hydrate(&mut tx, rows, self.include).await?;
        tx.commit().await?;

        Ok(Page::new(items, total, page))
    }
}

// =============================================================================
// Transaction bodies
// =============================================================================

async fn create_in(
    conn: &mut SqliteConnection,
    product: &NewProduct,
    category_names: &[String],
    include: Include,
) -> DbResult<Product> {
    let now = Utc::now();
    let sql = format!(
        "INSERT INTO products (slug, title, description, image, owner_id, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6) RETURNING {PRODUCT_FIELDS}"
    );

    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(&product.slug)
        .bind(product.title.trim())
        .bind(&product.description)
        .bind(&product.image)
        .bind(product.owner_id)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| DbError::from(e).with_unique_value("slug", &product.slug))?;

    let resolved =
        resolver::resolve_all(conn, category_names, MissingCategoryPolicy::Create).await?;
    for r in &resolved {
        attach(conn, row.id, r.category.id).await?;
    }

    debug!(
        id = row.id,
        attached = resolved.len(),
        created_categories = resolved.iter().filter(|r| r.created).count(),
        "Product inserted"
    );

    reload(conn, row.id, include).await
}

async fn update_in(
    conn: &mut SqliteConnection,
    product: &ProductUpdate,
    category_names: &[String],
    policy: MissingCategoryPolicy,
    include: Include,
) -> DbResult<Product> {
    let title = product.title.trim();

    let stored_title: String = sqlx::query_scalar("SELECT title FROM products WHERE id = ?1")
        .bind(product.id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Product", product.id))?;

    // A changed title always gets a fresh slug, however the title was set.
    let slug = if title == stored_title {
        product.slug.clone()
    } else {
        let slug = slugify(title);
        validate_slug(&slug)?;
        slug
    };

    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE products SET
            slug = ?2,
            title = ?3,
            description = ?4,
            image = ?5,
            updated_at = ?6
        WHERE id = ?1
        "#,
    )
    .bind(product.id)
    .bind(&slug)
    .bind(title)
    .bind(&product.description)
    .bind(&product.image)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).with_unique_value("slug", &slug))?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", product.id));
    }

    let resolved = resolver::resolve_all(conn, category_names, policy).await?;
    let desired: Vec<i64> = resolved.iter().map(|r| r.category.id).collect();
    let diff = set_associations(conn, product.id, &desired).await?;

    debug!(
        id = product.id,
        attached = diff.attached.len(),
        detached = diff.detached.len(),
        kept = diff.kept,
        "Product updated"
    );

    reload(conn, product.id, include).await
}

async fn reload(conn: &mut SqliteConnection, id: i64, include: Include) -> DbResult<Product> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ?1");
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    hydrate_one(conn, row, include)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))
}

// =============================================================================
// Associations
// =============================================================================

/// Adds `category_id` to the product's category set.
///
/// Returns `false` when the pair was already present. Runs on whatever
/// connection or transaction the caller holds.
pub async fn attach(
    conn: &mut SqliteConnection,
    product_id: i64,
    category_id: i64,
) -> DbResult<bool> {
    let result = sqlx::query(
        "INSERT INTO product_categories (product_id, category_id) VALUES (?1, ?2) \
         ON CONFLICT (product_id, category_id) DO NOTHING",
    )
    .bind(product_id)
    .bind(category_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Replaces the product's whole category set with `category_ids`.
///
/// Memberships missing from `category_ids` are removed, new ones are added,
/// and the rest are left as they are. Run it inside the transaction of the
/// mutation that owns the change.
pub async fn set_associations(
    conn: &mut SqliteConnection,
    product_id: i64,
    category_ids: &[i64],
) -> DbResult<AssociationDiff> {
    let current: BTreeSet<i64> =
        sqlx::query_scalar::<_, i64>("SELECT category_id FROM product_categories WHERE product_id = ?1")
            .bind(product_id)
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .collect();
    let desired: BTreeSet<i64> = category_ids.iter().copied().collect();

    let mut diff = AssociationDiff {
        kept: current.intersection(&desired).count(),
        ..AssociationDiff::default()
    };

    for &category_id in current.difference(&desired) {
        sqlx::query("DELETE FROM product_categories WHERE product_id = ?1 AND category_id = ?2")
            .bind(product_id)
            .bind(category_id)
            .execute(&mut *conn)
            .await?;
        diff.detached.push(category_id);
    }

    for &category_id in desired.difference(&current) {
        attach(conn, product_id, category_id).await?;
        diff.attached.push(category_id);
    }

    Ok(diff)
}

// =============================================================================
// Row loading and hydration
// =============================================================================

async fn find_row_by_slug(
    conn: &mut SqliteConnection,
    slug: &str,
    owner_id: Option<i64>,
) -> DbResult<Option<ProductRow>> {
    let row = match owner_id {
        Some(owner_id) => {
            let sql = format!(
                "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.slug = ?1 AND p.owner_id = ?2"
            );
            sqlx::query_as::<_, ProductRow>(&sql)
                .bind(slug)
                .bind(owner_id)
                .fetch_optional(&mut *conn)
                .await?
        }
        None => {
            let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.slug = ?1");
            sqlx::query_as::<_, ProductRow>(&sql)
                .bind(slug)
                .fetch_optional(&mut *conn)
                .await?
        }
    };

    Ok(row)
}

async fn hydrate_one(
    conn: &mut SqliteConnection,
    row: Option<ProductRow>,
    include: Include,
) -> DbResult<Option<Product>> {
    match row {
        Some(row) => Ok(hydrate(conn, vec![row], include).await?.pop()),
        None => Ok(None),
    }
}

/// Attaches categories and owners to a batch of rows, preserving row order.
async fn hydrate(
    conn: &mut SqliteConnection,
    rows: Vec<ProductRow>,
    include: Include,
) -> DbResult<Vec<Product>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut categories = if include.categories {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        categories_for(conn, &ids).await?
    } else {
        HashMap::new()
    };

    let owners = if include.owner {
        let mut owner_ids: Vec<i64> = rows.iter().map(|r| r.owner_id).collect();
        owner_ids.sort_unstable();
        owner_ids.dedup();
        user::find_many(conn, &owner_ids).await?
    } else {
        HashMap::new()
    };

    Ok(rows
        .into_iter()
        .map(|row| {
            let cats = categories.remove(&row.id).unwrap_or_default();
            let owner = owners.get(&row.owner_id).cloned();
            row.into_product(owner, cats)
        })
        .collect())
}

/// Categories of every product in `product_ids`, each list sorted by name.
async fn categories_for(
    conn: &mut SqliteConnection,
    product_ids: &[i64],
) -> DbResult<HashMap<i64, Vec<Category>>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT pc.product_id, c.id, c.name, c.description, c.created_at, c.updated_at \
         FROM product_categories pc \
         INNER JOIN categories c ON c.id = pc.category_id \
         WHERE pc.product_id IN (",
    );
    let mut separated = qb.separated(", ");
    for id in product_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY c.name, c.id");

    let links: Vec<CategoryLink> = qb.build_query_as().fetch_all(&mut *conn).await?;

    let mut by_product: HashMap<i64, Vec<Category>> = HashMap::new();
    for link in links {
        by_product
            .entry(link.product_id)
            .or_default()
            .push(link.category);
    }

    Ok(by_product)
}

// =============================================================================
// Unit Tests
// =============================================================================
