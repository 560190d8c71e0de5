//! # Domain Types
//!
//! Records returned by the persistence layer and the commands it accepts.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Category     │   │      User       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (i64)       │◄─►│  id (i64)       │   │  id (i64)       │       │
//! │  │  slug (unique)  │   │  name (unique)  │   │  username       │       │
//! │  │  title          │   │  description    │   │  email          │       │
//! │  │  owner_id (FK) ─┼───┼─────────────────┼──►│  password_hash  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │        many-to-many via product_categories                              │
//! │                                                                         │
//! │  Commands (what callers hand in):                                      │
//! │  NewProduct, ProductUpdate, NewCategory, NewUser                       │
//! │                                                                         │
//! │  Results (what callers get back):                                      │
//! │  Product (hydrated), Category, User, Page<T>                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Records Are Values
//! Repository calls take commands by reference and return freshly loaded
//! records. Nothing here is mutated behind the caller's back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::slug::slugify;
use crate::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

// =============================================================================
// User
// =============================================================================

/// An owner of products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,

    /// Already hashed by the caller. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub bio: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Command for registering a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        NewUser {
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
        }
    }
}

// =============================================================================
// Category
// =============================================================================

/// A classification products can belong to.
///
/// `name` is the natural key: products declare their categories by name and
/// the resolver looks them up by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Command for creating a category explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        NewCategory {
            name: name.into(),
            description: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog entry, hydrated with whatever associations were requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Surrogate key, assigned by the store.
    pub id: i64,

    /// Unique, derived from the title.
    pub slug: String,

    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,

    /// Set once at creation, never changed.
    pub owner_id: i64,

    /// Populated when the owner is eager-loaded.
    pub owner: Option<User>,

    /// Sorted by name. Empty when categories were not eager-loaded.
    pub categories: Vec<Category>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Names of the associated categories, in the order they were loaded.
    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    /// Whether `user_id` owns this product.
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_id == user_id
    }
}

/// Command for creating a product.
///
/// The slug is derived from the title on construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub owner_id: i64,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl NewProduct {
    pub fn new(owner_id: i64, title: impl Into<String>) -> Self {
        let title = title.into();
        NewProduct {
            owner_id,
            slug: slugify(&title),
            title,
            description: None,
            image: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// Full desired state of a product's scalar fields.
///
/// Start from the stored record with [`ProductUpdate::from_product`] and
/// change what needs changing. Setting a new title regenerates the slug.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl ProductUpdate {
    pub fn from_product(product: &Product) -> Self {
        ProductUpdate {
            id: product.id,
            slug: product.slug.clone(),
            title: product.title.clone(),
            description: product.description.clone(),
            image: product.image.clone(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self.slug = slugify(&self.title);
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn image(mut self, image: Option<String>) -> Self {
        self.image = image;
        self
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Offset/limit window after the page-size rules have been applied.
///
/// - `limit == 0` means [`DEFAULT_PAGE_LIMIT`]
/// - anything above [`MAX_PAGE_LIMIT`] is clamped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(offset: u32, limit: u32) -> Self {
        let limit = match limit {
            0 => DEFAULT_PAGE_LIMIT,
            l if l > MAX_PAGE_LIMIT => MAX_PAGE_LIMIT,
            l => l,
        };
        PageRequest { offset, limit }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(0, DEFAULT_PAGE_LIMIT)
    }
}

/// One page of results plus the size of the whole (filtered) set.
///
/// `total_count` is counted independently of the page, so it is not the
/// length of `items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub offset: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: i64, request: PageRequest) -> Self {
        Page {
            items,
            total_count,
            offset: request.offset,
            limit: request.limit,
        }
    }

    /// Whether rows exist past the end of this page.
    pub fn has_more(&self) -> bool {
        (self.offset as i64) + (self.items.len() as i64) < self.total_count
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            offset: self.offset,
            limit: self.limit,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        let now = Utc::now();
        Product {
            id: 1,
            slug: "blue-mug".to_string(),
            title: "Blue Mug".to_string(),
            description: Some("Stoneware".to_string()),
            image: None,
            owner_id: 9,
            owner: None,
            categories: vec![Category {
                id: 4,
                name: "kitchen".to_string(),
                description: None,
                created_at: now,
                updated_at: now,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_new_product_derives_slug() {
        let p = NewProduct::new(1, "Red Kettle (1.7L)").image("kettle.png");
        assert_eq!(p.slug, "red-kettle-1-7l");
        assert_eq!(p.image.as_deref(), Some("kettle.png"));
        assert!(p.description.is_none());
    }

    #[test]
    fn test_update_regenerates_slug_on_title_change() {
        let update = ProductUpdate::from_product(&sample_product());
        assert_eq!(update.slug, "blue-mug");

        let update = update.title("Green Mug");
        assert_eq!(update.slug, "green-mug");
        assert_eq!(update.description.as_deref(), Some("Stoneware"));
    }

    #[test]
    fn test_product_helpers() {
        let p = sample_product();
        assert_eq!(p.category_names(), vec!["kitchen"]);
        assert!(p.is_owned_by(9));
        assert!(!p.is_owned_by(10));
    }

    #[test]
    fn test_page_request_clamps() {
        assert_eq!(PageRequest::new(0, 0).limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(PageRequest::new(5, 1000).limit, MAX_PAGE_LIMIT);
        assert_eq!(PageRequest::new(5, 7), PageRequest { offset: 5, limit: 7 });
    }

    #[test]
    fn test_page_has_more() {
        let page = Page::new(vec![1], 2, PageRequest::new(0, 1));
        assert!(page.has_more());

        let last = Page::new(vec![2], 2, PageRequest::new(1, 1));
        assert!(!last.has_more());

        let doubled = last.map(|n| n * 2);
        assert_eq!(doubled.items, vec![4]);
        assert_eq!(doubled.total_count, 2);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: 1,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            bio: None,
            image: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("secret"));
    }
}
