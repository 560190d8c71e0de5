//! # Repository Module
//!
//! Database repository implementations for the catalog.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  Calling service                                                       │
//! │       │                                                                 │
//! │       │  db.products().create(&new_product, &["tea", "mugs"])          │
//! │       ▼                                                                 │
//! │  ProductRepository ─────────────┐                                      │
//! │  ├── get_by_slug / get_owned_by_slug                                   │
//! │  ├── create / update / delete   │ resolve names inside the same tx     │
//! │  └── list / list_by_category /  ▼                                      │
//! │      list_by_owner          resolver (find / resolve / resolve_all)    │
//! │                                                                         │
//! │  CategoryRepository  - explicit category CRUD + listing                │
//! │  UserRepository      - owner records                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Products and their category set
//! - [`CategoryRepository`](category::CategoryRepository) - Category CRUD and listing
//! - [`UserRepository`](user::UserRepository) - Owner records

pub mod category;
pub mod product;
pub mod user;

/// Which associations a product read populates.
///
/// Nothing is loaded lazily: whatever is switched off here comes back as an
/// empty `categories` vector or a `None` owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Include {
    pub categories: bool,
    pub owner: bool,
}

impl Include {
    pub const ALL: Include = Include {
        categories: true,
        owner: true,
    };

    pub const NONE: Include = Include {
        categories: false,
        owner: false,
    };

    pub const CATEGORIES: Include = Include {
        categories: true,
        owner: false,
    };
}

impl Default for Include {
    fn default() -> Self {
        Include::ALL
    }
}
