//! # catalog-db: Database Layer for the Catalog
//!
//! Persistence for products, categories and their many-to-many relationship.
//! Uses SQLite through sqlx; every multi-row write is a single transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Catalog Data Flow                                │
//! │                                                                         │
//! │  HTTP handler / CLI (outside this crate)                               │
//! │       │  authenticated owner id + NewProduct + ["tea", "mugs"]         │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   catalog-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ CategoryRepo  │    │ 001_initial_ │  │   │
//! │  │   │ begin/finish  │    │ UserRepo      │    │  schema.sql  │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                               │   │
//! │  │                         resolver.rs (name → category row)      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL, foreign keys ON)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration and transaction lifecycle
//! - [`config`] - TOML + environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`resolver`] - Category name resolution (get-or-create)
//! - [`repository`] - Product, category and user repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use catalog_core::NewProduct;
//! use catalog_db::{CatalogConfig, Database};
//!
//! let config = CatalogConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let mug = db
//!     .products()
//!     .create(&NewProduct::new(owner.id, "Blue Mug"), &["kitchen", "mugs"])
//!     .await?;
//!
//! let page = db.products().list_by_category("mugs", 0, 20).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod resolver;

#[cfg(test)]
mod test_utils;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{CatalogConfig, ConfigError};
pub use error::{DbError, DbResult};
pub use pool::{finish, Database, DbConfig, Tx};
pub use resolver::MissingCategoryPolicy;

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::product::{AssociationDiff, ProductRepository};
pub use repository::user::UserRepository;
pub use repository::Include;
