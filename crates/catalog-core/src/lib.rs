//! # catalog-core: Pure Domain Types for the Catalog
//!
//! Records, slug generation and validation rules shared by the persistence
//! layer and whatever service sits in front of it. Nothing in here touches a
//! database, a socket or the file system.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Catalog Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Calling service (HTTP, auth, hashing)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ NewProduct / ProductUpdate             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ catalog-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                  │   │
//! │  │   │   types   │  │   slug    │  │ validation│                  │   │
//! │  │   │  Product  │  │  slugify  │  │   rules   │                  │   │
//! │  │   │  Category │  │           │  │  paging   │                  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  catalog-db (Database Layer)                    │   │
//! │  │        SQLite, transactions, resolver, repositories             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Records (Product, Category, User, Page) and command DTOs
//! - [`slug`] - Title to URL-safe slug mapping
//! - [`validation`] - Input rules applied before anything reaches the store
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use catalog_core::NewProduct;
//!
//! let product = NewProduct::new(7, "Blue Mug, 350ml").description("Stoneware");
//!
//! assert_eq!(product.slug, "blue-mug-350ml");
//! assert_eq!(product.owner_id, 7);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod slug;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::ValidationError;
pub use slug::slugify;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Page size used when a caller asks for `limit = 0`.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Upper bound on a single page, regardless of what the caller asks for.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Longest accepted product title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Longest accepted category name, in characters.
pub const MAX_CATEGORY_NAME_LEN: usize = 64;

/// Longest slug produced by [`slugify`], in bytes.
pub const MAX_SLUG_LEN: usize = 96;
