//! # Validation Module
//!
//! Input rules checked before a command reaches the store.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Calling service                                              │
//! │  └── Request shape, authentication, ownership                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Non-blank title, non-empty slug                                   │
//! │  └── Category name normalization (trim, dedupe, length)                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE (slug, category name, username, email)                     │
//! │  └── Foreign keys (owner, join rows)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{NewProduct, ProductUpdate};
use crate::{MAX_CATEGORY_NAME_LEN, MAX_TITLE_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Product Fields
// =============================================================================

/// Validates a product title.
///
/// ## Rules
/// - Must not be blank
/// - At most [`MAX_TITLE_LEN`] characters
///
/// ```rust
/// use catalog_core::validation::validate_title;
///
/// assert!(validate_title("Blue Mug").is_ok());
/// assert!(validate_title("   ").is_err());
/// ```
pub fn validate_title(title: &str) -> ValidationResult<()> {
    let title = title.trim();

    if title.is_empty() {
        return Err(ValidationError::required("title"));
    }

    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::too_long("title", MAX_TITLE_LEN));
    }

    Ok(())
}

/// Validates a slug. A title made only of punctuation slugifies to nothing.
pub fn validate_slug(slug: &str) -> ValidationResult<()> {
    if slug.is_empty() {
        return Err(ValidationError::InvalidFormat {
            field: "slug".to_string(),
            reason: "title must contain at least one letter or digit".to_string(),
        });
    }

    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "slug".to_string(),
            reason: "must contain only lowercase letters, digits and hyphens".to_string(),
        });
    }

    Ok(())
}

pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_title(&product.title)?;
    validate_slug(&product.slug)
}

pub fn validate_product_update(update: &ProductUpdate) -> ValidationResult<()> {
    validate_title(&update.title)?;
    validate_slug(&update.slug)
}

// =============================================================================
// Category Names
// =============================================================================

/// Validates a single category name and returns it trimmed.
pub fn validate_category_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("category"));
    }

    if name.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(ValidationError::too_long("category", MAX_CATEGORY_NAME_LEN));
    }

    Ok(name.to_string())
}

/// Normalizes a caller-supplied list of category names.
///
/// - Names are trimmed
/// - Blank entries are dropped
/// - Duplicates are removed, keeping the first occurrence
/// - Any name longer than [`MAX_CATEGORY_NAME_LEN`] rejects the whole list
///
/// Matching is exact after trimming: `"Kitchen"` and `"kitchen"` are two
/// different categories.
///
/// ```rust
/// use catalog_core::validation::normalize_category_names;
///
/// let names = normalize_category_names(&[" a", "b", "", "a "]).unwrap();
/// assert_eq!(names, vec!["a", "b"]);
/// ```
pub fn normalize_category_names<S: AsRef<str>>(names: &[S]) -> ValidationResult<Vec<String>> {
    let mut seen = HashSet::with_capacity(names.len());
    let mut normalized = Vec::with_capacity(names.len());

    for raw in names {
        if raw.as_ref().trim().is_empty() {
            continue;
        }
        let name = validate_category_name(raw.as_ref())?;
        if seen.insert(name.clone()) {
            normalized.push(name);
        }
    }

    Ok(normalized)
}

// =============================================================================
// Users
// =============================================================================

pub fn validate_username(username: &str) -> ValidationResult<()> {
    if username.trim().is_empty() {
        return Err(ValidationError::required("username"));
    }
    Ok(())
}

/// Shallow email check; deliverability is the caller's problem.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "expected local@domain".to_string(),
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Blue Mug").is_ok());
        assert_eq!(
            validate_title("  "),
            Err(ValidationError::required("title"))
        );
        assert!(validate_title(&"x".repeat(MAX_TITLE_LEN + 1)).is_err());
    }

    #[test]
    fn test_punctuation_only_title_rejected_by_slug() {
        let product = NewProduct::new(1, "!!!");
        assert!(validate_title(&product.title).is_ok());
        assert!(matches!(
            validate_new_product(&product),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_validate_slug_charset() {
        assert!(validate_slug("blue-mug-2").is_ok());
        assert!(validate_slug("Blue Mug").is_err());
    }

    #[test]
    fn test_normalize_category_names() {
        let names = normalize_category_names(&["  tea ", "mugs", "tea", "", "   "]).unwrap();
        assert_eq!(names, vec!["tea".to_string(), "mugs".to_string()]);

        let empty: Vec<String> = normalize_category_names::<&str>(&[]).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_normalize_is_case_sensitive() {
        let names = normalize_category_names(&["Tea", "tea"]).unwrap();
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_normalize_rejects_long_name() {
        let long = "c".repeat(MAX_CATEGORY_NAME_LEN + 1);
        assert_eq!(
            normalize_category_names(&[long]),
            Err(ValidationError::too_long("category", MAX_CATEGORY_NAME_LEN))
        );
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("ada").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("").is_err());
    }
}
