//! Title to slug mapping.
//!
//! Deterministic and pure. The store, not this function, is responsible for
//! uniqueness: two titles that map to the same slug collide on the
//! `products.slug` unique index.

use crate::MAX_SLUG_LEN;

/// Turns a product title into a lowercase, hyphen-separated slug.
///
/// ASCII letters and digits are kept (lowercased); every other run of
/// characters collapses into a single `-`. Leading and trailing separators
/// are dropped and the result is capped at [`MAX_SLUG_LEN`] bytes.
///
/// ```rust
/// use catalog_core::slugify;
///
/// assert_eq!(slugify("Hello, World!"), "hello-world");
/// assert_eq!(slugify("  --Rust  2021--  "), "rust-2021");
/// ```
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_separators() {
        assert_eq!(slugify("Blue   Mug -- 350ml"), "blue-mug-350ml");
        assert_eq!(slugify("a_b.c/d"), "a-b-c-d");
    }

    #[test]
    fn test_trims_edges() {
        assert_eq!(slugify("!!Sale!!"), "sale");
        assert_eq!(slugify("   "), "");
    }

    #[test]
    fn test_non_ascii_acts_as_separator() {
        assert_eq!(slugify("Crème brûlée"), "cr-me-br-l-e");
    }

    #[test]
    fn test_same_slug_for_equivalent_titles() {
        assert_eq!(slugify("Blue Mug"), slugify("blue  mug!"));
    }

    #[test]
    fn test_length_cap() {
        let long = "ab ".repeat(100);
        let slug = slugify(&long);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }
}
