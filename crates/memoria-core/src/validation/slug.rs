//! Slug generation and validation.
//!
//! Slugs identify memorial pages in URLs: lowercase ASCII, digits, and
//! single hyphens. `slugify` folds the accented characters common in the
//! titles this service sees; anything else non-alphanumeric collapses to a
//! hyphen.

use anyhow::{Context, Result};
use regex::Regex;

use crate::error::AppError;

/// Maximum slug length, matching the column width.
pub const MAX_SLUG_LENGTH: usize = 120;

fn fold_char(c: char) -> Option<char> {
    let folded = match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        _ => return None,
    };
    Some(folded)
}

/// Derive a URL-safe slug from a free-text title.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_hyphen = true; // suppress leading hyphens
    for c in text.to_lowercase().chars() {
        let c = fold_char(c).unwrap_or(c);
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            out.push('-');
            last_was_hyphen = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out.truncate(MAX_SLUG_LENGTH);
    while out.ends_with('-') {
        out.pop();
    }
    out
}

fn slug_pattern() -> Result<Regex> {
    Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").context("Failed to compile slug validation regex")
}

/// Validate an operator-supplied slug.
pub fn validate_slug(slug: &str) -> Result<(), AppError> {
    if slug.is_empty() {
        return Err(AppError::InvalidInput("Slug cannot be empty".to_string()));
    }
    if slug.len() > MAX_SLUG_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "Slug exceeds maximum length of {} characters",
            MAX_SLUG_LENGTH
        )));
    }
    let pattern = slug_pattern()
        .map_err(|e| AppError::Internal(format!("slug validation unavailable: {}", e)))?;
    if !pattern.is_match(slug) {
        return Err(AppError::InvalidInput(format!(
            "Slug '{}' is invalid. Allowed: lowercase letters, digits, single hyphens",
            slug
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("En memoria de la Abuela Ana"), "en-memoria-de-la-abuela-ana");
    }

    #[test]
    fn test_slugify_accents() {
        assert_eq!(slugify("José María Ñoño"), "jose-maria-nono");
    }

    #[test]
    fn test_slugify_strips_edges() {
        assert_eq!(slugify("  --Hola, mundo!--  "), "hola-mundo");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("abuela-ana-2024").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Abuela").is_err());
        assert!(validate_slug("doble--guion").is_err());
        assert!(validate_slug("-inicial").is_err());
    }

    #[test]
    fn test_slugify_output_validates() {
        for title in ["En memoria de la Abuela Ana", "José!", "a  b", "2024"] {
            let slug = slugify(title);
            assert!(validate_slug(&slug).is_ok(), "slug {:?} from {:?}", slug, title);
        }
    }
}
