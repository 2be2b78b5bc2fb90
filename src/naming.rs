//! Slug conventions shared by posts and heading anchors.
//!
//! Post slugs become directory names (`blog/{slug}/index.html`) and URL path
//! segments, so they are held to a strict lowercase-ASCII form and rejected
//! at load time if they don't match. Heading anchors are *derived* instead:
//! [`slugify`] folds arbitrary heading text into the same alphabet.
//!
//! ## Slug alphabet
//!
//! - lowercase ASCII letters and digits
//! - single dashes between words, never leading, trailing, or doubled
//!
//! ```text
//! "hello-world"   valid
//! "2024-recap"    valid
//! "Hello"         invalid (uppercase)
//! "a--b"          invalid (doubled dash)
//! "-draft"        invalid (leading dash)
//! ```

/// Check whether `slug` is non-empty and uses only the URL-safe slug alphabet.
pub fn is_valid_slug(slug: &str) -> bool {
    if slug.is_empty() || slug.starts_with('-') || slug.ends_with('-') || slug.contains("--") {
        return false;
    }
    slug.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Fold free text into a slug: lowercase alphanumerics joined by single dashes.
///
/// Non-ASCII alphanumerics are kept (lowercased) so headings in other
/// scripts still produce a usable anchor. Returns `"section"` when nothing
/// usable remains.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_slug_is_valid() {
        assert!(is_valid_slug("hello-world"));
        assert!(is_valid_slug("2024-recap"));
        assert!(is_valid_slug("a"));
    }

    #[test]
    fn empty_slug_is_invalid() {
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn uppercase_slug_is_invalid() {
        assert!(!is_valid_slug("Hello"));
    }

    #[test]
    fn dash_placement_rules() {
        assert!(!is_valid_slug("-draft"));
        assert!(!is_valid_slug("draft-"));
        assert!(!is_valid_slug("a--b"));
    }

    #[test]
    fn path_characters_are_invalid() {
        assert!(!is_valid_slug("../etc"));
        assert!(!is_valid_slug("a/b"));
        assert!(!is_valid_slug("a b"));
    }

    #[test]
    fn slugify_lowercases_and_joins() {
        assert_eq!(slugify("Getting Started"), "getting-started");
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("What's new?  (v2)"), "what-s-new-v2");
    }

    #[test]
    fn slugify_trims_edges() {
        assert_eq!(slugify("  -- Intro --  "), "intro");
    }

    #[test]
    fn slugify_keeps_unicode_letters() {
        assert_eq!(slugify("Café Über"), "café-über");
    }

    #[test]
    fn slugify_falls_back_when_empty() {
        assert_eq!(slugify("!!!"), "section");
    }
}
