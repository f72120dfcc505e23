//! Utility functions for content processing

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::ContentError;

/// Replace every run of whitespace with a single space.
///
/// Leading and trailing whitespace collapse to one space but are kept;
/// use [`normalize_name`] to also trim.
pub fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                result.push(' ');
            }
            in_space = true;
        } else {
            result.push(c);
            in_space = false;
        }
    }
    result
}

/// Collapse inner whitespace and trim. Used for category and tag names.
pub fn normalize_name(text: &str) -> String {
    collapse_whitespace(text).trim().to_string()
}

/// Create a URL slug from a title or name
///
/// Diacritics are stripped (`Été` becomes `ete`), everything that is not
/// alphanumeric becomes a separator, and separators collapse to a single
/// hyphen.
///
/// ```rust
/// use content::slugify;
///
/// assert_eq!(slugify("Hello World!"), "hello-world");
/// assert_eq!(slugify("Crème brûlée: la recette"), "creme-brulee-la-recette");
/// ```
pub fn slugify(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Make `base` unique by appending `-1`, `-2`, ... while `taken` says it is used.
///
/// An empty base becomes `n-a` so a slug is never empty.
pub fn unique_slug(base: &str, taken: impl Fn(&str) -> bool) -> String {
    let base = if base.is_empty() { "n-a" } else { base };
    if !taken(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Truncate a string to a maximum length, adding ellipsis if truncated
pub fn truncate_with_ellipsis(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else if max_length <= 3 {
        text.chars().take(max_length).collect()
    } else {
        format!(
            "{}...",
            text.chars().take(max_length - 3).collect::<String>()
        )
    }
}

/// Extract the first paragraph of `content`, truncated to `max_length`
pub fn extract_summary(content: &str, max_length: usize) -> String {
    let first_paragraph = content.split("\n\n").next().unwrap_or(content).trim();

    truncate_with_ellipsis(first_paragraph, max_length)
}

/// Validate that a string is a valid slug format
///
/// Valid slugs contain only lowercase letters, numbers, and hyphens.
pub fn validate_slug_format(slug: &str) -> Result<(), ContentError> {
    if slug.is_empty() {
        return Err(ContentError::InvalidSlug("Slug cannot be empty".to_string()));
    }

    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ContentError::InvalidSlug(
            "Slug can only contain lowercase letters, numbers, and hyphens".to_string(),
        ));
    }

    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(ContentError::InvalidSlug(
            "Slug cannot start or end with hyphen".to_string(),
        ));
    }

    if slug.contains("--") {
        return Err(ContentError::InvalidSlug(
            "Slug cannot contain consecutive hyphens".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Hello World", "hello-world")]
    #[case("Test: With Punctuation!", "test-with-punctuation")]
    #[case("Multiple   Spaces", "multiple-spaces")]
    #[case("Été à Paris", "ete-a-paris")]
    #[case("  Rust & Symfony 7  ", "rust-symfony-7")]
    #[case("", "")]
    fn test_slugify(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[test]
    fn test_slugs_pass_format_check() {
        for title in ["Hello World", "Été à Paris", "a--b", "x"] {
            assert!(validate_slug_format(&slugify(title)).is_ok(), "{}", title);
        }
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("Not   Empty "), "Not Empty ");
        assert_eq!(collapse_whitespace("a\t\n b"), "a b");
        assert_eq!(normalize_name("  Not   Empty  "), "Not Empty");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn test_unique_slug() {
        let taken = ["news", "news-1"];
        assert_eq!(unique_slug("news", |s| taken.contains(&s)), "news-2");
        assert_eq!(unique_slug("other", |s| taken.contains(&s)), "other");
        assert_eq!(unique_slug("", |_| false), "n-a");
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("Short", 10), "Short");
        assert_eq!(
            truncate_with_ellipsis("This is a long string", 10),
            "This is..."
        );
        assert_eq!(truncate_with_ellipsis("Test", 4), "Test");
        assert_eq!(truncate_with_ellipsis("Test", 3), "Tes");
        assert_eq!(truncate_with_ellipsis("Déjà vu!", 8), "Déjà vu!");
    }

    #[test]
    fn test_extract_summary() {
        let content = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        assert_eq!(extract_summary(content, 20), "First paragraph.");

        let long_first = "This is a very long first paragraph that should be truncated.";
        assert_eq!(extract_summary(long_first, 20), "This is a very lo...");
    }

    #[test]
    fn test_validate_slug_format() {
        assert!(validate_slug_format("valid-slug-123").is_ok());
        assert!(validate_slug_format("").is_err());
        assert!(validate_slug_format("-starts-with-hyphen").is_err());
        assert!(validate_slug_format("ends-with-hyphen-").is_err());
        assert!(validate_slug_format("has--double--hyphen").is_err());
        assert!(validate_slug_format("has_underscore").is_err());
        assert!(validate_slug_format("UPPERCASE").is_err());
    }
}
