//! # Content Crate
//!
//! Blog content for Inklog: articles, categories and tags, together with the
//! form-submission types and the validation rules applied to them before
//! anything is persisted.
//!
//! - **Articles**: title/content rules, tag and category membership,
//!   publication state
//! - **Taxonomy**: categories and tags with whitespace-normalized names
//! - **Slugs**: transliterated, hyphenated URL slugs
//! - **Validation**: field-keyed [`FormErrors`]
//!
//! ## Usage
//!
//! ```rust
//! use chrono::Utc;
//! use content::{Article, ArticleInput};
//!
//! let input = ArticleInput {
//!     title: "  Hello Inklog ".to_string(),
//!     content: "A first article body.".to_string(),
//!     category_ids: vec![1],
//!     ..Default::default()
//! };
//! input.validate().unwrap();
//!
//! let mut article = Article::new(input, Some(1), Utc::now());
//! assert_eq!(article.slug, "hello-inklog");
//!
//! article.publish(Utc::now());
//! assert!(article.is_published(Utc::now()));
//! ```

pub mod article;
pub mod error;
pub mod taxonomy;
pub mod utils;
pub mod validation;

// Re-export commonly used types at the crate root
pub use article::{Article, ArticleInput};
pub use error::ContentError;
pub use taxonomy::{Category, CategoryInput, Tag, TagInput};
pub use utils::{collapse_whitespace, normalize_name, slugify, unique_slug};
pub use validation::FormErrors;

/// Result type for content operations
pub type Result<T> = std::result::Result<T, ContentError>;
