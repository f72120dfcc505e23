//! Blog articles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{extract_summary, slugify};
use crate::validation::FormErrors;

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 255;
pub const CONTENT_MIN: usize = 10;
pub const MAX_TAGS: usize = 10;
pub const MIN_CATEGORIES: usize = 1;
pub const MAX_CATEGORIES: usize = 5;

/// A blog article.
///
/// Tags and categories are referenced by id; the article owns the
/// association. Finding the articles of a tag or category is a storage query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: Option<i64>,
    pub title: String,
    pub summary: Option<String>,
    pub content: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub author_id: Option<i64>,
    pub tag_ids: Vec<i64>,
    pub category_ids: Vec<i64>,
}

/// Article form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    #[serde(default)]
    pub category_ids: Vec<i64>,
}

impl ArticleInput {
    /// Checks the submission. Title is trimmed before counting.
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.add("title", "Title is required.");
        } else {
            errors.check_length("title", title, Some(TITLE_MIN), Some(TITLE_MAX), |limit| {
                if limit == TITLE_MIN {
                    format!("Title must be at least {} characters.", limit)
                } else {
                    format!("Title cannot exceed {} characters.", limit)
                }
            });
        }

        if self.content.trim().is_empty() {
            errors.add("content", "Content is required.");
        } else {
            errors.check_length("content", &self.content, Some(CONTENT_MIN), None, |limit| {
                format!("Content must be at least {} characters.", limit)
            });
        }

        if distinct(&self.tag_ids).len() > MAX_TAGS {
            errors.add(
                "tags",
                format!("You cannot select more than {} tags.", MAX_TAGS),
            );
        }

        let categories = distinct(&self.category_ids).len();
        if categories < MIN_CATEGORIES {
            errors.add("categories", "You must select at least one category.");
        } else if categories > MAX_CATEGORIES {
            errors.add(
                "categories",
                format!("You cannot select more than {} categories.", MAX_CATEGORIES),
            );
        }

        errors.into_result()
    }
}

fn distinct(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

impl Article {
    /// A new unpublished article built from a validated submission.
    ///
    /// The slug is derived from the title; storage makes it unique.
    pub fn new(input: ArticleInput, author_id: Option<i64>, now: DateTime<Utc>) -> Self {
        let mut article = Self {
            id: None,
            title: String::new(),
            summary: None,
            content: String::new(),
            slug: String::new(),
            created_at: now,
            updated_at: now,
            published_at: None,
            author_id,
            tag_ids: Vec::new(),
            category_ids: Vec::new(),
        };
        article.apply(input, now);
        article.slug = slugify(&article.title);
        article
    }

    /// Copy a submission onto the article. The slug is kept.
    pub fn apply(&mut self, input: ArticleInput, now: DateTime<Utc>) {
        self.set_title(&input.title);
        self.summary = input.summary.filter(|s| !s.trim().is_empty());
        self.content = input.content;
        self.tag_ids.clear();
        self.category_ids.clear();
        for id in input.tag_ids {
            self.add_tag(id);
        }
        for id in input.category_ids {
            self.add_category(id);
        }
        self.updated_at = now;
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.trim().to_string();
    }

    pub fn add_tag(&mut self, tag_id: i64) {
        if !self.tag_ids.contains(&tag_id) {
            self.tag_ids.push(tag_id);
        }
    }

    pub fn remove_tag(&mut self, tag_id: i64) -> bool {
        let before = self.tag_ids.len();
        self.tag_ids.retain(|id| *id != tag_id);
        before != self.tag_ids.len()
    }

    pub fn add_category(&mut self, category_id: i64) {
        if !self.category_ids.contains(&category_id) {
            self.category_ids.push(category_id);
        }
    }

    pub fn remove_category(&mut self, category_id: i64) -> bool {
        let before = self.category_ids.len();
        self.category_ids.retain(|id| *id != category_id);
        before != self.category_ids.len()
    }

    /// Published means a publication date at or before `now`.
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        self.published_at.is_some_and(|at| at <= now)
    }

    pub fn publish(&mut self, now: DateTime<Utc>) {
        self.published_at = Some(now);
        self.updated_at = now;
    }

    pub fn unpublish(&mut self) {
        self.published_at = None;
    }

    /// The summary, or the start of the content when there is none.
    pub fn excerpt(&self, max_length: usize) -> String {
        match &self.summary {
            Some(summary) => summary.clone(),
            None => extract_summary(&self.content, max_length),
        }
    }

    /// Same checks as the submission form, applied to the current state.
    pub fn validate(&self) -> Result<(), FormErrors> {
        ArticleInput {
            title: self.title.clone(),
            summary: self.summary.clone(),
            content: self.content.clone(),
            tag_ids: self.tag_ids.clone(),
            category_ids: self.category_ids.clone(),
        }
        .validate()
    }
}

impl std::fmt::Display for Article {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}
