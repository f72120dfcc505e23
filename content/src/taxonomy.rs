//! Categories and tags.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::{normalize_name, slugify};
use crate::validation::FormErrors;

pub const CATEGORY_NAME_MIN: usize = 3;
pub const CATEGORY_NAME_MAX: usize = 50;
pub const TAG_NAME_MAX: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<i64>,
    name: String,
    pub description: Option<String>,
    pub slug: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CategoryInput {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        let name = normalize_name(&self.name);
        if name.is_empty() {
            errors.add("name", "Name is required.");
        } else {
            errors.check_length(
                "name",
                &name,
                Some(CATEGORY_NAME_MIN),
                Some(CATEGORY_NAME_MAX),
                |limit| {
                    if limit == CATEGORY_NAME_MIN {
                        format!("Name must be at least {} characters.", limit)
                    } else {
                        format!("Name cannot exceed {} characters.", limit)
                    }
                },
            );
        }
        errors.into_result()
    }
}

impl Category {
    pub fn new(input: CategoryInput) -> Self {
        let mut category = Self::default();
        category.apply(input);
        category.slug = slugify(&category.name);
        category
    }

    /// Rebuild a stored category
    pub fn restore(
        id: i64,
        name: String,
        description: Option<String>,
        slug: String,
    ) -> Self {
        Self {
            id: Some(id),
            name,
            description,
            slug,
        }
    }

    pub fn apply(&mut self, input: CategoryInput) {
        self.set_name(&input.name);
        self.description = input.description.filter(|d| !d.trim().is_empty());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whitespace runs collapse to one space and the ends are trimmed.
    pub fn set_name(&mut self, name: &str) {
        self.name = normalize_name(name);
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Option<i64>,
    name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInput {
    #[serde(default)]
    pub name: String,
}

impl TagInput {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        let name = normalize_name(&self.name);
        if name.is_empty() {
            errors.add("name", "Name is required.");
        } else {
            errors.check_length("name", &name, None, Some(TAG_NAME_MAX), |limit| {
                format!("Name cannot exceed {} characters.", limit)
            });
        }
        errors.into_result()
    }
}

impl Tag {
    pub fn new(input: TagInput) -> Self {
        let mut tag = Self::default();
        tag.set_name(&input.name);
        tag.slug = slugify(&tag.name);
        tag
    }

    /// Rebuild a stored tag
    pub fn restore(id: i64, name: String, slug: String) -> Self {
        Self {
            id: Some(id),
            name,
            slug,
        }
    }

    pub fn apply(&mut self, input: TagInput) {
        self.set_name(&input.name);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = normalize_name(name);
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
