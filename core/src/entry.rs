use crate::error::IndexError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Granularity tag of a [`SearchEntry`].
///
/// `Page` and `Section` describe prose; the remaining variants are the
/// lower-cased docstring categories emitted for API reference entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Page,
    Section,
    Module,
    Function,
    Method,
    Macro,
    Type,
    Constant,
    Keyword,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Page,
        Category::Section,
        Category::Module,
        Category::Function,
        Category::Method,
        Category::Macro,
        Category::Type,
        Category::Constant,
        Category::Keyword,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Page => "page",
            Category::Section => "section",
            Category::Module => "module",
            Category::Function => "function",
            Category::Method => "method",
            Category::Macro => "macro",
            Category::Type => "type",
            Category::Constant => "constant",
            Category::Keyword => "keyword",
        }
    }

    /// True for API reference entries, false for prose.
    pub fn is_docstring(&self) -> bool {
        !matches!(self, Category::Page | Category::Section)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| IndexError::UnknownCategory(s.to_string()))
    }
}

/// One record of the static index: a single documentation anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchEntry {
    pub location: String,
    pub page: String,
    pub title: String,
    pub text: String,
    pub category: Category,
}

impl SearchEntry {
    /// Body block of a page. The title of a page entry is the page label.
    pub fn page(location: impl Into<String>, page: impl Into<String>, text: impl Into<String>) -> Self {
        let page = page.into();
        Self { location: location.into(), title: page.clone(), page, text: text.into(), category: Category::Page }
    }

    /// Heading anchor. Sections carry no body text.
    pub fn section(location: impl Into<String>, page: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            page: page.into(),
            title: title.into(),
            text: String::new(),
            category: Category::Section,
        }
    }

    /// Fragment after `#`, if the location has one.
    pub fn anchor(&self) -> Option<&str> {
        self.location.split_once('#').map(|(_, frag)| frag)
    }
}
