use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

pub fn parse_categories(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

// Substring is case-sensitive containment, so "Bar" also matches "Barbecue"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryMatch {
    #[default]
    Substring,
    ExactToken,
}

impl CategoryMatch {
    pub fn matches(self, stored: &str, category: &str) -> bool {
        match self {
            CategoryMatch::Substring => stored.contains(category),
            CategoryMatch::ExactToken => stored
                .split(',')
                .any(|token| token.trim() == category.trim()),
        }
    }
}

impl FromStr for CategoryMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substring" => Ok(CategoryMatch::Substring),
            "exact" | "exact_token" => Ok(CategoryMatch::ExactToken),
            other => Err(format!("unknown category match mode '{}'", other)),
        }
    }
}

#[derive(Debug, Default)]
pub struct CategoryFrequency {
    counts: HashMap<String, usize>,
}

impl CategoryFrequency {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record<I>(&mut self, categories: I)
    where
        I: IntoIterator<Item = String>,
    {
        for category in categories {
            *self.counts.entry(category).or_insert(0) += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    // Equal counts are ordered by name so hash order never leaks out
    pub fn ranked(self) -> Vec<(String, usize)> {
        let mut entries: Vec<(String, usize)> = self.counts.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }
}
