use serde::{Deserialize, Serialize};

/// Explicit travel preferences a user selected
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserPreferences {
    /// Preferred content tags (e.g. "감성", "food")
    #[serde(default)]
    pub tags: Vec<String>,
    /// Preferred free-form keywords
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Preferred regions (e.g. "부산")
    #[serde(default)]
    pub regions: Vec<String>,
}

impl UserPreferences {
    /// Creates empty user preferences
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a preferred tag, ignoring duplicates
    pub fn add_tag(&mut self, tag: &str) {
        push_unique(&mut self.tags, tag);
    }

    /// Adds a preferred keyword, ignoring duplicates
    pub fn add_keyword(&mut self, keyword: &str) {
        push_unique(&mut self.keywords, keyword);
    }

    /// Adds a preferred region, ignoring duplicates
    pub fn add_region(&mut self, region: &str) {
        push_unique(&mut self.regions, region);
    }

    /// True when there is no preference signal at all
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.keywords.is_empty() && self.regions.is_empty()
    }
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    let value = value.trim().to_lowercase();
    if !value.is_empty() && !values.contains(&value) {
        values.push(value);
    }
}
