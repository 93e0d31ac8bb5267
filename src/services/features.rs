use std::collections::HashMap;

use crate::models::{UserPreferences, Video};

/// Sparse weighted representation of a video or a preference profile
pub type FeatureMap = HashMap<String, f64>;

pub const TAG_WEIGHT: f64 = 3.0;
pub const REGION_WEIGHT: f64 = 2.5;
pub const KEYWORD_WEIGHT: f64 = 2.0;
pub const TITLE_WEIGHT: f64 = 1.5;
pub const DESCRIPTION_WEIGHT: f64 = 0.5;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "this", "that", "from", "are", "was", "you", "your", "our",
    "its", "into", "about", "what", "how", "there", "here", "그리고", "하는", "있는", "에서",
    "으로", "이번", "정말", "너무", "같은",
];

/// Splits free text into lower-cased alphanumeric tokens.
///
/// Any Unicode letter or digit counts, so Hangul and other CJK text
/// tokenizes like Latin text. Single-character tokens and stopwords are
/// dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() > 1)
        .map(|token| token.to_lowercase())
        .filter(|token| !STOPWORDS.contains(&token.as_str()))
        .collect()
}

/// Builds the feature map of a video from its metadata.
///
/// Each feature key is namespaced by provenance and carries that provenance's
/// weight. Repeated tokens do not accumulate.
pub fn extract(video: &Video) -> FeatureMap {
    let mut features = FeatureMap::new();

    for tag in &video.tags {
        insert(&mut features, "tag", tag, TAG_WEIGHT);
    }
    if let Some(region) = video.region.as_deref() {
        insert(&mut features, "region", region, REGION_WEIGHT);
    }
    for keyword in video.keywords() {
        insert(&mut features, "keyword", &keyword, KEYWORD_WEIGHT);
    }
    for token in tokenize(&video.title) {
        insert(&mut features, "title", &token, TITLE_WEIGHT);
    }
    for token in tokenize(&video.description) {
        insert(&mut features, "desc", &token, DESCRIPTION_WEIGHT);
    }

    features
}

/// Builds the preference feature map for a user.
///
/// An empty map means there is nothing to personalize on; callers fall back
/// to popularity instead of scoring against it.
pub fn user_vector(preferences: &UserPreferences) -> FeatureMap {
    let mut features = FeatureMap::new();

    for tag in &preferences.tags {
        insert(&mut features, "tag", tag, TAG_WEIGHT);
    }
    for keyword in &preferences.keywords {
        insert(&mut features, "keyword", keyword, KEYWORD_WEIGHT);
    }
    for region in &preferences.regions {
        insert(&mut features, "region", region, REGION_WEIGHT);
    }

    features
}

fn insert(features: &mut FeatureMap, namespace: &str, raw: &str, weight: f64) {
    let value = raw.trim().to_lowercase();
    if value.is_empty() {
        return;
    }
    features.insert(format!("{}_{}", namespace, value), weight);
}
