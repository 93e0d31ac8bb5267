use serde::{Deserialize, Deserializer, Serialize};

/// Separators accepted in delimited tag and keyword strings
const DELIMITERS: [char; 4] = [',', '|', '#', ';'];

/// A travel video considered for recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Video {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Canonical tag list; see [`normalize_tags`] for the accepted raw forms
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub duration_secs: Option<i32>,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub like_count: i64,
    /// Lazily computed text embedding, written back once known
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl Video {
    /// Text handed to the embedding gateway for this video
    pub fn embedding_text(&self) -> String {
        format!("title: {} description: {}", self.title, self.description)
    }

    /// Keywords split out of the raw keyword string
    pub fn keywords(&self) -> Vec<String> {
        self.keyword
            .as_deref()
            .map(split_delimited)
            .unwrap_or_default()
    }
}

/// Normalizes the stored `tags` field into an ordered, de-duplicated list.
///
/// Accepts a JSON array of strings, an object (its keys are the tags), a
/// delimited string (`,` `|` `#` `;`), or null. Tags are trimmed and
/// lower-cased; empty entries are dropped.
pub fn normalize_tags(raw: &serde_json::Value) -> Vec<String> {
    let candidates: Vec<String> = match raw {
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        serde_json::Value::Object(map) => map.keys().cloned().collect(),
        serde_json::Value::String(s) => split_delimited(s),
        _ => Vec::new(),
    };

    let mut tags: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let tag = candidate.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Splits a delimited string into trimmed, lower-cased, non-empty parts
pub fn split_delimited(raw: &str) -> Vec<String> {
    raw.split(&DELIMITERS[..])
        .map(|part| part.trim().to_lowercase())
        .filter(|part| !part.is_empty())
        .collect()
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(normalize_tags(&raw))
}
