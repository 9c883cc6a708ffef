//! Reverse image search: upload a photo to a public image host, run Google
//! Lens on it through SerpApi and boil the results down to tags.

mod imgbb;
mod serpapi;

pub use imgbb::ImgBbUploader;
pub use serpapi::GoogleLensSearch;

use anyhow::Result;
use serde_json::Value;
use std::path::Path;

/// Visual matches beyond this many are mostly noise.
const VISUAL_MATCH_LIMIT: usize = 5;

/// Words stock-photo sites sprinkle over their titles.
const GENERIC_MATCH_WORDS: &[&str] = &["wikipedia", "image", "photo", "stock", "shutterstock"];

/// Separator between a visual match title and its source site name.
const TITLE_SOURCE_SEPARATOR: &str = " \u{2014} ";

/// Anything that can suggest tags for a local image by searching for it.
#[async_trait::async_trait]
pub trait ImageSearch: Send + Sync {
    async fn suggest_tags(&self, path: &Path, limit: usize) -> Result<Vec<String>>;
}

/// ImgBB upload followed by a Google Lens query.
pub struct LensTagger {
    uploader: ImgBbUploader,
    search: GoogleLensSearch,
}

impl LensTagger {
    pub fn new(uploader: ImgBbUploader, search: GoogleLensSearch) -> Self {
        Self { uploader, search }
    }
}

#[async_trait::async_trait]
impl ImageSearch for LensTagger {
    async fn suggest_tags(&self, path: &Path, limit: usize) -> Result<Vec<String>> {
        let url = self.uploader.upload(path).await?;
        log::info!("Uploaded {} to {url}", path.display());
        let results = self.search.search(&url).await?;
        Ok(lens_tags(&results, limit))
    }
}

/// Extract tags from a Google Lens result document.
///
/// Order: the knowledge-graph title, cleaned titles of the first few visual
/// matches, then any recognised text. Everything is lowercased; tags of two
/// characters or less and repeats are dropped.
pub fn lens_tags(results: &Value, limit: usize) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();

    let knowledge = match &results["knowledge_graph"] {
        Value::Array(entries) => entries.first(),
        other => Some(other),
    };
    if let Some(title) = knowledge.and_then(|k| k["title"].as_str()) {
        tags.push(title.to_lowercase());
    }

    if let Some(matches) = results["visual_matches"].as_array() {
        for entry in matches.iter().take(VISUAL_MATCH_LIMIT) {
            let Some(title) = entry["title"].as_str() else {
                continue;
            };
            let title = title.to_lowercase();
            let mut title = title
                .split(TITLE_SOURCE_SEPARATOR)
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            for generic in GENERIC_MATCH_WORDS {
                title = title.replace(generic, "").trim().to_string();
            }
            if title.chars().count() > 2 && !tags.contains(&title) {
                tags.push(title);
            }
        }
    }

    if let Some(text) = results["text"].as_str() {
        let text = text.to_lowercase().trim().to_string();
        if text.chars().count() > 3 && !tags.contains(&text) {
            tags.push(text);
        }
    }

    let mut unique: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if tag.chars().count() > 2 && !unique.contains(&tag) {
            unique.push(tag);
        }
    }
    unique.truncate(limit);
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn knowledge_graph_then_matches_then_text() {
        let results = json!({
            "knowledge_graph": [{ "title": "Vasa Museum" }, { "title": "Ignored" }],
            "visual_matches": [
                { "title": "Vasa Museum — Wikipedia" },
                { "title": "Vasa ship Stock Photo" },
                { "title": "Stockholm harbour image" },
                { "link": "no title here" }
            ],
            "text": "  VASA 1628 "
        });
        assert_eq!(
            lens_tags(&results, 10),
            vec!["vasa museum", "vasa ship", "holm harbour", "vasa 1628"]
        );
    }

    #[test]
    fn only_first_five_matches_count() {
        let matches: Vec<Value> = (0..8).map(|i| json!({ "title": format!("match number {i}") })).collect();
        let results = json!({ "visual_matches": matches });
        let tags = lens_tags(&results, 10);
        assert_eq!(tags.len(), 5);
        assert_eq!(tags[4], "match number 4");
    }

    #[test]
    fn knowledge_graph_object_and_short_text() {
        let results = json!({
            "knowledge_graph": { "title": "Ek" },
            "text": "abc"
        });
        // "ek" is too short to be a tag and "abc" too short to be text.
        assert!(lens_tags(&results, 10).is_empty());
    }

    #[test]
    fn limit_applies_last() {
        let results = json!({
            "knowledge_graph": { "title": "Kaknästornet" },
            "visual_matches": [{ "title": "TV tower" }, { "title": "Djurgården" }]
        });
        assert_eq!(lens_tags(&results, 2), vec!["kaknästornet", "tv tower"]);
        assert!(lens_tags(&json!({}), 10).is_empty());
    }
}
