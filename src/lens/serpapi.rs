use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;

const SEARCH_URL: &str = "https://serpapi.com/search.json";

/// Google Lens through SerpApi.
pub struct GoogleLensSearch {
    api_key: String,
    language: String,
    client: Client,
}

impl GoogleLensSearch {
    /// `language` is the interface language for results (`hl`), e.g. `"sv"`.
    pub fn new(api_key: String, language: String) -> Self {
        Self {
            api_key,
            language,
            client: Client::new(),
        }
    }

    /// Run a Lens search for a publicly reachable image URL and return the
    /// raw result document.
    pub async fn search(&self, image_url: &str) -> Result<Value> {
        let resp = self
            .client
            .get(SEARCH_URL)
            .query(&[
                ("engine", "google_lens"),
                ("url", image_url),
                ("hl", self.language.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("SerpApi request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("Failed to read SerpApi response")?;

        if !status.is_success() {
            anyhow::bail!("SerpApi error ({status}): {text}");
        }

        parse_search_response(&text)
    }
}

fn parse_search_response(body: &str) -> Result<Value> {
    let json: Value = serde_json::from_str(body).context("Failed to parse SerpApi response JSON")?;
    if let Some(error) = json["error"].as_str() {
        anyhow::bail!("SerpApi search failed: {error}");
    }
    log::debug!(
        "Google Lens returned {} visual match(es)",
        json["visual_matches"].as_array().map_or(0, Vec::len)
    );
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_document_is_passed_through() {
        let json = parse_search_response(r#"{"search_metadata": {"status": "Success"}, "visual_matches": [{"title": "x"}]}"#).unwrap();
        assert_eq!(json["visual_matches"][0]["title"], "x");
    }

    #[test]
    fn error_field_fails() {
        let err = parse_search_response(r#"{"error": "Invalid API key. Your API key should be here: https://serpapi.com/manage-api-key"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("Invalid API key"));
    }
}
