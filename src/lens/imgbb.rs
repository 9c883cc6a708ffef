use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;

const UPLOAD_URL: &str = "https://api.imgbb.com/1/upload";

/// Uploads images to ImgBB so search engines can fetch them by URL.
pub struct ImgBbUploader {
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<UploadData>,
    #[serde(default)]
    error: Option<UploadError>,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    url: String,
}

#[derive(Debug, Deserialize)]
struct UploadError {
    #[serde(default)]
    message: String,
}

impl ImgBbUploader {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }

    /// Upload the file at `path` and return its public URL.
    pub async fn upload(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image")
            .to_string();

        log::debug!("Uploading {} ({} bytes) to ImgBB", path.display(), bytes.len());

        let form = [
            ("key", self.api_key.clone()),
            ("name", name),
            ("image", STANDARD.encode(&bytes)),
        ];
        let resp = self
            .client
            .post(UPLOAD_URL)
            .form(&form)
            .send()
            .await
            .context("ImgBB request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("Failed to read ImgBB response")?;

        if !status.is_success() {
            anyhow::bail!("ImgBB API error ({status}): {text}");
        }

        parse_upload_response(&text)
    }
}

fn parse_upload_response(body: &str) -> Result<String> {
    let resp: UploadResponse =
        serde_json::from_str(body).context("Failed to parse ImgBB response JSON")?;

    match resp {
        UploadResponse {
            success: true,
            data: Some(data),
            ..
        } => Ok(data.url),
        UploadResponse { error, .. } => anyhow::bail!(
            "ImgBB upload was rejected: {}",
            error.map(|e| e.message).unwrap_or_else(|| "unknown error".into())
        ),
    }
}
