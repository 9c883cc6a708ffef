use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::exif::CorruptMetadataPolicy;
use crate::files::ArchiveRecord;

/// Number of quick-tag slots.
pub const TAG_SLOTS: usize = 10;

/// Extensions listed when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".jpg", ".png", ".jpeg", ".gif"];

/// Persisted settings for filetagger.
///
/// Stored as pretty-printed JSON. Keys missing from the file fall back to
/// their defaults, so older files keep loading.
///
/// ```rust,no_run
/// use filetagger::config::Config;
///
/// let mut config = Config::load(Some("config.json".as_ref())).unwrap();
/// config.set_extensions("jpg; PNG");
/// config.set_tag(1, "_sthlm").unwrap();
/// config.save(Some("config.json".as_ref())).unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder used by `list` when none is given.
    pub last_folder: Option<PathBuf>,
    /// Quick-tag slots, always [`TAG_SLOTS`] long after loading.
    pub tags: Vec<String>,
    /// Lowercase extensions with a leading dot.
    pub allowed_extensions: Vec<String>,
    pub api_keys: ApiKeys,
    /// Result language for reverse image search (`hl`).
    pub search_language: String,
    /// Name of the per-folder archive directory.
    pub archive_folder: String,
    /// Archive moves, most recent last.
    pub archived_files: Vec<ArchiveRecord>,
    /// What to do with unreadable EXIF blocks when saving.
    pub on_corrupt_metadata: CorruptMetadataPolicy,
}

/// Credentials for the external web services.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub imgbb: String,
    pub serpapi: String,
    pub google_maps: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            last_folder: None,
            tags: vec![String::new(); TAG_SLOTS],
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            api_keys: ApiKeys::default(),
            search_language: "sv".to_string(),
            archive_folder: "Arkiv".to_string(),
            archived_files: Vec::new(),
            on_corrupt_metadata: CorruptMetadataPolicy::Abort,
        }
    }
}

impl Config {
    /// Default config location: `config.json` next to the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        config.tags.resize(TAG_SLOTS, String::new());
        if config.allowed_extensions.is_empty() {
            config.allowed_extensions = DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        }
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::debug!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Replace the extension list from `;`-separated input such as
    /// `"jpg; .PNG"`. Empty input restores the defaults.
    pub fn set_extensions(&mut self, input: &str) {
        let extensions: Vec<String> = input
            .split(';')
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .map(|e| if e.starts_with('.') { e } else { format!(".{e}") })
            .collect();

        if extensions.is_empty() {
            log::info!("No extensions given, reverting to defaults");
            self.allowed_extensions = DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        } else {
            self.allowed_extensions = extensions;
        }
    }

    /// Text of a tag slot, numbered from 1.
    pub fn tag(&self, slot: usize) -> Result<&str> {
        let index = slot_index(slot)?;
        Ok(self.tags.get(index).map(String::as_str).unwrap_or_default())
    }

    pub fn set_tag(&mut self, slot: usize, text: &str) -> Result<()> {
        let index = slot_index(slot)?;
        self.tags.resize(TAG_SLOTS, String::new());
        self.tags[index] = text.to_string();
        Ok(())
    }

    /// Write suggested tags into the slots from the first one on. Slots past
    /// the suggestions keep their text.
    pub fn fill_tags(&mut self, suggestions: &[String]) {
        self.tags.resize(TAG_SLOTS, String::new());
        for (slot, tag) in self.tags.iter_mut().zip(suggestions) {
            slot.clone_from(tag);
        }
    }
}

fn slot_index(slot: usize) -> Result<usize> {
    if !(1..=TAG_SLOTS).contains(&slot) {
        anyhow::bail!("Tag slot must be between 1 and {TAG_SLOTS}, got {slot}");
    }
    Ok(slot - 1)
}

/// Return `key`, or a helpful error naming the missing setting.
pub fn require_key<'a>(key: &'a str, setting: &str) -> Result<&'a str> {
    if key.trim().is_empty() {
        anyhow::bail!("No API key configured: set api_keys.{setting} in the config file");
    }
    Ok(key.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── load / save ──────────────────────────────────────────────────

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(dir.path().join("config.json").as_path())).unwrap();
        assert_eq!(config.tags.len(), TAG_SLOTS);
        assert_eq!(config.allowed_extensions, vec![".jpg", ".png", ".jpeg", ".gif"]);
        assert_eq!(config.search_language, "sv");
        assert_eq!(config.archive_folder, "Arkiv");
        assert_eq!(config.on_corrupt_metadata, CorruptMetadataPolicy::Abort);
    }

    #[test]
    fn partial_file_is_filled_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"tags": ["_a", "_b"], "api_keys": {"imgbb": "k"}, "on_corrupt_metadata": "discard"}"#,
        )
        .unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.tags.len(), TAG_SLOTS);
        assert_eq!(config.tag(2).unwrap(), "_b");
        assert_eq!(config.tag(3).unwrap(), "");
        assert_eq!(config.api_keys.imgbb, "k");
        assert_eq!(config.api_keys.serpapi, "");
        assert_eq!(config.archive_folder, "Arkiv");
        assert_eq!(config.on_corrupt_metadata, CorruptMetadataPolicy::Discard);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.last_folder = Some(dir.path().to_path_buf());
        config.archived_files.push(ArchiveRecord {
            original: "a/x.jpg".into(),
            archived: "a/Arkiv/x.jpg".into(),
        });
        config.save(Some(path.as_path())).unwrap();

        let loaded = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(loaded.last_folder, config.last_folder);
        assert_eq!(loaded.archived_files, config.archived_files);
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Config::load(Some(path.as_path())).is_err());
    }

    // ── settings ─────────────────────────────────────────────────────

    #[test]
    fn extensions_are_normalised() {
        let mut config = Config::default();
        config.set_extensions(" JPG; .Png ;; webp ");
        assert_eq!(config.allowed_extensions, vec![".jpg", ".png", ".webp"]);

        config.set_extensions(" ; ");
        assert_eq!(config.allowed_extensions.len(), DEFAULT_EXTENSIONS.len());
    }

    #[test]
    fn tag_slots_are_one_based() {
        let mut config = Config::default();
        config.set_tag(1, "_first").unwrap();
        config.set_tag(TAG_SLOTS, "_last").unwrap();
        assert_eq!(config.tags[0], "_first");
        assert_eq!(config.tags[TAG_SLOTS - 1], "_last");
        assert!(config.set_tag(0, "x").is_err());
        assert!(config.tag(TAG_SLOTS + 1).is_err());
    }

    #[test]
    fn fill_tags_overwrites_leading_slots() {
        let mut config = Config::default();
        config.set_tag(3, "_keep").unwrap();
        config.fill_tags(&["stockholm".to_string(), "gamla stan".to_string()]);
        assert_eq!(config.tag(1).unwrap(), "stockholm");
        assert_eq!(config.tag(2).unwrap(), "gamla stan");
        assert_eq!(config.tag(3).unwrap(), "_keep");
    }

    #[test]
    fn missing_key_is_reported() {
        let keys = ApiKeys::default();
        let err = require_key(&keys.google_maps, "google_maps").unwrap_err();
        assert!(err.to_string().contains("api_keys.google_maps"));
        assert_eq!(require_key(" abc ", "imgbb").unwrap(), "abc");
    }
}
