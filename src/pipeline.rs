use anyhow::{Context, Result};
use std::path::Path;

use crate::config::{Config, require_key};
use crate::exif::{
    self, CorruptMetadataPolicy, GpsCoords, load_metadata, save_metadata, update_metadata,
};
use crate::geo::{Geocoder, GoogleMapsGeocoder};
use crate::lens::{GoogleLensSearch, ImageSearch, ImgBbUploader, LensTagger};

/// What [`geotag`] did with an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeotagOutcome {
    /// The coordinates were looked up and saved.
    Written(GpsCoords),
    /// The image already had coordinates and overwriting was not requested.
    Skipped { existing: GpsCoords },
}

/// Build the Google Maps geocoder from the configured key.
pub fn build_geocoder(config: &Config) -> Result<GoogleMapsGeocoder> {
    let key = require_key(&config.api_keys.google_maps, "google_maps")?;
    Ok(GoogleMapsGeocoder::new(key.to_string()))
}

/// Build the ImgBB + Google Lens reverse image search from the configured keys.
pub fn build_image_search(config: &Config) -> Result<LensTagger> {
    let imgbb = require_key(&config.api_keys.imgbb, "imgbb")?;
    let serpapi = require_key(&config.api_keys.serpapi, "serpapi")?;
    Ok(LensTagger::new(
        ImgBbUploader::new(imgbb.to_string()),
        GoogleLensSearch::new(serpapi.to_string(), config.search_language.clone()),
    ))
}

/// Look up `place` and store its coordinates in the image.
///
/// Images that already carry both coordinates are left alone unless
/// `overwrite` is set. A place the geocoder cannot find is an error.
///
/// # Example
///
/// ```rust,no_run
/// use filetagger::config::Config;
/// use filetagger::exif::CorruptMetadataPolicy;
/// use filetagger::pipeline::{build_geocoder, geotag};
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load(None)?;
/// let geocoder = build_geocoder(&config)?;
/// let outcome = geotag(
///     Path::new("IMG_0042.jpg"),
///     "Stortorget, Stockholm",
///     &geocoder,
///     false,
///     CorruptMetadataPolicy::Abort,
/// )
/// .await?;
/// println!("{outcome:?}");
/// # Ok(())
/// # }
/// ```
pub async fn geotag(
    path: &Path,
    place: &str,
    geocoder: &dyn Geocoder,
    overwrite: bool,
    policy: CorruptMetadataPolicy,
) -> Result<GeotagOutcome> {
    let place = place.trim();
    if place.is_empty() {
        anyhow::bail!("No place given");
    }

    let mut meta = load_metadata(path, policy)
        .with_context(|| format!("Failed to read metadata from {}", path.display()))?;

    if !overwrite {
        if let Some(existing) = meta.coordinates() {
            log::info!(
                "{} already has GPS {:.6}, {:.6}; skipping",
                path.display(),
                existing.latitude,
                existing.longitude
            );
            return Ok(GeotagOutcome::Skipped { existing });
        }
    }

    let coords = geocoder
        .locate(place)
        .await?
        .with_context(|| format!("No location found for {place:?}"))?;

    meta.set_coordinates(coords)
        .with_context(|| format!("Geocoder returned unusable coordinates for {place:?}"))?;
    save_metadata(path, &meta)
        .with_context(|| format!("Failed to save GPS to {}", path.display()))?;

    log::info!(
        "Geotagged {} at {:.6}, {:.6} ({place})",
        path.display(),
        coords.latitude,
        coords.longitude
    );
    Ok(GeotagOutcome::Written(coords))
}

/// Suggest place tags from the image's stored GPS position.
pub async fn place_tags_for(
    path: &Path,
    geocoder: &dyn Geocoder,
    limit: usize,
    policy: CorruptMetadataPolicy,
) -> Result<Vec<String>> {
    let meta = load_metadata(path, policy)
        .with_context(|| format!("Failed to read metadata from {}", path.display()))?;
    let coords = meta.coordinates().with_context(|| {
        format!(
            "{} has no GPS coordinates; geotag it first",
            path.display()
        )
    })?;

    let tags = geocoder.describe(coords, limit).await?;
    if tags.is_empty() {
        anyhow::bail!(
            "No places found near {:.6}, {:.6}",
            coords.latitude,
            coords.longitude
        );
    }
    Ok(tags)
}

/// Suggest tags by searching the web for the image itself.
pub async fn lens_tags_for(
    path: &Path,
    search: &dyn ImageSearch,
    limit: usize,
) -> Result<Vec<String>> {
    if !path.is_file() {
        anyhow::bail!("Not a file: {}", path.display());
    }
    let tags = search.suggest_tags(path, limit).await?;
    if tags.is_empty() {
        anyhow::bail!("Reverse image search found nothing usable for {}", path.display());
    }
    Ok(tags)
}

/// Store a capture timestamp (`YYYY:MM:DD HH:MM:SS`). The value is validated
/// before the file is read.
pub fn set_capture_date(path: &Path, timestamp: &str, policy: CorruptMetadataPolicy) -> Result<()> {
    let timestamp = timestamp.trim();
    exif::validate_timestamp(timestamp)?;
    update_metadata(path, policy, |meta| meta.set_capture_timestamp(timestamp))
        .with_context(|| format!("Failed to save capture date to {}", path.display()))?;
    log::info!("Set capture date of {} to {timestamp}", path.display());
    Ok(())
}

/// Store both GPS coordinates given in decimal degrees.
pub fn set_gps(path: &Path, coords: GpsCoords, policy: CorruptMetadataPolicy) -> Result<()> {
    update_metadata(path, policy, |meta| meta.set_coordinates(coords))
        .with_context(|| format!("Failed to save GPS to {}", path.display()))?;
    log::info!(
        "Set GPS of {} to {:.6}, {:.6}",
        path.display(),
        coords.latitude,
        coords.longitude
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::MetadataError;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FakeGeocoder {
        places: HashMap<String, GpsCoords>,
        names: Vec<String>,
        lookups: Mutex<usize>,
    }

    impl FakeGeocoder {
        fn stockholm() -> Self {
            Self {
                places: HashMap::from([(
                    "Stockholm".to_string(),
                    GpsCoords { latitude: 59.3293, longitude: 18.0686 },
                )]),
                names: vec!["gamla stan".into(), "stortorget".into(), "stockholm".into()],
                lookups: Mutex::new(0),
            }
        }

        fn lookups(&self) -> usize {
            *self.lookups.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl Geocoder for FakeGeocoder {
        async fn locate(&self, place: &str) -> Result<Option<GpsCoords>> {
            *self.lookups.lock().unwrap() += 1;
            Ok(self.places.get(place).copied())
        }

        async fn describe(&self, _coords: GpsCoords, limit: usize) -> Result<Vec<String>> {
            Ok(self.names.iter().take(limit).cloned().collect())
        }
    }

    struct FakeSearch(Vec<String>);

    #[async_trait::async_trait]
    impl ImageSearch for FakeSearch {
        async fn suggest_tags(&self, _path: &Path, limit: usize) -> Result<Vec<String>> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    fn jpeg(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, image::Rgb([200, 30, 30])))
            .save_with_format(&path, ImageFormat::Jpeg)
            .unwrap();
        path
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    // ── geotag ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn geotag_writes_coordinates() {
        let dir = TempDir::new().unwrap();
        let path = jpeg(&dir, "a.jpg");
        let geocoder = FakeGeocoder::stockholm();

        let outcome = geotag(&path, " Stockholm ", &geocoder, false, CorruptMetadataPolicy::Abort)
            .await
            .unwrap();
        assert!(matches!(outcome, GeotagOutcome::Written(_)));

        let meta = load_metadata(&path, CorruptMetadataPolicy::Abort).unwrap();
        assert!(close(meta.latitude().unwrap(), 59.3293));
        assert!(close(meta.longitude().unwrap(), 18.0686));
    }

    #[tokio::test]
    async fn geotag_skips_tagged_image_unless_forced() {
        let dir = TempDir::new().unwrap();
        let path = jpeg(&dir, "b.jpg");
        set_gps(&path, GpsCoords { latitude: 1.5, longitude: 2.5 }, CorruptMetadataPolicy::Abort).unwrap();
        let geocoder = FakeGeocoder::stockholm();

        let outcome = geotag(&path, "Stockholm", &geocoder, false, CorruptMetadataPolicy::Abort)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            GeotagOutcome::Skipped { existing: GpsCoords { latitude: 1.5, longitude: 2.5 } }
        );
        assert_eq!(geocoder.lookups(), 0);

        geotag(&path, "Stockholm", &geocoder, true, CorruptMetadataPolicy::Abort)
            .await
            .unwrap();
        let meta = load_metadata(&path, CorruptMetadataPolicy::Abort).unwrap();
        assert!(close(meta.latitude().unwrap(), 59.3293));
    }

    #[tokio::test]
    async fn geotag_unknown_place_leaves_file_alone() {
        let dir = TempDir::new().unwrap();
        let path = jpeg(&dir, "c.jpg");
        let before = std::fs::read(&path).unwrap();

        let err = geotag(&path, "Atlantis", &FakeGeocoder::stockholm(), false, CorruptMetadataPolicy::Abort)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Atlantis"));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    // ── tag suggestions ──────────────────────────────────────────────

    #[tokio::test]
    async fn place_tags_need_coordinates() {
        let dir = TempDir::new().unwrap();
        let path = jpeg(&dir, "d.jpg");
        let geocoder = FakeGeocoder::stockholm();

        let err = place_tags_for(&path, &geocoder, 10, CorruptMetadataPolicy::Abort)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("geotag"));

        set_gps(&path, GpsCoords { latitude: 59.325, longitude: 18.07 }, CorruptMetadataPolicy::Abort).unwrap();
        let tags = place_tags_for(&path, &geocoder, 2, CorruptMetadataPolicy::Abort)
            .await
            .unwrap();
        assert_eq!(tags, vec!["gamla stan", "stortorget"]);
    }

    #[tokio::test]
    async fn lens_tags_come_from_search() {
        let dir = TempDir::new().unwrap();
        let path = jpeg(&dir, "e.jpg");
        let search = FakeSearch(vec!["vasa museum".into(), "ship".into()]);

        let tags = lens_tags_for(&path, &search, 10).await.unwrap();
        assert_eq!(tags, vec!["vasa museum", "ship"]);
        assert!(lens_tags_for(&path, &FakeSearch(Vec::new()), 10).await.is_err());
        assert!(lens_tags_for(&dir.path().join("missing.jpg"), &search, 10).await.is_err());
    }

    // ── capture date ─────────────────────────────────────────────────

    #[test]
    fn capture_date_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = jpeg(&dir, "f.jpg");
        set_capture_date(&path, "2025:04:14 12:00:00", CorruptMetadataPolicy::Abort).unwrap();

        let meta = load_metadata(&path, CorruptMetadataPolicy::Abort).unwrap();
        assert_eq!(meta.capture_timestamp(), Some("2025:04:14 12:00:00"));
    }

    #[test]
    fn bad_capture_date_is_rejected_before_io() {
        let dir = TempDir::new().unwrap();
        let err = set_capture_date(&dir.path().join("missing.jpg"), "2025-04-14", CorruptMetadataPolicy::Abort)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MetadataError>(),
            Some(MetadataError::Validation(_))
        ));
    }

    #[test]
    fn out_of_range_gps_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = jpeg(&dir, "g.jpg");
        let before = std::fs::read(&path).unwrap();
        assert!(set_gps(&path, GpsCoords { latitude: 91.0, longitude: 0.0 }, CorruptMetadataPolicy::Abort).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    // ── builders ─────────────────────────────────────────────────────

    #[test]
    fn builders_require_keys() {
        let mut config = Config::default();
        assert!(build_geocoder(&config).is_err());
        assert!(build_image_search(&config).is_err());

        config.api_keys.google_maps = "g".into();
        config.api_keys.imgbb = "i".into();
        assert!(build_geocoder(&config).is_ok());
        assert!(build_image_search(&config).is_err());
        config.api_keys.serpapi = "s".into();
        assert!(build_image_search(&config).is_ok());
    }
}
