use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::gps::GpsCoords;
use super::writer::{CorruptMetadataPolicy, load_metadata};

/// Everything `show` prints about one photo.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PhotoSummary {
    pub path: PathBuf,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub size_bytes: u64,
    /// File modification time, local, in EXIF timestamp layout.
    pub modified: Option<String>,
    pub capture_date: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    /// Set only when both axes are present; drives the maps link.
    pub gps: Option<GpsCoords>,
    /// Each axis on its own, so a half-tagged photo still shows what it has.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Set when the EXIF block could not be read; the rest is still filled in.
    pub warning: Option<String>,
}

impl PhotoSummary {
    /// "1024x768, 1.50 MB"
    pub fn dimensions_label(&self) -> String {
        match (self.width, self.height) {
            (Some(w), Some(h)) => format!("{w}x{h}, {}", format_size(self.size_bytes)),
            _ => format_size(self.size_bytes),
        }
    }

    pub fn maps_url(&self) -> Option<String> {
        self.gps.map(maps_url)
    }
}

/// Collect file facts and EXIF fields for display. Unreadable metadata is
/// reported in [`PhotoSummary::warning`], not as an error.
pub fn read_summary(path: &Path) -> Result<PhotoSummary> {
    let stat = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?;

    let mut summary = PhotoSummary {
        path: path.to_path_buf(),
        size_bytes: stat.len(),
        modified: stat.modified().ok().map(|t| {
            DateTime::<Local>::from(t).format(super::TIMESTAMP_FORMAT).to_string()
        }),
        ..Default::default()
    };

    match image::image_dimensions(path) {
        Ok((w, h)) => {
            summary.width = Some(w);
            summary.height = Some(h);
        }
        Err(e) => log::debug!("Could not read dimensions of {}: {e}", path.display()),
    }

    match load_metadata(path, CorruptMetadataPolicy::Abort) {
        Ok(meta) => {
            summary.capture_date = meta.capture_timestamp().map(str::to_string);
            summary.make = meta.primary.make().map(str::to_string);
            summary.model = meta.primary.model().map(str::to_string);
            summary.latitude = meta.latitude();
            summary.longitude = meta.longitude();
            summary.gps = meta.coordinates();
        }
        Err(e) => {
            log::warn!("Could not read EXIF data from {}: {e}", path.display());
            summary.warning = Some(e.to_string());
        }
    }

    Ok(summary)
}

/// Human-readable file size: KB below one megabyte, MB from there on.
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    if kb >= 1024.0 {
        format!("{:.2} MB", kb / 1024.0)
    } else {
        format!("{kb:.2} KB")
    }
}

/// Google Maps link for a coordinate pair.
pub fn maps_url(coords: GpsCoords) -> String {
    format!(
        "https://www.google.com/maps?q={},{}",
        coords.latitude, coords.longitude
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::{MetadataContainer, save_metadata};
    use image::{DynamicImage, ImageFormat, RgbImage};

    #[test]
    fn size_switches_units_at_one_megabyte() {
        assert_eq!(format_size(512), "0.50 KB");
        assert_eq!(format_size(1024 * 1023), "1023.00 KB");
        assert_eq!(format_size(1024 * 1024), "1.00 MB");
        assert_eq!(format_size(3 * 1024 * 1024 / 2), "1.50 MB");
    }

    #[test]
    fn maps_link_uses_plain_decimals() {
        let url = maps_url(GpsCoords { latitude: 59.5, longitude: -18.25 });
        assert_eq!(url, "https://www.google.com/maps?q=59.5,-18.25");
    }

    #[test]
    fn summary_reads_metadata_and_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        DynamicImage::ImageRgb8(RgbImage::new(40, 30))
            .save_with_format(&path, ImageFormat::Jpeg)
            .unwrap();

        let mut meta = MetadataContainer::new();
        meta.primary.set_make(Some("Fujifilm".into()));
        meta.set_capture_timestamp("2023:08:09 10:11:12").unwrap();
        meta.set_latitude(10.5).unwrap();
        save_metadata(&path, &meta).unwrap();

        let summary = read_summary(&path).unwrap();
        assert_eq!((summary.width, summary.height), (Some(40), Some(30)));
        assert_eq!(summary.make.as_deref(), Some("Fujifilm"));
        assert_eq!(summary.capture_date.as_deref(), Some("2023:08:09 10:11:12"));
        assert_eq!(summary.latitude, Some(10.5));
        assert_eq!(summary.longitude, None);
        assert_eq!(summary.gps, None);
        assert!(summary.warning.is_none());
        assert!(summary.modified.is_some());
    }

    #[test]
    fn summary_survives_unsupported_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.jpg");
        std::fs::write(&path, b"not an image at all").unwrap();

        let summary = read_summary(&path).unwrap();
        assert_eq!(summary.size_bytes, 19);
        assert!(summary.warning.is_some());
        assert_eq!(summary.width, None);
        assert_eq!(summary.gps, None);
        assert_eq!(summary.maps_url(), None);
    }

    #[test]
    fn summary_keeps_single_axis_but_no_pair() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("half.png");
        DynamicImage::ImageRgb8(RgbImage::new(8, 8))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let mut meta = MetadataContainer::new();
        meta.set_longitude(-18.25).unwrap();
        save_metadata(&path, &meta).unwrap();

        let summary = read_summary(&path).unwrap();
        assert_eq!(summary.longitude, Some(-18.25));
        assert_eq!(summary.latitude, None);
        assert_eq!(summary.maps_url(), None);

        meta.set_latitude(59.5).unwrap();
        save_metadata(&path, &meta).unwrap();
        let summary = read_summary(&path).unwrap();
        assert_eq!(
            summary.maps_url().as_deref(),
            Some("https://www.google.com/maps?q=59.5,-18.25")
        );
    }
}
