//! # filetagger
//!
//! Batch rename and tag photos, edit EXIF capture dates and GPS coordinates,
//! and suggest tags from reverse geocoding (Google Maps) and reverse image
//! search (Google Lens via SerpApi).
//!
//! ## Quick Start
//!
//! Set a capture date and GPS position on a photo, then read them back:
//!
//! ```rust,no_run
//! use filetagger::exif::{self, CorruptMetadataPolicy, GpsCoords};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let path = Path::new("IMG_0042.jpg");
//!
//!     exif::update_metadata(path, CorruptMetadataPolicy::Abort, |meta| {
//!         meta.set_capture_timestamp("2025:04:14 12:00:00")?;
//!         meta.set_coordinates(GpsCoords { latitude: 59.3293, longitude: 18.0686 })
//!     })?;
//!
//!     let summary = exif::read_summary(path)?;
//!     println!("{:?} at {:?}", summary.capture_date, summary.maps_url());
//!     Ok(())
//! }
//! ```
//!
//! ## Tag Suggestions
//!
//! ```rust,no_run
//! use filetagger::config::{Config, TAG_SLOTS};
//! use filetagger::exif::CorruptMetadataPolicy;
//! use filetagger::pipeline;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let geocoder = pipeline::build_geocoder(&config)?;
//!     let path = Path::new("IMG_0042.jpg");
//!
//!     pipeline::geotag(path, "Gamla stan, Stockholm", &geocoder, false, CorruptMetadataPolicy::Abort).await?;
//!     let tags = pipeline::place_tags_for(path, &geocoder, TAG_SLOTS, CorruptMetadataPolicy::Abort).await?;
//!     println!("{}", tags.join(", "));
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Formats
//!
//! | Format | EXIF location |
//! |--------|---------------|
//! | JPEG (`.jpg`, `.jpeg`) | APP1 segment |
//! | PNG (`.png`) | `eXIf` chunk |
//! | WebP (`.webp`) | `EXIF` chunk |
//!
//! Other files can be listed, renamed and archived but carry no metadata.
//!
//! ## Modules
//!
//! - [`exif`]: EXIF container, GPS and date codecs, load/save cycle
//! - [`geo`]: Geocoding trait, Google Maps client, place tag heuristics
//! - [`lens`]: Image upload, Google Lens search, result tag heuristics
//! - [`files`]: Folder listing, renaming, archiving
//! - [`config`]: Persisted settings
//! - [`pipeline`]: High-level flows used by the CLI

pub mod config;
pub mod exif;
pub mod files;
pub mod geo;
pub mod lens;
pub mod pipeline;
