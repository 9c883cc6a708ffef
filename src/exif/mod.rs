//! EXIF capture date and GPS reading and writing.
//!
//! - [`MetadataContainer`]: typed, lossless view of one image's EXIF block
//! - [`load_metadata`] / [`save_metadata`] / [`update_metadata`]: the
//!   load → mutate → save cycle against a JPEG, PNG or WebP file
//! - [`read_summary`]: file facts plus the interesting EXIF fields, for display
//!
//! GPS coordinates are stored as degrees/minutes/seconds rationals with a
//! hemisphere reference letter; seconds use a denominator of
//! [`SECONDS_DENOMINATOR`], so the round-trip error stays under
//! 1/36,000,000 of a degree.

mod container;
mod error;
mod gps;
mod reader;
mod timestamp;
mod writer;

pub use container::{
    CaptureGroup, ExtraField, GpsGroup, MetadataContainer, PrimaryGroup, ThumbnailGroup,
};
pub use error::{MetadataError, Result};
pub use gps::{
    Axis, GpsCoordinate, GpsCoords, Hemisphere, SECONDS_DENOMINATOR, decode_coordinate,
    encode_coordinate,
};
pub use reader::{PhotoSummary, format_size, maps_url, read_summary};
pub use timestamp::{TIMESTAMP_FORMAT, validate_timestamp};
pub use writer::{
    CorruptMetadataPolicy, ImageKind, JPEG_MAX_EXIF_LEN, decode_image_metadata, embed_metadata,
    extract_metadata, load_metadata, save_metadata, update_metadata,
};
