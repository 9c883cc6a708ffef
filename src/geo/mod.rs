//! Geocoding: place name → coordinates, coordinates → place names, and the
//! heuristics that turn reverse-geocoding results into short tags.

mod google;

pub use google::GoogleMapsGeocoder;

use anyhow::Result;
use serde::Deserialize;

use crate::exif::GpsCoords;

/// Words that show up in almost every Swedish address and make poor tags.
const GENERIC_PLACE_WORDS: &[&str] = &["sweden", "sverige", "county", "municipality"];

/// Component types that describe administrative areas rather than places.
const SKIPPED_COMPONENT_TYPES: &[&str] = &["political", "country", "postal_code"];

/// A geocoding backend.
///
/// The library ships with [`GoogleMapsGeocoder`]; tests use in-memory fakes.
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    /// Look up a free-text place. `Ok(None)` means "not found".
    async fn locate(&self, place: &str) -> Result<Option<GpsCoords>>;

    /// Ordered place names near a coordinate, at most `limit` of them.
    /// Empty means "not found".
    async fn describe(&self, coords: GpsCoords, limit: usize) -> Result<Vec<String>>;
}

/// One reverse-geocoding result, reduced to the parts the tag heuristic reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceResult {
    #[serde(default)]
    pub formatted_address: String,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressComponent {
    #[serde(default)]
    pub long_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

/// Turn reverse-geocoding results into lowercase place tags.
///
/// Named address components come first (skipping administrative ones), then
/// the comma-separated parts of each formatted address with generic words
/// stripped. Tags of two characters or less and repeats are dropped.
pub fn place_tags(results: &[PlaceResult], limit: usize) -> Vec<String> {
    let mut tags = Vec::new();

    for result in results {
        for component in &result.address_components {
            if component
                .types
                .iter()
                .any(|t| SKIPPED_COMPONENT_TYPES.contains(&t.as_str()))
            {
                continue;
            }
            push_unique(&mut tags, component.long_name.trim().to_lowercase());
        }

        let address = result.formatted_address.trim().to_lowercase();
        for part in address.split(',').map(str::trim) {
            if tags.iter().any(|t| t == part)
                || part.chars().count() <= 2
                || part.chars().all(|c| c.is_ascii_digit())
            {
                continue;
            }
            let mut part = part.to_string();
            for generic in GENERIC_PLACE_WORDS {
                part = part.replace(generic, "").trim().to_string();
            }
            push_unique(&mut tags, part);
        }
    }

    tags.truncate(limit);
    tags
}

fn push_unique(tags: &mut Vec<String>, tag: String) {
    if tag.chars().count() > 2 && !tags.contains(&tag) {
        tags.push(tag);
    }
}
