use std::io::Cursor;

use exif::experimental::Writer;
use exif::{Context, Field, In, Rational, Reader, Tag, Value};

use super::error::{MetadataError, Result};
use super::gps::{self, Axis, GpsCoordinate, GpsCoords, Hemisphere};
use super::timestamp::validate_timestamp;

/// Some containers (WebP in particular) keep the APP1 marker in front of the
/// TIFF data.
const EXIF_MARKER: &[u8] = b"Exif\0\0";

/// A field this crate does not interpret, carried through verbatim.
#[derive(Debug, Clone)]
pub struct ExtraField {
    pub tag: Tag,
    pub value: Value,
}

impl ExtraField {
    fn from_field(field: &Field) -> Self {
        Self {
            tag: field.tag,
            value: field.value.clone(),
        }
    }

    fn to_field(&self, ifd_num: In) -> Field {
        Field {
            tag: self.tag,
            ifd_num,
            value: self.value.clone(),
        }
    }
}

/// IFD0 of the primary image: camera make and model.
#[derive(Debug, Clone, Default)]
pub struct PrimaryGroup {
    make: Option<String>,
    model: Option<String>,
    other: Vec<ExtraField>,
}

impl PrimaryGroup {
    pub fn make(&self) -> Option<&str> {
        self.make.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn set_make(&mut self, make: Option<String>) {
        self.other.retain(|f| f.tag != Tag::Make);
        self.make = make;
    }

    pub fn set_model(&mut self, model: Option<String>) {
        self.other.retain(|f| f.tag != Tag::Model);
        self.model = model;
    }

    pub fn other(&self) -> &[ExtraField] {
        &self.other
    }

    pub fn len(&self) -> usize {
        self.make.is_some() as usize + self.model.is_some() as usize + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exif sub-IFD: original and digitized capture timestamps.
#[derive(Debug, Clone, Default)]
pub struct CaptureGroup {
    original: Option<String>,
    digitized: Option<String>,
    other: Vec<ExtraField>,
}

impl CaptureGroup {
    pub fn original(&self) -> Option<&str> {
        self.original.as_deref()
    }

    pub fn digitized(&self) -> Option<&str> {
        self.digitized.as_deref()
    }

    pub fn other(&self) -> &[ExtraField] {
        &self.other
    }

    pub fn len(&self) -> usize {
        self.original.is_some() as usize + self.digitized.is_some() as usize + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// GPS sub-IFD. A coordinate lives here only as a complete value/reference
/// pair; orphan halves stay in `other` and read as absent.
#[derive(Debug, Clone, Default)]
pub struct GpsGroup {
    latitude: Option<GpsCoordinate>,
    longitude: Option<GpsCoordinate>,
    other: Vec<ExtraField>,
}

impl GpsGroup {
    pub fn coordinate(&self, axis: Axis) -> Option<&GpsCoordinate> {
        match axis {
            Axis::Latitude => self.latitude.as_ref(),
            Axis::Longitude => self.longitude.as_ref(),
        }
    }

    fn set(&mut self, axis: Axis, coordinate: GpsCoordinate) {
        let (value_tag, ref_tag) = axis_tags(axis);
        self.other.retain(|f| f.tag != value_tag && f.tag != ref_tag);
        match axis {
            Axis::Latitude => self.latitude = Some(coordinate),
            Axis::Longitude => self.longitude = Some(coordinate),
        }
    }

    pub fn other(&self) -> &[ExtraField] {
        &self.other
    }

    /// Number of stored EXIF fields (a coordinate counts as two).
    pub fn len(&self) -> usize {
        2 * (self.latitude.is_some() as usize + self.longitude.is_some() as usize)
            + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// IFD1: the embedded thumbnail. Not interpreted, only carried through.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailGroup {
    fields: Vec<ExtraField>,
    jpeg: Option<Vec<u8>>,
}

impl ThumbnailGroup {
    pub fn fields(&self) -> &[ExtraField] {
        &self.fields
    }

    pub fn jpeg(&self) -> Option<&[u8]> {
        self.jpeg.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.jpeg.is_none()
    }
}

/// In-memory EXIF block of one image, split into four typed groups.
///
/// A container lives for one load → mutate → save cycle. Build it with
/// [`MetadataContainer::decode`] (or `default()` when the image has no block),
/// change fields through the accessors, then serialize it with
/// [`MetadataContainer::encode`].
///
/// ```rust
/// use filetagger::exif::MetadataContainer;
///
/// let mut meta = MetadataContainer::decode(&[]).unwrap();
/// meta.set_capture_timestamp("2025:04:14 12:00:00").unwrap();
/// meta.set_latitude(59.3293).unwrap();
/// meta.set_longitude(18.0686).unwrap();
///
/// let block = meta.encode().unwrap();
/// let again = MetadataContainer::decode(&block).unwrap();
/// assert_eq!(again.capture_timestamp(), Some("2025:04:14 12:00:00"));
/// assert!((again.latitude().unwrap() - 59.3293).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetadataContainer {
    pub primary: PrimaryGroup,
    pub capture: CaptureGroup,
    pub gps: GpsGroup,
    pub thumbnail: ThumbnailGroup,
    little_endian: bool,
}

/// Half of a GPS pair seen while decoding.
#[derive(Default)]
struct PairParts {
    value: Option<ExtraField>,
    reference: Option<ExtraField>,
}

impl MetadataContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a raw EXIF (TIFF) block.
    ///
    /// An empty block yields an empty container. A malformed block yields
    /// [`MetadataError::Decode`] and nothing else: either every group decodes
    /// or no container is returned.
    ///
    /// Only IFD0 (with its Exif, GPS and interoperability sub-IFDs) and the
    /// thumbnail IFD are kept. Fields in any further IFD of the chain are
    /// dropped with a warning and will not be written back on save.
    pub fn decode(block: &[u8]) -> Result<Self> {
        let block = block.strip_prefix(EXIF_MARKER).unwrap_or(block);
        if block.is_empty() {
            return Ok(Self::default());
        }

        let exif = Reader::new()
            .read_raw(block.to_vec())
            .map_err(MetadataError::Decode)?;

        let mut container = Self {
            little_endian: exif.little_endian(),
            ..Self::default()
        };
        let mut latitude = PairParts::default();
        let mut longitude = PairParts::default();

        for field in exif.fields() {
            match field.ifd_num {
                In::PRIMARY => {
                    container.take_primary_field(field, &mut latitude, &mut longitude)
                }
                In::THUMBNAIL => container.take_thumbnail_field(field),
                other => log::warn!(
                    "Dropping {} from IFD {}: only the primary and thumbnail IFDs are kept",
                    field.tag,
                    other.index()
                ),
            }
        }

        container.gps.latitude = pair_coordinate(&mut container.gps.other, latitude, Axis::Latitude);
        container.gps.longitude =
            pair_coordinate(&mut container.gps.other, longitude, Axis::Longitude);

        if !container.thumbnail.fields.is_empty() {
            container.thumbnail.jpeg = thumbnail_jpeg(&exif, block);
        }

        log::debug!(
            "Decoded EXIF: {} primary, {} capture, {} gps, {} thumbnail fields",
            container.primary.len(),
            container.capture.len(),
            container.gps.len(),
            container.thumbnail.fields.len()
        );

        Ok(container)
    }

    /// Serialize the container back to a raw EXIF (TIFF) block.
    ///
    /// An entirely empty container encodes to an empty block, meaning "no
    /// metadata". The byte order of the decoded source is kept.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let fields = self.to_fields();
        let mut writer = Writer::new();
        for field in &fields {
            writer.push_field(field);
        }
        if let Some(jpeg) = self.thumbnail.jpeg.as_deref() {
            writer.set_jpeg(jpeg, In::THUMBNAIL);
        }

        let mut buf = Cursor::new(Vec::new());
        writer
            .write(&mut buf, self.little_endian)
            .map_err(|e| MetadataError::Encode(e.to_string()))?;
        Ok(buf.into_inner())
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
            && self.capture.is_empty()
            && self.gps.is_empty()
            && self.thumbnail.is_empty()
    }

    pub fn is_little_endian(&self) -> bool {
        self.little_endian
    }

    // ── capture timestamp ────────────────────────────────────────────

    /// The capture timestamp: "original" if present, else "digitized".
    pub fn capture_timestamp(&self) -> Option<&str> {
        self.capture.original().or(self.capture.digitized())
    }

    /// Store `value` as the original capture timestamp after validating it
    /// against `YYYY:MM:DD HH:MM:SS`. On failure nothing changes.
    pub fn set_capture_timestamp(&mut self, value: &str) -> Result<()> {
        validate_timestamp(value)?;
        self.capture.other.retain(|f| f.tag != Tag::DateTimeOriginal);
        self.capture.original = Some(value.to_string());
        Ok(())
    }

    // ── GPS ──────────────────────────────────────────────────────────

    pub fn latitude(&self) -> Option<f64> {
        self.gps.latitude.as_ref().and_then(GpsCoordinate::to_decimal)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.gps.longitude.as_ref().and_then(GpsCoordinate::to_decimal)
    }

    /// Both coordinates, when both are present.
    pub fn coordinates(&self) -> Option<GpsCoords> {
        Some(GpsCoords {
            latitude: self.latitude()?,
            longitude: self.longitude()?,
        })
    }

    pub fn set_latitude(&mut self, value: f64) -> Result<()> {
        let coordinate = gps::encode_coordinate(value, Axis::Latitude)?;
        self.gps.set(Axis::Latitude, coordinate);
        Ok(())
    }

    pub fn set_longitude(&mut self, value: f64) -> Result<()> {
        let coordinate = gps::encode_coordinate(value, Axis::Longitude)?;
        self.gps.set(Axis::Longitude, coordinate);
        Ok(())
    }

    /// Set both coordinates. Both are validated before either is written.
    pub fn set_coordinates(&mut self, coords: GpsCoords) -> Result<()> {
        let latitude = gps::encode_coordinate(coords.latitude, Axis::Latitude)?;
        let longitude = gps::encode_coordinate(coords.longitude, Axis::Longitude)?;
        self.gps.set(Axis::Latitude, latitude);
        self.gps.set(Axis::Longitude, longitude);
        Ok(())
    }

    // ── decode helpers ───────────────────────────────────────────────

    fn take_primary_field(
        &mut self,
        field: &Field,
        latitude: &mut PairParts,
        longitude: &mut PairParts,
    ) {
        let extra = || ExtraField::from_field(field);
        match field.tag {
            // Rebuilt by the writer from the groups themselves.
            Tag::ExifIFDPointer | Tag::GPSInfoIFDPointer | Tag::InteropIFDPointer => {}
            Tag::Make => match ascii_text(&field.value) {
                Some(text) => self.primary.make = Some(text),
                None => self.primary.other.push(extra()),
            },
            Tag::Model => match ascii_text(&field.value) {
                Some(text) => self.primary.model = Some(text),
                None => self.primary.other.push(extra()),
            },
            Tag::DateTimeOriginal => match ascii_text(&field.value) {
                Some(text) => self.capture.original = Some(text),
                None => self.capture.other.push(extra()),
            },
            Tag::DateTimeDigitized => match ascii_text(&field.value) {
                Some(text) => self.capture.digitized = Some(text),
                None => self.capture.other.push(extra()),
            },
            Tag::GPSLatitude => latitude.value = Some(extra()),
            Tag::GPSLatitudeRef => latitude.reference = Some(extra()),
            Tag::GPSLongitude => longitude.value = Some(extra()),
            Tag::GPSLongitudeRef => longitude.reference = Some(extra()),
            tag => match tag.context() {
                Context::Exif | Context::Interop => self.capture.other.push(extra()),
                Context::Gps => self.gps.other.push(extra()),
                _ => self.primary.other.push(extra()),
            },
        }
    }

    fn take_thumbnail_field(&mut self, field: &Field) {
        match field.tag {
            // Regenerated from the thumbnail bytes on encode.
            Tag::JPEGInterchangeFormat
            | Tag::JPEGInterchangeFormatLength
            | Tag::StripOffsets
            | Tag::StripByteCounts
            | Tag::TileOffsets
            | Tag::TileByteCounts => {}
            _ => self.thumbnail.fields.push(ExtraField::from_field(field)),
        }
    }

    // ── encode helpers ───────────────────────────────────────────────

    fn to_fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        let ascii = |tag: Tag, text: &str| Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![text.as_bytes().to_vec()]),
        };

        if let Some(make) = self.primary.make() {
            fields.push(ascii(Tag::Make, make));
        }
        if let Some(model) = self.primary.model() {
            fields.push(ascii(Tag::Model, model));
        }
        if let Some(original) = self.capture.original() {
            fields.push(ascii(Tag::DateTimeOriginal, original));
        }
        if let Some(digitized) = self.capture.digitized() {
            fields.push(ascii(Tag::DateTimeDigitized, digitized));
        }
        for axis in [Axis::Latitude, Axis::Longitude] {
            if let Some(coordinate) = self.gps.coordinate(axis) {
                let (value_tag, ref_tag) = axis_tags(axis);
                let letter = coordinate.hemisphere.letter().to_string();
                fields.push(ascii(ref_tag, &letter));
                fields.push(Field {
                    tag: value_tag,
                    ifd_num: In::PRIMARY,
                    value: Value::Rational(
                        coordinate
                            .components
                            .iter()
                            .map(|&(num, denom)| Rational { num, denom })
                            .collect(),
                    ),
                });
            }
        }

        let primary_extras = self
            .primary
            .other
            .iter()
            .chain(&self.capture.other)
            .chain(&self.gps.other);
        fields.extend(primary_extras.map(|f| f.to_field(In::PRIMARY)));
        fields.extend(self.thumbnail.fields.iter().map(|f| f.to_field(In::THUMBNAIL)));

        fields
    }
}

fn axis_tags(axis: Axis) -> (Tag, Tag) {
    match axis {
        Axis::Latitude => (Tag::GPSLatitude, Tag::GPSLatitudeRef),
        Axis::Longitude => (Tag::GPSLongitude, Tag::GPSLongitudeRef),
    }
}

/// First ASCII string of a value, without NUL padding. Blank strings count as
/// absent so the raw field is kept verbatim instead.
fn ascii_text(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(parts) => {
            let text = String::from_utf8_lossy(parts.first()?);
            let text = text.trim_end_matches('\0').trim();
            if text.is_empty() { None } else { Some(text.to_string()) }
        }
        _ => None,
    }
}

fn rational_triple(value: &Value) -> Option<[(u32, u32); 3]> {
    match value {
        Value::Rational(parts) if parts.len() == 3 => {
            Some([
                (parts[0].num, parts[0].denom),
                (parts[1].num, parts[1].denom),
                (parts[2].num, parts[2].denom),
            ])
        }
        _ => None,
    }
}

/// Turn the two halves of a GPS pair into a coordinate. Incomplete or
/// unusable pairs are kept verbatim in `other` and read as absent.
fn pair_coordinate(
    other: &mut Vec<ExtraField>,
    parts: PairParts,
    axis: Axis,
) -> Option<GpsCoordinate> {
    let parsed = match (&parts.value, &parts.reference) {
        (Some(value), Some(reference)) => {
            let components = rational_triple(&value.value);
            let hemisphere = match &reference.value {
                Value::Ascii(letters) => letters
                    .first()
                    .and_then(|l| Hemisphere::parse(&String::from_utf8_lossy(l), axis)),
                _ => None,
            };
            match (components, hemisphere) {
                (Some(components), Some(hemisphere)) => {
                    let coordinate = GpsCoordinate { components, hemisphere };
                    coordinate.to_decimal().map(|_| coordinate)
                }
                _ => None,
            }
        }
        _ => None,
    };

    if parsed.is_none() && (parts.value.is_some() || parts.reference.is_some()) {
        log::debug!("Keeping incomplete or malformed GPS {axis:?} pair as raw fields");
        other.extend(parts.value);
        other.extend(parts.reference);
    }

    parsed
}

/// Copy the JPEG thumbnail out of the block, if IFD1 points at one that fits.
fn thumbnail_jpeg(exif: &exif::Exif, block: &[u8]) -> Option<Vec<u8>> {
    let offset = exif
        .get_field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    let len = exif
        .get_field(Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    let end = offset.checked_add(len)?;
    let jpeg = block.get(offset..end).map(<[u8]>::to_vec);
    if jpeg.is_none() {
        log::debug!("Thumbnail offset {offset}+{len} is outside the EXIF block, dropping it");
    }
    jpeg
}
