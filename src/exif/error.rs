use std::fmt;

/// Everything that can go wrong while loading, editing or saving an image's
/// EXIF block.
///
/// An absent GPS coordinate is not an error; the accessors return `None` for it.
#[derive(Debug)]
pub enum MetadataError {
    /// The existing metadata block is malformed.
    Decode(exif::Error),
    /// The container could not be serialized, or the serialized block does not
    /// fit in the image container.
    Encode(String),
    /// A value failed its format or range contract. Nothing was mutated.
    Validation(String),
    /// The file is not a JPEG, PNG or WebP image.
    UnsupportedImage(String),
    /// The image container itself could not be parsed.
    Image(String),
    Io(std::io::Error),
}

impl MetadataError {
    /// Whether the error came from an unreadable existing block, which callers
    /// may choose to discard instead of aborting.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "existing EXIF data is malformed: {err}"),
            Self::Encode(msg) => write!(f, "could not encode EXIF data: {msg}"),
            Self::Validation(msg) => write!(f, "invalid value: {msg}"),
            Self::UnsupportedImage(msg) => write!(f, "unsupported image: {msg}"),
            Self::Image(msg) => write!(f, "could not parse image: {msg}"),
            Self::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for MetadataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MetadataError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
