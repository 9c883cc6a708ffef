use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::webp::WebP;
use img_parts::{Bytes, ImageEXIF};
use serde::{Deserialize, Serialize};

use super::container::MetadataContainer;
use super::error::{MetadataError, Result};

/// Largest TIFF block a single JPEG APP1 segment can carry: the 16-bit
/// segment length minus the length field itself and the `Exif\0\0` marker.
pub const JPEG_MAX_EXIF_LEN: usize = u16::MAX as usize - 2 - 6;

const APP1: u8 = 0xE1;
const EXIF_MARKER: &[u8] = b"Exif\0\0";

/// Image containers that can carry an EXIF block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// JPEG, block in an APP1 segment
    Jpeg,
    /// PNG, block in an `eXIf` chunk
    Png,
    /// WebP, block in an `EXIF` RIFF chunk
    WebP,
}

impl ImageKind {
    /// Detect the container from its leading magic bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Self::Png)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::WebP)
        } else {
            None
        }
    }

    /// Guess the container from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }
}

/// What to do when an image's existing EXIF block cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptMetadataPolicy {
    /// Report the decode error and leave the file untouched.
    #[default]
    Abort,
    /// Log a warning and start over from an empty container, replacing the
    /// unreadable block on save.
    Discard,
}

impl FromStr for CorruptMetadataPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "discard" => Ok(Self::Discard),
            other => Err(format!("unknown corrupt-metadata policy '{other}' (expected abort or discard)")),
        }
    }
}

fn unsupported(bytes: &[u8]) -> MetadataError {
    let head: Vec<String> = bytes.iter().take(4).map(|b| format!("{b:02X}")).collect();
    MetadataError::UnsupportedImage(format!(
        "not a JPEG, PNG or WebP file (starts with {})",
        head.join(" ")
    ))
}

fn image_error(kind: ImageKind, err: img_parts::Error) -> MetadataError {
    MetadataError::Image(format!("{kind:?}: {err}"))
}

/// Pull the raw EXIF block out of an encoded image. `Ok(None)` means the image
/// carries no block.
pub fn extract_metadata(bytes: &[u8]) -> Result<Option<Vec<u8>>> {
    let kind = ImageKind::from_bytes(bytes).ok_or_else(|| unsupported(bytes))?;
    let data = Bytes::copy_from_slice(bytes);
    let block = match kind {
        ImageKind::Jpeg => Jpeg::from_bytes(data).map_err(|e| image_error(kind, e))?.exif(),
        ImageKind::Png => Png::from_bytes(data).map_err(|e| image_error(kind, e))?.exif(),
        ImageKind::WebP => WebP::from_bytes(data).map_err(|e| image_error(kind, e))?.exif(),
    };
    Ok(block.map(|b| b.to_vec()).filter(|b| !b.is_empty()))
}

/// Replace (or with `None`/empty, remove) the EXIF block of an encoded image.
/// Every other segment or chunk, pixel data included, is kept byte for byte.
pub fn embed_metadata(bytes: &[u8], block: Option<&[u8]>) -> Result<Vec<u8>> {
    let kind = ImageKind::from_bytes(bytes).ok_or_else(|| unsupported(bytes))?;
    let block = block
        .map(|b| b.strip_prefix(EXIF_MARKER).unwrap_or(b))
        .filter(|b| !b.is_empty())
        .map(Bytes::copy_from_slice);
    let data = Bytes::copy_from_slice(bytes);

    let output = match kind {
        ImageKind::Jpeg => {
            if let Some(block) = &block {
                if block.len() > JPEG_MAX_EXIF_LEN {
                    return Err(MetadataError::Encode(format!(
                        "EXIF block is {} bytes, a JPEG APP1 segment holds at most {JPEG_MAX_EXIF_LEN}",
                        block.len()
                    )));
                }
            }
            let mut jpeg = Jpeg::from_bytes(data).map_err(|e| image_error(kind, e))?;
            let original_pos = exif_segment_pos(&jpeg);
            jpeg.set_exif(block);

            // set_exif() always inserts after the leading APP segments; put the
            // block back where the original one was.
            if let (Some(target), Some(current)) = (original_pos, exif_segment_pos(&jpeg)) {
                if target < current {
                    let segments = jpeg.segments_mut();
                    let segment = segments.remove(current);
                    segments.insert(target, segment);
                }
            }
            jpeg.encoder().bytes()
        }
        ImageKind::Png => {
            let mut png = Png::from_bytes(data).map_err(|e| image_error(kind, e))?;
            png.set_exif(block);
            png.encoder().bytes()
        }
        ImageKind::WebP => {
            let mut webp = WebP::from_bytes(data).map_err(|e| image_error(kind, e))?;
            webp.set_exif(block);
            webp.encoder().bytes()
        }
    };

    Ok(output.to_vec())
}

fn exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == APP1 && s.contents().starts_with(EXIF_MARKER))
}

/// Decode the EXIF block of an in-memory image according to `policy`.
pub fn decode_image_metadata(
    bytes: &[u8],
    policy: CorruptMetadataPolicy,
) -> Result<MetadataContainer> {
    let Some(block) = extract_metadata(bytes)? else {
        log::debug!("No EXIF block, starting from an empty container");
        return Ok(MetadataContainer::new());
    };

    match MetadataContainer::decode(&block) {
        Ok(container) => Ok(container),
        Err(err) if err.is_decode() && policy == CorruptMetadataPolicy::Discard => {
            log::warn!("Discarding unreadable EXIF block ({} bytes): {err}", block.len());
            Ok(MetadataContainer::new())
        }
        Err(err) => Err(err),
    }
}

/// Read the EXIF block of the image at `path` into a container.
///
/// Images without a block yield an empty container. An unreadable block is
/// handled according to `policy`.
pub fn load_metadata(path: &Path, policy: CorruptMetadataPolicy) -> Result<MetadataContainer> {
    let bytes = std::fs::read(path)?;
    decode_image_metadata(&bytes, policy)
}

/// Serialize `container` into the image at `path`.
///
/// The new file is written next to the original and renamed over it, so a
/// failure at any step leaves the original file as it was.
pub fn save_metadata(path: &Path, container: &MetadataContainer) -> Result<()> {
    let bytes = std::fs::read(path)?;
    let block = container.encode()?;
    let output = embed_metadata(&bytes, Some(&block))?;
    write_atomically(path, &output)?;
    log::debug!(
        "Wrote {} byte EXIF block to {}",
        block.len(),
        path.display()
    );
    Ok(())
}

/// One load → mutate → save cycle. The file is only rewritten when `edit`
/// succeeds; the edited container is returned.
pub fn update_metadata<F>(
    path: &Path,
    policy: CorruptMetadataPolicy,
    edit: F,
) -> Result<MetadataContainer>
where
    F: FnOnce(&mut MetadataContainer) -> Result<()>,
{
    let mut container = load_metadata(path, policy)?;
    edit(&mut container)?;
    save_metadata(path, &container)?;
    Ok(container)
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let permissions = std::fs::metadata(path)?.permissions();

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    std::fs::set_permissions(tmp.path(), permissions)?;
    tmp.persist(path).map_err(|e| MetadataError::Io(e.error))?;
    Ok(())
}
