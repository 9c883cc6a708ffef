use chrono::NaiveDateTime;

use super::error::{MetadataError, Result};

/// The only accepted layout for capture timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

const TIMESTAMP_SHAPE: &[u8; 19] = b"dddd:dd:dd dd:dd:dd";

/// Check a capture timestamp against `YYYY:MM:DD HH:MM:SS`.
///
/// The layout is matched character by character (chrono alone would accept
/// unpadded fields), then the value must be a real calendar date and time.
pub fn validate_timestamp(value: &str) -> Result<NaiveDateTime> {
    let invalid = || {
        MetadataError::Validation(format!(
            "capture date must look like YYYY:MM:DD HH:MM:SS (e.g. 2025:04:14 12:00:00), got {value:?}"
        ))
    };

    let bytes = value.as_bytes();
    if bytes.len() != TIMESTAMP_SHAPE.len() {
        return Err(invalid());
    }
    let shape_ok = bytes.iter().zip(TIMESTAMP_SHAPE.iter()).all(|(&b, &s)| match s {
        b'd' => b.is_ascii_digit(),
        _ => b == s,
    });
    if !shape_ok {
        return Err(invalid());
    }

    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn accepts_exif_layout() {
        let dt = validate_timestamp("2025:04:14 12:00:00").unwrap();
        assert_eq!(dt.year(), 2025);
        assert_eq!(dt.month(), 4);
        assert_eq!(dt.day(), 14);
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn rejects_other_layouts() {
        for bad in [
            "2025-04-14",
            "2025-04-14 12:00:00",
            "2025:4:14 12:00:00",
            "2025:04:14T12:00:00",
            "2025:04:14 12:00",
            " 2025:04:14 12:00:00",
            "2025:04:14 12:00:00 ",
            "",
            "N/A",
        ] {
            assert!(
                matches!(validate_timestamp(bad), Err(MetadataError::Validation(_))),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn rejects_impossible_dates() {
        assert!(validate_timestamp("2025:02:30 12:00:00").is_err());
        assert!(validate_timestamp("2025:13:01 12:00:00").is_err());
        assert!(validate_timestamp("2025:04:14 24:00:00").is_err());
        assert!(validate_timestamp("2024:02:29 23:59:59").is_ok());
    }
}
