//! Image encoding as self-describing data URIs.

use super::ContentUnit;
use crate::error::{MosaicError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;
use std::sync::OnceLock;

/// MIME type used when an image extension is not recognized.
pub const FALLBACK_MIME: &str = "application/octet-stream";

fn data_uri_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^data:(image/[A-Za-z0-9.+-]+|application/octet-stream);base64,[A-Za-z0-9+/]+={0,2}$",
        )
        .expect("static data URI pattern")
    })
}

/// MIME type for an image file extension (with or without the leading dot).
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension.trim_start_matches('.').to_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => FALLBACK_MIME,
    }
}

/// Encode raw image bytes as `data:<mime>;base64,<payload>`.
pub fn encode_image(bytes: &[u8], extension: &str) -> String {
    format!(
        "data:{};base64,{}",
        mime_for_extension(extension),
        STANDARD.encode(bytes)
    )
}

/// Encode an image into its single content unit.
///
/// Empty input is a `DecodeFailure`: its data URI has no body and would not
/// classify as an image at query time.
pub fn image_unit(
    source_file_id: &str,
    sequence_index: u32,
    bytes: &[u8],
    extension: &str,
) -> Result<ContentUnit> {
    if bytes.is_empty() {
        return Err(MosaicError::DecodeFailure(format!(
            "{}: image is empty",
            source_file_id
        )));
    }
    Ok(ContentUnit::image(
        source_file_id,
        sequence_index,
        encode_image(bytes, extension),
    ))
}

/// Whether a stored payload is an encoded image rather than text.
pub fn is_encoded_image(payload: &str) -> bool {
    data_uri_regex().is_match(payload)
}

/// MIME type of an encoded image payload.
///
/// Read from the data-URI header when present; otherwise `image/jpeg` if the payload
/// mentions jpeg and `image/png` for everything else.
pub fn image_mime_type(payload: &str) -> String {
    if let Some(header) = payload
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(mime, _)| mime)
    {
        if !header.is_empty() {
            return header.to_string();
        }
    }

    if payload.contains("jpeg") {
        "image/jpeg".to_string()
    } else {
        "image/png".to_string()
    }
}

/// The base64 body of an encoded image, without the data-URI header.
pub fn image_data(payload: &str) -> &str {
    payload
        .split_once(";base64,")
        .map(|(_, data)| data)
        .unwrap_or(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    #[test]
    fn test_encode_image_is_self_describing() {
        let encoded = encode_image(PNG_MAGIC, ".png");
        assert_eq!(encoded, "data:image/png;base64,iVBORw0KGgo=");
        assert!(is_encoded_image(&encoded));
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_for_extension(".JPG"), "image/jpeg");
        assert_eq!(mime_for_extension("jpeg"), "image/jpeg");
        assert_eq!(mime_for_extension(".svg"), "image/svg+xml");
        assert_eq!(mime_for_extension(".tiff"), FALLBACK_MIME);
    }

    #[test]
    fn test_every_encoded_image_classifies_as_image() {
        for ext in [".png", ".jpg", ".jpeg", ".svg", ".gif", ".unknown"] {
            for len in [1usize, 2, 3, 4, 100, 1001] {
                let bytes: Vec<u8> = (0..len).map(|i| (i * 37 % 256) as u8).collect();
                let encoded = encode_image(&bytes, ext);
                assert!(is_encoded_image(&encoded), "{ext} len={len}");
            }
        }
    }

    #[test]
    fn test_empty_image_rejected_before_encoding() {
        // The bare header would read back as text.
        assert!(!is_encoded_image(&encode_image(&[], ".png")));

        for ext in [".png", ".jpg", ".svg", ".unknown"] {
            assert!(matches!(
                image_unit("blank", 0, &[], ext),
                Err(MosaicError::DecodeFailure(_))
            ));
        }
    }

    #[test]
    fn test_prose_never_classifies_as_image() {
        let prose = [
            "The quarterly report shows a 12% increase in revenue.",
            "hello",
            "SGVsbG8gd29ybGQ=",
            "data:image/png;base64,",
            "data:text/plain;base64,SGVsbG8=",
            "See data:image/png;base64,iVBORw0KGgo= for the logo.",
            "",
        ];
        for text in prose {
            assert!(!is_encoded_image(text), "{text:?}");
        }
    }

    #[test]
    fn test_image_mime_type_inference() {
        assert_eq!(image_mime_type(&encode_image(b"x", ".jpg")), "image/jpeg");
        assert_eq!(image_mime_type(&encode_image(b"x", ".svg")), "image/svg+xml");
        assert_eq!(image_mime_type("/9j/jpeg-ish"), "image/jpeg");
        assert_eq!(image_mime_type("iVBORw0KGgo="), "image/png");
    }

    #[test]
    fn test_image_unit_and_data() {
        let unit = image_unit("photo-1", 0, PNG_MAGIC, ".png").unwrap();
        assert_eq!(unit.kind, crate::content::ContentKind::Image);
        assert_eq!(unit.sequence_index, 0);
        assert_eq!(image_data(&unit.payload), "iVBORw0KGgo=");
    }
}
