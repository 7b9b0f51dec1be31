//! Data-URL image payload checks.
//!
//! Images travel as `data:image/<type>;base64,<body>` strings. Workers run
//! [`validate`] before transforming anything; the checks are ordered so the
//! most specific failure is reported (missing, then encoding, then size).

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

/// Largest accepted decoded image: 5 MiB.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Required prefix of every image payload.
pub const DATA_URL_PREFIX: &str = "data:image/";

/// 1x1 transparent PNG, dispatched when a client submits no image.
pub const REFERENCE_IMAGE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Standard alphabet, padding optional, non-zero trailing bits ignored.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    #[error("No file uploaded.")]
    Missing,

    #[error("The base64 string provided is invalid or corrupted: {0}")]
    InvalidEncoding(String),

    #[error("The file is too large ({size} bytes). Maximum allowed size is {max} bytes.")]
    TooLarge { size: usize, max: usize },
}

/// Decode the body of a data-URL image.
///
/// The body is the segment after the first comma, up to the next comma if
/// any. ASCII whitespace inside the body is ignored.
pub fn decode_data_url(image: &str) -> Result<Vec<u8>, ImageError> {
    if image.is_empty() {
        return Err(ImageError::Missing);
    }
    if !image.starts_with(DATA_URL_PREFIX) {
        return Err(ImageError::InvalidEncoding(format!(
            "expected a \"{DATA_URL_PREFIX}\" prefix"
        )));
    }

    let body = image
        .split(',')
        .nth(1)
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ImageError::InvalidEncoding("no base64 body after ','".into()))?;

    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = LENIENT_STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ImageError::InvalidEncoding(e.to_string()))?;

    if bytes.is_empty() {
        return Err(ImageError::InvalidEncoding("decoded image is empty".into()));
    }
    Ok(bytes)
}

/// Run every payload check. Returns the decoded size on success.
pub fn validate(image: &str, max_bytes: usize) -> Result<usize, ImageError> {
    let size = decode_data_url(image)?.len();
    if size > max_bytes {
        return Err(ImageError::TooLarge {
            size,
            max: max_bytes,
        });
    }
    Ok(size)
}

/// Placeholder transform: returns the image unchanged.
///
/// Stands in for the real filter and effect algorithms, which are not
/// implemented.
pub fn passthrough(image: &str) -> String {
    image.to_string()
}

/// Wrap raw bytes as a data URL. Test and tooling helper.
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", LENIENT_STANDARD.encode(bytes))
}
