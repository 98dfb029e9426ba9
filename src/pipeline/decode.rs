//! Base64 and data-URL handling shared by the image and PDF paths.
//!
//! Payloads arrive as text inside a JSON body, so binary documents are
//! always base64, optionally wrapped in a `data:<mime>;base64,` URL.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Marker that starts an image data URL.
pub const IMAGE_DATA_URL: &str = "data:image";

/// Marker that starts a PDF data URL.
pub const PDF_DATA_URL: &str = "data:application/pdf";

/// PDF file signature.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Drop a `data:...,` header if present, returning the encoded part.
pub fn strip_data_url(input: &str) -> &str {
    if input.starts_with("data:") {
        match input.split_once(',') {
            Some((_, encoded)) => encoded,
            None => input,
        }
    } else {
        input
    }
}

/// Decode standard base64, ignoring whitespace and line breaks.
pub fn decode_base64(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let trimmed = input.trim();
    let bytes = if trimmed.chars().any(char::is_whitespace) {
        let joined: String = trimmed.split_whitespace().collect();
        STANDARD.decode(joined)?
    } else {
        STANDARD.decode(trimmed)?
    };
    debug!("Decoded base64 → {} bytes", bytes.len());
    Ok(bytes)
}

/// Decode a `data:` URL or bare base64 string.
pub fn decode_payload(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    decode_base64(strip_data_url(input))
}

/// Encode bytes as standard base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// `true` when `%PDF` appears within the first ten bytes.
///
/// Some producers emit a BOM or stray whitespace ahead of the header, so
/// the signature is searched in a short window rather than at offset 0.
pub fn has_pdf_signature(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(10)];
    window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_data_url_variants() {
        assert_eq!(strip_data_url("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_url("data:application/pdf;base64,JVBE"), "JVBE");
        assert_eq!(strip_data_url("AAAA"), "AAAA");
        assert_eq!(strip_data_url("data:broken"), "data:broken");
    }

    #[test]
    fn decode_round_trip_with_line_breaks() {
        let encoded = encode_base64(b"hello world, this is a document");
        let wrapped = format!("{}\n{}\n", &encoded[..8], &encoded[8..]);
        assert_eq!(
            decode_base64(&wrapped).unwrap(),
            b"hello world, this is a document"
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_base64("invalid-json").is_err());
    }

    #[test]
    fn pdf_signature_window() {
        assert!(has_pdf_signature(b"%PDF-1.7\n"));
        assert!(has_pdf_signature(b"\xEF\xBB\xBF%PDF-1.4"));
        assert!(!has_pdf_signature(b"\x89PNG\r\n\x1a\n"));
        assert!(!has_pdf_signature(b"%PD"));
        assert!(!has_pdf_signature(b"0123456789%PDF"));
    }
}
