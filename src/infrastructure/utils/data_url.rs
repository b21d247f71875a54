use base64::{engine::general_purpose::STANDARD, Engine};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Encodes file bytes as a `data:` URL usable as a local preview source.
pub fn to_data_url(bytes: &[u8]) -> String {
    let mime = infer::get(bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or(FALLBACK_MIME);

    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Best-effort MIME type for upload parts.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    infer::get(bytes).map(|kind| kind.mime_type())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn png_bytes_get_image_mime() {
        let url = to_data_url(&PNG_MAGIC);
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(sniff_mime(&PNG_MAGIC), Some("image/png"));
    }

    #[test]
    fn unknown_bytes_fall_back_to_octet_stream() {
        assert_eq!(to_data_url(b"hi"), "data:application/octet-stream;base64,aGk=");
        assert_eq!(sniff_mime(b"hi"), None);
    }
}
