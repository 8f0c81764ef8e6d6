//! Filename-based MIME lookup.
//!
//! The worker form API does not surface an upload part's MIME type, so
//! the create-note route derives it from the filename extension.

/// MIME type for the image formats browsers commonly upload. Unknown
/// extensions fall back to the octet-stream default the core applies
/// to an empty content type.
pub fn content_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_image_extensions_map_case_insensitively() {
        assert_eq!(content_type_for("pic.png"), "image/png");
        assert_eq!(content_type_for("PHOTO.JPG"), "image/jpeg");
        assert_eq!(content_type_for("anim.webp"), "image/webp");
    }

    #[test]
    fn unknown_or_missing_extension_falls_back() {
        assert_eq!(content_type_for("archive.zip"), "application/octet-stream");
        assert_eq!(content_type_for("no-extension"), "application/octet-stream");
        assert_eq!(content_type_for(""), "application/octet-stream");
    }
}
