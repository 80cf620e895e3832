//! Attachment classification
//!
//! Decides whether an attachment is previewed as an image. The content type
//! wins when one is known; otherwise the file name's extension is matched.

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];
pub const IMAGE_MIME_PREFIX: &str = "image/";

/// Check if a content type denotes an image
pub fn is_image_mime(mime: &str) -> bool {
    mime.trim().to_ascii_lowercase().starts_with(IMAGE_MIME_PREFIX)
}

/// Check if an extension is one of the previewable image formats
pub fn is_image_extension(ext: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}

/// Check a file name (or legacy attachment string) by its trailing extension
pub fn is_image_name(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| is_image_extension(ext))
        .unwrap_or(false)
}

/// Classify an attachment: mime first, then the name's extension.
pub fn classify(mime: Option<&str>, name: &str) -> bool {
    match mime.map(str::trim).filter(|m| !m.is_empty()) {
        Some(mime) => is_image_mime(mime),
        None => is_image_name(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_decides_when_present() {
        assert!(classify(Some("image/png"), "report.pdf"));
        assert!(!classify(Some("application/pdf"), "photo.png"));
        assert!(classify(Some("IMAGE/JPEG"), "x"));
    }

    #[test]
    fn test_empty_mime_falls_back_to_extension() {
        assert!(classify(Some(""), "holiday.JPG"));
        assert!(classify(None, "scan.webp"));
        assert!(!classify(None, "notes.txt"));
    }

    #[test]
    fn test_all_image_extensions_match() {
        for ext in IMAGE_EXTENSIONS {
            assert!(is_image_name(&format!("file.{ext}")), "{ext} should match");
            assert!(is_image_name(&format!("file.{}", ext.to_uppercase())));
        }
    }

    #[test]
    fn test_extension_edge_cases() {
        assert!(!is_image_name("png"));
        assert!(is_image_name(".png"));
        assert!(!is_image_name("archive.png.zip"));
        // svg is not in the preview set
        assert!(!is_image_name("logo.svg"));
    }
}
