//! Pasted images become inline data-URL markup plus a file for upload.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{CommentError, Result};
use crate::models::NewFile;

/// Result of pasting one image into a comment buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PastedImage {
    /// Markup to append to the active text buffer.
    pub markup: String,
    /// Raw file for the next mutation's `new_files`.
    pub file: NewFile,
}

/// Convert a pasted binary into inline markup and an upload file.
///
/// Only `image/*` content types are accepted.
pub fn paste_image(name: &str, content_type: &str, data: Vec<u8>) -> Result<PastedImage> {
    let content_type = content_type.trim().to_ascii_lowercase();
    if !content_type.starts_with("image/") {
        return Err(CommentError::validation(format!(
            "Only images can be pasted, got {}",
            if content_type.is_empty() { "unknown type" } else { content_type.as_str() }
        )));
    }
    if data.is_empty() {
        return Err(CommentError::validation("Pasted image is empty"));
    }

    let markup = format!(
        "<img src=\"data:{};base64,{}\" alt=\"{}\">",
        content_type,
        STANDARD.encode(&data),
        escape_attr(name)
    );
    Ok(PastedImage {
        markup,
        file: NewFile::new(name, content_type, data),
    })
}

/// Guess an image content type from a file extension.
pub fn content_type_for(name: &str) -> Option<&'static str> {
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_data_url_markup() {
        let pasted = paste_image("shot.png", "image/png", vec![1, 2, 3]).unwrap();
        assert_eq!(
            pasted.markup,
            "<img src=\"data:image/png;base64,AQID\" alt=\"shot.png\">"
        );
        assert_eq!(pasted.file.name, "shot.png");
        assert_eq!(pasted.file.data, vec![1, 2, 3]);
    }

    #[test]
    fn escapes_alt_text() {
        let pasted = paste_image("a\"<b>.png", "IMAGE/PNG", vec![0]).unwrap();
        assert!(pasted.markup.ends_with("alt=\"a&quot;&lt;b&gt;.png\">"));
        assert_eq!(pasted.file.content_type, "image/png");
    }

    #[test]
    fn rejects_non_images() {
        let err = paste_image("notes.txt", "text/plain", vec![1]).unwrap_err();
        assert!(matches!(err, CommentError::Validation(_)));
    }

    #[test]
    fn rejects_empty_image() {
        assert!(paste_image("a.png", "image/png", Vec::new()).is_err());
    }

    #[test]
    fn guesses_content_type() {
        assert_eq!(content_type_for("a.JPG"), Some("image/jpeg"));
        assert_eq!(content_type_for("a.tar.gz"), None);
        assert_eq!(content_type_for("noext"), None);
    }
}
