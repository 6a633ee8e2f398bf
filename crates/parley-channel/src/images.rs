//! Image payloads attached to feedback

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine as _;

use crate::error::{ChannelError, Result};

const FALLBACK_MIME: &str = "image/png";

/// A decoded image and its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImagePayload {
    /// Decode a `data:<mime>;base64,<data>` URI or bare base64.
    ///
    /// Bare base64 gets its MIME type from the magic bytes.
    pub fn decode(encoded: &str) -> Result<Self> {
        let encoded = encoded.trim();
        let (declared, data) = match encoded.strip_prefix("data:") {
            Some(rest) => {
                let (header, data) = rest
                    .split_once(',')
                    .ok_or_else(|| ChannelError::Image("data URI without ','".into()))?;
                let mut parts = header.split(';');
                let mime = parts.next().unwrap_or_default().trim();
                if !parts.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
                    return Err(ChannelError::Image("data URI is not base64".into()));
                }
                let mime = (!mime.is_empty()).then(|| mime.to_string());
                (mime, data)
            }
            None => (None, encoded),
        };

        let bytes = decode_base64(data)?;
        if bytes.is_empty() {
            return Err(ChannelError::Image("empty image".into()));
        }
        let mime_type = declared.unwrap_or_else(|| sniff_mime(&bytes).to_string());
        Ok(Self { bytes, mime_type })
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/bmp" => "bmp",
            "image/svg+xml" => "svg",
            _ => "png",
        }
    }
}

fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(&compact)
        .or_else(|_| STANDARD_NO_PAD.decode(compact.trim_end_matches('=')))
        .map_err(|e| ChannelError::Image(e.to_string()))
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else if bytes.starts_with(b"BM") {
        "image/bmp"
    } else {
        FALLBACK_MIME
    }
}

/// Write one feedback cycle's images as `feedback-<cycle>-<n>.<ext>`.
pub fn save_images(dir: &Path, cycle: i64, images: &[ImagePayload]) -> Result<Vec<PathBuf>> {
    if images.is_empty() {
        return Ok(Vec::new());
    }
    fs::create_dir_all(dir)?;
    let mut paths = Vec::with_capacity(images.len());
    for (index, image) in images.iter().enumerate() {
        let path = dir.join(format!(
            "feedback-{}-{}.{}",
            cycle,
            index + 1,
            image.extension()
        ));
        fs::write(&path, &image.bytes)?;
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn decodes_data_uri() {
        let uri = format!("data:image/jpeg;base64,{}", STANDARD.encode(b"jpegdata"));
        let image = ImagePayload::decode(&uri).unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.bytes, b"jpegdata");
        assert_eq!(image.extension(), "jpg");
    }

    #[test]
    fn raw_base64_is_sniffed() {
        let image = ImagePayload::decode(&STANDARD.encode(PNG_HEADER)).unwrap();
        assert_eq!(image.mime_type, "image/png");

        let gif = ImagePayload::decode(&STANDARD.encode(b"GIF89a....")).unwrap();
        assert_eq!(gif.mime_type, "image/gif");
    }

    #[test]
    fn unknown_bytes_fall_back_to_png() {
        let image = ImagePayload::decode(&STANDARD.encode(b"??")).unwrap();
        assert_eq!(image.mime_type, FALLBACK_MIME);
    }

    #[test]
    fn tolerates_missing_padding_and_whitespace() {
        let encoded = STANDARD_NO_PAD.encode(b"abcd");
        let wrapped = format!("  {}\n", encoded);
        assert_eq!(ImagePayload::decode(&wrapped).unwrap().bytes, b"abcd");
    }

    #[test]
    fn rejects_garbage() {
        assert!(ImagePayload::decode("!!!not base64!!!").is_err());
        assert!(ImagePayload::decode("data:image/png,plain").is_err());
        assert!(ImagePayload::decode("").is_err());
    }

    #[test]
    fn data_uri_round_trip() {
        let image = ImagePayload {
            bytes: PNG_HEADER.to_vec(),
            mime_type: "image/png".into(),
        };
        assert_eq!(ImagePayload::decode(&image.to_data_uri()).unwrap(), image);
    }

    #[test]
    fn saves_images_sequentially() {
        let tmp = TempDir::new().unwrap();
        let images = vec![
            ImagePayload {
                bytes: PNG_HEADER.to_vec(),
                mime_type: "image/png".into(),
            },
            ImagePayload {
                bytes: b"gif".to_vec(),
                mime_type: "image/gif".into(),
            },
        ];
        let paths = save_images(tmp.path(), 77, &images).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("feedback-77-1.png"));
        assert!(paths[1].ends_with("feedback-77-2.gif"));
        assert_eq!(fs::read(&paths[1]).unwrap(), b"gif");
    }
}
