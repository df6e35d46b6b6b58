use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine};
use std::fs;
use std::path::Path;

/// A captured still image, as handed over by the browser or read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// `data:image/...;base64,...` exactly as the camera capture produced it.
    DataUri(String),
    Bytes { mime_type: String, data: Vec<u8> },
}

impl ImageInput {
    /// Validates a data URI without re-encoding it.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        let (header, payload) = uri
            .split_once(',')
            .context("Image data URI has no payload")?;

        let mime_type = header
            .strip_prefix("data:")
            .and_then(|h| h.strip_suffix(";base64"))
            .context("Image must be a base64 data URI")?;

        if !mime_type.starts_with("image/") {
            anyhow::bail!("Unsupported image type: {}", mime_type);
        }
        if payload.is_empty() {
            anyhow::bail!("Image data URI is empty");
        }

        general_purpose::STANDARD
            .decode(payload)
            .context("Image payload is not valid base64")?;

        Ok(ImageInput::DataUri(uri.to_string()))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read(path)
            .with_context(|| format!("Failed to read image {}", path.display()))?;

        // MIME type from the file extension, JPEG otherwise
        let mime_type = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("png") => "image/png",
            Some(ext) if ext.eq_ignore_ascii_case("webp") => "image/webp",
            _ => "image/jpeg",
        };

        Ok(ImageInput::Bytes {
            mime_type: mime_type.to_string(),
            data,
        })
    }

    pub fn to_data_url(&self) -> String {
        match self {
            ImageInput::DataUri(uri) => uri.clone(),
            ImageInput::Bytes { mime_type, data } => format!(
                "data:{};base64,{}",
                mime_type,
                general_purpose::STANDARD.encode(data)
            ),
        }
    }
}

/// Vision/language model that looks at a photo and answers in free text.
#[async_trait::async_trait]
pub trait VisionService: Send + Sync {
    async fn analyze(&self, image: &ImageInput, dietary_hint: Option<&str>) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_image_data_uri() {
        let uri = "data:image/jpeg;base64,aGVsbG8=";
        let image = ImageInput::from_data_uri(uri).unwrap();

        assert_eq!(image.to_data_url(), uri);
    }

    #[test]
    fn test_rejects_bad_data_uris() {
        assert!(ImageInput::from_data_uri("hello").is_err());
        assert!(ImageInput::from_data_uri("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(ImageInput::from_data_uri("data:image/png,aGVsbG8=").is_err());
        assert!(ImageInput::from_data_uri("data:image/png;base64,").is_err());
        assert!(ImageInput::from_data_uri("data:image/png;base64,***").is_err());
    }

    #[test]
    fn test_bytes_to_data_url() {
        let image = ImageInput::Bytes {
            mime_type: "image/png".to_string(),
            data: b"hello".to_vec(),
        };

        assert_eq!(image.to_data_url(), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn test_from_path_detects_mime() {
        let path = std::env::temp_dir().join(format!("fridge-chef-{}.PNG", std::process::id()));
        fs::write(&path, b"hello").unwrap();

        let image = ImageInput::from_path(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(image.to_data_url(), "data:image/png;base64,aGVsbG8=");
    }
}
