//! Custom icon detection
//!
//! Icons are accepted as PNG, JPEG or ICO and copied into the project's
//! build resources unchanged.

use std::path::Path;

use webforge_errors::SubmitError;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const ICO_MAGIC: &[u8] = &[0x00, 0x00, 0x01, 0x00];

/// Supported icon formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconFormat {
    Png,
    Jpeg,
    Ico,
}

impl IconFormat {
    /// File extension used when the icon is written into a project
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Ico => "ico",
        }
    }

    fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(PNG_MAGIC) {
            Some(Self::Png)
        } else if bytes.starts_with(JPEG_MAGIC) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(ICO_MAGIC) {
            Some(Self::Ico)
        } else {
            None
        }
    }

    fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "ico" => Some(Self::Ico),
            _ => None,
        }
    }

    /// Identify an icon from its content, cross-checked against the
    /// uploaded file name when one is given.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::UnsupportedIcon` if the content is not PNG, JPEG
    /// or ICO, or if the file name's extension names a different format.
    pub fn detect(filename: Option<&str>, bytes: &[u8]) -> Result<Self, SubmitError> {
        let Some(format) = Self::from_magic(bytes) else {
            return Err(SubmitError::UnsupportedIcon {
                reason: "content is not a PNG, JPEG or ICO image".to_string(),
            });
        };

        let extension = filename
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str());
        if let Some(extension) = extension {
            match Self::from_extension(extension) {
                Some(claimed) if claimed == format => {}
                Some(_) => {
                    return Err(SubmitError::UnsupportedIcon {
                        reason: format!(
                            ".{extension} file contains {} data",
                            format.extension().to_ascii_uppercase()
                        ),
                    });
                }
                None => {
                    return Err(SubmitError::UnsupportedIcon {
                        reason: format!(".{extension} is not an accepted icon extension"),
                    });
                }
            }
        }

        Ok(format)
    }
}

/// An uploaded icon
#[derive(Debug, Clone)]
pub struct IconAsset {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

impl IconAsset {
    #[must_use]
    pub fn new(filename: Option<String>, bytes: Vec<u8>) -> Self {
        Self { filename, bytes }
    }

    /// Detected format of this icon
    ///
    /// # Errors
    ///
    /// See [`IconFormat::detect`].
    pub fn format(&self) -> Result<IconFormat, SubmitError> {
        IconFormat::detect(self.filename.as_deref(), &self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> Vec<u8> {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        bytes
    }

    #[test]
    fn detects_by_magic_bytes() {
        assert_eq!(IconFormat::detect(None, &png()).unwrap(), IconFormat::Png);
        assert_eq!(
            IconFormat::detect(Some("logo.JPEG"), &[0xFF, 0xD8, 0xFF, 0xE0]).unwrap(),
            IconFormat::Jpeg
        );
        assert_eq!(
            IconFormat::detect(Some("app.ico"), &[0, 0, 1, 0, 1, 0]).unwrap(),
            IconFormat::Ico
        );
    }

    #[test]
    fn rejects_mismatch_and_unknown_content() {
        assert!(IconFormat::detect(Some("logo.ico"), &png()).is_err());
        assert!(IconFormat::detect(Some("logo.gif"), &png()).is_err());
        assert!(IconFormat::detect(Some("logo.png"), b"GIF89a").is_err());
    }
}
