//! Staged uploads: scoped temporary copies of an uploaded image.
//!
//! A [`StagedImage`] owns its file. Dropping it deletes the file, so whoever
//! holds the handle decides when the bytes go away.

use std::fmt;
use std::io::Write;
use std::path::Path;

use image::ImageFormat;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{AnalyzerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// Parse a bare extension (no dot), case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            _ => None,
        }
    }

    /// Kind of an uploaded file, judged by its name's extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        split_extension(name).map(|(_, kind)| kind)
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::Png => ImageFormat::Png,
        }
    }

    /// True when the magic bytes of `data` agree with this kind.
    pub fn matches_content(self, data: &[u8]) -> bool {
        image::guess_format(data).map_or(false, |format| format == self.image_format())
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Split the extension off an uploaded file name, keeping its original case.
fn split_extension(name: &str) -> Option<(&str, ImageKind)> {
    let ext = Path::new(name).extension()?.to_str()?;
    ImageKind::from_extension(ext).map(|kind| (ext, kind))
}

pub struct StagedImage {
    file: NamedTempFile,
    kind: ImageKind,
    original_name: String,
}

impl StagedImage {
    /// Write `bytes` to a fresh, uniquely named file in `dir` whose name ends
    /// with the extension of `original_name`.
    pub fn stage(dir: &Path, original_name: &str, bytes: &[u8]) -> Result<Self> {
        let (ext, kind) =
            split_extension(original_name).ok_or_else(|| AnalyzerError::UnsupportedImage {
                name: original_name.to_string(),
            })?;

        let suffix = format!(".{ext}");
        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(dir)
            .map_err(|e| AnalyzerError::io(dir, e))?;

        let written = file.write_all(bytes);
        let written = written.and_then(|()| file.flush());
        if let Err(e) = written {
            return Err(AnalyzerError::io(file.path(), e));
        }

        debug!(
            path = %file.path().display(),
            size = bytes.len(),
            %kind,
            "Staged upload"
        );

        Ok(Self {
            file,
            kind,
            original_name: original_name.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        tokio::fs::read(self.path())
            .await
            .map_err(|e| AnalyzerError::io(self.path(), e))
    }

    /// Delete the file now. A failure here is logged, not returned: the
    /// handle is gone either way.
    pub fn release(self) {
        let path = self.path().to_path_buf();
        match self.file.close() {
            Ok(()) => debug!(path = %path.display(), "Released staged upload"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete staged upload"),
        }
    }
}

impl fmt::Debug for StagedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagedImage")
            .field("path", &self.path())
            .field("kind", &self.kind)
            .field("original_name", &self.original_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_preserves_extension_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = b"\x00\x01\x02arbitrary\xff";

        for name in ["scan.jpg", "scan.jpeg", "scan.png", "XRAY.PNG"] {
            let staged = StagedImage::stage(dir.path(), name, bytes).unwrap();
            let ext = Path::new(name).extension().unwrap().to_str().unwrap();

            assert!(
                staged.path().to_string_lossy().ends_with(&format!(".{ext}")),
                "{} should end with .{ext}",
                staged.path().display()
            );
            assert_eq!(std::fs::read(staged.path()).unwrap(), bytes);
            assert_eq!(staged.original_name(), name);
        }
    }

    #[test]
    fn test_stage_rejects_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["scan.gif", "scan", "scan.png.exe", ".png"] {
            let err = StagedImage::stage(dir.path(), name, b"data").unwrap_err();
            assert!(matches!(err, AnalyzerError::UnsupportedImage { .. }), "{name}");
        }
    }

    #[test]
    fn test_each_stage_gets_a_unique_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = StagedImage::stage(dir.path(), "a.png", b"a").unwrap();
        let b = StagedImage::stage(dir.path(), "a.png", b"b").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_drop_and_release_delete_the_file() {
        let dir = tempfile::tempdir().unwrap();

        let staged = StagedImage::stage(dir.path(), "a.jpg", b"a").unwrap();
        let path = staged.path().to_path_buf();
        drop(staged);
        assert!(!path.exists());

        let staged = StagedImage::stage(dir.path(), "b.jpg", b"b").unwrap();
        let path = staged.path().to_path_buf();
        staged.release();
        assert!(!path.exists());
    }

    #[test]
    fn test_kind_mime_and_sniffing() {
        assert_eq!(ImageKind::from_extension("JPG"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::Png.mime_type(), "image/png");
        assert_eq!(ImageKind::Jpeg.mime_type(), "image/jpeg");

        let png_magic = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR";
        let jpeg_magic = b"\xff\xd8\xff\xe0\x00\x10JFIF\x00";
        assert!(ImageKind::Png.matches_content(png_magic));
        assert!(!ImageKind::Jpeg.matches_content(png_magic));
        assert!(ImageKind::Jpeg.matches_content(jpeg_magic));
        assert!(!ImageKind::Png.matches_content(b"hello world"));
    }
}
