use crate::infrastructure::error::InfraError;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickedImage {
    Picked(String),
    Cancelled,
}

/// Media-picker capability consumed by the notes feature. Only the returned
/// local URI is stored; the image bytes never pass through this crate.
pub trait ImagePicker: Send + Sync {
    fn pick_image(&self) -> Result<PickedImage, InfraError>;
}

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "webp", "heic"];

/// Picks an existing image file from disk and hands back a `file://` URI.
#[derive(Debug, Clone)]
pub struct FilePathImagePicker {
    candidate: Option<PathBuf>,
}

impl FilePathImagePicker {
    pub fn new(candidate: Option<PathBuf>) -> Self {
        Self { candidate }
    }
}

impl ImagePicker for FilePathImagePicker {
    fn pick_image(&self) -> Result<PickedImage, InfraError> {
        let Some(path) = self.candidate.as_deref() else {
            return Ok(PickedImage::Cancelled);
        };
        if !is_image_path(path) {
            return Err(InfraError::InvalidConfig(format!(
                "not an image file: {}",
                path.display()
            )));
        }
        let absolute = path.canonicalize()?;
        Ok(PickedImage::Picked(format!("file://{}", absolute.display())))
    }
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(extension))
        })
        .unwrap_or(false)
}
