use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use url::Url;

use crate::error::AppError;
use crate::model::ImageId;

/// Filesystem-backed stand-in for the binary-storage collaborator. Image ids
/// are opaque tokens naming a file under the images directory; resolving an
/// id that no longer has a file yields None, never an error.
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// One-time upload target: a fresh id plus the file URL the caller is
    /// expected to write the raw bytes to.
    pub fn upload_target(&self) -> Result<(ImageId, Url), AppError> {
        fs::create_dir_all(&self.root)?;
        let mut token = format!("img_{}", Utc::now().timestamp_micros());
        let mut bump = 0u32;
        while self.root.join(&token).exists() {
            bump += 1;
            token = format!("img_{}_{bump}", Utc::now().timestamp_micros());
        }
        let path = self.root.join(&token);
        let url = Url::from_file_path(&path).map_err(|_| {
            AppError::UploadFailed(format!("invalid upload path: {}", path.display()))
        })?;
        Ok((ImageId(token), url))
    }

    /// Full upload: generate a target and write the source file's bytes into
    /// it, returning the id to stamp on an exercise.
    pub fn store(&self, source: &Path) -> Result<ImageId, AppError> {
        let bytes = fs::read(source)?;
        let (image_id, _) = self.upload_target()?;
        let path = self.path_for(&image_id);
        fs::write(&path, bytes)
            .map_err(|err| AppError::UploadFailed(format!("{}: {err}", path.display())))?;
        Ok(image_id)
    }

    /// Read-time resolution of an image id to a displayable URL.
    pub fn resolve_url(&self, image_id: &ImageId) -> Option<Url> {
        let path = self.path_for(image_id);
        if !path.is_file() {
            return None;
        }
        Url::from_file_path(&path).ok()
    }

    fn path_for(&self, image_id: &ImageId) -> PathBuf {
        self.root.join(&image_id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_image_resolves_to_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ImageStore::new(dir.path().join("images"));
        assert!(store.resolve_url(&ImageId("img_gone".to_string())).is_none());
    }

    #[test]
    fn stored_image_resolves_to_file_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("photo.png");
        fs::write(&source, b"not-really-a-png").expect("write source");

        let store = ImageStore::new(dir.path().join("images"));
        let image_id = store.store(&source).expect("store");
        let url = store.resolve_url(&image_id).expect("url");
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with(&image_id.0));
    }

    #[test]
    fn upload_targets_are_distinct() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ImageStore::new(dir.path().join("images"));
        let (first, first_url) = store.upload_target().expect("target");
        fs::write(dir.path().join("images").join(&first.0), b"x").expect("write");
        let (second, _) = store.upload_target().expect("target");
        assert_ne!(first, second);
        assert!(first_url.path().ends_with(&first.0));
    }
}
