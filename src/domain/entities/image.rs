use std::{path::{Path, PathBuf}, sync::Arc};

use serde::{Deserialize, Serialize};

pub type ImageId = i64;

/// Secondary image stored server side for a maquete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedImage {
    pub id: ImageId,
    #[serde(default)]
    pub public_id: String, // media host id
    #[serde(default)]
    pub url: String,
}

// Body of POST /api/maquetes/{id}/images
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewImageLink {
    pub public_id: String,
    pub url: String,
}

/// Identifiers returned by the media host for one upload.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UploadedImage {
    #[serde(default)]
    pub public_id: String,
    #[serde(default)]
    pub secure_url: String,
}

impl From<&UploadedImage> for NewImageLink {
    fn from(upload: &UploadedImage) -> Self {
        NewImageLink {
            public_id: upload.public_id.clone(),
            url: upload.secure_url.clone(),
        }
    }
}

/// Image selected locally and not yet linked to a saved maquete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedImage {
    pub file_name: String,
    pub preview_url: String, // data: URL, local only
    pub external_id: String,
    pub remote_url: String,
}

impl StagedImage {
    pub fn new(file_name: impl Into<String>) -> Self {
        StagedImage {
            file_name: file_name.into(),
            ..StagedImage::default()
        }
    }

    /// An entry can be linked once the upload produced either identifier.
    pub fn is_resolved(&self) -> bool {
        !self.external_id.is_empty() || !self.remote_url.is_empty()
    }

    pub fn to_link(&self) -> NewImageLink {
        NewImageLink {
            public_id: self.external_id.clone(),
            url: self.remote_url.clone(),
        }
    }
}

#[derive(Debug, Clone)]
enum FileSource {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

/// A file picked by the user, read lazily for previews and uploads.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    name: String,
    source: FileSource,
}

impl SelectedFile {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        SelectedFile {
            name,
            source: FileSource::Path(path),
        }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        SelectedFile {
            name: name.into(),
            source: FileSource::Memory(Arc::from(bytes)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        match &self.source {
            FileSource::Path(path) => tokio::fs::read(path).await,
            FileSource::Memory(bytes) => Ok(bytes.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_image_resolution() {
        let mut image = StagedImage::new("a.png");
        assert!(!image.is_resolved());

        image.remote_url = "https://cdn.example.com/a.png".into();
        assert!(image.is_resolved());

        let link = image.to_link();
        assert_eq!(link.public_id, "");
        assert_eq!(link.url, "https://cdn.example.com/a.png");
    }

    #[test]
    fn selected_file_name_comes_from_path() {
        let file = SelectedFile::from_path("/tmp/photos/front.jpg");
        assert_eq!(file.name(), "front.jpg");
    }

    #[tokio::test]
    async fn in_memory_file_reads_back() {
        let file = SelectedFile::from_bytes("x.bin", vec![1u8, 2, 3]);
        assert_eq!(file.read().await.unwrap(), vec![1, 2, 3]);
    }
}
