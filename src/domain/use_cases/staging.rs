use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::{
    constants::{STAGED_THUMB_SIZE, THUMBNAIL_LIMIT},
    entities::image::{SelectedFile, StagedImage, UploadedImage},
    upload::cloudinary::{CloudinaryUrls, ImageUploader},
    utils::data_url::to_data_url,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EntryKey(u64);

struct StagedEntry {
    key: EntryKey,
    image: StagedImage,
}

#[derive(Default)]
struct StagedState {
    entries: Vec<StagedEntry>,
    next_key: u64,
    in_flight: usize,
}

impl StagedState {
    fn entry_mut(&mut self, key: EntryKey) -> Option<&mut StagedImage> {
        self.entries
            .iter_mut()
            .find(|e| e.key == key)
            .map(|e| &mut e.image)
    }
}

/// Images selected for a maquete that has not been created yet.
///
/// Every selected file gets a placeholder entry right away; its local preview
/// and its upload resolve later on spawned tasks. Late results are applied by
/// entry key, so an entry removed or cleared in the meantime stays gone.
#[derive(Clone)]
pub struct StagedImageList {
    state: Arc<Mutex<StagedState>>,
    uploader: Arc<dyn ImageUploader>,
    revision: Arc<watch::Sender<u64>>,
}

impl StagedImageList {
    pub fn new(uploader: Arc<dyn ImageUploader>) -> Self {
        let (revision, _) = watch::channel(0);
        StagedImageList {
            state: Arc::new(Mutex::new(StagedState::default())),
            uploader,
            revision: Arc::new(revision),
        }
    }

    pub fn uploads_enabled(&self) -> bool {
        self.uploader.is_configured()
    }

    /// Receives a new value every time the list should be re-rendered.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    /// Stages `files` and starts their preview reads and uploads.
    ///
    /// Must be called from within a tokio runtime. Returns immediately.
    pub fn add_files(&self, files: impl IntoIterator<Item = SelectedFile>) {
        let upload = self.uploader.is_configured();

        for file in files {
            let key = {
                let mut state = self.state.lock();
                let key = EntryKey(state.next_key);
                state.next_key += 1;
                state.entries.push(StagedEntry {
                    key,
                    image: StagedImage::new(file.name()),
                });
                if upload {
                    state.in_flight += 1;
                }
                key
            };

            self.spawn_preview(key, file.clone());
            if upload {
                self.spawn_upload(key, file);
            }
        }

        self.bump();
    }

    fn spawn_preview(&self, key: EntryKey, file: SelectedFile) {
        let list = self.clone();
        tokio::spawn(async move {
            let preview = match file.read().await {
                Ok(bytes) => to_data_url(&bytes),
                Err(e) => {
                    tracing::warn!("Failed to read {} for preview: {}", file.name(), e);
                    return;
                }
            };

            let applied = list.apply(key, |image| image.preview_url = preview);
            if !applied {
                tracing::debug!("Preview for {} arrived after removal", file.name());
            }
        });
    }

    fn spawn_upload(&self, key: EntryKey, file: SelectedFile) {
        let list = self.clone();
        tokio::spawn(async move {
            match list.uploader.upload(&file).await {
                Ok(UploadedImage { public_id, secure_url }) => {
                    let applied = list.apply(key, |image| {
                        image.external_id = public_id;
                        image.remote_url = secure_url;
                    });
                    if !applied {
                        tracing::debug!("Upload of {} finished after removal, discarded", file.name());
                    }
                }
                Err(e) => tracing::error!("Failed to upload secondary image {}: {}", file.name(), e),
            }

            list.state.lock().in_flight -= 1;
            list.bump();
        });
    }

    /// Applies `update` to the entry if it is still staged.
    fn apply(&self, key: EntryKey, update: impl FnOnce(&mut StagedImage)) -> bool {
        let applied = match self.state.lock().entry_mut(key) {
            Some(image) => {
                update(image);
                true
            }
            None => false,
        };
        if applied {
            self.bump();
        }
        applied
    }

    pub fn remove(&self, index: usize) -> Option<StagedImage> {
        let removed = {
            let mut state = self.state.lock();
            (index < state.entries.len()).then(|| state.entries.remove(index).image)
        };
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    pub fn clear(&self) {
        self.state.lock().entries.clear();
        self.bump();
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<StagedImage> {
        self.state.lock().entries.iter().map(|e| e.image.clone()).collect()
    }

    /// Entries whose upload produced an id or a URL.
    pub fn resolved_entries(&self) -> Vec<StagedImage> {
        self.state
            .lock()
            .entries
            .iter()
            .filter(|e| e.image.is_resolved())
            .map(|e| e.image.clone())
            .collect()
    }

    pub fn unresolved_entries(&self) -> Vec<StagedImage> {
        self.state
            .lock()
            .entries
            .iter()
            .filter(|e| !e.image.is_resolved())
            .map(|e| e.image.clone())
            .collect()
    }

    /// Resolved and unresolved entries, from one snapshot.
    pub fn partition(&self) -> (Vec<StagedImage>, Vec<StagedImage>) {
        self.state
            .lock()
            .entries
            .iter()
            .map(|e| e.image.clone())
            .partition(StagedImage::is_resolved)
    }

    /// Uploads started and not finished yet, removed entries included.
    pub fn in_flight_uploads(&self) -> usize {
        self.state.lock().in_flight
    }

    /// Waits until no upload is in flight; `false` if `timeout` ran out first.
    pub async fn wait_for_uploads(&self, timeout: Duration) -> bool {
        let mut revisions = self.subscribe();
        let settled = async {
            loop {
                if self.in_flight_uploads() == 0 {
                    return;
                }
                if revisions.changed().await.is_err() {
                    return;
                }
            }
        };

        tokio::time::timeout(timeout, settled).await.is_ok()
    }

    pub fn preview(&self, urls: &CloudinaryUrls) -> StagedPreview {
        let state = self.state.lock();
        let thumbnails = state
            .entries
            .iter()
            .take(THUMBNAIL_LIMIT)
            .enumerate()
            .map(|(index, entry)| {
                let image = &entry.image;
                let src = urls
                    .thumb_url(&image.external_id, STAGED_THUMB_SIZE)
                    .or_else(|| Some(image.preview_url.clone()).filter(|s| !s.is_empty()))
                    .or_else(|| Some(image.remote_url.clone()).filter(|s| !s.is_empty()));

                StagedThumbnail {
                    index,
                    file_name: image.file_name.clone(),
                    src,
                    uploaded: image.is_resolved(),
                }
            })
            .collect();

        StagedPreview {
            thumbnails,
            more: state.entries.len().saturating_sub(THUMBNAIL_LIMIT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedThumbnail {
    pub index: usize,
    pub file_name: String,
    pub src: Option<String>,
    pub uploaded: bool,
}

/// What the staging area shows: a few thumbnails and a counter for the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPreview {
    pub thumbnails: Vec<StagedThumbnail>,
    pub more: usize,
}

impl StagedPreview {
    pub fn is_empty(&self) -> bool {
        self.thumbnails.is_empty()
    }

    pub fn more_label(&self) -> Option<String> {
        match self.more {
            0 => None,
            1 => Some("+ 1 photo".to_string()),
            n => Some(format!("+ {} photos", n)),
        }
    }
}
