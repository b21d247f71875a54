use std::{sync::Arc, time::Duration};

use derive_more::Display;
use futures::future::join_all;
use parking_lot::Mutex;
use tracing::instrument;
use validator::Validate;

use crate::{
    constants::{CREATE_LABEL, CREATING_LABEL, MAIN_PREVIEW_SIZE, SAVE_LABEL, SAVING_LABEL},
    entities::{
        image::{ImageId, NewImageLink, SelectedFile, UploadedImage},
        maquete::{Maquete, MaqueteForm, MaqueteId},
    },
    errors::AppError,
    feedback::{Confirmer, Notifier},
    repositories::{image::ImageRepository, maquete::MaqueteRepository},
    upload::cloudinary::{CloudinaryUrls, ImageUploader},
    use_cases::{
        gallery::{DeleteOutcome, GallerySynchronizer, GalleryView},
        staging::StagedImageList,
    },
    utils::data_url::to_data_url,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FormState {
    #[display("editing")]
    Editing,
    #[display("submitting")]
    Submitting,
    #[display("success")]
    Success,
    #[display("failed")]
    Failed,
}

/// Snapshot of the submit button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitControl {
    pub enabled: bool,
    pub label: String,
}

struct SubmitTracker {
    inner: Mutex<(FormState, SubmitControl)>,
}

impl SubmitTracker {
    fn new(label: &str) -> Self {
        SubmitTracker {
            inner: Mutex::new((
                FormState::Editing,
                SubmitControl { enabled: true, label: label.to_string() },
            )),
        }
    }

    /// Disables the control and returns the label to restore afterwards.
    fn begin(&self, busy_label: &str) -> Result<String, AppError> {
        let mut inner = self.inner.lock();
        let (state, control) = &mut *inner;
        if *state == FormState::Submitting || !control.enabled {
            return Err(AppError::SubmitInProgress);
        }

        *state = FormState::Submitting;
        control.enabled = false;
        Ok(std::mem::replace(&mut control.label, busy_label.to_string()))
    }

    fn finish(&self, original_label: String, succeeded: bool) {
        let mut inner = self.inner.lock();
        inner.0 = if succeeded { FormState::Success } else { FormState::Failed };
        inner.1 = SubmitControl { enabled: true, label: original_label };
    }

    fn reset(&self) {
        self.inner.lock().0 = FormState::Editing;
    }

    fn state(&self) -> FormState {
        self.inner.lock().0
    }

    fn control(&self) -> SubmitControl {
        self.inner.lock().1.clone()
    }
}

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReport {
    pub maquete_id: MaqueteId,
    pub linked: usize,
    pub failed_links: usize,
    /// Staged files that were not linked because their upload never resolved.
    pub dropped: Vec<String>,
    pub warnings: Vec<String>,
    pub gallery: GalleryView,
}

/// Main image chosen in the create form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainImageSelection {
    pub preview_url: String,
    pub uploaded: Option<UploadedImage>,
}

/// Drives the "new maquete" form: record creation plus staged secondary images.
pub struct CreateFormController<M, I>
where
    M: MaqueteRepository,
    I: ImageRepository,
{
    pub maquete_repo: M,
    pub gallery: GallerySynchronizer<I>,
    staged: StagedImageList,
    uploader: Arc<dyn ImageUploader>,
    urls: CloudinaryUrls,
    notifier: Arc<dyn Notifier>,
    upload_wait: Duration,
    tracker: SubmitTracker,
}

impl<M, I> CreateFormController<M, I>
where
    M: MaqueteRepository,
    I: ImageRepository,
{
    pub fn new(
        maquete_repo: M,
        gallery: GallerySynchronizer<I>,
        uploader: Arc<dyn ImageUploader>,
        urls: CloudinaryUrls,
        notifier: Arc<dyn Notifier>,
        upload_wait: Duration,
    ) -> Self {
        CreateFormController {
            maquete_repo,
            gallery,
            staged: StagedImageList::new(uploader.clone()),
            uploader,
            urls,
            notifier,
            upload_wait,
            tracker: SubmitTracker::new(CREATE_LABEL),
        }
    }

    pub fn staged(&self) -> &StagedImageList {
        &self.staged
    }

    pub fn state(&self) -> FormState {
        self.tracker.state()
    }

    pub fn submit_control(&self) -> SubmitControl {
        self.tracker.control()
    }

    /// Previews the main image and, when the host is configured, uploads it
    /// and fills the main image fields of `form`.
    pub async fn select_main_image(
        &self,
        file: &SelectedFile,
        form: &mut MaqueteForm,
    ) -> Result<MainImageSelection, AppError> {
        let local_preview = to_data_url(&file.read().await?);

        if !self.uploader.is_configured() {
            form.clear_main_image();
            return Ok(MainImageSelection { preview_url: local_preview, uploaded: None });
        }

        match self.uploader.upload(file).await {
            Ok(uploaded) => {
                form.set_main_image(&uploaded.public_id, &uploaded.secure_url);
                let preview_url = self.urls
                    .thumb_url(&uploaded.public_id, MAIN_PREVIEW_SIZE)
                    .or_else(|| Some(uploaded.secure_url.clone()).filter(|u| !u.is_empty()))
                    .unwrap_or(local_preview);

                Ok(MainImageSelection { preview_url, uploaded: Some(uploaded) })
            }
            Err(e) => {
                self.notifier.error(&format!("Failed to upload image: {}", e));
                Ok(MainImageSelection { preview_url: local_preview, uploaded: None })
            }
        }
    }

    /// Clears the staged images and returns the form to editing.
    pub fn reset(&self) {
        self.staged.clear();
        self.tracker.reset();
    }

    /// Creates the maquete, then links every staged image whose upload resolved.
    #[instrument(skip(self, form))]
    pub async fn submit(&self, form: MaqueteForm) -> Result<SubmitReport, AppError> {
        let original_label = self.tracker.begin(CREATING_LABEL)?;

        let result = self.create_and_link(form).await;
        self.tracker.finish(original_label, result.is_ok());

        match &result {
            Ok(report) => {
                self.staged.clear();
                self.notifier.success("Maquete created");
                tracing::info!(
                    "Maquete {} created with {} linked image(s)",
                    report.maquete_id,
                    report.linked
                );
            }
            Err(e) => self.notifier.error(&format!("Failed to create: {}", e)),
        }

        result
    }

    async fn create_and_link(&self, form: MaqueteForm) -> Result<SubmitReport, AppError> {
        let form = form.sanitized();
        form.validate()?;

        let maquete_id = self.maquete_repo.create_maquete(&form).await?;

        let mut report = SubmitReport {
            maquete_id,
            linked: 0,
            failed_links: 0,
            dropped: Vec::new(),
            warnings: Vec::new(),
            gallery: GalleryView::Placeholder,
        };

        if !self.staged.is_empty() {
            self.link_staged(maquete_id, &mut report).await;
        }

        report.gallery = match self.gallery.refresh(Some(maquete_id)).await {
            Ok(view) => view,
            Err(e) => {
                tracing::warn!("Gallery refresh after create failed: {}", e);
                self.gallery.view()
            }
        };

        for warning in &report.warnings {
            self.notifier.warning(warning);
        }

        Ok(report)
    }

    async fn link_staged(&self, maquete_id: MaqueteId, report: &mut SubmitReport) {
        if !self.staged.uploads_enabled() {
            report.dropped = self.staged.entries().into_iter().map(|i| i.file_name).collect();
            report.warnings.push(format!(
                "Upload host not configured: {} secondary image(s) will not be saved",
                report.dropped.len()
            ));
            return;
        }

        if !self.staged.wait_for_uploads(self.upload_wait).await {
            tracing::warn!(
                "{} upload(s) still running after {:?}",
                self.staged.in_flight_uploads(),
                self.upload_wait
            );
        }

        let (resolved, unresolved) = self.staged.partition();
        if !unresolved.is_empty() {
            report.dropped = unresolved.into_iter().map(|i| i.file_name).collect();
            report.warnings.push(format!(
                "{} secondary image(s) did not finish uploading and were not saved: {}",
                report.dropped.len(),
                report.dropped.join(", ")
            ));
        }

        let links: Vec<(String, NewImageLink)> = resolved
            .into_iter()
            .map(|img| (img.file_name.clone(), img.to_link()))
            .collect();

        let results = join_all(
            links.iter().map(|(_, link)| self.gallery.image_repo.link_image(maquete_id, link)),
        )
        .await;

        for ((file_name, _), result) in links.iter().zip(results) {
            match result {
                Ok(()) => report.linked += 1,
                Err(e) => {
                    report.failed_links += 1;
                    tracing::warn!("Failed to link {} to maquete {}: {}", file_name, maquete_id, e);
                }
            }
        }

        if report.failed_links > 0 {
            report.warnings.push(format!(
                "{} secondary image(s) could not be linked",
                report.failed_links
            ));
        }
    }
}

/// Drives the edit page of an existing maquete. Images are uploaded and linked
/// one at a time, straight against the saved record.
pub struct EditFormController<M, I>
where
    M: MaqueteRepository,
    I: ImageRepository,
{
    pub maquete_id: MaqueteId,
    pub maquete_repo: M,
    pub gallery: GallerySynchronizer<I>,
    uploader: Arc<dyn ImageUploader>,
    notifier: Arc<dyn Notifier>,
    tracker: SubmitTracker,
}

impl<M, I> EditFormController<M, I>
where
    M: MaqueteRepository,
    I: ImageRepository,
{
    pub fn new(
        maquete_id: MaqueteId,
        maquete_repo: M,
        gallery: GallerySynchronizer<I>,
        uploader: Arc<dyn ImageUploader>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        EditFormController {
            maquete_id,
            maquete_repo,
            gallery,
            uploader,
            notifier,
            tracker: SubmitTracker::new(SAVE_LABEL),
        }
    }

    pub fn state(&self) -> FormState {
        self.tracker.state()
    }

    pub fn submit_control(&self) -> SubmitControl {
        self.tracker.control()
    }

    /// Loads the record and its gallery.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Maquete, AppError> {
        let maquete = self.maquete_repo
            .get_maquete(self.maquete_id)
            .await
            .inspect_err(|e| self.notifier.error(&format!("Failed to load maquete: {}", e)))?;

        if let Err(e) = self.gallery.refresh(Some(self.maquete_id)).await {
            self.notifier.error(&format!("Failed to load secondary images: {}", e));
        }

        Ok(maquete)
    }

    #[instrument(skip(self, form))]
    pub async fn save(&self, form: MaqueteForm) -> Result<(), AppError> {
        let original_label = self.tracker.begin(SAVING_LABEL)?;

        let result = self.update_record(form).await;

        self.tracker.finish(original_label, result.is_ok());

        match &result {
            Ok(()) => self.notifier.success("Changes saved."),
            Err(e) => self.notifier.error(&format!("Failed to save: {}", e)),
        }

        result
    }

    async fn update_record(&self, form: MaqueteForm) -> Result<(), AppError> {
        let form = form.sanitized();
        form.validate()?;
        self.maquete_repo.update_maquete(self.maquete_id, &form).await
    }

    async fn upload_and_link(&self, files: &[SelectedFile]) -> Result<GalleryView, AppError> {
        let mut view = self.gallery.view();
        for file in files {
            let uploaded = self.uploader.upload(file).await?;
            view = self.gallery
                .add_image(Some(self.maquete_id), &NewImageLink::from(&uploaded))
                .await?;
        }
        Ok(view)
    }

    /// Uploads a new main image and writes its identifiers into `form`.
    pub async fn upload_main_image(
        &self,
        file: &SelectedFile,
        form: &mut MaqueteForm,
    ) -> Result<UploadedImage, AppError> {
        match self.uploader.upload(file).await {
            Ok(uploaded) => {
                form.set_main_image(&uploaded.public_id, &uploaded.secure_url);
                self.notifier.success("Main image updated!");
                Ok(uploaded)
            }
            Err(e) => {
                self.notifier.error(&format!("Upload failed: {}", e));
                Err(e)
            }
        }
    }

    /// Uploads and links each file in turn; stops at the first failure.
    #[instrument(skip(self, files))]
    pub async fn add_secondary_images(
        &self,
        files: Vec<SelectedFile>,
    ) -> Result<GalleryView, AppError> {
        if files.is_empty() {
            return Ok(self.gallery.view());
        }

        let result = self.upload_and_link(&files).await;

        match &result {
            Ok(_) => self.notifier.success("Images added!"),
            Err(e) => self.notifier.error(&format!("Failed to add: {}", e)),
        }

        result
    }

    pub async fn delete_secondary_image(
        &self,
        image_id: ImageId,
        confirmer: &dyn Confirmer,
    ) -> Result<DeleteOutcome, AppError> {
        let result = self.gallery
            .delete_image(Some(self.maquete_id), image_id, confirmer)
            .await;

        match &result {
            Ok(DeleteOutcome::Deleted(_)) => self.notifier.success("Image deleted."),
            Ok(DeleteOutcome::Cancelled) => {}
            Err(e) => self.notifier.error(&format!("Failed to delete: {}", e)),
        }

        result
    }
}
