use parking_lot::RwLock;
use tracing::instrument;

use crate::{
    constants::GALLERY_THUMB_SIZE,
    entities::{
        image::{ImageId, NewImageLink, PersistedImage},
        maquete::MaqueteId,
    },
    errors::AppError,
    feedback::Confirmer,
    repositories::image::ImageRepository,
    upload::cloudinary::CloudinaryUrls,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryItem {
    pub id: ImageId,
    pub public_id: String,
    pub display_url: Option<String>,
}

/// Rendered state of the persisted gallery.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GalleryView {
    /// No maquete selected.
    #[default]
    Placeholder,
    Empty,
    Images(Vec<GalleryItem>),
}

impl GalleryView {
    pub fn items(&self) -> &[GalleryItem] {
        match self {
            GalleryView::Images(items) => items,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Cancelled,
    Deleted(GalleryView),
}

/// Keeps the on-screen images of one maquete in line with the server.
///
/// Every mutation is followed by a full re-fetch; entries are never spliced in
/// locally because only the server knows the ids it assigned.
pub struct GallerySynchronizer<R>
where
    R: ImageRepository,
{
    pub image_repo: R,
    urls: CloudinaryUrls,
    view: RwLock<GalleryView>,
}

impl<R> GallerySynchronizer<R>
where
    R: ImageRepository,
{
    pub fn new(image_repo: R, urls: CloudinaryUrls) -> Self {
        GallerySynchronizer {
            image_repo,
            urls,
            view: RwLock::new(GalleryView::Placeholder),
        }
    }

    pub fn view(&self) -> GalleryView {
        self.view.read().clone()
    }

    fn render(&self, images: Vec<PersistedImage>) -> GalleryView {
        if images.is_empty() {
            return GalleryView::Empty;
        }

        let items = images
            .into_iter()
            .map(|img| {
                let display_url = self.urls
                    .thumb_url(&img.public_id, GALLERY_THUMB_SIZE)
                    .or_else(|| Some(img.url.clone()).filter(|u| !u.is_empty()));

                GalleryItem {
                    id: img.id,
                    public_id: img.public_id,
                    display_url,
                }
            })
            .collect();

        GalleryView::Images(items)
    }

    /// Replaces the rendered list with the server's current one.
    #[instrument(skip(self))]
    pub async fn refresh(&self, maquete_id: Option<MaqueteId>) -> Result<GalleryView, AppError> {
        let Some(id) = maquete_id else {
            *self.view.write() = GalleryView::Placeholder;
            return Ok(GalleryView::Placeholder);
        };

        let images = self.image_repo.list_images(id).await?;
        let view = self.render(images);
        *self.view.write() = view.clone();
        Ok(view)
    }

    #[instrument(skip(self, link))]
    pub async fn add_image(
        &self,
        maquete_id: Option<MaqueteId>,
        link: &NewImageLink,
    ) -> Result<GalleryView, AppError> {
        let id = maquete_id.ok_or(AppError::MissingParent)?;

        self.image_repo.link_image(id, link).await?;
        tracing::info!("Linked image {} to maquete {}", link.public_id, id);

        self.refresh(Some(id)).await
    }

    #[instrument(skip(self, confirmer))]
    pub async fn delete_image(
        &self,
        maquete_id: Option<MaqueteId>,
        image_id: ImageId,
        confirmer: &dyn Confirmer,
    ) -> Result<DeleteOutcome, AppError> {
        let id = maquete_id.ok_or(AppError::MissingParent)?;

        if !confirmer.confirm(&format!("Remove image #{}?", image_id)) {
            return Ok(DeleteOutcome::Cancelled);
        }

        match self.image_repo.delete_image(id, image_id).await {
            Ok(()) => tracing::info!("Removed image {} from maquete {}", image_id, id),
            Err(AppError::Http { status: 404, .. }) => {
                tracing::info!("Image {} was already gone from maquete {}", image_id, id)
            }
            Err(e) => return Err(e),
        }

        self.refresh(Some(id)).await.map(DeleteOutcome::Deleted)
    }
}
