use std::sync::Arc;

mod domain;
mod interfaces;
mod infrastructure;
pub mod errors;
pub mod settings;
pub mod constants;
pub mod shared_repos;

pub use domain::{entities, use_cases};
pub use interfaces::{feedback, repositories};
pub use infrastructure::{http, upload, utils};

use entities::maquete::MaqueteId;
use errors::AppError;
use feedback::Notifier;
use http::client::ApiClient;
use repositories::http_repo::{HttpImageRepo, HttpMaqueteRepo};
use shared_repos::SharedRepositories;
use upload::cloudinary::{CloudinaryUploader, CloudinaryUrls, ImageUploader};
use use_cases::{
    catalog::CatalogHandler,
    form::{CreateFormController, EditFormController},
    gallery::GallerySynchronizer,
};

pub type AppCatalog = CatalogHandler<HttpMaqueteRepo>;
pub type AppGallery = GallerySynchronizer<HttpImageRepo>;
pub type AppCreateForm = CreateFormController<HttpMaqueteRepo, HttpImageRepo>;
pub type AppEditForm = EditFormController<HttpMaqueteRepo, HttpImageRepo>;

/// Everything the admin screens need, wired from one configuration.
pub struct AppState {
    pub config: settings::AppConfig,
    pub repos: SharedRepositories,
    pub uploader: Arc<dyn ImageUploader>,
    pub urls: CloudinaryUrls,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(config: settings::AppConfig, notifier: Arc<dyn Notifier>) -> Result<Self, AppError> {
        let client = ApiClient::new(&config.api_base_url)?;
        let uploader = CloudinaryUploader::from_config(&config)?;
        let urls = CloudinaryUrls::from_config(&config);

        if !config.uploads_enabled() {
            tracing::warn!("Upload host not configured: images will only be previewed locally");
        }

        Ok(AppState {
            repos: SharedRepositories::new(client),
            uploader: Arc::new(uploader),
            urls,
            notifier,
            config,
        })
    }

    pub fn catalog(&self) -> AppCatalog {
        CatalogHandler::new(
            self.repos.maquete_repo.clone(),
            self.urls.clone(),
            self.notifier.clone(),
        )
    }

    pub fn gallery(&self) -> AppGallery {
        GallerySynchronizer::new(self.repos.image_repo.clone(), self.urls.clone())
    }

    pub fn create_form(&self) -> AppCreateForm {
        CreateFormController::new(
            self.repos.maquete_repo.clone(),
            self.gallery(),
            self.uploader.clone(),
            self.urls.clone(),
            self.notifier.clone(),
            self.config.upload_wait(),
        )
    }

    pub fn edit_form(&self, maquete_id: MaqueteId) -> AppEditForm {
        EditFormController::new(
            maquete_id,
            self.repos.maquete_repo.clone(),
            self.gallery(),
            self.uploader.clone(),
            self.notifier.clone(),
        )
    }
}
