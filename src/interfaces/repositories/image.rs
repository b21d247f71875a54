use async_trait::async_trait;

use crate::{
    entities::{
        image::{ImageId, NewImageLink, PersistedImage},
        maquete::MaqueteId,
    },
    errors::AppError,
    infrastructure::http::client::ApiClient,
    repositories::http_repo::HttpImageRepo,
};

#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn list_images(&self, maquete_id: MaqueteId) -> Result<Vec<PersistedImage>, AppError>;
    async fn link_image(&self, maquete_id: MaqueteId, link: &NewImageLink) -> Result<(), AppError>;
    async fn delete_image(&self, maquete_id: MaqueteId, image_id: ImageId) -> Result<(), AppError>;
}

impl HttpImageRepo {
    pub fn new(client: ApiClient) -> Self {
        HttpImageRepo { client }
    }
}

#[async_trait]
impl ImageRepository for HttpImageRepo {
    async fn list_images(&self, maquete_id: MaqueteId) -> Result<Vec<PersistedImage>, AppError> {
        let images: Option<Vec<PersistedImage>> = self.client
            .get(&format!("/api/maquetes/{}/images", maquete_id))
            .await?;

        Ok(images.unwrap_or_default())
    }

    async fn link_image(&self, maquete_id: MaqueteId, link: &NewImageLink) -> Result<(), AppError> {
        self.client
            .post::<_, serde_json::Value>(&format!("/api/maquetes/{}/images", maquete_id), link)
            .await
            .map(|_| ())
    }

    async fn delete_image(&self, maquete_id: MaqueteId, image_id: ImageId) -> Result<(), AppError> {
        self.client
            .delete(&format!("/api/maquetes/{}/images/{}", maquete_id, image_id))
            .await
    }
}
