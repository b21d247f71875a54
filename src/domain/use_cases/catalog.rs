use std::sync::Arc;

use tracing::instrument;

use crate::{
    constants::CATALOG_THUMB_SIZE,
    entities::{
        health::DbStatus,
        maquete::{MaqueteId, MaqueteSummary},
    },
    errors::AppError,
    feedback::{Confirmer, Notifier},
    repositories::maquete::MaqueteRepository,
    upload::cloudinary::CloudinaryUrls,
};

/// Figures shown on the dashboard's info tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatalogKpis {
    pub total: usize,
    pub with_image: usize,
    pub without_image: usize,
}

impl CatalogKpis {
    pub fn from_summaries(maquetes: &[MaqueteSummary]) -> Self {
        let total = maquetes.len();
        let with_image = maquetes.iter().filter(|m| m.has_main_image()).count();

        CatalogKpis {
            total,
            with_image,
            without_image: total - with_image,
        }
    }
}

pub struct CatalogHandler<R>
where
    R: MaqueteRepository,
{
    pub maquete_repo: R,
    urls: CloudinaryUrls,
    notifier: Arc<dyn Notifier>,
}

impl<R> CatalogHandler<R>
where
    R: MaqueteRepository,
{
    pub fn new(maquete_repo: R, urls: CloudinaryUrls, notifier: Arc<dyn Notifier>) -> Self {
        CatalogHandler { maquete_repo, urls, notifier }
    }

    /// Lists every maquete
    pub async fn list(&self) -> Result<Vec<MaqueteSummary>, AppError> {
        self.maquete_repo
            .list_maquetes()
            .await
            .inspect_err(|e| self.notifier.error(&format!("Failed to load maquetes: {}", e)))
    }

    /// Card thumbnail: host thumbnail of the main image, else its stored URL.
    pub fn card_image(&self, maquete: &MaqueteSummary) -> Option<String> {
        maquete
            .imagem_principal_public_id
            .as_deref()
            .and_then(|id| self.urls.thumb_url(id, CATALOG_THUMB_SIZE))
            .or_else(|| maquete.imagem_principal_url.clone().filter(|u| !u.is_empty()))
    }

    /// Deletes a maquete after confirmation and returns the refreshed list.
    /// `None` when the user declined.
    #[instrument(skip(self, confirmer))]
    pub async fn delete(
        &self,
        id: MaqueteId,
        confirmer: &dyn Confirmer,
    ) -> Result<Option<Vec<MaqueteSummary>>, AppError> {
        if !confirmer.confirm(&format!("Delete maquete #{}?", id)) {
            return Ok(None);
        }

        self.maquete_repo
            .delete_maquete(id)
            .await
            .inspect_err(|e| self.notifier.error(&format!("Failed to delete: {}", e)))?;

        tracing::info!("Deleted maquete {}", id);
        let maquetes = self.list().await?;
        self.notifier.success("Maquete deleted");
        Ok(Some(maquetes))
    }

    pub async fn kpis(&self) -> Result<CatalogKpis, AppError> {
        let maquetes = self.maquete_repo.list_maquetes().await?;
        Ok(CatalogKpis::from_summaries(&maquetes))
    }

    /// Database state as reported by the backend; unreachable counts as an error state.
    pub async fn health(&self) -> DbStatus {
        match self.maquete_repo.check_health().await {
            Ok(health) => health.db,
            Err(e) => {
                tracing::warn!("Health check failed: {}", e);
                DbStatus::Other(e.to_string())
            }
        }
    }
}
