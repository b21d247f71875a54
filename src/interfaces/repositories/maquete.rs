use async_trait::async_trait;

use crate::{
    entities::{
        health::HealthStatus,
        maquete::{CreatedMaquete, Maquete, MaqueteForm, MaqueteId, MaqueteSummary},
    },
    errors::AppError,
    infrastructure::http::client::ApiClient,
    repositories::http_repo::HttpMaqueteRepo,
};

#[async_trait]
pub trait MaqueteRepository: Send + Sync {
    async fn check_health(&self) -> Result<HealthStatus, AppError>;
    async fn list_maquetes(&self) -> Result<Vec<MaqueteSummary>, AppError>;
    async fn get_maquete(&self, id: MaqueteId) -> Result<Maquete, AppError>;
    async fn create_maquete(&self, form: &MaqueteForm) -> Result<MaqueteId, AppError>;
    async fn update_maquete(&self, id: MaqueteId, form: &MaqueteForm) -> Result<(), AppError>;
    async fn delete_maquete(&self, id: MaqueteId) -> Result<(), AppError>;
}

impl HttpMaqueteRepo {
    pub fn new(client: ApiClient) -> Self {
        HttpMaqueteRepo { client }
    }
}

#[async_trait]
impl MaqueteRepository for HttpMaqueteRepo {
    async fn check_health(&self) -> Result<HealthStatus, AppError> {
        self.client.get("/health").await
    }

    async fn list_maquetes(&self) -> Result<Vec<MaqueteSummary>, AppError> {
        let maquetes: Option<Vec<MaqueteSummary>> = self.client.get("/api/maquetes").await?;
        Ok(maquetes.unwrap_or_default())
    }

    async fn get_maquete(&self, id: MaqueteId) -> Result<Maquete, AppError> {
        self.client.get(&format!("/api/maquetes/{}", id)).await
    }

    async fn create_maquete(&self, form: &MaqueteForm) -> Result<MaqueteId, AppError> {
        let created: Option<CreatedMaquete> = self.client.post("/api/maquetes", form).await?;

        created
            .map(|c| c.id)
            .ok_or_else(|| AppError::Decode("create response carried no id".to_string()))
    }

    async fn update_maquete(&self, id: MaqueteId, form: &MaqueteForm) -> Result<(), AppError> {
        self.client
            .put::<_, serde_json::Value>(&format!("/api/maquetes/{}", id), form)
            .await
            .map(|_| ())
    }

    async fn delete_maquete(&self, id: MaqueteId) -> Result<(), AppError> {
        self.client.delete(&format!("/api/maquetes/{}", id)).await
    }
}
