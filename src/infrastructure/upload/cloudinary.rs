use async_trait::async_trait;
use reqwest::{multipart::{Form, Part}, Client};
use serde::Deserialize;
use url::Url;

use crate::{
    entities::image::{SelectedFile, UploadedImage},
    errors::AppError,
    settings::AppConfig,
    utils::data_url::sniff_mime,
};

#[async_trait]
pub trait ImageUploader: Send + Sync {
    /// Whether an upload can be attempted at all.
    fn is_configured(&self) -> bool;

    async fn upload(&self, file: &SelectedFile) -> Result<UploadedImage, AppError>;
}

#[derive(Clone)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub upload_preset: String,
}

impl CloudinaryCredentials {
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        match (&config.cloudinary_cloud_name, &config.cloudinary_upload_preset) {
            (Some(cloud_name), Some(upload_preset)) => Some(CloudinaryCredentials {
                cloud_name: cloud_name.clone(),
                upload_preset: upload_preset.clone(),
            }),
            _ => None,
        }
    }
}

/// Unsigned uploads to a Cloudinary-compatible media host.
#[derive(Clone)]
pub struct CloudinaryUploader {
    http: Client,
    upload_host: Url,
    credentials: Option<CloudinaryCredentials>,
}

#[derive(Deserialize)]
struct HostErrorBody {
    error: Option<HostErrorDetail>,
}

#[derive(Deserialize)]
struct HostErrorDetail {
    message: Option<String>,
}

impl CloudinaryUploader {
    pub fn new(upload_host: &str, credentials: Option<CloudinaryCredentials>) -> Result<Self, AppError> {
        Ok(CloudinaryUploader {
            http: Client::new(),
            upload_host: Url::parse(upload_host)?,
            credentials,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Self::new(&config.upload_host, CloudinaryCredentials::from_config(config))
    }

    fn upload_url(&self, cloud_name: &str) -> Result<Url, AppError> {
        let path = format!("v1_1/{}/image/upload", urlencoding::encode(cloud_name));
        Ok(self.upload_host.join(&path)?)
    }
}

#[async_trait]
impl ImageUploader for CloudinaryUploader {
    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn upload(&self, file: &SelectedFile) -> Result<UploadedImage, AppError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            AppError::Configuration("upload host needs a cloud name and an upload preset".to_string())
        })?;

        let bytes = file.read().await?;
        let mime = sniff_mime(&bytes);
        let mut part = Part::bytes(bytes).file_name(file.name().to_string());
        if let Some(mime) = mime {
            part = part.mime_str(mime)?;
        }

        let form = Form::new()
            .part("file", part)
            .text("upload_preset", credentials.upload_preset.clone());

        let response = self.http
            .post(self.upload_url(&credentials.cloud_name)?)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<HostErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(AppError::Upload { status: status.as_u16(), message });
        }

        let uploaded: UploadedImage = serde_json::from_slice(&body)?;
        tracing::info!("Uploaded {} as {}", file.name(), uploaded.public_id);
        Ok(uploaded)
    }
}

/// Delivery URLs for images stored on the media host.
#[derive(Clone, Debug)]
pub struct CloudinaryUrls {
    delivery_host: String,
    cloud_name: Option<String>,
}

impl CloudinaryUrls {
    pub fn new(delivery_host: &str, cloud_name: Option<String>) -> Self {
        CloudinaryUrls {
            delivery_host: delivery_host.trim_end_matches('/').to_string(),
            cloud_name: cloud_name.filter(|c| !c.is_empty()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.delivery_host, config.cloudinary_cloud_name.clone())
    }

    pub fn disabled() -> Self {
        Self::new("", None)
    }

    pub fn image_url(&self, public_id: &str) -> Option<String> {
        let cloud = self.cloud_name.as_deref()?;
        if public_id.is_empty() {
            return None;
        }
        Some(format!("{}/{}/image/upload/{}", self.delivery_host, cloud, public_id))
    }

    pub fn thumb_url(&self, public_id: &str, (width, height): (u32, u32)) -> Option<String> {
        let cloud = self.cloud_name.as_deref()?;
        if public_id.is_empty() {
            return None;
        }
        Some(format!(
            "{}/{}/image/upload/c_fill,w_{},h_{}/{}",
            self.delivery_host, cloud, width, height, public_id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumb_url_includes_fill_transformation() {
        let urls = CloudinaryUrls::new("https://res.cloudinary.com/", Some("demo".into()));
        assert_eq!(
            urls.thumb_url("maquetes/abc", (110, 80)).as_deref(),
            Some("https://res.cloudinary.com/demo/image/upload/c_fill,w_110,h_80/maquetes/abc")
        );
        assert_eq!(
            urls.image_url("maquetes/abc").as_deref(),
            Some("https://res.cloudinary.com/demo/image/upload/maquetes/abc")
        );
    }

    #[test]
    fn no_urls_without_cloud_or_id() {
        let urls = CloudinaryUrls::disabled();
        assert_eq!(urls.thumb_url("abc", (10, 10)), None);

        let urls = CloudinaryUrls::new("https://res.cloudinary.com", Some("demo".into()));
        assert_eq!(urls.image_url(""), None);
    }

    #[test]
    fn upload_url_targets_image_endpoint() {
        let uploader = CloudinaryUploader::new("https://api.cloudinary.com", None).unwrap();
        assert!(!uploader.is_configured());
        assert_eq!(
            uploader.upload_url("my cloud").unwrap().as_str(),
            "https://api.cloudinary.com/v1_1/my%20cloud/image/upload"
        );
    }

    #[tokio::test]
    async fn unconfigured_upload_is_a_configuration_error() {
        let uploader = CloudinaryUploader::new("https://api.cloudinary.com", None).unwrap();
        let file = SelectedFile::from_bytes("a.png", vec![0u8; 4]);

        let result = uploader.upload(&file).await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
