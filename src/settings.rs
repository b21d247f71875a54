use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use dotenv::dotenv;
use std::{env, fmt, str::FromStr, time::Duration};
use url::Url;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    Development,
    Production,
    Testing,
}

impl FromStr for AppEnvironment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(AppEnvironment::Development),
            "production" => Ok(AppEnvironment::Production),
            "testing" => Ok(AppEnvironment::Testing),
            _ => Err(ConfigError::Message(format!("Invalid environment: {}", s))),
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    #[serde(default = "default_env")]
    pub env: AppEnvironment,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default)]
    pub cloudinary_cloud_name: Option<String>,

    #[serde(default)]
    pub cloudinary_upload_preset: Option<String>,

    #[serde(default = "default_upload_host")]
    pub upload_host: String,

    #[serde(default = "default_delivery_host")]
    pub delivery_host: String,

    #[serde(default = "default_upload_wait_timeout")]
    pub upload_wait_timeout: String,
}

fn default_env() -> AppEnvironment {
    AppEnvironment::Development
}
fn default_api_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_upload_host() -> String {
    "https://api.cloudinary.com".to_string()
}
fn default_delivery_host() -> String {
    "https://res.cloudinary.com".to_string()
}
fn default_upload_wait_timeout() -> String {
    "30s".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            env: default_env(),
            api_base_url: default_api_base_url(),
            cloudinary_cloud_name: None,
            cloudinary_upload_preset: None,
            upload_host: default_upload_host(),
            delivery_host: default_delivery_host(),
            upload_wait_timeout: default_upload_wait_timeout(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        dotenv().ok();

        let raw_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let env_name = AppEnvironment::from_str(&raw_env)
            .map_err(|_| ConfigError::Message(format!("Invalid APP_ENV value: {}", raw_env)))?;

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env_name)).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;

        config.env = env_name;

        // The backend reads the same variables for its own templates
        config.cloudinary_cloud_name = non_empty(config.cloudinary_cloud_name)
            .or_else(|| non_empty(env::var("CLOUDINARY_CLOUD_NAME").ok()));
        config.cloudinary_upload_preset = non_empty(config.cloudinary_upload_preset)
            .or_else(|| non_empty(env::var("CLOUDINARY_UPLOAD_PRESET").ok()));

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if Url::parse(&self.api_base_url).is_err() {
            errors.push(format!("API_BASE_URL is not a valid URL: {}", self.api_base_url));
        }
        if Url::parse(&self.upload_host).is_err() {
            errors.push(format!("UPLOAD_HOST is not a valid URL: {}", self.upload_host));
        }
        if Url::parse(&self.delivery_host).is_err() {
            errors.push(format!("DELIVERY_HOST is not a valid URL: {}", self.delivery_host));
        }
        if humantime::parse_duration(&self.upload_wait_timeout).is_err() {
            errors.push(format!(
                "UPLOAD_WAIT_TIMEOUT is not a duration: {}",
                self.upload_wait_timeout
            ));
        }

        if self.cloudinary_cloud_name.is_some() != self.cloudinary_upload_preset.is_some() {
            tracing::warn!(
                "Only one of CLOUDINARY_CLOUD_NAME / CLOUDINARY_UPLOAD_PRESET is set; uploads stay disabled"
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(errors.join(", ")))
        }
    }

    pub fn is_production(&self) -> bool {
        self.env == AppEnvironment::Production
    }

    /// Both the account name and the unsigned preset are needed to upload.
    pub fn uploads_enabled(&self) -> bool {
        self.cloudinary_cloud_name.is_some() && self.cloudinary_upload_preset.is_some()
    }

    pub fn upload_wait(&self) -> Duration {
        humantime::parse_duration(&self.upload_wait_timeout)
            .unwrap_or(Duration::from_secs(30))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppEnvironment::Development => "development",
            AppEnvironment::Production => "production",
            AppEnvironment::Testing => "testing",
        };
        write!(f, "{s}")
    }
}

trait Redact {
    fn redact(&self) -> &str;
}

impl Redact for Option<String> {
    fn redact(&self) -> &str {
        match self {
            None => "[MISSING]",
            Some(_) => "[REDACTED]",
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("api_base_url", &self.api_base_url)
            .field("cloudinary_cloud_name", &self.cloudinary_cloud_name)
            .field("cloudinary_upload_preset", &self.cloudinary_upload_preset.redact())
            .field("upload_host", &self.upload_host)
            .field("delivery_host", &self.delivery_host)
            .field("upload_wait_timeout", &self.upload_wait_timeout)
            .finish()
    }
}
