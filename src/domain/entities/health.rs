use derive_more::Display;
use serde::{Deserialize, Deserializer};

/// Database state reported by the backend's `/health` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum DbStatus {
    #[display("DB: ok")]
    Ok,

    #[display("DB: not configured")]
    MissingConfig,

    #[display("DB: error")]
    Other(String),
}

impl DbStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, DbStatus::Ok)
    }
}

impl From<&str> for DbStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "ok" => DbStatus::Ok,
            "missing_config" => DbStatus::MissingConfig,
            other => DbStatus::Other(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for DbStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(DbStatus::from).unwrap_or_else(|| DbStatus::Other("unknown".into())))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    #[serde(default = "unknown_db")]
    pub db: DbStatus,
}

fn unknown_db() -> DbStatus {
    DbStatus::Other("unknown".into())
}
