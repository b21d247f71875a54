use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

const MAX_NAME_LENGTH: u64 = 120;

pub type MaqueteId = i64;

// ───── API Models ─────────────────────────────────────────────────────

/// Row of the catalog listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaqueteSummary {
    pub id: MaqueteId,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub escala: Option<String>,
    #[serde(default)]
    pub proprietario: Option<String>,
    #[serde(default)]
    pub imagem_principal_url: Option<String>,
    #[serde(default)]
    pub imagem_principal_public_id: Option<String>,
}

impl MaqueteSummary {
    pub fn has_main_image(&self) -> bool {
        self.imagem_principal_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    pub fn title(&self) -> &str {
        self.nome.as_deref().filter(|n| !n.is_empty()).unwrap_or("Untitled")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Maquete {
    pub id: MaqueteId,
    #[serde(flatten)]
    pub fields: MaqueteForm,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedMaquete {
    pub id: MaqueteId,
}

// ───── Input & Validation ───────────────────────────────────────────

/// Record fields sent on create and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, PartialEq)]
#[serde(default)]
pub struct MaqueteForm {
    #[validate(length(min = 1, max = MAX_NAME_LENGTH, message = "Name is required"))]
    #[serde(deserialize_with = "null_as_empty")]
    pub nome: String,
    pub escala: Option<String>,
    pub peso: Option<f64>,
    pub proprietario: Option<String>,
    pub projeto: Option<String>,

    #[validate(custom(function = "validate_optional_url"))]
    pub imagem_principal_url: Option<String>,
    pub imagem_principal_public_id: Option<String>,

    pub cidade: Option<String>,
    pub estado: Option<String>,
    pub ano: Option<i32>,

    #[validate(range(min = 1, max = 12, message = "Month must be between 1 and 12"))]
    pub mes: Option<u8>,

    pub largura_cm: Option<f64>,
    pub altura_cm: Option<f64>,
    pub comprimento_cm: Option<f64>,

    /// Older backends reject a null here, so it is always sent.
    #[serde(deserialize_with = "null_as_empty")]
    pub info: String,
}

impl MaqueteForm {
    /// Normalizes free-text input before it is sent.
    pub fn sanitized(mut self) -> Self {
        self.nome = self.nome.trim().to_string();
        self.info = self.info.trim().to_string();
        self.imagem_principal_url = self
            .imagem_principal_url
            .map(|url| url.replace('`', "").trim().to_string())
            .filter(|url| !url.is_empty());
        self.imagem_principal_public_id = self
            .imagem_principal_public_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        self
    }

    pub fn set_main_image(&mut self, public_id: &str, url: &str) {
        self.imagem_principal_public_id = Some(public_id.to_string()).filter(|s| !s.is_empty());
        self.imagem_principal_url = Some(url.to_string()).filter(|s| !s.is_empty());
    }

    pub fn clear_main_image(&mut self) {
        self.imagem_principal_public_id = None;
        self.imagem_principal_url = None;
    }
}

/// Rows written before `nome`/`info` became mandatory carry nulls.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn validate_optional_url(url: &str) -> Result<(), ValidationError> {
    match url::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(ValidationError::new("invalid_url")
            .with_message("Main image URL must be an http(s) URL".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> MaqueteForm {
        MaqueteForm {
            nome: "  Edifício Aurora ".into(),
            info: "  detalhes  ".into(),
            imagem_principal_url: Some(" `https://cdn.example.com/a.jpg` ".into()),
            ..MaqueteForm::default()
        }
    }

    #[test]
    fn sanitized_strips_backticks_and_trims() {
        let form = form().sanitized();

        assert_eq!(form.nome, "Edifício Aurora");
        assert_eq!(form.info, "detalhes");
        assert_eq!(form.imagem_principal_url.as_deref(), Some("https://cdn.example.com/a.jpg"));
        assert!(form.validate().is_ok());
    }

    #[test]
    fn blank_main_image_becomes_none() {
        let form = MaqueteForm {
            nome: "x".into(),
            imagem_principal_url: Some(" `` ".into()),
            ..MaqueteForm::default()
        }
        .sanitized();

        assert_eq!(form.imagem_principal_url, None);
    }

    #[test]
    fn validation_catches_missing_name_and_bad_month() {
        let form = MaqueteForm {
            mes: Some(13),
            ..MaqueteForm::default()
        };

        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("nome"));
        assert!(fields.contains_key("mes"));
    }

    #[test]
    fn info_is_serialized_even_when_empty() {
        let json = serde_json::to_value(MaqueteForm::default()).unwrap();
        assert_eq!(json["info"], "");
    }

    #[test]
    fn maquete_flattens_form_fields() {
        let maquete: Maquete = serde_json::from_value(serde_json::json!({
            "id": 7,
            "nome": "Ponte",
            "ano": 1998,
            "info": "ok"
        }))
        .unwrap();

        assert_eq!(maquete.id, 7);
        assert_eq!(maquete.fields.nome, "Ponte");
        assert_eq!(maquete.fields.ano, Some(1998));
    }

    #[test]
    fn null_text_fields_load_as_empty() {
        let maquete: Maquete = serde_json::from_value(serde_json::json!({
            "id": 3,
            "nome": null,
            "info": null
        }))
        .unwrap();

        assert_eq!(maquete.fields.nome, "");
        assert_eq!(maquete.fields.info, "");

        let json = serde_json::to_value(&maquete.fields).unwrap();
        assert_eq!(json["info"], "");
        assert_eq!(json["nome"], "");
    }

    #[test]
    fn summary_main_image_flag() {
        let mut summary = MaqueteSummary {
            id: 1,
            nome: None,
            escala: None,
            proprietario: None,
            imagem_principal_url: Some("  ".into()),
            imagem_principal_public_id: None,
        };
        assert!(!summary.has_main_image());
        assert_eq!(summary.title(), "Untitled");

        summary.imagem_principal_url = Some("https://cdn.example.com/x.jpg".into());
        assert!(summary.has_main_image());
    }
}
