// ============================================================================
// Réponse de la commande : pièces jointes + embeds
// ============================================================================
// Forme neutre d'un message de chat riche, sérialisable en JSON
// ============================================================================

use serde::Serialize;

use crate::chart::ChartImage;
use crate::command::args::RequestSummary;

/// Accent d'un embed de succès
pub const SUCCESS_COLOR: u32 = 0xAEFF5A;
/// Accent d'un embed d'échec
pub const FAILURE_COLOR: u32 = 0xFA0A00;

pub const ATTACHMENT_NAME: &str = "image.png";
pub const FAILURE_DESCRIPTION: &str = "### Error: Could not fetch data for: ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub name: String,
    pub content_type: &'static str,
    pub size: usize,
    /// Octets de l'image ; jamais sérialisés dans le JSON
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn from_image(name: impl Into<String>, image: ChartImage) -> Self {
        Self {
            name: name.into(),
            content_type: image.encoding.mime_type(),
            size: image.bytes.len(),
            data: image.bytes,
        }
    }

    /// Référence utilisable depuis un embed
    pub fn url(&self) -> String {
        format!("attachment://{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

impl Embed {
    pub fn new(color: u32) -> Self {
        Self {
            color,
            description: None,
            image: None,
            fields: Vec::new(),
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.image = Some(EmbedImage { url: url.into() });
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField::new(name, value));
        self
    }
}

/// Réponse complète à une commande
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyPayload {
    pub files: Vec<Attachment>,
    pub embeds: Vec<Embed>,
}

impl ReplyPayload {
    /// L'image en pièce jointe, référencée par l'embed
    pub fn success(image: ChartImage) -> Self {
        let attachment = Attachment::from_image(ATTACHMENT_NAME, image);
        let embed = Embed::new(SUCCESS_COLOR).image(attachment.url());
        Self {
            files: vec![attachment],
            embeds: vec![embed],
        }
    }

    /// Pas de pièce jointe ; rappelle ce qui a été demandé
    pub fn failure(summary: &RequestSummary) -> Self {
        let embed = Embed::new(FAILURE_COLOR)
            .description(FAILURE_DESCRIPTION)
            .field("Symbol", &summary.symbol)
            .field("Timeframe", &summary.timeframe)
            .field("Market Type", &summary.market_type);
        Self {
            files: Vec::new(),
            embeds: vec![embed],
        }
    }

    pub fn is_success(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.embeds
            .iter()
            .flat_map(|e| e.fields.iter())
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
