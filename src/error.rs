// ============================================================================
// Module : error
// ============================================================================
// Taxonomie d'erreurs du pipeline récupération → rendu
//
// CONCEPT RUST : thiserror
// - #[derive(Error)] génère l'implémentation de std::error::Error
// - #[error("...")] génère Display à partir des champs
// - Le binaire garde anyhow pour sa plomberie (config, fichiers, logs)
// ============================================================================

use thiserror::Error;

/// Message renvoyé quand le provider ne donne aucune raison exploitable
pub const MISSING_DATA_MESSAGE: &str =
    "Data does not exist. Check the symbol naming, timeframe and market type.";

/// Erreurs d'une requête de graphique
#[derive(Debug, Error)]
pub enum ChartError {
    /// Argument de commande manquant, inconnu ou hors des choix autorisés
    #[error("invalid argument `{field}`: {reason}")]
    Validation { field: String, reason: String },

    /// Le provider a refusé la requête, renvoyé une série vide, ou n'a pas
    /// répondu (transport, timeout, JSON illisible)
    #[error("{message}")]
    Provider { message: String },

    /// Construction ou rastérisation du graphique impossible
    #[error("render failed: {0}")]
    Render(String),
}

impl ChartError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ChartError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        ChartError::Provider {
            message: message.into(),
        }
    }

    pub fn render(reason: impl std::fmt::Display) -> Self {
        ChartError::Render(reason.to_string())
    }

    /// Nom court de la catégorie, utilisé comme champ structuré dans les logs
    pub fn kind(&self) -> &'static str {
        match self {
            ChartError::Validation { .. } => "validation",
            ChartError::Provider { .. } => "provider",
            ChartError::Render(_) => "render",
        }
    }
}

impl From<reqwest::Error> for ChartError {
    fn from(err: reqwest::Error) -> Self {
        // Les erreurs réseau sont traitées comme des échecs du provider :
        // une seule tentative, pas de retry
        if err.is_timeout() {
            ChartError::provider("Bybit did not answer before the request timeout")
        } else if err.is_decode() {
            ChartError::provider(format!("Unreadable response from Bybit: {}", err))
        } else if let Some(status) = err.status() {
            ChartError::provider(format!("Bybit returned HTTP {}", status))
        } else {
            ChartError::provider(format!("Request to Bybit failed: {}", err))
        }
    }
}

pub type Result<T> = std::result::Result<T, ChartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_display_is_message() {
        let err = ChartError::provider("Invalid symbol");
        assert_eq!(err.to_string(), "Invalid symbol");
        assert_eq!(err.kind(), "provider");
    }

    #[test]
    fn test_validation_display() {
        let err = ChartError::validation("coin", "missing required option");
        assert_eq!(err.to_string(), "invalid argument `coin`: missing required option");
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_render_kind() {
        assert_eq!(ChartError::render("boom").kind(), "render");
    }
}
