// ============================================================================
// Module : config
// ============================================================================
// Configuration lue depuis l'environnement (et le fichier .env)
//
// Variables reconnues :
// - CLIENT_KEY / CLIENT_SECRET : identifiants Bybit (optionnels, la route
//   kline est publique ; s'ils sont présents, les requêtes sont signées)
// - BYBIT_BASE_URL : endpoint REST (défaut : mainnet)
// - BYBIT_TIMEOUT_SECS : timeout de la requête HTTP
// - BYBIT_RECV_WINDOW : fenêtre de validité d'une requête signée (ms)
// ============================================================================

use std::time::Duration;

use anyhow::{Context, Result};

/// Endpoint REST de production (pas le testnet)
pub const MAINNET_BASE_URL: &str = "https://api.bybit.com";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RECV_WINDOW: u64 = 5000;

/// Configuration du client Bybit
#[derive(Clone)]
pub struct BybitConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub base_url: String,
    /// Borne la requête réseau ; à l'expiration, erreur provider
    pub timeout: Duration,
    pub recv_window: u64,
    pub user_agent: String,
}

impl Default for BybitConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            base_url: MAINNET_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            recv_window: DEFAULT_RECV_WINDOW,
            user_agent: format!("chartbot/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

// Le secret ne doit jamais apparaître dans les logs
impl std::fmt::Debug for BybitConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BybitConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("api_secret", &self.api_secret.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("recv_window", &self.recv_window)
            .finish()
    }
}

impl BybitConfig {
    /// Configuration sans identifiants (requêtes publiques non signées)
    pub fn public() -> Self {
        Self::default()
    }

    pub fn with_credentials(mut self, api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self.api_secret = Some(api_secret.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_recv_window(mut self, recv_window: u64) -> Self {
        self.recv_window = recv_window;
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }

    /// Lit la configuration depuis les variables d'environnement
    ///
    /// CONCEPT RUST : closure passée en paramètre
    /// - `lookup` abstrait std::env::var pour pouvoir tester sans toucher
    ///   à l'environnement du process
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Une variable vide est traitée comme absente
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let (Some(key), Some(secret)) = (get("CLIENT_KEY"), get("CLIENT_SECRET")) {
            config = config.with_credentials(key, secret);
        }

        if let Some(url) = get("BYBIT_BASE_URL") {
            config = config.with_base_url(url);
        }

        if let Some(raw) = get("BYBIT_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("BYBIT_TIMEOUT_SECS invalide : {}", raw))?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        if let Some(raw) = get("BYBIT_RECV_WINDOW") {
            let window: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("BYBIT_RECV_WINDOW invalide : {}", raw))?;
            config = config.with_recv_window(window);
        }

        Ok(config)
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BybitConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.base_url, MAINNET_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.recv_window, 5000);
        assert!(!config.has_credentials());
    }

    #[test]
    fn test_credentials_and_overrides() {
        let config = BybitConfig::from_lookup(lookup_from(&[
            ("CLIENT_KEY", "key"),
            ("CLIENT_SECRET", "secret"),
            ("BYBIT_BASE_URL", "http://localhost:8080/"),
            ("BYBIT_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert!(config.has_credentials());
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_half_credentials_ignored() {
        let config = BybitConfig::from_lookup(lookup_from(&[("CLIENT_KEY", "key")])).unwrap();
        assert!(!config.has_credentials());
    }

    #[test]
    fn test_invalid_timeout() {
        let result = BybitConfig::from_lookup(lookup_from(&[("BYBIT_TIMEOUT_SECS", "soon")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = BybitConfig::public().with_credentials("key", "very-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("very-secret"));
    }
}
