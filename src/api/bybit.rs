// ============================================================================
// API Client : Bybit v5
// ============================================================================
// Client HTTP minimal pour la route `GET /v5/market/kline`
//
// CONCEPTS RUST AVANCÉS :
// 1. async/await : programmation asynchrone (non-bloquante)
// 2. Serde : désérialisation de l'enveloppe JSON de Bybit
// 3. HMAC : signature optionnelle des requêtes avec les identifiants
// ============================================================================

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, instrument};

use crate::config::BybitConfig;
use crate::error::{ChartError, Result};
use crate::models::{FetchRequest, KLINE_LIMIT};

type HmacSha256 = Hmac<Sha256>;

const KLINE_PATH: &str = "/v5/market/kline";

// ============================================================================
// Structures pour la requête et la réponse
// ============================================================================
// Bybit enveloppe toutes ses réponses :
// { "retCode": 0, "retMsg": "OK", "result": { "list": [[...], ...] } }
//
// CONCEPT RUST : #[serde(default)]
// - En cas d'erreur, Bybit renvoie souvent "result": {} sans "list"
// - default permet de parser quand même et de vérifier retCode ensuite
// ============================================================================

/// Paramètres de `GET /v5/market/kline`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KlineQuery {
    pub category: String,
    pub symbol: String,
    pub interval: String,
    pub limit: usize,
}

impl KlineQuery {
    pub fn from_request(request: &FetchRequest) -> Self {
        Self {
            category: request.segment.as_str().to_string(),
            symbol: request.symbol.clone(),
            interval: request.timeframe.as_str().to_string(),
            limit: KLINE_LIMIT,
        }
    }

    /// Query string dans un ordre fixe : la signature porte sur ce texte exact
    pub fn to_query_string(&self) -> String {
        format!(
            "category={}&symbol={}&interval={}&limit={}",
            urlencoding::encode(&self.category),
            urlencoding::encode(&self.symbol),
            urlencoding::encode(&self.interval),
            self.limit
        )
    }
}

/// Enveloppe de réponse Bybit
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KlineResponse {
    pub ret_code: i64,
    #[serde(default)]
    pub ret_msg: String,
    #[serde(default)]
    pub result: KlineResult,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KlineResult {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    /// Lignes [startTime, open, high, low, close, volume, turnover],
    /// toutes en texte, de la plus récente à la plus ancienne
    #[serde(default)]
    pub list: Vec<Vec<String>>,
}

// ============================================================================
// Client
// ============================================================================

/// Client Bybit réutilisable (le reqwest::Client interne gère son pool de
/// connexions et peut être partagé entre tâches)
#[derive(Debug, Clone)]
pub struct BybitClient {
    config: BybitConfig,
    http: reqwest::Client,
}

impl BybitClient {
    /// Construit le client HTTP avec timeout et user-agent
    ///
    /// Échoue seulement si reqwest ne peut pas initialiser TLS
    pub fn new(config: BybitConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &BybitConfig {
        &self.config
    }

    /// Une seule requête kline, pas de retry
    ///
    /// Retourne l'enveloppe brute : la validation (retCode, liste vide) est
    /// faite par le fetcher
    #[instrument(skip(self), fields(category = %query.category, symbol = %query.symbol, interval = %query.interval))]
    pub async fn get_kline(&self, query: &KlineQuery) -> Result<KlineResponse> {
        let query_string = query.to_query_string();
        let url = format!("{}{}?{}", self.config.base_url, KLINE_PATH, query_string);
        debug!(url = %url, "Sending kline request to Bybit");

        let mut request = self.http.get(&url);
        if let Some(headers) = self.auth_headers(&query_string)? {
            for (name, value) in headers {
                request = request.header(name, value);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        // Bybit répond 200 même pour les erreurs métier (retCode != 0) ;
        // un statut HTTP d'erreur vient d'une passerelle ou d'un rate-limit
        if !status.is_success() {
            return Err(ChartError::provider(format!("Bybit returned HTTP {}", status)));
        }

        let body: KlineResponse = response.json().await?;
        debug!(
            ret_code = body.ret_code,
            ret_msg = %body.ret_msg,
            rows = body.result.list.len(),
            "Parsed kline response"
        );
        Ok(body)
    }

    /// En-têtes d'authentification v5, si des identifiants sont configurés
    fn auth_headers(&self, query_string: &str) -> Result<Option<[(&'static str, String); 4]>> {
        let (Some(api_key), Some(api_secret)) = (&self.config.api_key, &self.config.api_secret) else {
            return Ok(None);
        };

        let timestamp = timestamp_ms().to_string();
        let recv_window = self.config.recv_window.to_string();
        let signature = sign(api_secret, &timestamp, api_key, &recv_window, query_string)?;

        Ok(Some([
            ("X-BAPI-API-KEY", api_key.clone()),
            ("X-BAPI-TIMESTAMP", timestamp),
            ("X-BAPI-RECV-WINDOW", recv_window),
            ("X-BAPI-SIGN", signature),
        ]))
    }
}

fn timestamp_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Signature v5 : hex(HMAC_SHA256(secret, timestamp + key + recvWindow + query))
pub fn sign(
    secret: &str,
    timestamp: &str,
    api_key: &str,
    recv_window: &str,
    query_string: &str,
) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ChartError::provider(format!("HMAC error: {}", e)))?;

    mac.update(timestamp.as_bytes());
    mac.update(api_key.as_bytes());
    mac.update(recv_window.as_bytes());
    mac.update(query_string.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarketSegment, Timeframe};

    #[test]
    fn test_query_from_request() {
        let request = FetchRequest::new("eth", None, Timeframe::D1, MarketSegment::Spot).unwrap();
        let query = KlineQuery::from_request(&request);
        assert_eq!(query.category, "spot");
        assert_eq!(query.symbol, "ETHUSDT");
        assert_eq!(query.interval, "D");
        assert_eq!(query.limit, 100);
        assert_eq!(
            query.to_query_string(),
            "category=spot&symbol=ETHUSDT&interval=D&limit=100"
        );
    }

    #[test]
    fn test_sign_is_stable_hex() {
        let a = sign("secret", "1700000000000", "key", "5000", "category=linear").unwrap();
        let b = sign("secret", "1700000000000", "key", "5000", "category=linear").unwrap();
        let c = sign("other", "1700000000000", "key", "5000", "category=linear").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn test_parse_error_envelope_without_list() {
        let json = r#"{"retCode":10001,"retMsg":"Not supported symbols","result":{},"retExtInfo":{},"time":1}"#;
        let response: KlineResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.ret_code, 10001);
        assert_eq!(response.ret_msg, "Not supported symbols");
        assert!(response.result.list.is_empty());
    }

    #[test]
    fn test_parse_success_envelope() {
        let json = r#"{
            "retCode": 0,
            "retMsg": "OK",
            "result": {
                "category": "linear",
                "symbol": "BTCUSDT",
                "list": [["1670608800000","17071","17073","17027","17055.5","268611","15.74462667"]]
            }
        }"#;
        let response: KlineResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.result.symbol.as_deref(), Some("BTCUSDT"));
        assert_eq!(response.result.list.len(), 1);
        assert_eq!(response.result.list[0][4], "17055.5");
    }

    #[test]
    fn test_public_client_has_no_auth_headers() {
        let client = BybitClient::new(BybitConfig::public()).unwrap();
        assert!(client.auth_headers("category=spot").unwrap().is_none());
    }

    #[test]
    fn test_signed_client_headers() {
        let client = BybitClient::new(BybitConfig::public().with_credentials("key", "secret")).unwrap();
        let headers = client.auth_headers("category=spot").unwrap().unwrap();
        assert_eq!(headers[0], ("X-BAPI-API-KEY", "key".to_string()));
        assert_eq!(headers[2], ("X-BAPI-RECV-WINDOW", "5000".to_string()));
        assert_eq!(headers[3].1.len(), 64);
    }
}
