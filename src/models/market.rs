// ============================================================================
// Paramètres de marché : segment, timeframe, requête
// ============================================================================
// Représente ce que l'utilisateur demande : quelle paire, sur quel marché,
// avec quelle granularité de chandelles
//
// CONCEPTS RUST :
// 1. Enums avec méthodes : chaque variante connaît son token Bybit
// 2. FromStr : parsing typé des arguments de commande
// 3. Constructeur validant : FetchRequest ne peut pas exister invalide
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChartError;

/// Devise de cotation utilisée quand l'appelant n'en donne pas
pub const DEFAULT_QUOTE: &str = "USDT";

/// Nombre fixe de chandelles demandées au provider
pub const KLINE_LIMIT: usize = 100;

// ============================================================================
// Enum : MarketSegment
// ============================================================================

/// Catégorie de produit Bybit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketSegment {
    Spot,
    /// Dérivés linéaires (perpétuels USDT/USDC)
    Linear,
    /// Dérivés inverses (réglés dans la crypto de base)
    Inverse,
}

impl MarketSegment {
    /// Token attendu par l'API (`category=...`)
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketSegment::Spot => "spot",
            MarketSegment::Linear => "linear",
            MarketSegment::Inverse => "inverse",
        }
    }

    /// Label pour l'affichage : seule la première lettre en majuscule
    pub fn label(&self) -> String {
        capitalize_first(self.as_str())
    }

    pub fn all() -> [MarketSegment; 3] {
        [MarketSegment::Linear, MarketSegment::Spot, MarketSegment::Inverse]
    }
}

impl Default for MarketSegment {
    fn default() -> Self {
        MarketSegment::Linear
    }
}

impl fmt::Display for MarketSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketSegment {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spot" => Ok(MarketSegment::Spot),
            "linear" => Ok(MarketSegment::Linear),
            "inverse" => Ok(MarketSegment::Inverse),
            other => Err(ChartError::validation(
                "market_type",
                format!("unknown market type `{}` (expected linear, spot or inverse)", other),
            )),
        }
    }
}

/// Met en majuscule le premier caractère uniquement
///
/// "linear" -> "Linear", "LINEAR" -> "LINEAR" (le reste n'est pas touché)
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Enum : Timeframe
// ============================================================================
// CONCEPT : Timeframe = largeur d'une chandelle
// - Même rôle que l'Interval d'un graphique classique
// - Les tokens sont ceux de l'API Bybit : minutes en chiffres, puis D/W/M
// ============================================================================

/// Largeur d'une chandelle (intervalle Bybit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M3,
    M5,
    M15,
    M30,
    M60,
    H2,
    H4,
    H6,
    H12,
    D1,
    W1,
    Mo1,
}

/// Format des dates sur l'axe X selon la granularité
const INTRADAY_FORMAT: &str = "%d/%m %H:%M";
const DAILY_FORMAT: &str = "%d/%m";
const MONTHLY_FORMAT: &str = "%m/%Y";

impl Timeframe {
    /// Token de l'API Bybit (`interval=...`)
    ///
    /// CONCEPT RUST : &'static str
    /// - Littéral stocké dans le binaire, aucune allocation
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1",
            Timeframe::M3 => "3",
            Timeframe::M5 => "5",
            Timeframe::M15 => "15",
            Timeframe::M30 => "30",
            Timeframe::M60 => "60",
            Timeframe::H2 => "120",
            Timeframe::H4 => "240",
            Timeframe::H6 => "360",
            Timeframe::H12 => "720",
            Timeframe::D1 => "D",
            Timeframe::W1 => "W",
            Timeframe::Mo1 => "M",
        }
    }

    /// Label lisible proposé dans les choix de la commande
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1 Minute",
            Timeframe::M3 => "3 Minutes",
            Timeframe::M5 => "5 Minutes",
            Timeframe::M15 => "15 Minutes",
            Timeframe::M30 => "30 Minutes",
            Timeframe::M60 => "60 Minutes",
            Timeframe::H2 => "2 Hours",
            Timeframe::H4 => "4 Hours",
            Timeframe::H6 => "6 Hours",
            Timeframe::H12 => "12 Hours",
            Timeframe::D1 => "1 Day",
            Timeframe::W1 => "1 Week",
            Timeframe::Mo1 => "1 Month",
        }
    }

    /// Durée nominale d'une chandelle en minutes (un mois compte 30 jours)
    pub fn minutes(&self) -> i64 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M3 => 3,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::M60 => 60,
            Timeframe::H2 => 120,
            Timeframe::H4 => 240,
            Timeframe::H6 => 360,
            Timeframe::H12 => 720,
            Timeframe::D1 => 24 * 60,
            Timeframe::W1 => 7 * 24 * 60,
            Timeframe::Mo1 => 30 * 24 * 60,
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.minutes())
    }

    /// Format chrono des labels de l'axe X
    pub fn axis_format(&self) -> &'static str {
        match self {
            Timeframe::D1 | Timeframe::W1 => DAILY_FORMAT,
            Timeframe::Mo1 => MONTHLY_FORMAT,
            _ => INTRADAY_FORMAT,
        }
    }

    /// Tous les timeframes, dans l'ordre des choix de la commande
    pub fn all() -> [Timeframe; 13] {
        [
            Timeframe::M1,
            Timeframe::M3,
            Timeframe::M5,
            Timeframe::M15,
            Timeframe::M30,
            Timeframe::M60,
            Timeframe::H2,
            Timeframe::H4,
            Timeframe::H6,
            Timeframe::H12,
            Timeframe::D1,
            Timeframe::W1,
            Timeframe::Mo1,
        ]
    }
}

impl Default for Timeframe {
    /// Intervalle par défaut : 60 minutes
    fn default() -> Self {
        Timeframe::M60
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ChartError;

    /// Tokens numériques exacts, D/W/M insensibles à la casse
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Timeframe::all()
            .into_iter()
            .find(|tf| tf.as_str().eq_ignore_ascii_case(token))
            .ok_or_else(|| {
                ChartError::validation(
                    "timeframe",
                    format!("unknown timeframe `{}`", token),
                )
            })
    }
}

// ============================================================================
// Structure : FetchRequest
// ============================================================================

/// Paramètres d'une récupération de chandelles
///
/// Invariant : `symbol` est non vide, en majuscules, base + cotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub segment: MarketSegment,
}

impl FetchRequest {
    /// Construit la requête à partir de la crypto de base et de la cotation
    ///
    /// `compare` vaut "USDT" si absent. Le symbole est mis en majuscules :
    /// "btc" et "BTC" donnent tous les deux "BTCUSDT".
    pub fn new(
        coin: &str,
        compare: Option<&str>,
        timeframe: Timeframe,
        segment: MarketSegment,
    ) -> Result<Self, ChartError> {
        let symbol = build_symbol(coin, compare)?;
        Ok(Self {
            symbol,
            timeframe,
            segment,
        })
    }

    /// Requête sur un symbole déjà complet (ex: "ETHBTC")
    pub fn for_symbol(
        symbol: &str,
        timeframe: Timeframe,
        segment: MarketSegment,
    ) -> Result<Self, ChartError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ChartError::validation("symbol", "symbol must not be empty"));
        }
        Ok(Self {
            symbol,
            timeframe,
            segment,
        })
    }
}

/// uppercase(coin + (compare ?? "USDT"))
///
/// Seule l'absence de `compare` donne "USDT" : une cotation fournie est
/// utilisée telle quelle, même vide
pub fn build_symbol(coin: &str, compare: Option<&str>) -> Result<String, ChartError> {
    let coin = coin.trim();
    if coin.is_empty() {
        return Err(ChartError::validation("coin", "coin must not be empty"));
    }

    let quote = compare.map(str::trim).unwrap_or(DEFAULT_QUOTE);

    Ok(format!("{}{}", coin, quote).to_uppercase())
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_is_case_insensitive() {
        let lower = FetchRequest::new("btc", None, Timeframe::default(), MarketSegment::Linear).unwrap();
        let upper = FetchRequest::new("BTC", None, Timeframe::default(), MarketSegment::Linear).unwrap();
        assert_eq!(lower.symbol, "BTCUSDT");
        assert_eq!(upper.symbol, "BTCUSDT");
    }

    #[test]
    fn test_symbol_with_compare() {
        assert_eq!(build_symbol("eth", Some("btc")).unwrap(), "ETHBTC");
        assert_eq!(build_symbol(" sol ", None).unwrap(), "SOLUSDT");
        // Cotation présente mais vide : pas de repli sur USDT
        assert_eq!(build_symbol("btc", Some("  ")).unwrap(), "BTC");
    }

    #[test]
    fn test_empty_coin_rejected() {
        let err = build_symbol("   ", None).unwrap_err();
        assert!(matches!(err, ChartError::Validation { ref field, .. } if field == "coin"));
    }

    #[test]
    fn test_segment_label() {
        assert_eq!(MarketSegment::Linear.label(), "Linear");
        assert_eq!(MarketSegment::Spot.label(), "Spot");
        assert_eq!("LINEAR".parse::<MarketSegment>().unwrap().label(), "Linear");
    }

    #[test]
    fn test_capitalize_first_only() {
        assert_eq!(capitalize_first("linear"), "Linear");
        assert_eq!(capitalize_first("iNVERSE"), "INVERSE");
        assert_eq!(capitalize_first(""), "");
    }

    #[test]
    fn test_segment_parse_rejects_unknown() {
        assert!("futures".parse::<MarketSegment>().is_err());
    }

    #[test]
    fn test_timeframe_tokens() {
        assert_eq!(Timeframe::default().as_str(), "60");
        assert_eq!("240".parse::<Timeframe>().unwrap(), Timeframe::H4);
        assert_eq!("d".parse::<Timeframe>().unwrap(), Timeframe::D1);
        assert_eq!("M".parse::<Timeframe>().unwrap(), Timeframe::Mo1);
        assert!("2".parse::<Timeframe>().is_err());
        assert!("1h".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_timeframe_roundtrip_all() {
        for tf in Timeframe::all() {
            assert_eq!(tf.as_str().parse::<Timeframe>().unwrap(), tf);
        }
    }

    #[test]
    fn test_timeframe_axis_format() {
        assert_eq!(Timeframe::M15.axis_format(), "%d/%m %H:%M");
        assert_eq!(Timeframe::D1.axis_format(), "%d/%m");
        assert_eq!(Timeframe::H2.minutes(), 120);
    }
}
