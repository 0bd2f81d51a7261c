// ============================================================================
// Arguments de la commande `c`
// ============================================================================
// La couche de dispatch livre une liste d'options (nom, valeur). On la
// convertit en arguments typés, en rejetant tout ce qui est inattendu
// AVANT le moindre appel réseau.
// ============================================================================

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, Result};
use crate::models::{FetchRequest, MarketSegment, Timeframe, DEFAULT_QUOTE};

pub const OPT_COIN: &str = "coin";
pub const OPT_MARKET_TYPE: &str = "market_type";
pub const OPT_COMPARE: &str = "compare";
pub const OPT_TIMEFRAME: &str = "timeframe";

const KNOWN_OPTIONS: [&str; 4] = [OPT_COIN, OPT_MARKET_TYPE, OPT_COMPARE, OPT_TIMEFRAME];

/// Une option telle que livrée par la plateforme de chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOption {
    pub name: String,
    pub value: String,
}

impl CommandOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// "coin=btc" -> CommandOption { name: "coin", value: "btc" }
impl FromStr for CommandOption {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| ChartError::validation(s, "expected NAME=VALUE"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ChartError::validation(s, "option name must not be empty"));
        }
        Ok(Self::new(name, value.trim()))
    }
}

/// Arguments validés de la commande
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArgs {
    pub coin: String,
    pub market_type: MarketSegment,
    pub compare: Option<String>,
    pub timeframe: Timeframe,
}

impl ChartArgs {
    /// Valide et convertit les options
    ///
    /// Erreurs (toutes `ChartError::Validation`) :
    /// - option inconnue ou répétée
    /// - coin ou market_type absent
    /// - market_type / timeframe hors des choix autorisés
    pub fn from_options(options: &[CommandOption]) -> Result<Self> {
        let mut seen = HashSet::new();
        for option in options {
            if !KNOWN_OPTIONS.contains(&option.name.as_str()) {
                return Err(ChartError::validation(&option.name, "unknown option"));
            }
            if !seen.insert(option.name.as_str()) {
                return Err(ChartError::validation(&option.name, "option given more than once"));
            }
        }

        let coin = lookup(options, OPT_COIN)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ChartError::validation(OPT_COIN, "required option is missing"))?;

        let market_type = lookup(options, OPT_MARKET_TYPE)
            .ok_or_else(|| ChartError::validation(OPT_MARKET_TYPE, "required option is missing"))?
            .parse::<MarketSegment>()?;

        let timeframe = match lookup(options, OPT_TIMEFRAME) {
            Some(raw) => raw.parse::<Timeframe>()?,
            None => Timeframe::default(),
        };

        let compare = lookup(options, OPT_COMPARE).map(|v| v.trim().to_string());

        Ok(Self {
            coin: coin.trim().to_string(),
            market_type,
            compare,
            timeframe,
        })
    }

    pub fn to_request(&self) -> Result<FetchRequest> {
        FetchRequest::new(&self.coin, self.compare.as_deref(), self.timeframe, self.market_type)
    }
}

/// Ce que l'utilisateur a demandé, tel quel, pour le message d'échec
///
/// Construit sans validation : il doit exister même quand les options
/// sont invalides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSummary {
    pub symbol: String,
    pub timeframe: String,
    pub market_type: String,
}

impl RequestSummary {
    pub fn from_options(options: &[CommandOption]) -> Self {
        let coin = lookup(options, OPT_COIN).unwrap_or_default().trim();
        let compare = lookup(options, OPT_COMPARE).map(str::trim).unwrap_or(DEFAULT_QUOTE);

        let timeframe = lookup(options, OPT_TIMEFRAME)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(Timeframe::default().as_str());

        Self {
            symbol: format!("{}{}", coin, compare).to_uppercase(),
            timeframe: timeframe.to_string(),
            market_type: lookup(options, OPT_MARKET_TYPE).unwrap_or_default().trim().to_string(),
        }
    }
}

fn lookup<'a>(options: &'a [CommandOption], name: &str) -> Option<&'a str> {
    options
        .iter()
        .find(|o| o.name == name)
        .map(|o| o.value.as_str())
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(pairs: &[(&str, &str)]) -> Vec<CommandOption> {
        pairs.iter().map(|(n, v)| CommandOption::new(*n, *v)).collect()
    }

    #[test]
    fn test_defaults() {
        let args = ChartArgs::from_options(&opts(&[("coin", "btc"), ("market_type", "linear")])).unwrap();
        assert_eq!(args.market_type, MarketSegment::Linear);
        assert_eq!(args.timeframe, Timeframe::M60);
        assert_eq!(args.compare, None);
        assert_eq!(args.to_request().unwrap().symbol, "BTCUSDT");
    }

    #[test]
    fn test_all_options() {
        let args = ChartArgs::from_options(&opts(&[
            ("coin", "eth"),
            ("market_type", "spot"),
            ("compare", "btc"),
            ("timeframe", "D"),
        ]))
        .unwrap();
        let request = args.to_request().unwrap();
        assert_eq!(request.symbol, "ETHBTC");
        assert_eq!(request.timeframe, Timeframe::D1);
        assert_eq!(request.segment, MarketSegment::Spot);
    }

    #[test]
    fn test_empty_compare_is_kept() {
        let options = opts(&[("coin", "btc"), ("market_type", "spot"), ("compare", "")]);
        let args = ChartArgs::from_options(&options).unwrap();
        assert_eq!(args.compare.as_deref(), Some(""));
        assert_eq!(args.to_request().unwrap().symbol, "BTC");
        assert_eq!(RequestSummary::from_options(&options).symbol, "BTC");
    }

    #[test]
    fn test_missing_required() {
        let err = ChartArgs::from_options(&opts(&[("market_type", "spot")])).unwrap_err();
        assert!(matches!(err, ChartError::Validation { ref field, .. } if field == "coin"));

        let err = ChartArgs::from_options(&opts(&[("coin", "btc")])).unwrap_err();
        assert!(matches!(err, ChartError::Validation { ref field, .. } if field == "market_type"));
    }

    #[test]
    fn test_unknown_and_duplicate_options() {
        let unknown = ChartArgs::from_options(&opts(&[("coin", "btc"), ("market_type", "spot"), ("limit", "5")]));
        assert!(matches!(unknown, Err(ChartError::Validation { ref field, .. }) if field == "limit"));

        let duplicate = ChartArgs::from_options(&opts(&[("coin", "btc"), ("coin", "eth"), ("market_type", "spot")]));
        assert!(matches!(duplicate, Err(ChartError::Validation { ref field, .. }) if field == "coin"));
    }

    #[test]
    fn test_out_of_choice_values() {
        let bad_market = ChartArgs::from_options(&opts(&[("coin", "btc"), ("market_type", "futures")]));
        assert!(matches!(bad_market, Err(ChartError::Validation { .. })));

        let bad_tf = ChartArgs::from_options(&opts(&[("coin", "btc"), ("market_type", "spot"), ("timeframe", "7")]));
        assert!(matches!(bad_tf, Err(ChartError::Validation { .. })));
    }

    #[test]
    fn test_parse_pair() {
        let option: CommandOption = "coin=btc".parse().unwrap();
        assert_eq!(option, CommandOption::new("coin", "btc"));
        assert!("coin".parse::<CommandOption>().is_err());
        assert!("=btc".parse::<CommandOption>().is_err());
    }

    #[test]
    fn test_summary_echoes_raw_input() {
        let summary = RequestSummary::from_options(&opts(&[("coin", "fakecoin"), ("market_type", "spot")]));
        assert_eq!(summary.symbol, "FAKECOINUSDT");
        assert_eq!(summary.timeframe, "60");
        assert_eq!(summary.market_type, "spot");

        let summary = RequestSummary::from_options(&opts(&[("market_type", "nope"), ("timeframe", "W")]));
        assert_eq!(summary.symbol, "USDT");
        assert_eq!(summary.timeframe, "W");
        assert_eq!(summary.market_type, "nope");
    }
}
