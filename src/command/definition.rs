// ============================================================================
// Description de la commande `c`
// ============================================================================
// Ce que la plateforme de chat doit enregistrer : nom, description,
// options et leurs choix. Sérialisé en JSON par `chartbot --describe`.
// ============================================================================

use serde::Serialize;

use crate::command::args::{OPT_COIN, OPT_COMPARE, OPT_MARKET_TYPE, OPT_TIMEFRAME};
use crate::models::{MarketSegment, Timeframe};

pub const COMMAND_NAME: &str = "c";
pub const COMMAND_DESCRIPTION: &str = "Show a Chart for the Price of any given Coin";

/// Type "chaîne" des options de commande slash
const STRING_OPTION: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionChoice {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionDefinition {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<OptionChoice>,
}

impl OptionDefinition {
    fn string(name: &'static str, description: &'static str, required: bool) -> Self {
        Self {
            kind: STRING_OPTION,
            name,
            description,
            required,
            choices: Vec::new(),
        }
    }

    fn with_choices(mut self, choices: impl IntoIterator<Item = (String, String)>) -> Self {
        self.choices = choices
            .into_iter()
            .map(|(name, value)| OptionChoice { name, value })
            .collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub options: Vec<OptionDefinition>,
}

impl CommandDefinition {
    pub fn chart() -> Self {
        let market_choices = MarketSegment::all()
            .into_iter()
            .map(|m| (m.label(), m.as_str().to_string()));
        let timeframe_choices = Timeframe::all()
            .into_iter()
            .map(|tf| (tf.label().to_string(), tf.as_str().to_string()));

        Self {
            name: COMMAND_NAME,
            description: COMMAND_DESCRIPTION,
            options: vec![
                OptionDefinition::string(OPT_COIN, "Which Coin to display on the graph", true),
                OptionDefinition::string(OPT_MARKET_TYPE, "The Market Type", true).with_choices(market_choices),
                OptionDefinition::string(OPT_COMPARE, "What to compare the coin to (e.g USDT)", false),
                OptionDefinition::string(OPT_TIMEFRAME, "Which timeframe to select data from", false)
                    .with_choices(timeframe_choices),
            ],
        }
    }

    pub fn option(&self, name: &str) -> Option<&OptionDefinition> {
        self.options.iter().find(|o| o.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_definition() {
        let def = CommandDefinition::chart();
        assert_eq!(def.name, "c");
        assert_eq!(def.options.len(), 4);
        assert!(def.option("coin").unwrap().required);
        assert!(!def.option("compare").unwrap().required);

        let markets = &def.option("market_type").unwrap().choices;
        assert_eq!(markets[0], OptionChoice { name: "Linear".into(), value: "linear".into() });

        let timeframes = &def.option("timeframe").unwrap().choices;
        assert_eq!(timeframes.len(), 13);
        assert_eq!(timeframes[10], OptionChoice { name: "1 Day".into(), value: "D".into() });
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(CommandDefinition::chart()).unwrap();
        assert_eq!(json["description"], COMMAND_DESCRIPTION);
        assert_eq!(json["options"][0]["type"], 3);
        assert!(json["options"][0].get("choices").is_none());
        assert_eq!(json["options"][3]["choices"][0]["value"], "1");
    }
}
