// ============================================================================
// Structure : Candle (Open, High, Low, Close)
// ============================================================================
// Représente une chandelle japonaise telle que renvoyée par Bybit
//
// CONCEPTS RUST :
// 1. i64 : timestamp epoch en millisecondes (format natif de Bybit)
// 2. f64 : prix en floating point 64 bits (précision suffisante)
// 3. Vec<T> borné : une série ne dépasse jamais KLINE_LIMIT chandelles
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::market::FetchRequest;

/// Sens d'une chandelle, détermine sa couleur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleDirection {
    Up,
    Down,
    Unchanged,
}

/// Une chandelle japonaise (candlestick)
///
/// Invariant attendu du provider mais non vérifié :
/// high >= max(open, close) >= min(open, close) >= low
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Début de la chandelle, epoch en millisecondes
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }

    /// Timestamp converti en DateTime<Utc>
    ///
    /// CONCEPT RUST : Option
    /// - None si le timestamp sort de la plage représentable par chrono
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    pub fn direction(&self) -> CandleDirection {
        if self.close > self.open {
            CandleDirection::Up
        } else if self.close < self.open {
            CandleDirection::Down
        } else {
            CandleDirection::Unchanged
        }
    }

    /// true si les quatre prix sont des nombres finis
    pub fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.is_finite())
    }
}

/// Série de chandelles triées par timestamp croissant, avec la requête qui
/// l'a produite (pour le titre et les labels)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleSeries {
    pub request: FetchRequest,

    /// CONCEPT RUST : Ownership
    /// - CandleSeries possède le Vec, consommé une seule fois par le rendu
    pub candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(request: FetchRequest, candles: Vec<Candle>) -> Self {
        Self { request, candles }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Plus bas de la période
    ///
    /// CONCEPT RUST : fold
    /// - Un seul passage, pas de partial_cmp().unwrap() sur des NaN
    pub fn min_low(&self) -> Option<f64> {
        if self.candles.is_empty() {
            return None;
        }
        Some(self.candles.iter().fold(f64::INFINITY, |min, c| min.min(c.low)))
    }

    /// Plus haut de la période
    pub fn max_high(&self) -> Option<f64> {
        if self.candles.is_empty() {
            return None;
        }
        Some(
            self.candles
                .iter()
                .fold(f64::NEG_INFINITY, |max, c| max.max(c.high)),
        )
    }

    /// true si les timestamps sont strictement croissants
    pub fn is_ascending(&self) -> bool {
        self.candles
            .windows(2)
            .all(|pair| pair[0].timestamp < pair[1].timestamp)
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
