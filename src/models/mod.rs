// ============================================================================
// Module : models
// ============================================================================
// Structures de données du pipeline : requête, chandelles, séries
// ============================================================================

pub mod candle; // Candle, CandleSeries
pub mod market; // MarketSegment, Timeframe, FetchRequest

// Re-export des structures principales pour simplifier les imports
// On peut faire : use chartbot::models::Candle;
pub use candle::{Candle, CandleDirection, CandleSeries};
pub use market::{
    build_symbol, capitalize_first, FetchRequest, MarketSegment, Timeframe, DEFAULT_QUOTE,
    KLINE_LIMIT,
};
