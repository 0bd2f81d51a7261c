// ============================================================================
// Data Fetcher : Bybit -> CandleSeries
// ============================================================================
// Récupère les chandelles d'un symbole et les normalise :
// - une seule requête, pas de retry
// - retCode != 0 ou liste vide => erreur provider
// - lignes texte -> Candle, triées par timestamp croissant
// ============================================================================

use tracing::{debug, error, info, instrument};

use crate::api::bybit::{BybitClient, KlineQuery, KlineResponse};
use crate::error::{ChartError, Result, MISSING_DATA_MESSAGE};
use crate::models::{Candle, CandleSeries, FetchRequest, MarketSegment, Timeframe, KLINE_LIMIT};

/// Récupère les chandelles pour un symbole complet (ex: "BTCUSDT")
///
/// Les valeurs par défaut de la commande (timeframe "60", marché "linear")
/// sont celles de `Timeframe::default()` et `MarketSegment::default()`.
pub async fn fetch(
    client: &BybitClient,
    symbol: &str,
    timeframe: Timeframe,
    segment: MarketSegment,
) -> Result<CandleSeries> {
    let request = FetchRequest::for_symbol(symbol, timeframe, segment)?;
    fetch_request(client, request).await
}

/// Récupère les chandelles décrites par une requête déjà validée
#[instrument(skip(client), fields(symbol = %request.symbol, interval = %request.timeframe, category = %request.segment))]
pub async fn fetch_request(client: &BybitClient, request: FetchRequest) -> Result<CandleSeries> {
    let query = KlineQuery::from_request(&request);
    debug!(?query, "Built kline query");

    let response = match client.get_kline(&query).await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "Could not reach Bybit");
            return Err(e);
        }
    };

    let series = normalize_klines(request, response)?;
    info!(candles = series.len(), "Successfully fetched kline data");
    Ok(series)
}

/// Valide l'enveloppe Bybit et convertit les lignes en CandleSeries
///
/// CONCEPT RUST : Ownership
/// - `response` est consommée (move), ses lignes sont parcourues sans copie
pub fn normalize_klines(request: FetchRequest, response: KlineResponse) -> Result<CandleSeries> {
    if response.ret_code != 0 || response.result.list.is_empty() {
        let reason = failure_reason(&response);
        error!(
            symbol = %request.symbol,
            ret_code = response.ret_code,
            reason = %reason,
            "Could not fetch data"
        );
        return Err(ChartError::provider(reason));
    }

    let mut candles = response
        .result
        .list
        .iter()
        .map(|row| parse_row(row))
        .collect::<Result<Vec<Candle>>>()?;

    // Ordre croissant quel que soit l'ordre du provider (Bybit : du plus
    // récent au plus ancien), puis on garde les KLINE_LIMIT plus récentes
    candles.sort_by_key(|c| c.timestamp);
    candles.dedup_by_key(|c| c.timestamp);
    if candles.len() > KLINE_LIMIT {
        candles.drain(..candles.len() - KLINE_LIMIT);
    }

    debug!(parsed = candles.len(), "Normalized kline rows");
    Ok(CandleSeries::new(request, candles))
}

/// Message d'erreur : retMsg de Bybit s'il en donne un, sinon le message
/// générique
fn failure_reason(response: &KlineResponse) -> String {
    let msg = response.ret_msg.trim();
    if msg.is_empty() {
        MISSING_DATA_MESSAGE.to_string()
    } else {
        msg.to_string()
    }
}

/// [startTime, open, high, low, close, ...] -> Candle
fn parse_row(row: &[String]) -> Result<Candle> {
    if row.len() < 5 {
        return Err(ChartError::provider(format!(
            "Malformed kline row: expected at least 5 fields, got {}",
            row.len()
        )));
    }

    let timestamp = row[0]
        .trim()
        .parse::<i64>()
        .map_err(|_| ChartError::provider(format!("Malformed kline timestamp: {:?}", row[0])))?;

    let price = |i: usize| -> Result<f64> {
        row[i]
            .trim()
            .parse::<f64>()
            .map_err(|_| ChartError::provider(format!("Malformed kline price: {:?}", row[i])))
    };

    let candle = Candle::new(timestamp, price(1)?, price(2)?, price(3)?, price(4)?);

    // "NaN" et "inf" passent le parse f64 mais ne sont pas des prix
    if !candle.is_finite() {
        return Err(ChartError::provider(format!(
            "Malformed kline price: non-finite value in row {:?}",
            row
        )));
    }
    Ok(candle)
}

// ============================================================================
// Tests unitaires
// ============================================================================
