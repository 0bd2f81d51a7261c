// ============================================================================
// Module : api
// ============================================================================
// Client Bybit et récupération des chandelles
// ============================================================================

pub mod bybit; // Client HTTP Bybit v5
pub mod fetcher; // Validation + normalisation des klines

// Re-export des fonctions principales
pub use bybit::{BybitClient, KlineQuery, KlineResponse};
pub use fetcher::{fetch, fetch_request, normalize_klines};
