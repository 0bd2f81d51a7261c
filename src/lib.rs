// ============================================================================
// Chartbot - Library
// ============================================================================
// Commande de chat `c` : chandelles Bybit -> graphique PNG -> réponse
// Expose les modules publics pour le binaire et les tests
// ============================================================================

pub mod api; // Client Bybit + fetcher
pub mod chart; // Spec du graphique + rendu PNG
pub mod command; // Orchestrateur de la commande
pub mod config; // Configuration (environnement, .env)
pub mod error; // ChartError
pub mod models; // Structures de données
pub mod resources; // Client + contexte de rendu partagés
