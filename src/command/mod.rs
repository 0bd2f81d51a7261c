// ============================================================================
// Module : command
// ============================================================================
// Orchestrateur de la commande `c` :
//   options -> arguments typés -> fetch Bybit -> rendu -> réponse
//
// Aucune erreur ne remonte à la couche de dispatch : tout échec devient un
// embed d'erreur.
//
// CONCEPT : State machine
// Idle -> Fetching -> Rendering -> Succeeded
//             |           |
//             +-----------+-> Failed
// ============================================================================

pub mod args; // Options -> arguments typés
pub mod definition; // Surface de la commande (nom, options, choix)
pub mod reply; // Embeds + pièce jointe

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use crate::api::fetch_request;
use crate::chart::ChartImage;
use crate::error::Result;
use crate::resources::ResourceHolder;

pub use args::{ChartArgs, CommandOption, RequestSummary};
pub use definition::{CommandDefinition, COMMAND_NAME};
pub use reply::{Attachment, Embed, EmbedField, ReplyPayload};

/// Étape d'une requête
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Fetching,
    Rendering,
    Succeeded,
    Failed,
}

impl RequestState {
    pub fn can_advance_to(self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Idle, Fetching) | (Fetching, Rendering) | (Fetching, Failed) | (Rendering, Succeeded) | (Rendering, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Succeeded | RequestState::Failed)
    }

    /// Passe à l'étape suivante et trace la transition
    fn advance(&mut self, next: RequestState) {
        debug_assert!(self.can_advance_to(next), "illegal transition {} -> {}", self, next);
        debug!(from = %self, to = %next, "Request state transition");
        *self = next;
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestState::Idle => "idle",
            RequestState::Fetching => "fetching",
            RequestState::Rendering => "rendering",
            RequestState::Succeeded => "succeeded",
            RequestState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Handler de la commande `c`
///
/// Les ressources (client Bybit, contexte de rendu) sont injectées ;
/// chaque appel à `handle` est indépendant et peut tourner en parallèle.
#[derive(Debug, Clone)]
pub struct ChartCommand {
    resources: Arc<ResourceHolder>,
}

impl ChartCommand {
    pub fn new(resources: Arc<ResourceHolder>) -> Self {
        Self { resources }
    }

    pub fn definition() -> CommandDefinition {
        CommandDefinition::chart()
    }

    /// Exécute la commande ; ne renvoie jamais d'erreur
    #[instrument(skip_all, fields(command = COMMAND_NAME))]
    pub async fn handle(&self, options: &[CommandOption]) -> ReplyPayload {
        let summary = RequestSummary::from_options(options);
        let mut state = RequestState::Idle;

        match self.run(options, &mut state).await {
            Ok(image) => {
                state.advance(RequestState::Succeeded);
                info!(symbol = %summary.symbol, bytes = image.len(), "Chart rendered");
                ReplyPayload::success(image)
            }
            Err(e) => {
                state.advance(RequestState::Failed);
                error!(
                    kind = e.kind(),
                    error = %e,
                    symbol = %summary.symbol,
                    timeframe = %summary.timeframe,
                    market_type = %summary.market_type,
                    "Error: Could not fetch data"
                );
                ReplyPayload::failure(&summary)
            }
        }
    }

    async fn run(&self, options: &[CommandOption], state: &mut RequestState) -> Result<ChartImage> {
        state.advance(RequestState::Fetching);

        // Validation complète avant tout appel réseau
        let args = ChartArgs::from_options(options)?;
        let request = args.to_request()?;
        debug!(?args, symbol = %request.symbol, "Parsed command arguments");

        let resources = self.resources.get()?;
        let series = fetch_request(&resources.client, request).await?;

        state.advance(RequestState::Rendering);
        resources.renderer.render(&series).await
    }
}
