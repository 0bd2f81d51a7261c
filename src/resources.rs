// ============================================================================
// Module : resources
// ============================================================================
// Ressources longue durée partagées par toutes les requêtes :
// - le client Bybit (pool de connexions reqwest)
// - le contexte de rendu (canvas + polices)
//
// CONCEPTS RUST :
// 1. OnceCell : initialisation paresseuse, exactement une fois, thread-safe
// 2. Arc : plusieurs tâches tokio partagent les mêmes ressources en lecture
// ============================================================================

use std::sync::Arc;

use anyhow::Context;
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::api::BybitClient;
use crate::chart::RenderContext;
use crate::config::BybitConfig;
use crate::error::Result;

/// Ce qui est construit une fois et réutilisé par chaque commande
#[derive(Debug)]
pub struct SharedResources {
    pub client: BybitClient,
    pub renderer: RenderContext,
}

impl SharedResources {
    pub fn new(config: BybitConfig) -> Result<Self> {
        let client = BybitClient::new(config)?;
        let renderer = RenderContext::new()?;
        Ok(Self { client, renderer })
    }
}

/// Détenteur paresseux des ressources partagées
///
/// Le premier appel à `get()` construit le client et le contexte de rendu ;
/// les suivants renvoient la même instance. Si deux tâches arrivent en même
/// temps, une seule construit, l'autre attend.
#[derive(Debug)]
pub struct ResourceHolder {
    config: BybitConfig,
    cell: OnceCell<Arc<SharedResources>>,
}

/// Singleton process, configuré depuis l'environnement au premier accès
static GLOBAL: OnceCell<Arc<ResourceHolder>> = OnceCell::new();

impl ResourceHolder {
    pub fn new(config: BybitConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    /// Holder configuré par l'environnement (et le fichier .env)
    pub fn from_env() -> anyhow::Result<Self> {
        // Absence de .env : pas une erreur
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Holder configuré par une source de variables quelconque
    ///
    /// Une valeur invalide (ex: BYBIT_TIMEOUT_SECS=soon) est une erreur,
    /// jamais remplacée par la valeur par défaut
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = BybitConfig::from_lookup(lookup).context("Configuration Bybit invalide")?;
        Ok(Self::new(config))
    }

    /// Holder partagé par tout le process
    ///
    /// Une configuration invalide est une erreur ; elle n'est pas mémorisée
    /// et sera relue au prochain appel
    pub fn global() -> anyhow::Result<Arc<ResourceHolder>> {
        GLOBAL
            .get_or_try_init(|| Self::from_env().map(Arc::new))
            .map(Arc::clone)
    }

    pub fn config(&self) -> &BybitConfig {
        &self.config
    }

    /// Renvoie les ressources, en les construisant au premier appel
    ///
    /// Un échec de construction n'est pas mémorisé : l'appel suivant réessaie
    pub fn get(&self) -> Result<Arc<SharedResources>> {
        let resources = self.cell.get_or_try_init(|| {
            debug!(config = ?self.config, "Building shared resources");
            let resources = SharedResources::new(self.config.clone())?;
            info!(
                base_url = %self.config.base_url,
                signed = self.config.has_credentials(),
                "Shared resources ready"
            );
            Ok::<_, crate::error::ChartError>(Arc::new(resources))
        })?;
        Ok(Arc::clone(resources))
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
