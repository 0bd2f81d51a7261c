// ============================================================================
// Chartbot - Binaire
// ============================================================================
// Exécute la commande `c` une fois depuis le terminal :
//   chartbot coin=btc market_type=linear timeframe=240 --out btc.png
//
// - L'image (si succès) est écrite dans --out
// - Les embeds de la réponse sont affichés en JSON sur stdout
// - --describe affiche la définition de la commande (pour l'enregistrer)
//
// CONCEPTS RUST CLÉS :
// 1. clap derive : parsing des arguments par attributs
// 2. Async dans sync : tokio::runtime::Runtime + block_on
// 3. anyhow::Context : erreurs de démarrage lisibles
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use chartbot::command::{ChartCommand, CommandOption};
use chartbot::resources::ResourceHolder;

/// Affiche un graphique en chandeliers pour n'importe quelle crypto Bybit
#[derive(Debug, Parser)]
#[command(name = "chartbot", version, about)]
struct Cli {
    /// Fichier PNG de sortie
    #[arg(long, default_value = "chart.png")]
    out: PathBuf,

    /// Affiche la définition JSON de la commande et quitte
    #[arg(long)]
    describe: bool,

    /// Options de la commande : coin, market_type, compare, timeframe
    #[arg(value_name = "NAME=VALUE")]
    options: Vec<CommandOption>,
}

// ============================================================================
// Initialisation du logging
// ============================================================================
// CONCEPT : Deux sorties
// - Fichier avec rotation quotidienne (historique complet)
// - stderr (stdout est réservé au JSON de la réponse)
// ============================================================================

/// Initialise le système de logging
///
/// Les logs sont écrits dans :
/// - Linux : ~/.local/share/chartbot/logs/chartbot.log
/// - macOS : ~/Library/Application Support/chartbot/logs/chartbot.log
/// - Windows : C:\Users\<user>\AppData\Local\chartbot\logs\chartbot.log
/// - à défaut : ./logs/chartbot.log
///
/// # Utilisation
/// ```bash
/// RUST_LOG=chartbot=trace chartbot coin=btc market_type=spot
/// ```
fn init_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = dirs::data_local_dir()
        .map(|dir| dir.join("chartbot").join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"));

    std::fs::create_dir_all(&log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "chartbot.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false) // Pas de codes couleur dans le fichier
                .with_target(true)
                .with_thread_ids(true) // Les rendus tournent sur le pool bloquant
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(
            // Par défaut : debug pour chartbot, info pour les dépendances
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chartbot=debug,info".into()),
        )
        .try_init()
        .context("Un subscriber tracing est déjà installé")?;

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée
// ============================================================================

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Si l'init échoue, on affiche l'erreur et on continue sans logs
    init_logging().unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {:#}", e);
        eprintln!("   Continuing without logging...");
    });

    if cli.describe {
        let json = serde_json::to_string_pretty(&ChartCommand::definition())?;
        println!("{}", json);
        return Ok(ExitCode::SUCCESS);
    }

    // Erreurs de démarrage : fatales
    let holder = ResourceHolder::global()?;
    info!(config = ?holder.config(), "Configuration chargée");

    holder
        .get()
        .context("Impossible de construire le client Bybit ou le contexte de rendu")?;
    let command = ChartCommand::new(holder);

    let runtime = tokio::runtime::Runtime::new().context("Impossible de démarrer le runtime tokio")?;
    let reply = runtime.block_on(command.handle(&cli.options));

    if let Some(file) = reply.files.first() {
        std::fs::write(&cli.out, &file.data)
            .with_context(|| format!("Impossible d'écrire {}", cli.out.display()))?;
        info!(path = %cli.out.display(), bytes = file.size, "Graphique écrit");
    }

    println!("{}", serde_json::to_string_pretty(&reply.embeds)?);

    if reply.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        error!("La commande a échoué");
        Ok(ExitCode::FAILURE)
    }
}
