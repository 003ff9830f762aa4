pub mod adaptive;
pub mod db;
pub mod emotion;
pub mod error;
pub mod fusion;
pub mod sensing;
pub mod session;
pub mod settings;
mod utils;

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::sync::broadcast::{self, error::RecvError};

use adaptive::AdaptiveEngine;
use db::Database;
use emotion::ModalityKind;
use fusion::FusionEngine;
use sensing::{ModalityAdapter, SimulatedClassifier, SimulationProfile};
use session::{recover_incomplete_session, SessionEvent, StudySessionController};
use settings::{AppSettings, SettingsStore};

const DEFAULT_DATA_DIR: &str = "./emostudy-data";

/// Runs one study session against simulated sensors until Ctrl-C.
///
/// The first command-line argument, if any, is used as the study topic.
pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    info!("EmoStudy starting up...");

    let data_dir = std::env::var_os("EMOSTUDY_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let settings = SettingsStore::new(data_dir.join("settings.json"))?.get();
    let topic = std::env::args().nth(1);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(run_session(data_dir, settings, topic))
}

async fn run_session(data_dir: PathBuf, settings: AppSettings, topic: Option<String>) -> Result<()> {
    let database = Database::new(data_dir.join("emostudy.sqlite3"))?;

    // Finalize sessions that were running when the app last crashed.
    recover_incomplete_session(&database).await?;

    let facial = ModalityAdapter::new(
        ModalityKind::Facial,
        Box::new(SimulatedClassifier::new(SimulationProfile::facial())),
        settings.sensing.facial.clone(),
    );
    let voice = ModalityAdapter::new(
        ModalityKind::Voice,
        Box::new(SimulatedClassifier::new(SimulationProfile::voice())),
        settings.sensing.voice.clone(),
    );
    let fusion = FusionEngine::new(facial, voice, settings.fusion.clone())?;
    let adaptive = AdaptiveEngine::new(settings.interventions.clone(), settings.adaptive.clone())?;

    let controller = StudySessionController::new(database, fusion, adaptive, &settings.session);
    let printer = tokio::spawn(print_events(controller.subscribe()));

    let session = controller.start_session(topic).await?;
    info!("Session {} running; press Ctrl-C to finish", session.id);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    let summary = controller.end_session().await?;
    info!(
        "Studied {} min, {} interventions (most frequent trigger: {})",
        summary.minutes_studied,
        summary.stats.total_interventions,
        summary
            .stats
            .most_frequent()
            .map(|label| label.as_str())
            .unwrap_or("none")
    );

    drop(controller);
    if let Err(err) = printer.await {
        warn!("event printer ended abnormally: {err}");
    }
    Ok(())
}

async fn print_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::Intervention { intervention, .. }) => {
                if let Some(content) = intervention.content.as_deref() {
                    info!(
                        "[{:?} {}] {content}",
                        intervention.priority, intervention.intervention_type
                    );
                }
            }
            Ok(SessionEvent::EmotionUpdated {
                emotion,
                confidence,
                degraded,
                ..
            }) => {
                debug!("emotion {emotion} ({confidence:.2}){}", if degraded { " [degraded]" } else { "" });
            }
            Ok(SessionEvent::Ended { .. }) => break,
            Ok(SessionEvent::Started { .. }) => {}
            Err(RecvError::Lagged(skipped)) => warn!("event printer skipped {skipped} events"),
            Err(RecvError::Closed) => break,
        }
    }
}
