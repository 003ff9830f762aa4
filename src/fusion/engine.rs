use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use log::{info, warn};
use tokio::{sync::Mutex as AsyncMutex, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    emotion::{EmotionLabel, EmotionReading, ModalityKind},
    error::{ConfigError, SensingError},
    sensing::{ModalityAdapter, ReadingSlot},
};

use super::{
    algorithm::{fuse_readings, FusionCandidate},
    config::FusionConfig,
    smoothing::SmoothingHistory,
    state::{FusedState, ModalityHealth},
};

// Set to false to silence per-tick fusion logs
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

struct AdapterPair {
    facial: ModalityAdapter,
    voice: ModalityAdapter,
}

struct FusionCore {
    history: SmoothingHistory,
    state: FusedState,
}

/// State shared with the tick task.
struct FusionInner {
    config: FusionConfig,
    facial_slot: ReadingSlot,
    voice_slot: ReadingSlot,
    core: Mutex<FusionCore>,
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Pulls both modality adapters on a fixed tick and keeps one smoothed emotion estimate.
#[derive(Clone)]
pub struct FusionEngine {
    inner: Arc<FusionInner>,
    adapters: Arc<AsyncMutex<AdapterPair>>,
    ticker: Arc<AsyncMutex<Option<Ticker>>>,
}

impl FusionEngine {
    pub fn new(
        facial: ModalityAdapter,
        voice: ModalityAdapter,
        config: FusionConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let inner = FusionInner {
            facial_slot: facial.slot(),
            voice_slot: voice.slot(),
            core: Mutex::new(FusionCore {
                history: SmoothingHistory::new(config.smoothing_window),
                state: FusedState::default(),
            }),
            config,
        };

        Ok(Self {
            inner: Arc::new(inner),
            adapters: Arc::new(AsyncMutex::new(AdapterPair { facial, voice })),
            ticker: Arc::new(AsyncMutex::new(None)),
        })
    }

    pub fn config(&self) -> &FusionConfig {
        &self.inner.config
    }

    /// Starts both adapters and the fusion tick. Returns `false` if either adapter is
    /// unavailable, after stopping whichever one did start.
    pub async fn start(&self) -> bool {
        let mut ticker = self.ticker.lock().await;
        if ticker.is_some() {
            return true;
        }

        {
            let mut adapters = self.adapters.lock().await;
            if let Err(err) = adapters.facial.start().await {
                warn!("fusion not started: {err}");
                return false;
            }
            if let Err(err) = adapters.voice.start().await {
                warn!("fusion not started: {err}");
                adapters.facial.stop().await;
                return false;
            }
        }

        self.inner.reset();

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(fusion_loop(Arc::clone(&self.inner), cancel_token.clone()));
        *ticker = Some(Ticker {
            handle,
            cancel_token,
        });

        info!(
            "emotion fusion started (tick {}ms, window {})",
            self.inner.config.tick_interval_ms, self.inner.config.smoothing_window
        );
        true
    }

    /// Stops the tick and both adapters. Safe to call repeatedly or before `start`.
    pub async fn stop(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.cancel_token.cancel();
            if let Err(err) = ticker.handle.await {
                warn!("fusion tick task ended abnormally: {err}");
            }
        }

        let mut adapters = self.adapters.lock().await;
        adapters.facial.stop().await;
        adapters.voice.stop().await;
    }

    pub async fn is_running(&self) -> bool {
        self.ticker.lock().await.is_some()
    }

    /// Latest fused emotion; `(Neutral, 0.0)` before the first tick.
    pub fn get_current_emotion(&self) -> (EmotionLabel, f64) {
        self.inner.lock_core().state.current()
    }

    pub fn get_detailed_state(&self) -> FusedState {
        self.inner.lock_core().state.clone()
    }

    /// Runs one fusion step immediately, outside the regular tick.
    pub fn fuse_now(&self) -> FusedState {
        self.inner.fuse_at(Utc::now())
    }

    pub fn fuse_at(&self, now: DateTime<Utc>) -> FusedState {
        self.inner.fuse_at(now)
    }
}

impl FusionInner {
    fn lock_core(&self) -> MutexGuard<'_, FusionCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reset(&self) {
        let mut core = self.lock_core();
        core.history.clear();
        core.state = FusedState::default();
    }

    fn fuse_at(&self, now: DateTime<Utc>) -> FusedState {
        let (facial, facial_health) = self.observe(ModalityKind::Facial, &self.facial_slot);
        let (voice, voice_health) = self.observe(ModalityKind::Voice, &self.voice_slot);

        let candidate = fuse_readings(facial.as_ref(), voice.as_ref(), now, &self.config);

        let mut core = self.lock_core();
        report_degradation(ModalityKind::Facial, core.state.facial_health, facial_health);
        report_degradation(ModalityKind::Voice, core.state.voice_health, voice_health);

        // With nothing usable from either modality, older votes no longer describe the learner.
        let smoothed = if candidate == FusionCandidate::neutral() {
            core.history.clear();
            candidate
        } else {
            core.history.push(candidate, now)
        };
        core.state = FusedState {
            emotion: smoothed.emotion,
            confidence: smoothed.confidence,
            facial,
            voice,
            facial_health,
            voice_health,
            updated_at: Some(now),
        };

        log_debug!(
            "fused {} ({:.2}) from candidate {} ({:.2})",
            smoothed.emotion,
            smoothed.confidence,
            candidate.emotion,
            candidate.confidence
        );

        core.state.clone()
    }

    /// A failed read counts as "no reading" for this tick.
    fn observe(
        &self,
        modality: ModalityKind,
        slot: &ReadingSlot,
    ) -> (Option<EmotionReading>, ModalityHealth) {
        match slot.load() {
            Ok(reading) => (reading, ModalityHealth::default()),
            Err(SensingError::TransientReadFailure {
                consecutive,
                reason,
                ..
            }) => {
                log_debug!("{modality} has no reading this tick: {reason}");
                let health = ModalityHealth {
                    consecutive_failures: consecutive,
                    degraded: consecutive >= self.config.degraded_after_failures,
                };
                (None, health)
            }
            Err(err) => {
                log_warn!("unexpected {modality} read error: {err}");
                (None, ModalityHealth::default())
            }
        }
    }
}

fn report_degradation(modality: ModalityKind, before: ModalityHealth, after: ModalityHealth) {
    if after.degraded && !before.degraded {
        log_warn!(
            "{modality} modality degraded after {} failed samples; fusing without it",
            after.consecutive_failures
        );
    } else if before.degraded && !after.degraded {
        log_info!("{modality} modality recovered");
    }
}

async fn fusion_loop(inner: Arc<FusionInner>, cancel_token: CancellationToken) {
    let mut interval = tokio::time::interval(inner.config.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            _ = interval.tick() => {
                inner.fuse_at(Utc::now());
            }
        }
    }

    log_info!("fusion loop shutting down");
}
