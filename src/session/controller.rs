use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    adaptive::{AdaptiveEngine, InterventionContext},
    db::{
        models::{EmotionLog, InterventionLog, StudySession, StudySessionStatus},
        Database,
    },
    fusion::FusionEngine,
};

use super::{SessionConfig, SessionEvent, SessionSummary};

struct SessionServices {
    db: Database,
    fusion: FusionEngine,
    adaptive: AdaptiveEngine,
    events: broadcast::Sender<SessionEvent>,
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Owns the lifecycle of one study session at a time: sensing, periodic logging and
/// interventions.
#[derive(Clone)]
pub struct StudySessionController {
    services: Arc<SessionServices>,
    active: Arc<Mutex<Option<StudySession>>>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    tick_interval: Duration,
}

impl StudySessionController {
    pub fn new(
        db: Database,
        fusion: FusionEngine,
        adaptive: AdaptiveEngine,
        config: &SessionConfig,
    ) -> Self {
        let debug_mode = std::env::var("EMOSTUDY_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let (events, _) = broadcast::channel(config.event_capacity);

        Self {
            services: Arc::new(SessionServices {
                db,
                fusion,
                adaptive,
                events,
            }),
            active: Arc::new(Mutex::new(None)),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: config.tick_interval(debug_mode),
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.services.events.subscribe()
    }

    pub async fn current_session(&self) -> Option<StudySession> {
        self.active.lock().await.clone()
    }

    pub async fn start_session(&self, topic: Option<String>) -> Result<StudySession> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return Err(anyhow!("study session already active"));
        }

        let session = StudySession::begin(topic, Utc::now());
        self.services.db.insert_study_session(&session).await?;
        self.services.adaptive.reset_session_at(session.started_at);

        if !self.services.fusion.start().await {
            self.services
                .db
                .mark_session_status(
                    &session.id,
                    StudySessionStatus::Interrupted,
                    Some(Utc::now()),
                )
                .await?;
            return Err(anyhow!("emotion sensing unavailable; session {} interrupted", session.id));
        }

        *active = Some(session.clone());
        drop(active);

        self.spawn_ticker(session.clone()).await;

        info!(
            "study session {} started (topic: {})",
            session.id,
            session.topic.as_deref().unwrap_or("none")
        );
        let _ = self.services.events.send(SessionEvent::Started {
            session: session.clone(),
        });

        Ok(session)
    }

    pub async fn end_session(&self) -> Result<SessionSummary> {
        self.finish(StudySessionStatus::Completed).await
    }

    /// Ends the active session without a summary. A no-op when idle.
    pub async fn cancel_session(&self) -> Result<()> {
        if self.active.lock().await.is_none() {
            return Ok(());
        }
        self.finish(StudySessionStatus::Cancelled).await.map(|_| ())
    }

    async fn finish(&self, status: StudySessionStatus) -> Result<SessionSummary> {
        let mut session = self
            .active
            .lock()
            .await
            .take()
            .ok_or_else(|| anyhow!("no active study session"))?;

        self.cancel_ticker().await;
        self.services.fusion.stop().await;

        let ended_at = Utc::now();
        self.services
            .db
            .mark_session_status(&session.id, status, Some(ended_at))
            .await?;
        session.status = status;
        session.ended_at = Some(ended_at);

        let summary = SessionSummary {
            stats: self.services.adaptive.get_session_stats(),
            minutes_studied: session.minutes_elapsed(ended_at),
            session,
        };

        info!(
            "study session {} {} after {} min with {} interventions",
            summary.session.id,
            status.as_str().to_lowercase(),
            summary.minutes_studied,
            summary.stats.total_interventions
        );
        let _ = self.services.events.send(SessionEvent::Ended {
            summary: summary.clone(),
        });

        Ok(summary)
    }

    async fn spawn_ticker(&self, session: StudySession) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(previous) = ticker_guard.take() {
            previous.cancel_token.cancel();
        }

        let services = Arc::clone(&self.services);
        let tick_interval = self.tick_interval;
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            // First snapshot after one full period, once fusion has something to report.
            let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        record_tick(&services, &session, Utc::now()).await;
                    }
                }
            }
        });

        *ticker_guard = Some(Ticker {
            handle,
            cancel_token,
        });
    }

    async fn cancel_ticker(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.cancel_token.cancel();
            if let Err(err) = ticker.handle.await {
                warn!("session ticker ended abnormally: {err}");
            }
        }
    }
}

/// Logs the fused state and, when the adaptive engine asks for one, an intervention.
/// Persistence failures are logged and do not stop the session.
async fn record_tick(services: &SessionServices, session: &StudySession, now: DateTime<Utc>) {
    let state = services.fusion.get_detailed_state();

    let log = EmotionLog::from_state(&session.id, &state, now);
    let emotion_log_id = match services.db.insert_emotion_log(&log).await {
        Ok(id) => Some(id),
        Err(err) => {
            error!("Failed to persist emotion log: {err}");
            None
        }
    };

    let _ = services.events.send(SessionEvent::EmotionUpdated {
        session_id: session.id.clone(),
        emotion: state.emotion,
        confidence: state.confidence,
        degraded: state.any_degraded(),
        at: now,
    });

    let context = InterventionContext {
        topic: session.topic.clone(),
        minutes_studying: Some(session.minutes_elapsed(now)),
    };
    let Some(intervention) = services.adaptive.get_intervention_with_context_at(
        state.emotion,
        state.confidence,
        &context,
        now,
    ) else {
        return;
    };

    let record = InterventionLog::from_intervention(&session.id, emotion_log_id, &intervention);
    let intervention_id = match services.db.insert_intervention(&record).await {
        Ok(id) => Some(id),
        Err(err) => {
            error!("Failed to persist intervention: {err}");
            None
        }
    };

    let _ = services.events.send(SessionEvent::Intervention {
        session_id: session.id.clone(),
        intervention_id,
        intervention,
    });
}

/// Marks a session left running by a previous crash as interrupted.
pub async fn recover_incomplete_session(db: &Database) -> Result<Option<StudySession>> {
    let Some(mut session) = db.get_incomplete_session().await? else {
        return Ok(None);
    };

    let ended_at = Utc::now();
    db.mark_session_status(&session.id, StudySessionStatus::Interrupted, Some(ended_at))
        .await?;
    session.status = StudySessionStatus::Interrupted;
    session.ended_at = Some(ended_at);

    warn!("Recovered incomplete study session {}; marked interrupted", session.id);
    Ok(Some(session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adaptive::{AdaptiveConfig, InterventionRules},
        db::temp_database,
        emotion::{EmotionLabel, LabelMap, ModalityKind},
        fusion::FusionConfig,
        sensing::{
            controller::tests::{DeviceProbe, ScriptedClassifier},
            AdapterConfig, ModalityAdapter, RawSample,
        },
    };

    fn adapter(modality: ModalityKind, classifier: ScriptedClassifier, label_map: LabelMap) -> ModalityAdapter {
        ModalityAdapter::new(
            modality,
            Box::new(classifier),
            AdapterConfig {
                sample_interval_ms: 10,
                sample_timeout_ms: 500,
                stop_grace_ms: 1_000,
                label_map,
            },
        )
    }

    fn controller_with(db: Database, facial: ScriptedClassifier, voice: ScriptedClassifier) -> StudySessionController {
        let fusion = FusionEngine::new(
            adapter(ModalityKind::Facial, facial, LabelMap::facial_default()),
            adapter(ModalityKind::Voice, voice, LabelMap::voice_default()),
            FusionConfig {
                tick_interval_ms: 10,
                smoothing_window: 1,
                ..FusionConfig::default()
            },
        )
        .unwrap();
        let adaptive = AdaptiveEngine::new(InterventionRules::default(), AdaptiveConfig::default()).unwrap();

        // Ticks are driven by hand in these tests.
        StudySessionController::new(db, fusion, adaptive, &SessionConfig::default())
            .with_tick_interval(Duration::from_secs(3_600))
    }

    fn frustrated_learner(db: Database) -> StudySessionController {
        controller_with(
            db,
            ScriptedClassifier::new(DeviceProbe::default(), vec![Ok(RawSample::new("angry", 0.9))]),
            ScriptedClassifier::new(DeviceProbe::default(), vec![Ok(RawSample::new("negative", 0.8))]),
        )
    }

    async fn wait_for_emotion(controller: &StudySessionController, expected: EmotionLabel) -> bool {
        for _ in 0..200 {
            if controller.services.fusion.get_current_emotion().0 == expected {
                return true;
            }
            time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn session_tick_logs_emotion_and_intervention() {
        let (_dir, db) = temp_database();
        let controller = frustrated_learner(db.clone());
        let mut events = controller.subscribe();

        let session = controller.start_session(Some("thermodynamics".into())).await.unwrap();
        assert!(matches!(events.recv().await.unwrap(), SessionEvent::Started { .. }));
        assert!(wait_for_emotion(&controller, EmotionLabel::Frustrated).await);

        record_tick(&controller.services, &session, Utc::now()).await;

        match events.recv().await.unwrap() {
            SessionEvent::EmotionUpdated { emotion, degraded, .. } => {
                assert_eq!(emotion, EmotionLabel::Frustrated);
                assert!(!degraded);
            }
            other => panic!("unexpected event {other:?}"),
        }
        match events.recv().await.unwrap() {
            SessionEvent::Intervention { intervention, intervention_id, .. } => {
                assert_eq!(intervention.intervention_type, "break");
                assert!(intervention_id.is_some());
            }
            other => panic!("unexpected event {other:?}"),
        }

        // Second tick lands inside the cooldown: logged, but no new intervention.
        record_tick(&controller.services, &session, Utc::now()).await;

        let summary = controller.end_session().await.unwrap();
        assert_eq!(summary.session.status, StudySessionStatus::Completed);
        assert_eq!(summary.stats.total_interventions, 1);
        assert_eq!(summary.stats.count(EmotionLabel::Frustrated), 1);

        assert_eq!(db.get_emotion_history(&session.id, 10).await.unwrap().len(), 2);
        let interventions = db.get_interventions_for_session(&session.id).await.unwrap();
        assert_eq!(interventions.len(), 1);
        assert!(interventions[0].emotion_log_id.is_some());

        let stored = db.get_study_session(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, StudySessionStatus::Completed);
        assert!(controller.current_session().await.is_none());
        assert!(!controller.services.fusion.is_running().await);
    }

    #[tokio::test]
    async fn unavailable_sensor_interrupts_session() {
        let (_dir, db) = temp_database();
        let controller = controller_with(
            db.clone(),
            ScriptedClassifier::new(DeviceProbe::default(), vec![Ok(RawSample::new("happy", 0.9))]),
            ScriptedClassifier::unavailable(DeviceProbe::default()),
        );

        assert!(controller.start_session(None).await.is_err());
        assert!(controller.current_session().await.is_none());

        let interrupted: i64 = db
            .execute(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM study_sessions WHERE status = 'Interrupted'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(interrupted, 1);
        assert!(db.get_incomplete_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn one_session_at_a_time_and_cancel_is_idempotent() {
        let (_dir, db) = temp_database();
        let controller = frustrated_learner(db.clone());

        assert!(controller.end_session().await.is_err());
        controller.cancel_session().await.unwrap();

        let session = controller.start_session(None).await.unwrap();
        assert!(controller.start_session(None).await.is_err());
        assert_eq!(controller.current_session().await.map(|s| s.id), Some(session.id.clone()));

        controller.cancel_session().await.unwrap();
        controller.cancel_session().await.unwrap();

        let stored = db.get_study_session(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, StudySessionStatus::Cancelled);

        // A fresh session starts with fresh adaptive stats.
        controller.start_session(None).await.unwrap();
        assert_eq!(controller.services.adaptive.get_session_stats().total_interventions, 0);
        controller.end_session().await.unwrap();
    }

    #[tokio::test]
    async fn recovery_marks_leftover_session_interrupted() {
        let (_dir, db) = temp_database();
        assert!(recover_incomplete_session(&db).await.unwrap().is_none());

        let leftover = StudySession::begin(Some("history".into()), Utc::now());
        db.insert_study_session(&leftover).await.unwrap();

        let recovered = recover_incomplete_session(&db).await.unwrap().unwrap();
        assert_eq!(recovered.id, leftover.id);
        assert_eq!(recovered.status, StudySessionStatus::Interrupted);

        let stored = db.get_study_session(&leftover.id).await.unwrap().unwrap();
        assert_eq!(stored.status, StudySessionStatus::Interrupted);
        assert!(db.get_incomplete_session().await.unwrap().is_none());
    }
}
