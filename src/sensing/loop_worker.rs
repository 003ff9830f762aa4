use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::emotion::{EmotionReading, LabelMap, ModalityKind};

use super::{classifier::Classifier, slot::ReadingSlot};

// Set to false to silence per-tick sampling logs
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

pub(crate) type SharedClassifier = Arc<Mutex<Box<dyn Classifier>>>;

pub(crate) fn lock_classifier(
    classifier: &SharedClassifier,
) -> MutexGuard<'_, Box<dyn Classifier>> {
    classifier.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything a sampling loop needs; cloned out of the adapter at start.
pub(crate) struct SamplingContext {
    pub modality: ModalityKind,
    pub classifier: SharedClassifier,
    pub slot: ReadingSlot,
    pub label_map: LabelMap,
    pub interval: Duration,
    pub sample_timeout: Duration,
}

pub(crate) async fn sampling_loop(ctx: SamplingContext, cancel_token: CancellationToken) {
    let mut ticker = tokio::time::interval(ctx.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => break,
                    outcome = tokio::time::timeout(ctx.sample_timeout, take_sample(&ctx)) => outcome,
                };

                match outcome {
                    Ok(Ok(Some(reading))) => {
                        log_debug!(
                            "{} sample: {} ({:.2})",
                            ctx.modality,
                            reading.label,
                            reading.confidence
                        );
                        ctx.slot.publish(reading);
                    }
                    Ok(Ok(None)) => {}
                    Ok(Err(err)) => {
                        let streak = ctx.slot.record_failure(format!("{err:#}"));
                        log_warn!("{} sample failed ({streak} in a row): {err:#}", ctx.modality);
                    }
                    Err(_) => {
                        let streak = ctx.slot.record_failure("sample timed out");
                        log_warn!(
                            "{} sample timeout (> {}ms, {streak} in a row)",
                            ctx.modality,
                            ctx.sample_timeout.as_millis()
                        );
                    }
                }
            }
        }
    }

    release_device(ctx.modality, &ctx.classifier).await;
    log_info!("{} sampling loop shut down", ctx.modality);
}

/// Runs one classifier call off the runtime and translates its label.
/// `Ok(None)` means the classifier answered with a label we cannot map.
async fn take_sample(ctx: &SamplingContext) -> Result<Option<EmotionReading>> {
    let classifier = Arc::clone(&ctx.classifier);
    let raw = tokio::task::spawn_blocking(move || lock_classifier(&classifier).sample())
        .await
        .context("classifier worker join failed")??;

    let label = match ctx.label_map.translate(&raw.label) {
        Ok(label) => label,
        Err(err) => {
            log_warn!("{} classifier produced unmappable label: {err}", ctx.modality);
            return Ok(None);
        }
    };

    EmotionReading::new(label, raw.confidence, ctx.modality, Utc::now())
        .map(Some)
        .map_err(|err| anyhow!(err))
}

/// Closes the device. Waits for any in-flight sample, since that holds the classifier.
pub(crate) async fn release_device(modality: ModalityKind, classifier: &SharedClassifier) {
    let classifier = Arc::clone(classifier);
    if let Err(err) = tokio::task::spawn_blocking(move || lock_classifier(&classifier).close()).await
    {
        log_error!("{modality} device release failed to join: {err}");
    }
}
