use std::sync::{Arc, Mutex};

use log::{error, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    emotion::{EmotionReading, ModalityKind},
    error::SensingError,
};

use super::{
    classifier::Classifier,
    config::AdapterConfig,
    loop_worker::{lock_classifier, release_device, sampling_loop, SamplingContext, SharedClassifier},
    slot::ReadingSlot,
};

/// Owns one classifier, its sampling loop and the latest-reading slot.
pub struct ModalityAdapter {
    modality: ModalityKind,
    config: AdapterConfig,
    classifier: SharedClassifier,
    slot: ReadingSlot,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl ModalityAdapter {
    pub fn new(modality: ModalityKind, classifier: Box<dyn Classifier>, config: AdapterConfig) -> Self {
        Self {
            modality,
            config,
            classifier: Arc::new(Mutex::new(classifier)),
            slot: ReadingSlot::new(modality),
            handle: None,
            cancel_token: None,
        }
    }

    pub fn modality(&self) -> ModalityKind {
        self.modality
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Handle to the latest-reading slot for readers on other tasks.
    pub fn slot(&self) -> ReadingSlot {
        self.slot.clone()
    }

    /// Opens the device and spawns the sampling loop. A running adapter is left as is.
    pub async fn start(&mut self) -> Result<(), SensingError> {
        if self.handle.is_some() {
            return Ok(());
        }

        let classifier = Arc::clone(&self.classifier);
        let opened = tokio::task::spawn_blocking(move || lock_classifier(&classifier).open()).await;

        let failure = match opened {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(format!("{err:#}")),
            Err(join_err) => Some(format!("device open worker failed: {join_err}")),
        };

        if let Some(reason) = failure {
            // A half-opened device is still a held device.
            release_device(self.modality, &self.classifier).await;
            warn!("{} adapter could not start: {reason}", self.modality);
            return Err(SensingError::AdapterUnavailable {
                modality: self.modality,
                reason,
            });
        }

        self.slot.clear();

        let cancel_token = CancellationToken::new();
        let ctx = SamplingContext {
            modality: self.modality,
            classifier: Arc::clone(&self.classifier),
            slot: self.slot.clone(),
            label_map: self.config.label_map.clone(),
            interval: self.config.sample_interval(),
            sample_timeout: self.config.sample_timeout(),
        };

        self.handle = Some(tokio::spawn(sampling_loop(ctx, cancel_token.clone())));
        self.cancel_token = Some(cancel_token);

        info!(
            "{} adapter started (every {}ms)",
            self.modality, self.config.sample_interval_ms
        );
        Ok(())
    }

    /// Cancels the loop and waits for it to release the device. Safe to call repeatedly.
    pub async fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        let Some(handle) = self.handle.take() else {
            return;
        };

        match tokio::time::timeout(self.config.stop_grace(), handle).await {
            Ok(Ok(())) => info!("{} adapter stopped", self.modality),
            Ok(Err(join_err)) => {
                error!("{} sampling loop failed: {join_err}", self.modality);
                release_device(self.modality, &self.classifier).await;
            }
            Err(_) => warn!(
                "{} adapter still busy after {}ms; device closes once the in-flight sample returns",
                self.modality, self.config.stop_grace_ms
            ),
        }
    }

    /// Most recent reading without waiting on the sampling loop.
    pub fn get_current_emotion(&self) -> Result<Option<EmotionReading>, SensingError> {
        self.slot.load()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.slot.consecutive_failures()
    }
}

impl Drop for ModalityAdapter {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}
