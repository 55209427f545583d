//! Continuous watch machinery.
//!
//! A watch pairs a platform subscription with a forwarding task that turns
//! samples into keep-alive responses on the watch's callback:
//!
//! - [`WatchSlot`]: a registered watch and its teardown handles
//! - [`FieldForwarder`]: pumps raw field samples to a callback
//! - [`HeadingForwarder`]: pumps headings, applying the change filter and
//!   refreshing the cached calibration state
//!
//! The adapter holds at most one slot per watch kind; registering a new
//! watch cancels the previous slot before the new forwarder starts.

use std::sync::{Arc, RwLock};

use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::CalibrationState;
use crate::bridge::{CallbackId, PluginResponse};
use crate::platform::fusion::angular_difference;
use crate::platform::{FieldSample, HeadingUpdate};
use crate::reading::{FieldReading, Heading};

/// A registered continuous watch.
#[derive(Debug)]
pub(super) struct WatchSlot {
    callback_id: CallbackId,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl WatchSlot {
    pub(super) fn new(
        callback_id: CallbackId,
        token: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            callback_id,
            token,
            task,
        }
    }

    /// Callback channel this watch reports on.
    pub(super) fn callback_id(&self) -> &CallbackId {
        &self.callback_id
    }

    /// Stop the forwarding task. No further update reaches the callback
    /// once this returns.
    pub(super) fn cancel(self) {
        self.token.cancel();
        self.task.abort();
    }
}

/// Forwards raw field samples to a watch callback.
pub(super) struct FieldForwarder {
    updates: mpsc::Receiver<FieldSample>,
    response_tx: mpsc::Sender<PluginResponse>,
    callback_id: CallbackId,
}

impl FieldForwarder {
    pub(super) fn new(
        updates: mpsc::Receiver<FieldSample>,
        response_tx: mpsc::Sender<PluginResponse>,
        callback_id: CallbackId,
    ) -> Self {
        Self {
            updates,
            response_tx,
            callback_id,
        }
    }

    /// Pump samples until cancelled or the stream ends.
    pub(super) async fn run(mut self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                sample = self.updates.recv() => match sample {
                    Some(sample) => {
                        let reading = FieldReading::from(sample);
                        let response =
                            PluginResponse::ok_keep(self.callback_id.clone(), json!(reading));
                        if self.response_tx.send(response).await.is_err() {
                            debug!(callback = %self.callback_id, "response channel closed, field watch ending");
                            break;
                        }
                    }
                    None => {
                        debug!(callback = %self.callback_id, "field stream ended");
                        break;
                    }
                },
            }
        }
    }
}

/// Forwards heading updates to a watch callback.
///
/// Every update refreshes the shared calibration cache, including updates
/// the change filter then suppresses.
pub(super) struct HeadingForwarder {
    updates: mpsc::Receiver<HeadingUpdate>,
    response_tx: mpsc::Sender<PluginResponse>,
    callback_id: CallbackId,
    filter_deg: f64,
    calibration: Arc<RwLock<CalibrationState>>,
    last_delivered: Option<f64>,
}

impl HeadingForwarder {
    pub(super) fn new(
        updates: mpsc::Receiver<HeadingUpdate>,
        response_tx: mpsc::Sender<PluginResponse>,
        callback_id: CallbackId,
        filter_deg: f64,
        calibration: Arc<RwLock<CalibrationState>>,
    ) -> Self {
        Self {
            updates,
            response_tx,
            callback_id,
            filter_deg,
            calibration,
            last_delivered: None,
        }
    }

    /// Pump headings until cancelled or the stream ends.
    pub(super) async fn run(mut self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                update = self.updates.recv() => match update {
                    Some(update) => {
                        if !self.handle_update(update).await {
                            break;
                        }
                    }
                    None => {
                        debug!(callback = %self.callback_id, "heading stream ended");
                        break;
                    }
                },
            }
        }
    }

    /// Process one update; returns `false` when the watch should end.
    async fn handle_update(&mut self, update: HeadingUpdate) -> bool {
        self.calibration
            .write()
            .unwrap()
            .apply(update.sensor_accuracy);

        if let Some(previous) = self.last_delivered {
            if angular_difference(update.magnetic_heading, previous) < self.filter_deg {
                return true;
            }
        }
        self.last_delivered = Some(update.magnetic_heading);

        let heading = Heading::from(update);
        let response = PluginResponse::ok_keep(self.callback_id.clone(), json!(heading));
        if self.response_tx.send(response).await.is_err() {
            debug!(callback = %self.callback_id, "response channel closed, heading watch ending");
            return false;
        }
        true
    }
}
