//! Bridge lifecycle facade.
//!
//! [`MagnetometerBridge`] wires the plugin adapter to its channels and owns
//! the dispatch task. Callers queue work with [`MagnetometerBridge::invoke`],
//! consume results from the response receiver handed back by `start`, and
//! tear everything down with [`MagnetometerBridge::shutdown`].

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bridge::{Invocation, PluginResponse};
use crate::config::BridgeConfig;
use crate::platform::{LocationService, MotionService, SimulatedPlatform};
use crate::plugin::Magnetometer;

/// Errors from driving a bridge handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The dispatch task is no longer accepting invocations.
    #[error("bridge dispatch is not running")]
    Closed,
}

/// A running magnetometer bridge.
///
/// Invocations are processed in arrival order by a single dispatch task,
/// and every response travels through the one receiver returned from
/// [`MagnetometerBridge::start`], preserving the per-callback ordering the
/// shell contract requires.
pub struct MagnetometerBridge {
    invocation_tx: mpsc::Sender<Invocation>,
    cancellation: CancellationToken,
    dispatch: JoinHandle<()>,
}

impl MagnetometerBridge {
    /// Start a bridge over the given platform services.
    ///
    /// Returns the bridge handle together with the response stream.
    ///
    /// # Arguments
    ///
    /// * `motion` - Raw magnetometer service
    /// * `location` - Compass heading service
    /// * `config` - Timeouts, channel capacity and platform label
    pub fn start(
        motion: Arc<dyn MotionService>,
        location: Arc<dyn LocationService>,
        config: BridgeConfig,
    ) -> (Self, mpsc::Receiver<PluginResponse>) {
        info!("Starting magnetometer bridge");

        let (invocation_tx, mut invocation_rx) = mpsc::channel(config.response_capacity);
        let (response_tx, response_rx) = mpsc::channel(config.response_capacity);
        let cancellation = CancellationToken::new();

        let mut plugin = Magnetometer::new(motion, location, response_tx, config);
        let shutdown = cancellation.clone();
        let dispatch = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    _ = shutdown.cancelled() => {
                        info!("Dispatch loop shutting down");
                        break;
                    }

                    invocation = invocation_rx.recv() => match invocation {
                        Some(invocation) => plugin.handle(invocation).await,
                        None => {
                            debug!("Invocation channel closed, dispatch ending");
                            break;
                        }
                    },
                }
            }
            plugin.reset();
        });

        (
            Self {
                invocation_tx,
                cancellation,
                dispatch,
            },
            response_rx,
        )
    }

    /// Start a bridge backed by the simulated platform.
    pub fn start_simulated(
        platform: SimulatedPlatform,
        config: BridgeConfig,
    ) -> (Self, mpsc::Receiver<PluginResponse>) {
        let platform = Arc::new(platform);
        Self::start(
            Arc::clone(&platform) as Arc<dyn MotionService>,
            platform,
            config,
        )
    }

    /// Queue one invocation for dispatch.
    pub async fn invoke(&self, invocation: Invocation) -> Result<(), BridgeError> {
        self.invocation_tx
            .send(invocation)
            .await
            .map_err(|_| BridgeError::Closed)
    }

    /// Stop dispatch and tear down any active watches.
    pub async fn shutdown(self) {
        info!("Shutting down magnetometer bridge");

        self.cancellation.cancel();
        if self.dispatch.await.is_err() {
            warn!("Dispatch task ended abnormally");
        }

        info!("Magnetometer bridge shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{Action, CallbackId, ResponseStatus};
    use crate::platform::SimulatedPlatformConfig;
    use std::time::Duration;
    use tokio::time::timeout;

    fn started() -> (MagnetometerBridge, mpsc::Receiver<PluginResponse>) {
        let platform = SimulatedPlatform::new(SimulatedPlatformConfig::default());
        MagnetometerBridge::start_simulated(platform, BridgeConfig::default())
    }

    async fn next_response(rx: &mut mpsc::Receiver<PluginResponse>) -> PluginResponse {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_bridge_round_trips_an_invocation() {
        let (bridge, mut responses) = started();

        bridge
            .invoke(Invocation::of(Action::IsAvailable, "cb-1"))
            .await
            .unwrap();

        let response = next_response(&mut responses).await;
        assert_eq!(response.callback_id, CallbackId::new("cb-1"));
        assert_eq!(response.status, ResponseStatus::Ok);
        assert_eq!(response.payload, serde_json::json!(1));

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_bridge_serves_sensor_data() {
        let (bridge, mut responses) = started();

        bridge
            .invoke(Invocation::of(Action::GetReading, "cb-read"))
            .await
            .unwrap();

        let response = next_response(&mut responses).await;
        assert_eq!(response.status, ResponseStatus::Ok);
        let magnitude = response.payload["magnitude"].as_f64().unwrap();
        assert!(magnitude > 0.0);

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_ends_response_stream() {
        let (bridge, mut responses) = started();

        bridge
            .invoke(Invocation::with_args(
                Action::WatchReadings,
                vec![serde_json::json!(20)],
                "cb-watch",
            ))
            .await
            .unwrap();
        next_response(&mut responses).await;

        timeout(Duration::from_secs(2), bridge.shutdown())
            .await
            .unwrap();

        // Buffered watch data may remain; the stream itself must end.
        let drained = timeout(Duration::from_secs(2), async {
            while responses.recv().await.is_some() {}
        })
        .await;
        assert!(drained.is_ok());
    }

    #[tokio::test]
    async fn test_invoke_fails_once_dispatch_is_gone() {
        let (mut bridge, _responses) = started();

        bridge.dispatch.abort();
        let _ = (&mut bridge.dispatch).await;

        let result = bridge.invoke(Invocation::of(Action::IsAvailable, "cb-1")).await;
        assert_eq!(result, Err(BridgeError::Closed));
    }
}
