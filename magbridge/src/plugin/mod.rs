//! Magnetometer plugin operations.
//!
//! [`Magnetometer`] is the device half of the plugin: it executes shell
//! invocations against the platform sensor services and reports every
//! result on the outbound response channel. The ground rules:
//!
//! - One-shot reads run on spawned tasks with a timeout, so a stalled
//!   sensor fails that caller instead of blocking dispatch
//! - Continuous watches occupy one slot per kind; a newer watch replaces
//!   the older one
//! - Calibration queries are served from a cache fed by heading updates,
//!   never by waking the sensor

mod watch;

use std::sync::{Arc, RwLock};

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use watch::{FieldForwarder, HeadingForwarder, WatchSlot};

use crate::bridge::{Action, CallbackId, Invocation, PluginResponse};
use crate::config::{BridgeConfig, WatchOptions};
use crate::error::PluginError;
use crate::platform::{
    FieldSample, HeadingUpdate, LocationService, MotionService, SampleRate,
};
use crate::reading::{FieldReading, Heading, MagnetometerInfo, SensorAccuracy};

/// Cached magnetometer calibration state.
///
/// Heading updates carry the sensor's accuracy tier; the adapter remembers
/// the most recent one so `getAccuracy` and `isCalibrationNeeded` answer
/// instantly. A device that never produced a heading reports the optimistic
/// defaults.
#[derive(Debug, Clone, Copy, Default)]
struct CalibrationState {
    accuracy: SensorAccuracy,
    needed: bool,
}

impl CalibrationState {
    fn apply(&mut self, accuracy: SensorAccuracy) {
        self.accuracy = accuracy;
        self.needed = accuracy.needs_calibration();
    }
}

/// Executes plugin operations against the platform sensor services.
pub struct Magnetometer {
    motion: Arc<dyn MotionService>,
    location: Arc<dyn LocationService>,
    response_tx: mpsc::Sender<PluginResponse>,
    config: BridgeConfig,
    calibration: Arc<RwLock<CalibrationState>>,
    field_watch: Option<WatchSlot>,
    heading_watch: Option<WatchSlot>,
}

impl Magnetometer {
    /// Create an adapter over the given sensor services.
    ///
    /// # Arguments
    ///
    /// * `motion` - Raw magnetometer service
    /// * `location` - Compass heading service
    /// * `response_tx` - Outbound channel for plugin responses
    /// * `config` - Timeouts and platform label
    pub fn new(
        motion: Arc<dyn MotionService>,
        location: Arc<dyn LocationService>,
        response_tx: mpsc::Sender<PluginResponse>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            motion,
            location,
            response_tx,
            config,
            calibration: Arc::new(RwLock::new(CalibrationState::default())),
            field_watch: None,
            heading_watch: None,
        }
    }

    /// Execute one invocation.
    ///
    /// Every invocation produces at least one response on its callback,
    /// including unknown action names, which fail with an invalid-action
    /// error rather than poisoning dispatch.
    pub async fn handle(&mut self, invocation: Invocation) {
        let Invocation {
            action,
            args,
            callback_id,
        } = invocation;

        let action = match action.parse::<Action>() {
            Ok(action) => action,
            Err(err) => {
                warn!(callback = %callback_id, "{err}");
                self.respond(PluginResponse::error(callback_id, err.payload()))
                    .await;
                return;
            }
        };

        debug!(action = %action, callback = %callback_id, "dispatching invocation");

        match action {
            Action::IsAvailable => self.is_available(callback_id).await,
            Action::GetReading => self.get_reading(callback_id).await,
            Action::GetHeading => self.get_heading(callback_id).await,
            Action::WatchReadings => self.watch_readings(callback_id, &args).await,
            Action::StopWatch => self.stop_watch(callback_id).await,
            Action::WatchHeading => self.watch_heading(callback_id, &args).await,
            Action::StopWatchHeading => self.stop_watch_heading(callback_id).await,
            Action::GetMagnetometerInfo => self.get_magnetometer_info(callback_id).await,
            Action::GetAccuracy => self.get_accuracy(callback_id).await,
            Action::IsCalibrationNeeded => self.is_calibration_needed(callback_id).await,
            Action::GetFieldStrength => self.get_field_strength(callback_id).await,
        }
    }

    /// Drop all continuous watches without responding on their callbacks.
    ///
    /// Called when the dispatch loop shuts down so no forwarding task
    /// outlives the bridge.
    pub fn reset(&mut self) {
        if let Some(slot) = self.field_watch.take() {
            debug!(callback = %slot.callback_id(), "clearing field watch");
            slot.cancel();
        }
        if let Some(slot) = self.heading_watch.take() {
            debug!(callback = %slot.callback_id(), "clearing heading watch");
            slot.cancel();
        }
    }

    async fn is_available(&self, callback_id: CallbackId) {
        let available = self.motion.is_available();
        self.respond(PluginResponse::ok(callback_id, json!(u8::from(available))))
            .await;
    }

    async fn get_reading(&self, callback_id: CallbackId) {
        let Some(updates) = self.subscribe_fields(&callback_id, SampleRate::Ui).await else {
            return;
        };
        self.spawn_field_oneshot(callback_id, updates, "magnetometer reading", |reading| {
            json!(reading)
        });
    }

    async fn get_field_strength(&self, callback_id: CallbackId) {
        let Some(updates) = self.subscribe_fields(&callback_id, SampleRate::Ui).await else {
            return;
        };
        self.spawn_field_oneshot(callback_id, updates, "field strength", |reading| {
            json!(reading.magnitude)
        });
    }

    async fn get_heading(&self, callback_id: CallbackId) {
        let Some(mut updates) = self
            .subscribe_headings(&callback_id, SampleRate::Ui)
            .await
        else {
            return;
        };

        let response_tx = self.response_tx.clone();
        let calibration = Arc::clone(&self.calibration);
        let wait = self.config.oneshot_timeout;

        tokio::spawn(async move {
            let response = match timeout(wait, updates.recv()).await {
                Ok(Some(update)) => {
                    calibration.write().unwrap().apply(update.sensor_accuracy);
                    PluginResponse::ok(callback_id, json!(Heading::from(update)))
                }
                _ => {
                    let err = PluginError::Timeout("heading");
                    PluginResponse::error(callback_id, err.payload())
                }
            };
            if response_tx.send(response).await.is_err() {
                debug!("response channel closed, dropping one-shot result");
            }
        });
    }

    async fn watch_readings(&mut self, callback_id: CallbackId, args: &[Value]) {
        let options = WatchOptions::from_args(args);
        if let Some(previous) = self.field_watch.take() {
            debug!(replaced = %previous.callback_id(), "replacing field watch");
            previous.cancel();
        }

        let Some(updates) = self.subscribe_fields(&callback_id, options.rate()).await else {
            return;
        };

        // Ack before the forwarder starts so the shell sees the watch
        // registered ahead of any data.
        self.respond(PluginResponse::no_result_keep(callback_id.clone()))
            .await;

        let forwarder =
            FieldForwarder::new(updates, self.response_tx.clone(), callback_id.clone());
        let token = CancellationToken::new();
        let task = tokio::spawn(forwarder.run(token.clone()));
        self.field_watch = Some(WatchSlot::new(callback_id, token, task));
    }

    async fn watch_heading(&mut self, callback_id: CallbackId, args: &[Value]) {
        let options = WatchOptions::from_args(args);
        if let Some(previous) = self.heading_watch.take() {
            debug!(replaced = %previous.callback_id(), "replacing heading watch");
            previous.cancel();
        }

        let Some(updates) = self
            .subscribe_headings(&callback_id, options.rate())
            .await
        else {
            return;
        };

        self.respond(PluginResponse::no_result_keep(callback_id.clone()))
            .await;

        let forwarder = HeadingForwarder::new(
            updates,
            self.response_tx.clone(),
            callback_id.clone(),
            options.filter_deg,
            Arc::clone(&self.calibration),
        );
        let token = CancellationToken::new();
        let task = tokio::spawn(forwarder.run(token.clone()));
        self.heading_watch = Some(WatchSlot::new(callback_id, token, task));
    }

    async fn stop_watch(&mut self, callback_id: CallbackId) {
        if let Err(err) = self.clear_field_watch() {
            debug!(callback = %callback_id, "{err}");
        }
        self.respond(PluginResponse::ok(callback_id, Value::Null))
            .await;
    }

    async fn stop_watch_heading(&mut self, callback_id: CallbackId) {
        if let Err(err) = self.clear_heading_watch() {
            debug!(callback = %callback_id, "{err}");
        }
        self.respond(PluginResponse::ok(callback_id, Value::Null))
            .await;
    }

    async fn get_magnetometer_info(&self, callback_id: CallbackId) {
        let available = self.motion.is_available();
        let updates = if available {
            self.motion.field_updates(SampleRate::Ui).ok()
        } else {
            None
        };

        let response_tx = self.response_tx.clone();
        let calibration = Arc::clone(&self.calibration);
        let platform = self.config.platform.clone();
        let wait = self.config.info_snapshot_timeout;

        tokio::spawn(async move {
            let reading = match updates {
                Some(mut updates) => timeout(wait, updates.recv())
                    .await
                    .ok()
                    .flatten()
                    .map(FieldReading::from),
                None => None,
            };
            let state = *calibration.read().unwrap();
            let info = MagnetometerInfo {
                is_available: available,
                accuracy: state.accuracy,
                calibration_needed: state.needed,
                platform,
                reading,
            };
            let response = PluginResponse::ok(callback_id, json!(info));
            if response_tx.send(response).await.is_err() {
                debug!("response channel closed, dropping info snapshot");
            }
        });
    }

    async fn get_accuracy(&self, callback_id: CallbackId) {
        let accuracy = self.calibration.read().unwrap().accuracy;
        self.respond(PluginResponse::ok(callback_id, json!(accuracy)))
            .await;
    }

    async fn is_calibration_needed(&self, callback_id: CallbackId) {
        let needed = self.calibration.read().unwrap().needed;
        self.respond(PluginResponse::ok(callback_id, json!(u8::from(needed))))
            .await;
    }

    /// Tear down the field watch. Reports whether one was registered.
    fn clear_field_watch(&mut self) -> Result<(), PluginError> {
        match self.field_watch.take() {
            Some(slot) => {
                slot.cancel();
                Ok(())
            }
            None => Err(PluginError::NoActiveWatch),
        }
    }

    /// Tear down the heading watch. Reports whether one was registered.
    fn clear_heading_watch(&mut self) -> Result<(), PluginError> {
        match self.heading_watch.take() {
            Some(slot) => {
                slot.cancel();
                Ok(())
            }
            None => Err(PluginError::NoActiveWatch),
        }
    }

    /// Open a field subscription, reporting failures on `callback_id`.
    async fn subscribe_fields(
        &self,
        callback_id: &CallbackId,
        rate: SampleRate,
    ) -> Option<mpsc::Receiver<FieldSample>> {
        match self.motion.field_updates(rate) {
            Ok(updates) => Some(updates),
            Err(err) => {
                let err = PluginError::from(err);
                warn!(callback = %callback_id, "field subscription failed: {err}");
                self.respond(PluginResponse::error(callback_id.clone(), err.payload()))
                    .await;
                None
            }
        }
    }

    /// Open a heading subscription, reporting failures on `callback_id`.
    async fn subscribe_headings(
        &self,
        callback_id: &CallbackId,
        rate: SampleRate,
    ) -> Option<mpsc::Receiver<HeadingUpdate>> {
        match self.location.heading_updates(rate) {
            Ok(updates) => Some(updates),
            Err(err) => {
                let err = PluginError::from(err);
                warn!(callback = %callback_id, "heading subscription failed: {err}");
                self.respond(PluginResponse::error(callback_id.clone(), err.payload()))
                    .await;
                None
            }
        }
    }

    /// Wait for one field sample on a spawned task and answer with
    /// `payload` of the reading, or a timeout error naming `what`.
    fn spawn_field_oneshot(
        &self,
        callback_id: CallbackId,
        mut updates: mpsc::Receiver<FieldSample>,
        what: &'static str,
        payload: fn(FieldReading) -> Value,
    ) {
        let response_tx = self.response_tx.clone();
        let wait = self.config.oneshot_timeout;

        tokio::spawn(async move {
            let response = match timeout(wait, updates.recv()).await {
                Ok(Some(sample)) => {
                    PluginResponse::ok(callback_id, payload(FieldReading::from(sample)))
                }
                _ => {
                    let err = PluginError::Timeout(what);
                    PluginResponse::error(callback_id, err.payload())
                }
            };
            if response_tx.send(response).await.is_err() {
                debug!("response channel closed, dropping one-shot result");
            }
        });
    }

    async fn respond(&self, response: PluginResponse) {
        if self.response_tx.send(response).await.is_err() {
            debug!("response channel closed, dropping response");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ResponseStatus;
    use crate::platform::{Authorization, PlatformError};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedMotion {
        available: bool,
        streams: Mutex<VecDeque<mpsc::Receiver<FieldSample>>>,
    }

    impl ScriptedMotion {
        fn unavailable() -> Self {
            Self {
                available: false,
                streams: Mutex::new(VecDeque::new()),
            }
        }

        fn with_streams(streams: Vec<mpsc::Receiver<FieldSample>>) -> Self {
            Self {
                available: true,
                streams: Mutex::new(streams.into()),
            }
        }
    }

    impl MotionService for ScriptedMotion {
        fn is_available(&self) -> bool {
            self.available
        }

        fn field_updates(
            &self,
            _rate: SampleRate,
        ) -> Result<mpsc::Receiver<FieldSample>, PlatformError> {
            if !self.available {
                return Err(PlatformError::Unavailable);
            }
            self.streams
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(PlatformError::Unavailable)
        }
    }

    struct ScriptedLocation {
        available: bool,
        authorization: Authorization,
        streams: Mutex<VecDeque<mpsc::Receiver<HeadingUpdate>>>,
    }

    impl ScriptedLocation {
        fn granted(streams: Vec<mpsc::Receiver<HeadingUpdate>>) -> Self {
            Self {
                available: true,
                authorization: Authorization::Granted,
                streams: Mutex::new(streams.into()),
            }
        }

        fn denied() -> Self {
            Self {
                available: true,
                authorization: Authorization::Denied,
                streams: Mutex::new(VecDeque::new()),
            }
        }
    }

    impl LocationService for ScriptedLocation {
        fn is_available(&self) -> bool {
            self.available
        }

        fn authorization(&self) -> Authorization {
            self.authorization
        }

        fn heading_updates(
            &self,
            _rate: SampleRate,
        ) -> Result<mpsc::Receiver<HeadingUpdate>, PlatformError> {
            if !self.available {
                return Err(PlatformError::Unavailable);
            }
            if self.authorization == Authorization::Denied {
                return Err(PlatformError::PermissionDenied);
            }
            self.streams
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(PlatformError::Unavailable)
        }
    }

    fn adapter(
        motion: impl MotionService + 'static,
        location: impl LocationService + 'static,
    ) -> (Magnetometer, mpsc::Receiver<PluginResponse>) {
        let config = BridgeConfig {
            oneshot_timeout: Duration::from_millis(200),
            info_snapshot_timeout: Duration::from_millis(100),
            ..BridgeConfig::default()
        };
        let (response_tx, response_rx) = mpsc::channel(32);
        let magnetometer =
            Magnetometer::new(Arc::new(motion), Arc::new(location), response_tx, config);
        (magnetometer, response_rx)
    }

    fn no_location() -> ScriptedLocation {
        ScriptedLocation::granted(Vec::new())
    }

    fn sample(x: f64, y: f64, z: f64) -> FieldSample {
        FieldSample {
            x,
            y,
            z,
            timestamp_ms: 1_000,
        }
    }

    fn heading(magnetic: f64, accuracy: SensorAccuracy) -> HeadingUpdate {
        HeadingUpdate {
            magnetic_heading: magnetic,
            true_heading: magnetic + 5.0,
            accuracy_deg: Some(15.0),
            sensor_accuracy: accuracy,
            timestamp_ms: 1_000,
        }
    }

    async fn next_response(rx: &mut mpsc::Receiver<PluginResponse>) -> PluginResponse {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    // ==== availability and unknown actions ====

    #[tokio::test]
    async fn test_is_available_reports_presence() {
        let (field_tx, field_rx) = mpsc::channel(4);
        let (mut magnetometer, mut responses) =
            adapter(ScriptedMotion::with_streams(vec![field_rx]), no_location());
        let _keep = field_tx;

        magnetometer
            .handle(Invocation::of(Action::IsAvailable, "cb-1"))
            .await;

        let response = next_response(&mut responses).await;
        assert_eq!(response.callback_id, CallbackId::new("cb-1"));
        assert_eq!(response.status, ResponseStatus::Ok);
        assert_eq!(response.payload, json!(1));
        assert!(response.is_final());
    }

    #[tokio::test]
    async fn test_is_available_reports_absence() {
        let (mut magnetometer, mut responses) =
            adapter(ScriptedMotion::unavailable(), no_location());

        magnetometer
            .handle(Invocation::of(Action::IsAvailable, "cb-1"))
            .await;

        let response = next_response(&mut responses).await;
        assert_eq!(response.payload, json!(0));
    }

    #[tokio::test]
    async fn test_unknown_action_fails_on_its_callback() {
        let (mut magnetometer, mut responses) =
            adapter(ScriptedMotion::unavailable(), no_location());

        magnetometer
            .handle(Invocation::new("selfDestruct", Vec::new(), "cb-9"))
            .await;

        let response = next_response(&mut responses).await;
        assert_eq!(response.callback_id, CallbackId::new("cb-9"));
        assert_eq!(response.status, ResponseStatus::Error);
        assert_eq!(response.payload["code"], json!(5));
        assert_eq!(
            response.payload["message"],
            json!("Invalid action: selfDestruct")
        );
    }

    // ==== one-shot reads ====

    #[tokio::test]
    async fn test_get_reading_reports_first_sample() {
        let (field_tx, field_rx) = mpsc::channel(4);
        let (mut magnetometer, mut responses) =
            adapter(ScriptedMotion::with_streams(vec![field_rx]), no_location());

        magnetometer
            .handle(Invocation::of(Action::GetReading, "cb-read"))
            .await;
        field_tx.send(sample(30.0, 0.0, 40.0)).await.unwrap();

        let response = next_response(&mut responses).await;
        assert_eq!(response.callback_id, CallbackId::new("cb-read"));
        assert_eq!(response.status, ResponseStatus::Ok);
        assert_eq!(response.payload["x"], json!(30.0));
        assert_eq!(response.payload["magnitude"], json!(50.0));
        assert!(response.is_final());
    }

    #[tokio::test]
    async fn test_get_reading_times_out_without_samples() {
        let (field_tx, field_rx) = mpsc::channel::<FieldSample>(4);
        let (mut magnetometer, mut responses) =
            adapter(ScriptedMotion::with_streams(vec![field_rx]), no_location());
        let _keep = field_tx;

        magnetometer
            .handle(Invocation::of(Action::GetReading, "cb-read"))
            .await;

        let response = next_response(&mut responses).await;
        assert_eq!(response.status, ResponseStatus::Error);
        assert_eq!(response.payload["code"], json!(2));
        assert_eq!(
            response.payload["message"],
            json!("Timeout waiting for magnetometer reading")
        );
    }

    #[tokio::test]
    async fn test_get_reading_fails_when_unavailable() {
        let (mut magnetometer, mut responses) =
            adapter(ScriptedMotion::unavailable(), no_location());

        magnetometer
            .handle(Invocation::of(Action::GetReading, "cb-read"))
            .await;

        let response = next_response(&mut responses).await;
        assert_eq!(response.status, ResponseStatus::Error);
        assert_eq!(response.payload["code"], json!(3));
        assert_eq!(response.payload["message"], json!("Magnetometer not available"));
    }

    #[tokio::test]
    async fn test_get_field_strength_reports_magnitude() {
        let (field_tx, field_rx) = mpsc::channel(4);
        let (mut magnetometer, mut responses) =
            adapter(ScriptedMotion::with_streams(vec![field_rx]), no_location());

        magnetometer
            .handle(Invocation::of(Action::GetFieldStrength, "cb-str"))
            .await;
        field_tx.send(sample(3.0, 4.0, 0.0)).await.unwrap();

        let response = next_response(&mut responses).await;
        assert_eq!(response.status, ResponseStatus::Ok);
        assert_eq!(response.payload, json!(5.0));
    }

    #[tokio::test]
    async fn test_get_field_strength_timeout_names_operation() {
        let (field_tx, field_rx) = mpsc::channel::<FieldSample>(4);
        let (mut magnetometer, mut responses) =
            adapter(ScriptedMotion::with_streams(vec![field_rx]), no_location());
        let _keep = field_tx;

        magnetometer
            .handle(Invocation::of(Action::GetFieldStrength, "cb-str"))
            .await;

        let response = next_response(&mut responses).await;
        assert_eq!(
            response.payload["message"],
            json!("Timeout waiting for field strength")
        );
    }

    // ==== headings and calibration ====

    #[tokio::test]
    async fn test_get_heading_reports_first_update() {
        let (heading_tx, heading_rx) = mpsc::channel(4);
        let (mut magnetometer, mut responses) = adapter(
            ScriptedMotion::unavailable(),
            ScriptedLocation::granted(vec![heading_rx]),
        );

        magnetometer
            .handle(Invocation::of(Action::GetHeading, "cb-head"))
            .await;
        heading_tx
            .send(heading(120.0, SensorAccuracy::High))
            .await
            .unwrap();

        let response = next_response(&mut responses).await;
        assert_eq!(response.status, ResponseStatus::Ok);
        assert_eq!(response.payload["magneticHeading"], json!(120.0));
        assert_eq!(response.payload["trueHeading"], json!(125.0));
        assert_eq!(response.payload["headingAccuracy"], json!(15.0));
    }

    #[tokio::test]
    async fn test_get_heading_denied_reports_permission_error() {
        let (mut magnetometer, mut responses) =
            adapter(ScriptedMotion::unavailable(), ScriptedLocation::denied());

        magnetometer
            .handle(Invocation::of(Action::GetHeading, "cb-head"))
            .await;

        let response = next_response(&mut responses).await;
        assert_eq!(response.status, ResponseStatus::Error);
        assert_eq!(response.payload["code"], json!(1));
        assert_eq!(
            response.payload["message"],
            json!("Location permission denied")
        );
    }

    #[tokio::test]
    async fn test_get_heading_timeout_names_operation() {
        let (heading_tx, heading_rx) = mpsc::channel::<HeadingUpdate>(4);
        let (mut magnetometer, mut responses) = adapter(
            ScriptedMotion::unavailable(),
            ScriptedLocation::granted(vec![heading_rx]),
        );
        let _keep = heading_tx;

        magnetometer
            .handle(Invocation::of(Action::GetHeading, "cb-head"))
            .await;

        let response = next_response(&mut responses).await;
        assert_eq!(response.payload["code"], json!(2));
        assert_eq!(response.payload["message"], json!("Timeout waiting for heading"));
    }

    #[tokio::test]
    async fn test_heading_result_updates_calibration_cache() {
        let (heading_tx, heading_rx) = mpsc::channel(4);
        let (mut magnetometer, mut responses) = adapter(
            ScriptedMotion::unavailable(),
            ScriptedLocation::granted(vec![heading_rx]),
        );

        magnetometer
            .handle(Invocation::of(Action::GetHeading, "cb-head"))
            .await;
        heading_tx
            .send(heading(45.0, SensorAccuracy::Low))
            .await
            .unwrap();
        next_response(&mut responses).await;

        magnetometer
            .handle(Invocation::of(Action::GetAccuracy, "cb-acc"))
            .await;
        let accuracy = next_response(&mut responses).await;
        assert_eq!(accuracy.payload, json!(1));

        magnetometer
            .handle(Invocation::of(Action::IsCalibrationNeeded, "cb-cal"))
            .await;
        let needed = next_response(&mut responses).await;
        assert_eq!(needed.payload, json!(1));
    }

    #[tokio::test]
    async fn test_calibration_defaults_are_optimistic() {
        let (mut magnetometer, mut responses) =
            adapter(ScriptedMotion::unavailable(), no_location());

        magnetometer
            .handle(Invocation::of(Action::GetAccuracy, "cb-acc"))
            .await;
        let accuracy = next_response(&mut responses).await;
        assert_eq!(accuracy.payload, json!(3));

        magnetometer
            .handle(Invocation::of(Action::IsCalibrationNeeded, "cb-cal"))
            .await;
        let needed = next_response(&mut responses).await;
        assert_eq!(needed.payload, json!(0));
    }

    // ==== watches ====

    #[tokio::test]
    async fn test_watch_readings_acks_then_streams() {
        let (field_tx, field_rx) = mpsc::channel(8);
        let (mut magnetometer, mut responses) =
            adapter(ScriptedMotion::with_streams(vec![field_rx]), no_location());

        magnetometer
            .handle(Invocation::with_args(
                Action::WatchReadings,
                vec![json!(50)],
                "cb-watch",
            ))
            .await;

        let ack = next_response(&mut responses).await;
        assert_eq!(ack.callback_id, CallbackId::new("cb-watch"));
        assert_eq!(ack.status, ResponseStatus::NoResult);
        assert!(ack.keep_callback);

        field_tx.send(sample(1.0, 2.0, 2.0)).await.unwrap();
        let first = next_response(&mut responses).await;
        assert_eq!(first.status, ResponseStatus::Ok);
        assert!(first.keep_callback);
        assert_eq!(first.payload["magnitude"], json!(3.0));

        field_tx.send(sample(0.0, 0.0, 9.0)).await.unwrap();
        let second = next_response(&mut responses).await;
        assert_eq!(second.payload["magnitude"], json!(9.0));
    }

    #[tokio::test]
    async fn test_watch_replacement_moves_stream_to_new_callback() {
        let (first_tx, first_rx) = mpsc::channel(8);
        let (second_tx, second_rx) = mpsc::channel(8);
        let (mut magnetometer, mut responses) = adapter(
            ScriptedMotion::with_streams(vec![first_rx, second_rx]),
            no_location(),
        );
        let _keep = first_tx;

        magnetometer
            .handle(Invocation::with_args(
                Action::WatchReadings,
                vec![json!(50)],
                "cb-old",
            ))
            .await;
        next_response(&mut responses).await;

        magnetometer
            .handle(Invocation::with_args(
                Action::WatchReadings,
                vec![json!(50)],
                "cb-new",
            ))
            .await;
        let ack = next_response(&mut responses).await;
        assert_eq!(ack.callback_id, CallbackId::new("cb-new"));

        second_tx.send(sample(2.0, 3.0, 6.0)).await.unwrap();
        let data = next_response(&mut responses).await;
        assert_eq!(data.callback_id, CallbackId::new("cb-new"));
        assert_eq!(data.payload["magnitude"], json!(7.0));
    }

    #[tokio::test]
    async fn test_stop_watch_is_benign_without_watch() {
        let (mut magnetometer, mut responses) =
            adapter(ScriptedMotion::unavailable(), no_location());

        assert_eq!(
            magnetometer.clear_field_watch(),
            Err(PluginError::NoActiveWatch)
        );

        magnetometer
            .handle(Invocation::of(Action::StopWatch, "cb-stop"))
            .await;
        let response = next_response(&mut responses).await;
        assert_eq!(response.status, ResponseStatus::Ok);
        assert_eq!(response.payload, Value::Null);
    }

    #[tokio::test]
    async fn test_stop_watch_ends_stream() {
        let (field_tx, field_rx) = mpsc::channel(8);
        let (mut magnetometer, mut responses) =
            adapter(ScriptedMotion::with_streams(vec![field_rx]), no_location());

        magnetometer
            .handle(Invocation::with_args(
                Action::WatchReadings,
                vec![json!(50)],
                "cb-watch",
            ))
            .await;
        next_response(&mut responses).await;

        field_tx.send(sample(1.0, 0.0, 0.0)).await.unwrap();
        next_response(&mut responses).await;

        magnetometer
            .handle(Invocation::of(Action::StopWatch, "cb-stop"))
            .await;
        let stop = next_response(&mut responses).await;
        assert_eq!(stop.callback_id, CallbackId::new("cb-stop"));
        assert_eq!(stop.status, ResponseStatus::Ok);

        // The forwarder is gone; new samples go nowhere.
        field_tx.send(sample(2.0, 0.0, 0.0)).await.unwrap();
        tokio::task::yield_now().await;
        assert!(responses.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_watch_heading_applies_filter_argument() {
        let (heading_tx, heading_rx) = mpsc::channel(8);
        let (mut magnetometer, mut responses) = adapter(
            ScriptedMotion::unavailable(),
            ScriptedLocation::granted(vec![heading_rx]),
        );

        magnetometer
            .handle(Invocation::with_args(
                Action::WatchHeading,
                vec![json!(50), json!(30)],
                "cb-compass",
            ))
            .await;
        let ack = next_response(&mut responses).await;
        assert_eq!(ack.status, ResponseStatus::NoResult);

        for degrees in [0.0, 10.0, 40.0] {
            heading_tx
                .send(heading(degrees, SensorAccuracy::High))
                .await
                .unwrap();
        }

        let first = next_response(&mut responses).await;
        assert_eq!(first.payload["magneticHeading"], json!(0.0));
        let second = next_response(&mut responses).await;
        assert_eq!(second.payload["magneticHeading"], json!(40.0));
    }

    #[tokio::test]
    async fn test_watches_are_independent() {
        let (field_tx, field_rx) = mpsc::channel(8);
        let (heading_tx, heading_rx) = mpsc::channel(8);
        let (mut magnetometer, mut responses) = adapter(
            ScriptedMotion::with_streams(vec![field_rx]),
            ScriptedLocation::granted(vec![heading_rx]),
        );

        magnetometer
            .handle(Invocation::with_args(
                Action::WatchReadings,
                vec![json!(50)],
                "cb-field",
            ))
            .await;
        next_response(&mut responses).await;

        magnetometer
            .handle(Invocation::with_args(
                Action::WatchHeading,
                vec![json!(50), json!(0)],
                "cb-compass",
            ))
            .await;
        next_response(&mut responses).await;

        magnetometer
            .handle(Invocation::of(Action::StopWatch, "cb-stop"))
            .await;
        next_response(&mut responses).await;

        heading_tx
            .send(heading(200.0, SensorAccuracy::High))
            .await
            .unwrap();
        let update = next_response(&mut responses).await;
        assert_eq!(update.callback_id, CallbackId::new("cb-compass"));
        assert_eq!(update.payload["magneticHeading"], json!(200.0));

        let _keep = field_tx;
    }

    #[tokio::test]
    async fn test_watch_readings_unavailable_reports_error() {
        let (mut magnetometer, mut responses) =
            adapter(ScriptedMotion::unavailable(), no_location());

        magnetometer
            .handle(Invocation::with_args(
                Action::WatchReadings,
                vec![json!(50)],
                "cb-watch",
            ))
            .await;

        let response = next_response(&mut responses).await;
        assert_eq!(response.status, ResponseStatus::Error);
        assert_eq!(response.payload["code"], json!(3));
        assert!(magnetometer.clear_field_watch().is_err());
    }

    // ==== device info ====

    #[tokio::test]
    async fn test_info_includes_fresh_reading() {
        let (field_tx, field_rx) = mpsc::channel(4);
        let (mut magnetometer, mut responses) =
            adapter(ScriptedMotion::with_streams(vec![field_rx]), no_location());

        magnetometer
            .handle(Invocation::of(Action::GetMagnetometerInfo, "cb-info"))
            .await;
        field_tx.send(sample(10.0, 0.0, 0.0)).await.unwrap();

        let response = next_response(&mut responses).await;
        assert_eq!(response.status, ResponseStatus::Ok);
        assert_eq!(response.payload["isAvailable"], json!(true));
        assert_eq!(response.payload["platform"], json!("simulated"));
        assert_eq!(response.payload["accuracy"], json!(3));
        assert_eq!(response.payload["calibrationNeeded"], json!(false));
        assert_eq!(response.payload["reading"]["x"], json!(10.0));
    }

    #[tokio::test]
    async fn test_info_omits_reading_when_unavailable() {
        let (mut magnetometer, mut responses) =
            adapter(ScriptedMotion::unavailable(), no_location());

        magnetometer
            .handle(Invocation::of(Action::GetMagnetometerInfo, "cb-info"))
            .await;

        let response = next_response(&mut responses).await;
        assert_eq!(response.status, ResponseStatus::Ok);
        assert_eq!(response.payload["isAvailable"], json!(false));
        assert!(response.payload.get("reading").is_none());
    }

    // ==== reset ====

    #[tokio::test]
    async fn test_reset_clears_watches_silently() {
        let (field_tx, field_rx) = mpsc::channel(8);
        let (mut magnetometer, mut responses) =
            adapter(ScriptedMotion::with_streams(vec![field_rx]), no_location());

        magnetometer
            .handle(Invocation::with_args(
                Action::WatchReadings,
                vec![json!(50)],
                "cb-watch",
            ))
            .await;
        next_response(&mut responses).await;

        magnetometer.reset();
        assert!(magnetometer.clear_field_watch().is_err());
        assert!(magnetometer.clear_heading_watch().is_err());

        field_tx.send(sample(1.0, 0.0, 0.0)).await.unwrap();
        tokio::task::yield_now().await;
        assert!(responses.try_recv().is_err());
    }
}
