//! Asynchronous forecast pipeline
//!
//! The game loop pushes one feature vector per frame. Once the window is full
//! it offers a snapshot to a dedicated worker thread through a single-slot
//! inbox: if the worker has not picked up the previous window yet, the new
//! one is dropped rather than queued. The worker runs the model and publishes
//! the latest forecast, which the loop reads without blocking.
//!
//! The frame loop never waits on inference, and no lock is held while the
//! model runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::model::{Forecaster, TcnModel};
use super::window::{FeatureVector, FeatureWindow};
use crate::settings::PredictionSettings;

/// Latest published forecast
///
/// Stored as one atomic word: the high half flags presence, the low half holds
/// the f32 bits, so readers see either the old or the new value in full.
#[derive(Debug, Default)]
pub struct ForecastSlot {
    bits: AtomicU64,
}

impl ForecastSlot {
    const PRESENT: u64 = 1 << 32;

    pub fn publish(&self, value: f32) {
        self.bits
            .store(Self::PRESENT | u64::from(value.to_bits()), Ordering::Release);
    }

    pub fn load(&self) -> Option<f32> {
        let bits = self.bits.load(Ordering::Acquire);
        (bits & Self::PRESENT != 0).then(|| f32::from_bits(bits as u32))
    }
}

/// What happened to a pushed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Pipeline is disabled; nothing was recorded
    Disabled,
    /// Window still filling
    Buffered,
    /// Full window handed to the worker
    Sent,
    /// Worker inbox was occupied; this window was discarded
    Dropped,
}

/// Producer handle owned by the game loop
pub struct PredictionPipeline {
    window: FeatureWindow,
    inbox: Option<SyncSender<Vec<FeatureVector>>>,
    forecast: Arc<ForecastSlot>,
    /// Set by the producer on send, cleared by the worker on receipt
    busy: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl PredictionPipeline {
    /// Load the model artifact and start the worker, or come up disabled
    pub fn from_settings(settings: &PredictionSettings, screen_height: f32) -> Self {
        match TcnModel::load(&settings.model_path, settings.sequence_length) {
            Ok(model) => Self::spawn(Box::new(model), settings, screen_height),
            Err(err) => {
                log::warn!("Forecasting disabled: {err}");
                Self::disabled(settings.sequence_length)
            }
        }
    }

    /// A pipeline that never forecasts and does no bookkeeping
    pub fn disabled(sequence_length: usize) -> Self {
        Self {
            window: FeatureWindow::new(sequence_length),
            inbox: None,
            forecast: Arc::new(ForecastSlot::default()),
            busy: Arc::new(AtomicBool::new(false)),
            stop: Arc::new(AtomicBool::new(true)),
            worker: None,
        }
    }

    /// Start a worker that owns `model`; raw outputs are scaled by `screen_height`
    pub fn spawn(
        model: Box<dyn Forecaster>,
        settings: &PredictionSettings,
        screen_height: f32,
    ) -> Self {
        let (inbox, rx) = mpsc::sync_channel(1);
        let forecast = Arc::new(ForecastSlot::default());
        let busy = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));

        let worker = Worker {
            model,
            inbox: rx,
            forecast: Arc::clone(&forecast),
            busy: Arc::clone(&busy),
            stop: Arc::clone(&stop),
            poll: Duration::from_millis(settings.poll_timeout_ms.max(1)),
            scale: screen_height,
        };

        let handle = thread::Builder::new()
            .name("forecast-worker".into())
            .spawn(move || worker.run());

        match handle {
            Ok(handle) => Self {
                window: FeatureWindow::new(settings.sequence_length),
                inbox: Some(inbox),
                forecast,
                busy,
                stop,
                worker: Some(handle),
            },
            Err(err) => {
                log::warn!("Forecasting disabled, could not start worker: {err}");
                Self::disabled(settings.sequence_length)
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inbox.is_some()
    }

    /// Record this frame's features and offer a full window to the worker
    pub fn push(&mut self, features: FeatureVector) -> Offer {
        let Some(inbox) = &self.inbox else {
            return Offer::Disabled;
        };

        self.window.push(features);
        if !self.window.is_full() {
            return Offer::Buffered;
        }

        // An occupied inbox drops the window before it is copied
        if self.busy.swap(true, Ordering::AcqRel) {
            return Offer::Dropped;
        }
        match inbox.try_send(self.window.snapshot()) {
            Ok(()) => Offer::Sent,
            Err(TrySendError::Full(_)) => Offer::Dropped,
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("Forecast worker exited, disabling pipeline");
                self.inbox = None;
                Offer::Disabled
            }
        }
    }

    /// Most recent forecast in screen pixels; never blocks
    pub fn forecast(&self) -> Option<f32> {
        self.forecast.load()
    }

    /// Signal the worker and wait for it to finish its current cycle
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.inbox = None;
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("Forecast worker panicked");
            }
        }
    }
}

impl Drop for PredictionPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for PredictionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionPipeline")
            .field("enabled", &self.is_enabled())
            .field("buffered", &self.window.len())
            .field("forecast", &self.forecast())
            .finish()
    }
}

/// Consumer side, moved onto the worker thread
struct Worker {
    model: Box<dyn Forecaster>,
    inbox: Receiver<Vec<FeatureVector>>,
    forecast: Arc<ForecastSlot>,
    busy: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    poll: Duration,
    scale: f32,
}

impl Worker {
    fn run(mut self) {
        log::debug!("Forecast worker started");
        while !self.stop.load(Ordering::Acquire) {
            let window = match self.inbox.recv_timeout(self.poll) {
                Ok(window) => window,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };
            self.busy.store(false, Ordering::Release);

            match self.model.forecast(&window) {
                // A stop raised mid-inference discards the result
                Ok(_) if self.stop.load(Ordering::Acquire) => break,
                Ok(raw) if !raw.is_finite() => {
                    log::warn!("Forecast failed, keeping previous value: model returned {raw}")
                }
                Ok(raw) => self.forecast.publish(raw * self.scale),
                Err(err) => log::warn!("Forecast failed, keeping previous value: {err}"),
            }
        }
        log::debug!("Forecast worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::FEATURE_COUNT;
    use crate::error::ModelError;
    use std::sync::mpsc::Sender;
    use std::time::Instant;

    fn settings(sequence_length: usize) -> PredictionSettings {
        PredictionSettings {
            sequence_length,
            poll_timeout_ms: 10,
            ..PredictionSettings::default()
        }
    }

    fn frame(v: f32) -> FeatureVector {
        [v; FEATURE_COUNT]
    }

    /// Poll until the forecast satisfies `pred` or time runs out
    fn wait_for(pipeline: &PredictionPipeline, pred: impl Fn(Option<f32>) -> bool) -> Option<f32> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let value = pipeline.forecast();
            if pred(value) || Instant::now() > deadline {
                return value;
            }
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_slot_starts_absent() {
        let slot = ForecastSlot::default();
        assert_eq!(slot.load(), None);
        slot.publish(0.0);
        assert_eq!(slot.load(), Some(0.0));
        slot.publish(-12.5);
        assert_eq!(slot.load(), Some(-12.5));
    }

    #[test]
    fn test_disabled_pipeline_does_nothing() {
        let mut pipeline = PredictionPipeline::disabled(3);
        for i in 0..10 {
            assert_eq!(pipeline.push(frame(i as f32)), Offer::Disabled);
        }
        assert!(!pipeline.is_enabled());
        assert_eq!(pipeline.window.len(), 0, "no window bookkeeping");
        assert_eq!(pipeline.forecast(), None);
    }

    #[test]
    fn test_missing_model_disables_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PredictionSettings {
            model_path: dir.path().join("absent.json"),
            ..settings(30)
        };
        let pipeline = PredictionPipeline::from_settings(&settings, 600.0);
        assert!(!pipeline.is_enabled());
        assert_eq!(pipeline.forecast(), None);
    }

    #[test]
    fn test_forecast_is_scaled_to_screen() {
        let model = |window: &[FeatureVector]| -> Result<f32, ModelError> {
            Ok(window[window.len() - 1][5])
        };
        let mut pipeline = PredictionPipeline::spawn(Box::new(model), &settings(3), 600.0);
        assert_eq!(pipeline.forecast(), None, "absent before first inference");

        assert_eq!(pipeline.push(frame(0.1)), Offer::Buffered);
        assert_eq!(pipeline.push(frame(0.2)), Offer::Buffered);
        assert_eq!(pipeline.push(frame(0.5)), Offer::Sent);

        let value = wait_for(&pipeline, |v| v.is_some());
        assert_eq!(value, Some(300.0));
        pipeline.stop();
    }

    #[test]
    fn test_model_errors_keep_stale_forecast() {
        let model = |window: &[FeatureVector]| -> Result<f32, ModelError> {
            let last = window[window.len() - 1][0];
            if last < 0.0 {
                Err(ModelError::NonFinite)
            } else {
                Ok(last)
            }
        };
        let mut pipeline = PredictionPipeline::spawn(Box::new(model), &settings(1), 100.0);

        pipeline.push(frame(0.25));
        assert_eq!(wait_for(&pipeline, |v| v.is_some()), Some(25.0));

        // Failing cycle, then a good one: the stale value survives in between
        wait_until_sent(&mut pipeline, frame(-1.0));
        assert_eq!(pipeline.forecast(), Some(25.0));
        wait_until_sent(&mut pipeline, frame(0.75));
        assert_eq!(wait_for(&pipeline, |v| v == Some(75.0)), Some(75.0));
    }

    #[test]
    fn test_non_finite_output_keeps_stale_forecast() {
        let model = |window: &[FeatureVector]| -> Result<f32, ModelError> {
            let last = window[window.len() - 1][0];
            Ok(if last < 0.0 { f32::NAN } else if last > 1.0 { f32::INFINITY } else { last })
        };
        let mut pipeline = PredictionPipeline::spawn(Box::new(model), &settings(1), 100.0);

        pipeline.push(frame(0.5));
        assert_eq!(wait_for(&pipeline, |v| v.is_some()), Some(50.0));

        wait_until_sent(&mut pipeline, frame(-1.0));
        wait_until_sent(&mut pipeline, frame(2.0));
        assert_eq!(pipeline.forecast(), Some(50.0));
        wait_until_sent(&mut pipeline, frame(0.25));
        assert_eq!(wait_for(&pipeline, |v| v == Some(25.0)), Some(25.0));
        pipeline.stop();
    }

    fn wait_until_sent(pipeline: &mut PredictionPipeline, features: FeatureVector) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while pipeline.push(features) != Offer::Sent && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
    }

    /// Forecaster that reports each window it starts on and then blocks until released
    fn stalled_model(
        started: Sender<Vec<FeatureVector>>,
        release: Receiver<()>,
    ) -> impl FnMut(&[FeatureVector]) -> Result<f32, ModelError> + Send {
        move |window: &[FeatureVector]| {
            let _ = started.send(window.to_vec());
            let _ = release.recv();
            Ok(window[window.len() - 1][0])
        }
    }

    #[test]
    fn test_full_inbox_drops_new_window() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let model = stalled_model(started_tx, release_rx);
        let mut pipeline = PredictionPipeline::spawn(Box::new(model), &settings(2), 1.0);

        pipeline.push(frame(1.0));
        assert_eq!(pipeline.push(frame(2.0)), Offer::Sent);

        // Worker is now stuck inside inference on [1, 2]
        let first = started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first, vec![frame(1.0), frame(2.0)]);

        // Inbox is empty again: [2, 3] is accepted and waits there
        assert_eq!(pipeline.push(frame(3.0)), Offer::Sent);
        // Inbox occupied: [3, 4] and [4, 5] are dropped, never queued
        assert_eq!(pipeline.push(frame(4.0)), Offer::Dropped);
        assert_eq!(pipeline.push(frame(5.0)), Offer::Dropped);
        assert!(pipeline.busy.load(Ordering::Acquire), "slot still taken by [2, 3]");

        // The frame loop was never blocked and nothing was published yet
        assert_eq!(pipeline.forecast(), None);

        release_tx.send(()).unwrap();
        let second = started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(second, vec![frame(2.0), frame(3.0)], "inbox contents unchanged");
        release_tx.send(()).unwrap();

        assert_eq!(wait_for(&pipeline, |v| v == Some(3.0)), Some(3.0));
        assert!(
            started_rx.recv_timeout(Duration::from_millis(50)).is_err(),
            "dropped windows never reach the model"
        );
        pipeline.stop();
    }

    #[test]
    fn test_stop_discards_in_flight_result() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let model = stalled_model(started_tx, release_rx);
        let mut pipeline = PredictionPipeline::spawn(Box::new(model), &settings(1), 1.0);

        assert_eq!(pipeline.push(frame(9.0)), Offer::Sent);
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // Raise the flag while inference is running, then let it finish
        pipeline.stop.store(true, Ordering::Release);
        release_tx.send(()).unwrap();
        pipeline.stop();

        assert_eq!(pipeline.forecast(), None);
        assert!(!pipeline.is_enabled());
        assert_eq!(pipeline.push(frame(1.0)), Offer::Disabled);
    }
}
