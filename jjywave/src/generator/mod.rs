//! Generator control surface
//!
//! [`Generator`] ties a [`Clock`], an [`AudioSink`] and the core scheduler
//! together. `start` and `stop` return immediately; the outcome arrives as a
//! [`GeneratorEvent`] on the receiver returned by [`Generator::new`].
//!
//! Configuration may be read and changed at any time. Changes to the sample
//! rate or channel count are refused while a transmission is active; every
//! other change is stored at once and heard from the next rendered second
//! (carrier) or the next frame (encoding).

mod events;
mod metrics;
mod state;
mod transmitter;


use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use jjywave_core::{
    CarrierBand, CarrierConfiguration, Clock, ConfigError, EncodingOptions, Frame,
    GeneratorConfig, LeapSecondPlan, SchedulerTolerances, ServiceStatusBits, TransmissionScheduler,
    WaveformShape,
};
use tracing::{debug, error, warn};

pub use events::{GeneratorDelegate, GeneratorEvent, dispatch, spawn_delegate_dispatcher};

use state::{GeneratorInner, Phase, Shared};
use transmitter::Transmitter;

use crate::sink::AudioSink;

/// Configuration fields refused by [`Generator::apply_configuration`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("configuration rejected: {}", .fields.join(", "))]
pub struct RejectedFields {
    pub fields: Vec<&'static str>,
}

/// Errors from individual configuration setters
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The field cannot change while transmitting; stop first
    #[error("{0} cannot be changed while transmitting")]
    ActiveTransmission(&'static str),

    /// The new value is unusable
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

/// A JJY signal generator
pub struct Generator {
    inner: Arc<GeneratorInner>,
}

impl Generator {
    /// Create an idle generator
    ///
    /// Events are delivered on the returned receiver; drain it on whichever
    /// thread should see them, or hand it to [`spawn_delegate_dispatcher`].
    pub fn new(
        config: GeneratorConfig,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn AudioSink>,
    ) -> (Self, Receiver<GeneratorEvent>) {
        Self::with_tolerances(config, clock, sink, SchedulerTolerances::default())
    }

    pub fn with_tolerances(
        config: GeneratorConfig,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn AudioSink>,
        tolerances: SchedulerTolerances,
    ) -> (Self, Receiver<GeneratorEvent>) {
        let (events_tx, events_rx) = mpsc::channel();
        let (scheduler, scheduler_events) = TransmissionScheduler::new(tolerances);
        let shared = Shared {
            config,
            scheduler,
            scheduler_events,
            phase: Phase::Idle,
            run_id: 0,
            transmitter: None,
        };
        let inner = GeneratorInner::new(shared, clock, sink, events_tx);
        (
            Self {
                inner: Arc::new(inner),
            },
            events_rx,
        )
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Begin transmitting
    ///
    /// Returns immediately. [`GeneratorEvent::Started`] follows once the sink
    /// is negotiated and the first second is queued, or
    /// [`GeneratorEvent::Error`] if that fails. Ignored while already active.
    pub fn start(&self) {
        let mut shared = self.inner.lock();
        if shared.phase != Phase::Idle {
            debug!("start ignored: transmission already active");
            return;
        }
        if let Err(e) = shared.config.carrier.validate() {
            warn!("Refusing to start with invalid configuration: {}", e);
            self.inner.emit(GeneratorEvent::Error(e.to_string()));
            return;
        }

        shared.run_id += 1;
        shared.phase = Phase::Starting;

        match Transmitter::spawn(Arc::clone(&self.inner), shared.run_id) {
            Ok(handle) => shared.transmitter = Some(handle),
            Err(e) => {
                error!("Failed to spawn transmitter thread: {}", e);
                shared.phase = Phase::Idle;
                self.inner
                    .emit(GeneratorEvent::Error(format!("failed to start: {e}")));
            }
        }
    }

    /// Stop transmitting
    ///
    /// Returns immediately and is safe to call at any time, including while
    /// a start is still in flight. Audio already queued may finish playing.
    pub fn stop(&self) {
        let mut shared = self.inner.lock();
        if shared.phase == Phase::Idle {
            return;
        }
        shared.phase = Phase::Idle;
        shared.run_id += 1;
        shared.scheduler.stop();
        let _ = shared.drain_scheduler_events();
        let handle = shared.transmitter.take();
        self.inner.emit(GeneratorEvent::Stopped);
        drop(shared);

        if let Some(handle) = handle {
            handle.cancel();
        }
        debug!("Transmission stopped");
    }

    /// True from `start` until `stop` or a failed start
    pub fn is_active(&self) -> bool {
        self.inner.lock().phase != Phase::Idle
    }

    /// True once the first second has been scheduled
    pub fn is_running(&self) -> bool {
        self.inner.lock().phase == Phase::Running
    }

    /// The frame being transmitted
    pub fn current_frame(&self) -> Option<Arc<Frame>> {
        self.inner.lock().scheduler.current_frame()
    }

    // =========================================================================
    // Whole-configuration access
    // =========================================================================

    pub fn config(&self) -> GeneratorConfig {
        self.inner.lock().config.clone()
    }

    pub fn carrier(&self) -> CarrierConfiguration {
        self.inner.lock().config.carrier.clone()
    }

    pub fn encoding(&self) -> EncodingOptions {
        self.inner.lock().config.encoding.clone()
    }

    /// Replace the whole configuration
    ///
    /// Nothing changes if any field is refused: format fields while active,
    /// or fields holding unusable values.
    pub fn apply_configuration(&self, config: GeneratorConfig) -> Result<(), RejectedFields> {
        if let Err(ConfigError::InvalidValue { field, reason }) = config.carrier.validate() {
            warn!("Configuration rejected: {} ({})", field, reason);
            return Err(RejectedFields {
                fields: vec![field],
            });
        }

        let mut shared = self.inner.lock();
        if shared.phase != Phase::Idle {
            let fields = config.carrier.format_changes(&shared.config.carrier);
            if !fields.is_empty() {
                warn!("Configuration rejected while transmitting: {:?}", fields);
                return Err(RejectedFields { fields });
            }
        }
        shared.config = config;
        Ok(())
    }

    pub fn set_tolerances(&self, tolerances: SchedulerTolerances) {
        self.inner.lock().scheduler.set_tolerances(tolerances);
    }

    pub fn tolerances(&self) -> SchedulerTolerances {
        self.inner.lock().scheduler.tolerances()
    }

    // =========================================================================
    // Carrier
    // =========================================================================

    /// Apply `change` to a copy of the carrier and commit it if still valid
    fn update_carrier(
        &self,
        change: impl FnOnce(&mut CarrierConfiguration),
    ) -> Result<(), GeneratorError> {
        let mut shared = self.inner.lock();
        let mut carrier = shared.config.carrier.clone();
        change(&mut carrier);
        if shared.phase != Phase::Idle {
            if let Some(&field) = carrier.format_changes(&shared.config.carrier).first() {
                warn!("{} change rejected while transmitting", field);
                return Err(GeneratorError::ActiveTransmission(field));
            }
        }
        carrier.validate()?;
        shared.config.carrier = carrier;
        Ok(())
    }

    /// Switch band and retune the carrier; refused while active
    pub fn set_band(&self, band: CarrierBand) -> Result<(), GeneratorError> {
        let mut shared = self.inner.lock();
        if shared.phase != Phase::Idle {
            warn!("Band change rejected while transmitting");
            return Err(GeneratorError::ActiveTransmission("band"));
        }
        shared.config.carrier.set_band(band);
        Ok(())
    }

    pub fn band(&self) -> CarrierBand {
        self.inner.lock().config.carrier.band
    }

    pub fn set_sample_rate(&self, sample_rate: f64) -> Result<(), GeneratorError> {
        self.update_carrier(|c| c.sample_rate = sample_rate)
    }

    pub fn sample_rate(&self) -> f64 {
        self.inner.lock().config.carrier.sample_rate
    }

    pub fn set_channel_count(&self, channels: u16) -> Result<(), GeneratorError> {
        self.update_carrier(|c| c.channel_count = channels)
    }

    pub fn channel_count(&self) -> u16 {
        self.inner.lock().config.carrier.channel_count
    }

    pub fn set_test_mode(&self, enabled: bool) {
        self.inner.lock().config.carrier.test_mode = enabled;
    }

    pub fn test_mode(&self) -> bool {
        self.inner.lock().config.carrier.test_mode
    }

    pub fn set_test_frequency(&self, frequency: f64) -> Result<(), GeneratorError> {
        self.update_carrier(|c| c.test_frequency = frequency)
    }

    pub fn test_frequency(&self) -> f64 {
        self.inner.lock().config.carrier.test_frequency
    }

    pub fn set_actual_frequency(&self, frequency: f64) -> Result<(), GeneratorError> {
        self.update_carrier(|c| c.actual_frequency = frequency)
    }

    pub fn actual_frequency(&self) -> f64 {
        self.inner.lock().config.carrier.actual_frequency
    }

    /// Frequency currently being rendered
    pub fn effective_frequency(&self) -> f64 {
        self.inner.lock().config.carrier.effective_frequency()
    }

    pub fn set_waveform(&self, waveform: WaveformShape) {
        self.inner.lock().config.carrier.waveform = waveform;
    }

    pub fn waveform(&self) -> WaveformShape {
        self.inner.lock().config.carrier.waveform
    }

    pub fn set_gain(&self, gain: f32) -> Result<(), GeneratorError> {
        self.update_carrier(|c| c.gain = gain)
    }

    pub fn gain(&self) -> f32 {
        self.inner.lock().config.carrier.gain
    }

    pub fn set_low_amplitude_fraction(&self, fraction: f32) -> Result<(), GeneratorError> {
        self.update_carrier(|c| c.low_amplitude_fraction = fraction)
    }

    pub fn low_amplitude_fraction(&self) -> f32 {
        self.inner.lock().config.carrier.low_amplitude_fraction
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    pub fn set_encoding(&self, encoding: EncodingOptions) {
        self.inner.lock().config.encoding = encoding;
    }

    pub fn set_enable_callsign(&self, enabled: bool) {
        self.inner.lock().config.encoding.enable_callsign = enabled;
    }

    pub fn enable_callsign(&self) -> bool {
        self.inner.lock().config.encoding.enable_callsign
    }

    pub fn set_enable_service_status_bits(&self, enabled: bool) {
        self.inner.lock().config.encoding.enable_service_status_bits = enabled;
    }

    pub fn enable_service_status_bits(&self) -> bool {
        self.inner.lock().config.encoding.enable_service_status_bits
    }

    pub fn set_service_status_bits(&self, bits: ServiceStatusBits) {
        self.inner.lock().config.encoding.service_status_bits = bits;
    }

    pub fn service_status_bits(&self) -> ServiceStatusBits {
        self.inner.lock().config.encoding.service_status_bits
    }

    pub fn set_leap_second_pending(&self, pending: bool) {
        self.inner.lock().config.encoding.leap_second_pending = pending;
    }

    pub fn leap_second_pending(&self) -> bool {
        self.inner.lock().config.encoding.leap_second_pending
    }

    pub fn set_leap_second_inserted(&self, inserted: bool) {
        self.inner.lock().config.encoding.leap_second_inserted = inserted;
    }

    pub fn leap_second_inserted(&self) -> bool {
        self.inner.lock().config.encoding.leap_second_inserted
    }

    /// Calendar plan; overrides the manual leap flags while set
    pub fn set_leap_second_plan(&self, plan: Option<LeapSecondPlan>) {
        self.inner.lock().config.encoding.leap_second_plan = plan;
    }

    pub fn leap_second_plan(&self) -> Option<LeapSecondPlan> {
        self.inner.lock().config.encoding.leap_second_plan
    }
}

impl Drop for Generator {
    fn drop(&mut self) {
        self.stop();
    }
}
