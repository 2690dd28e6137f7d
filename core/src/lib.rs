//! JJYWave Core - time-code encoding and scheduling
//!
//! This crate provides everything needed to turn wall-clock time into a
//! JJY-style longwave time signal rendered as audio, independent of any
//! particular audio device or threading model.
//!
//! # Architecture
//!
//! - [`Clock`] - Wall-clock instant plus a monotonic hardware tick counter
//! - [`FrameBuilder`] - Encodes one minute of time code into a [`Frame`]
//! - [`WaveformSynthesizer`] - Renders one [`Symbol`] as one second of PCM
//! - [`TransmissionScheduler`] - Maps frame seconds onto hardware ticks and
//!   corrects drift
//! - [`morse`] - Call sign envelope used during announcement minutes

pub mod clock;
pub mod config;
pub mod morse;
pub mod scheduler;
pub mod synth;
pub mod timecode;

// Re-export core traits and types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    CarrierBand, CarrierConfiguration, ConfigError, EncodingOptions, GeneratorConfig,
    LeapSecondKind, LeapSecondPlan, ServiceStatusBits, WaveformShape,
};
pub use morse::{CALLSIGN_UNIT_SECONDS, CALLSIGN_WINDOW_SECONDS, MorsePattern};
pub use scheduler::{
    SchedulerError, SchedulerEvent, SchedulerState, SchedulerStats, SchedulerTolerances,
    TransmissionScheduler,
};
pub use synth::{PhaseAccumulator, SampleFormat, SecondParams, WaveformSynthesizer};
pub use timecode::{
    DecodedFrame, Frame, FrameBuilder, JST_OFFSET_SECONDS, LeapSecondState, Symbol,
    TimeFrameContext,
};
