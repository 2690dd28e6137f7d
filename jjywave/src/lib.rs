//! JJYWave - Library interface
//!
//! Runs the `jjywave-core` scheduler on a transmitter thread and feeds the
//! rendered seconds to an audio sink.
//!
//! ```no_run
//! use std::sync::Arc;
//! use jjywave::generator::Generator;
//! use jjywave::sink::MemorySink;
//! use jjywave_core::{GeneratorConfig, SystemClock};
//!
//! let sink = Arc::new(MemorySink::new());
//! let (generator, events) = Generator::new(
//!     GeneratorConfig::default(),
//!     Arc::new(SystemClock::new()),
//!     sink.clone(),
//! );
//! generator.start();
//! println!("{:?}", events.recv());
//! generator.stop();
//! ```

pub mod generator;
pub mod sink;

pub use generator::{
    Generator, GeneratorDelegate, GeneratorError, GeneratorEvent, RejectedFields,
    spawn_delegate_dispatcher,
};
pub use sink::{AudioSink, MemorySink, SinkError, SinkFormat};
