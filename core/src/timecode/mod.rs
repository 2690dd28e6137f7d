//! JJY time code
//!
//! A [`Frame`] is one JST minute of [`Symbol`]s. [`FrameBuilder`] produces
//! frames from instants; [`DecodedFrame`] reads the fields back.

mod builder;
mod context;
mod decode;
mod frame;
mod leap;
mod symbol;

#[cfg(test)]
mod tests;

pub use builder::{CALLSIGN_WINDOW_START, FrameBuilder};
pub use context::{JST_OFFSET_SECONDS, TimeFrameContext, jst, jst_minute_start};
pub use decode::DecodedFrame;
pub use frame::{FRAME_SECONDS, Frame, MARKER_POSITIONS};
pub use leap::LeapSecondState;
pub use symbol::Symbol;
