//! Audio capture plumbing: the frame-source seam the capture loop consumes,
//! plus a real microphone implementation on top of CPAL.
//!
//! Device-native input is downmixed to mono, cut into fixed-size frames, and
//! rate-converted to the configured decoder rate before it leaves this module.

mod dispatch;
mod meter;
mod mic;
mod resample;
mod source;

pub use meter::LiveMeter;
pub(crate) use meter::rms_db;
pub use mic::MicSource;
pub use source::{AudioFrame, AudioFrameSource, ReadError};
