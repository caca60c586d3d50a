//! Voice-capture and utterance-endpointing engine.
//!
//! Turns a continuous microphone stream into a single finalized transcript,
//! delivered asynchronously to a caller that keeps running its own loop.
//! The hard parts live in three layers: the [`segmenter`] decides when
//! speech has ended without a fixed-length recording, the [`session`] runs
//! one capture attempt with cancellation and fault containment, and the
//! [`listener`] exposes the non-blocking start/poll/stop surface the caller
//! sees.

pub mod audio;
pub mod config;
pub mod decoder;
pub mod error;
pub mod listener;
pub mod segmenter;
pub mod session;
mod telemetry;

pub use error::CaptureFault;
pub use listener::{Listener, ListenerStatus, SourceFactory};
pub use session::{CaptureMetrics, CaptureResult, StopCause};
pub use telemetry::init_tracing;
