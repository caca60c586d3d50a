//! Fault taxonomy for capture sessions.
//!
//! Only unrecoverable conditions appear here. Transient read hiccups are
//! retried inside the capture loop, timeouts are a normal outcome, and a
//! caller-requested stop produces no result at all.

use thiserror::Error;

/// Unrecoverable faults a capture session can report.
///
/// A session never panics across the thread boundary; whatever goes wrong on
/// the capture thread is folded into one of these variants and delivered as
/// `CaptureResult::Failed`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureFault {
    /// The audio input device could not be opened.
    #[error("audio device unavailable: {0}")]
    DeviceOpen(String),

    /// The audio source died mid-session and cannot deliver more frames.
    #[error("audio source failed: {0}")]
    SourceLost(String),

    /// The streaming decoder returned an error or invalid state.
    #[error("decoder failure: {0}")]
    Decoder(String),
}

impl CaptureFault {
    /// Short label for structured log lines.
    pub fn label(&self) -> &'static str {
        match self {
            CaptureFault::DeviceOpen(_) => "device_open",
            CaptureFault::SourceLost(_) => "source_lost",
            CaptureFault::Decoder(_) => "decoder",
        }
    }
}
