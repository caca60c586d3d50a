//! The seam between the capture loop and whatever produces PCM.
//!
//! Real microphones, scripted test sources, and file replays all sit behind
//! `AudioFrameSource`, so the session and segmenter never know which one
//! they are running against.

use std::time::{Duration, Instant};

/// One fixed-size block of mono PCM. Immutable once produced; the session
/// feeds it to the decoder and discards it.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub captured_at: Instant,
}

/// Why a single read produced no frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// Nothing arrived this cycle; retry on the next one. The session's
    /// overall deadline bounds how long retries can go on.
    Transient,
    /// The source is gone and will not deliver again; the session must abort.
    Fatal(String),
}

/// Supplies fixed-size PCM frames from an input device.
///
/// Implementations are created per session and used from the capture thread
/// only, so they need not be `Send`.
pub trait AudioFrameSource {
    /// Open the underlying device. Idempotent: opening an already-open
    /// source is a no-op.
    fn open(&mut self) -> anyhow::Result<()>;

    /// Pull the next frame, waiting at most `timeout`.
    fn read_frame(&mut self, timeout: Duration) -> Result<AudioFrame, ReadError>;

    /// Release the device. Must tolerate being called when `open` never
    /// succeeded, and more than once.
    fn close(&mut self);

    /// Frames lost because the consumer could not keep up.
    fn dropped_frames(&self) -> usize {
        0
    }
}
