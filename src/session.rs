//! One listen attempt from device open to finalized result.
//!
//! The session runs entirely on the capture thread: it opens the frame
//! source, fires the ready notification, then loops read → decode → segment
//! until the utterance completes, the deadline passes, the caller cancels,
//! or something breaks. The source is closed on every exit path and no
//! failure ever crosses the thread boundary as a panic.

use crate::audio::{rms_db, AudioFrameSource, LiveMeter, ReadError};
use crate::config::ListenerConfig;
use crate::decoder::{sanitize_transcript, Hypothesis, StreamingDecoder};
use crate::error::CaptureFault;
use crate::segmenter::{Endpoint, UtteranceSegmenter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

/// Outcome of one capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureResult {
    /// A finalized, sanitized transcript.
    Success(String),
    /// The session ended without usable speech (timeout or rejected blip).
    Empty,
    /// The session aborted on an unrecoverable fault.
    Failed(CaptureFault),
}

/// Why the capture loop stopped, for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    DecoderFinal,
    EndSilence,
    Timeout,
    Cancelled,
    Fault,
}

impl StopCause {
    pub fn label(self) -> &'static str {
        match self {
            StopCause::DecoderFinal => "decoder_final",
            StopCause::EndSilence => "end_silence",
            StopCause::Timeout => "timeout",
            StopCause::Cancelled => "cancelled",
            StopCause::Fault => "fault",
        }
    }
}

/// Per-session observability counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureMetrics {
    pub capture_ms: u64,
    pub utterance_ms: u64,
    pub frames_processed: usize,
    pub frames_dropped: usize,
    pub stop_cause: StopCause,
}

impl Default for CaptureMetrics {
    fn default() -> Self {
        Self {
            capture_ms: 0,
            utterance_ms: 0,
            frames_processed: 0,
            frames_dropped: 0,
            stop_cause: StopCause::Timeout,
        }
    }
}

/// Callback fired once, after the device opened and before the first read.
pub type ReadyCallback = Box<dyn FnOnce() + Send>;

/// Run one capture session to completion.
///
/// The result is `None` only when the caller cancelled; every other exit
/// produces exactly one `CaptureResult`. Metrics are reported for every
/// exit, cancellation included.
pub(crate) fn run_capture(
    source: &mut dyn AudioFrameSource,
    decoder: &mut dyn StreamingDecoder,
    config: &ListenerConfig,
    cancel: &AtomicBool,
    ready: Option<ReadyCallback>,
    meter: Option<&LiveMeter>,
) -> (Option<CaptureResult>, CaptureMetrics) {
    let mut metrics = CaptureMetrics::default();

    if let Err(err) = source.open() {
        // Closing an unopened source must be safe; do it anyway so partially
        // initialized backends release whatever they grabbed.
        source.close();
        warn!(error = %format!("{err:#}"), "device open failed");
        metrics.stop_cause = StopCause::Fault;
        log_capture_metrics(&metrics);
        return (
            Some(CaptureResult::Failed(CaptureFault::DeviceOpen(format!(
                "{err:#}"
            )))),
            metrics,
        );
    }
    decoder.reset();
    if let Some(ready) = ready {
        ready();
    }

    let started = Instant::now();
    let deadline = started + config.record_timeout;
    let frame_wait = config.frame_duration();
    let mut segmenter = UtteranceSegmenter::new(config.min_utterance, config.end_silence);
    let mut cause = StopCause::Timeout;

    let outcome = loop {
        // Cancellation wins over everything, including a result that would
        // have been ready this very cycle.
        if cancel.load(Ordering::Relaxed) {
            cause = StopCause::Cancelled;
            break None;
        }
        let now = Instant::now();
        if now >= deadline {
            break Some(finalize_on_timeout(decoder, &segmenter));
        }

        match source.read_frame(frame_wait) {
            Ok(frame) => {
                metrics.frames_processed += 1;
                if let Some(meter) = meter {
                    meter.set_db(rms_db(&frame.samples));
                }
                let hypothesis = match decoder.feed(&frame.samples) {
                    Ok(hypothesis) => hypothesis,
                    Err(err) => {
                        cause = StopCause::Fault;
                        break Some(CaptureResult::Failed(CaptureFault::Decoder(format!(
                            "{err:#}"
                        ))));
                    }
                };
                let now = Instant::now();
                match segmenter.observe(&hypothesis, now) {
                    Endpoint::Pending => {}
                    Endpoint::DecoderFinal(text) => {
                        cause = StopCause::DecoderFinal;
                        let text = sanitize_transcript(&text);
                        break Some(if text.is_empty() {
                            CaptureResult::Empty
                        } else {
                            CaptureResult::Success(text)
                        });
                    }
                    Endpoint::SilenceElapsed => {
                        cause = StopCause::EndSilence;
                        break Some(finalize_on_silence(decoder, &segmenter));
                    }
                }
            }
            // No audio this cycle; the deadline bounds how long this can
            // repeat.
            Err(ReadError::Transient) => {}
            Err(ReadError::Fatal(message)) => {
                cause = StopCause::Fault;
                break Some(CaptureResult::Failed(CaptureFault::SourceLost(message)));
            }
        }
    };

    source.close();
    if let Some(meter) = meter {
        meter.clear();
    }

    let ended = Instant::now();
    metrics.capture_ms = ended.duration_since(started).as_millis() as u64;
    metrics.utterance_ms = segmenter
        .utterance_duration(ended)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    metrics.frames_dropped = source.dropped_frames();
    metrics.stop_cause = if matches!(outcome, Some(CaptureResult::Failed(_))) {
        StopCause::Fault
    } else {
        cause
    };
    if let Some(CaptureResult::Failed(fault)) = &outcome {
        warn!(fault = fault.label(), "capture session failed");
    }
    log_capture_metrics(&metrics);

    (outcome, metrics)
}

/// End-silence path: flush the decoder and apply the minimum-utterance gate.
fn finalize_on_silence(
    decoder: &mut dyn StreamingDecoder,
    segmenter: &UtteranceSegmenter,
) -> CaptureResult {
    match decoder.force_finalize() {
        Ok(text) => {
            let text = sanitize_transcript(&text);
            if !text.is_empty() && segmenter.meets_minimum(Instant::now()) {
                CaptureResult::Success(text)
            } else {
                CaptureResult::Empty
            }
        }
        Err(err) => CaptureResult::Failed(CaptureFault::Decoder(format!("{err:#}"))),
    }
}

/// Deadline path: take whatever the decoder holds, ungated. A session that
/// never heard speech skips the flush entirely.
fn finalize_on_timeout(
    decoder: &mut dyn StreamingDecoder,
    segmenter: &UtteranceSegmenter,
) -> CaptureResult {
    if !segmenter.saw_speech() {
        return CaptureResult::Empty;
    }
    match decoder.force_finalize() {
        Ok(text) => {
            let text = sanitize_transcript(&text);
            if text.is_empty() {
                CaptureResult::Empty
            } else {
                CaptureResult::Success(text)
            }
        }
        Err(err) => CaptureResult::Failed(CaptureFault::Decoder(format!("{err:#}"))),
    }
}

fn log_capture_metrics(metrics: &CaptureMetrics) {
    debug!(
        capture_ms = metrics.capture_ms,
        utterance_ms = metrics.utterance_ms,
        frames_processed = metrics.frames_processed,
        frames_dropped = metrics.frames_dropped,
        stop_cause = metrics.stop_cause.label(),
        "capture session finished"
    );
}
