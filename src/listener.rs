//! Caller-facing listener: start a capture in the background, poll it from a
//! render loop, stop it early.
//!
//! Exactly one capture session runs per listener at a time. The worker sends
//! its result into a capacity-1 channel *before* the thread exits, so
//! "thread finished" always implies "result, if any, is already readable".
//! That single ordering rule is what makes `is_listening` and `poll_result`
//! race-free without a second done-flag.

use crate::audio::{AudioFrameSource, LiveMeter, MicSource};
use crate::config::ListenerConfig;
use crate::decoder::StreamingDecoder;
use crate::session::{run_capture, CaptureMetrics, CaptureResult, ReadyCallback};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// How long `poll_result` may wait to smooth the "worker sent, thread not
/// yet reaped" race. Never exceeded.
const RESULT_GRACE: Duration = Duration::from_millis(500);

/// How long `stop` waits for the capture thread before giving up on it. A
/// blocking device read cannot always be interrupted mid-cycle; state
/// convergence is guaranteed, immediate device release is not.
const STOP_WAIT: Duration = Duration::from_millis(1_000);

/// Builds one frame source per session, on the capture thread. Sources stay
/// thread-local (CPAL streams are not `Send`); only the factory crosses.
pub type SourceFactory = Arc<dyn Fn(&ListenerConfig) -> Box<dyn AudioFrameSource> + Send + Sync>;

/// Caller-visible snapshot of the listener lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerStatus {
    Idle,
    Listening,
    ResultReady,
    Stopped,
}

struct ActiveSession {
    receiver: Receiver<CaptureResult>,
    handle: Option<thread::JoinHandle<()>>,
    cancel: Arc<AtomicBool>,
}

impl ActiveSession {
    fn finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }
}

pub struct Listener {
    config: ListenerConfig,
    source_factory: SourceFactory,
    decoder: Arc<Mutex<dyn StreamingDecoder>>,
    meter: Option<LiveMeter>,
    active: Option<ActiveSession>,
    pending: Option<CaptureResult>,
    last_metrics: Arc<Mutex<Option<CaptureMetrics>>>,
    stopped: bool,
}

impl Listener {
    /// Listener over the system microphone.
    pub fn new(config: ListenerConfig, decoder: Arc<Mutex<dyn StreamingDecoder>>) -> Self {
        let factory: SourceFactory = Arc::new(|config: &ListenerConfig| {
            Box::new(MicSource::new(
                config.device.clone(),
                config.sample_rate,
                config.frame_samples,
                config.channel_capacity,
            )) as Box<dyn AudioFrameSource>
        });
        Self::with_source(config, factory, decoder)
    }

    /// Listener over an arbitrary frame source. The seam the tests use.
    pub fn with_source(
        config: ListenerConfig,
        source_factory: SourceFactory,
        decoder: Arc<Mutex<dyn StreamingDecoder>>,
    ) -> Self {
        Self {
            config,
            source_factory,
            decoder,
            meter: None,
            active: None,
            pending: None,
            last_metrics: Arc::new(Mutex::new(None)),
            stopped: false,
        }
    }

    /// Attach a level meter updated once per captured frame.
    pub fn set_meter(&mut self, meter: LiveMeter) {
        self.meter = Some(meter);
    }

    /// Launch one background capture session and return immediately.
    ///
    /// A no-op while a session is listening. Otherwise any previous result
    /// is cleared first, so stale text can never be returned twice.
    pub fn start(&mut self, ready: Option<ReadyCallback>) {
        if self.is_listening() {
            debug!("start ignored; capture already running");
            return;
        }
        // Dropping the old session also drops its receiver; a lingering
        // cancelled worker finds the channel closed and its send discarded.
        self.active = None;
        self.pending = None;
        self.stopped = false;
        *self.last_metrics.lock().unwrap_or_else(|e| e.into_inner()) = None;

        let (sender, receiver) = mpsc::sync_channel::<CaptureResult>(1);
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_for_worker = cancel.clone();
        let config = self.config.clone();
        let source_factory = self.source_factory.clone();
        let decoder = self.decoder.clone();
        let meter = self.meter.clone();
        let metrics_slot = self.last_metrics.clone();

        let handle = thread::spawn(move || {
            let mut source = source_factory(&config);
            let mut decoder = decoder.lock().unwrap_or_else(|e| e.into_inner());
            let (outcome, metrics) = run_capture(
                source.as_mut(),
                &mut *decoder,
                &config,
                &cancel_for_worker,
                ready,
                meter.as_ref(),
            );
            // Metrics land before the result, and the result is sent before
            // the thread exits; a cancelled session sends nothing at all.
            *metrics_slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(metrics);
            if let Some(result) = outcome {
                let _ = sender.send(result);
            }
        });
        debug!("capture session started");

        self.active = Some(ActiveSession {
            receiver,
            handle: Some(handle),
            cancel,
        });
    }

    /// True from `start` until the session has fully exited, teardown
    /// included. `stop` forces this false even if the thread lingers.
    pub fn is_listening(&self) -> bool {
        if self.stopped {
            return false;
        }
        self.active.as_ref().is_some_and(|session| !session.finished())
    }

    /// Non-blocking result peek; at most `RESULT_GRACE` when the session is
    /// mid-exit. `None` while still listening, and after a cancelled
    /// session.
    pub fn poll_result(&mut self) -> Option<CaptureResult> {
        if let Some(result) = self.pending.take() {
            return Some(result);
        }
        let session = self.active.as_ref()?;
        let drained = match session.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => {
                if session.finished() {
                    // Worker between send and exit, or a cancelled session
                    // that will never send. Either resolves within the grace
                    // window because the channel disconnects on exit.
                    session.receiver.recv_timeout(RESULT_GRACE).ok()
                } else {
                    return None;
                }
            }
            Err(TryRecvError::Disconnected) => None,
        };
        self.reap();
        drained
    }

    /// Current lifecycle snapshot.
    pub fn status(&mut self) -> ListenerStatus {
        if self.is_listening() {
            return ListenerStatus::Listening;
        }
        if self.result_ready() {
            return ListenerStatus::ResultReady;
        }
        if self.stopped {
            return ListenerStatus::Stopped;
        }
        ListenerStatus::Idle
    }

    /// Request cancellation and wait boundedly for the session to exit.
    /// Marks the listener `Stopped` regardless of whether it did.
    pub fn stop(&mut self) {
        if let Some(session) = &mut self.active {
            session.cancel.store(true, Ordering::Relaxed);
            let deadline = Instant::now() + STOP_WAIT;
            while !session.finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if session.finished() {
                if let Some(handle) = session.handle.take() {
                    let _ = handle.join();
                }
            } else {
                debug!("capture thread did not exit within stop window");
            }
        }
        self.stopped = true;
    }

    /// Counters from the most recently finished session, cancelled sessions
    /// included. `None` until the first session exits; cleared by `start`.
    pub fn last_metrics(&self) -> Option<CaptureMetrics> {
        self.last_metrics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Peek without consuming: parks an arrived result in the pending slot.
    fn result_ready(&mut self) -> bool {
        if self.pending.is_some() {
            return true;
        }
        let Some(session) = &self.active else {
            return false;
        };
        match session.receiver.try_recv() {
            Ok(result) => {
                self.pending = Some(result);
                self.reap();
                true
            }
            Err(_) => false,
        }
    }

    /// Join and forget a finished session.
    fn reap(&mut self) {
        if let Some(session) = &mut self.active {
            if session.finished() {
                if let Some(handle) = session.handle.take() {
                    let _ = handle.join();
                }
                self.active = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioFrame, ReadError};
    use crate::decoder::Hypothesis;
    use crate::error::CaptureFault;
    use crate::session::StopCause;
    use anyhow::anyhow;
    use std::sync::atomic::AtomicUsize;

    // Source that emits zero-filled frames forever, pacing the loop at one
    // frame per 20 ms.
    struct SilentSource {
        reads: Arc<AtomicUsize>,
        fail_open: bool,
    }

    impl AudioFrameSource for SilentSource {
        fn open(&mut self) -> anyhow::Result<()> {
            if self.fail_open {
                return Err(anyhow!("device vanished"));
            }
            Ok(())
        }

        fn read_frame(&mut self, timeout: Duration) -> Result<AudioFrame, ReadError> {
            thread::sleep(timeout);
            self.reads.fetch_add(1, Ordering::Relaxed);
            Ok(AudioFrame {
                samples: vec![0.0; 20],
                sample_rate: 1_000,
                captured_at: Instant::now(),
            })
        }

        fn close(&mut self) {}
    }

    // Decoder that speaks for a fixed number of feeds, then goes quiet.
    struct TalkingDecoder {
        speech_feeds: usize,
        feeds_seen: usize,
        text: String,
    }

    impl StreamingDecoder for TalkingDecoder {
        fn feed(&mut self, _samples: &[f32]) -> anyhow::Result<Hypothesis> {
            self.feeds_seen += 1;
            if self.feeds_seen <= self.speech_feeds {
                Ok(Hypothesis::Partial(self.text.clone()))
            } else {
                Ok(Hypothesis::Partial(String::new()))
            }
        }

        fn force_finalize(&mut self) -> anyhow::Result<String> {
            Ok(self.text.clone())
        }

        fn reset(&mut self) {
            self.feeds_seen = 0;
        }
    }

    fn fast_config() -> ListenerConfig {
        ListenerConfig {
            sample_rate: 1_000,
            frame_samples: 20,
            device: None,
            channel_capacity: 8,
            record_timeout: Duration::from_millis(2_000),
            min_utterance: Duration::from_millis(20),
            end_silence: Duration::from_millis(60),
        }
    }

    fn silent_factory(reads: Arc<AtomicUsize>, fail_open: bool) -> SourceFactory {
        Arc::new(move |_config: &ListenerConfig| {
            Box::new(SilentSource {
                reads: reads.clone(),
                fail_open,
            }) as Box<dyn AudioFrameSource>
        })
    }

    fn talking_listener(text: &str, speech_feeds: usize) -> Listener {
        let decoder = Arc::new(Mutex::new(TalkingDecoder {
            speech_feeds,
            feeds_seen: 0,
            text: text.to_string(),
        }));
        Listener::with_source(
            fast_config(),
            silent_factory(Arc::new(AtomicUsize::new(0)), false),
            decoder,
        )
    }

    fn wait_result(listener: &mut Listener) -> Option<CaptureResult> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while listener.is_listening() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!listener.is_listening(), "session should have finished");
        listener.poll_result()
    }

    #[test]
    fn end_to_end_transcript_flow() {
        let mut listener = talking_listener("read me a story", 3);
        assert_eq!(listener.status(), ListenerStatus::Idle);
        listener.start(None);
        let result = wait_result(&mut listener);
        assert_eq!(
            result,
            Some(CaptureResult::Success("read me a story".into()))
        );
        assert_eq!(listener.status(), ListenerStatus::Idle);
    }

    #[test]
    fn ready_callback_fires_before_result() {
        let ready = Arc::new(AtomicBool::new(false));
        let ready_clone = ready.clone();
        let mut listener = talking_listener("hello", 2);
        listener.start(Some(Box::new(move || {
            ready_clone.store(true, Ordering::SeqCst);
        })));
        let result = wait_result(&mut listener);
        assert!(ready.load(Ordering::SeqCst));
        assert!(matches!(result, Some(CaptureResult::Success(_))));
    }

    #[test]
    fn start_while_listening_is_a_no_op() {
        let mut listener = talking_listener("only once", 5);
        listener.start(None);
        assert!(listener.is_listening());
        listener.start(None);
        listener.start(None);

        let first = wait_result(&mut listener);
        assert_eq!(first, Some(CaptureResult::Success("only once".into())));
        // No duplicate session means no second result.
        assert_eq!(listener.poll_result(), None);
    }

    #[test]
    fn poll_while_listening_returns_none() {
        let mut listener = talking_listener("patience", 20);
        listener.start(None);
        assert_eq!(listener.poll_result(), None);
        assert_eq!(listener.status(), ListenerStatus::Listening);
        listener.stop();
    }

    #[test]
    fn stop_converges_to_stopped_without_result() {
        let mut listener = talking_listener("cut short", 200);
        listener.start(None);
        thread::sleep(Duration::from_millis(50));
        listener.stop();
        assert!(!listener.is_listening());
        assert_eq!(listener.poll_result(), None, "cancelled session has no result");
        assert_eq!(listener.status(), ListenerStatus::Stopped);
    }

    #[test]
    fn start_after_stop_runs_a_fresh_session() {
        let mut listener = talking_listener("second run", 3);
        listener.start(None);
        listener.stop();
        listener.start(None);
        let result = wait_result(&mut listener);
        assert_eq!(result, Some(CaptureResult::Success("second run".into())));
    }

    #[test]
    fn open_failure_surfaces_failed_and_skips_reads() {
        let reads = Arc::new(AtomicUsize::new(0));
        let decoder = Arc::new(Mutex::new(TalkingDecoder {
            speech_feeds: 0,
            feeds_seen: 0,
            text: String::new(),
        }));
        let mut listener =
            Listener::with_source(fast_config(), silent_factory(reads.clone(), true), decoder);
        listener.start(None);
        let result = wait_result(&mut listener);
        assert!(matches!(
            result,
            Some(CaptureResult::Failed(CaptureFault::DeviceOpen(_)))
        ));
        assert_eq!(reads.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn result_is_consumed_exactly_once() {
        let mut listener = talking_listener("one shot", 2);
        listener.start(None);
        let result = wait_result(&mut listener);
        assert!(result.is_some());
        assert_eq!(listener.poll_result(), None);
    }

    #[test]
    fn metrics_survive_the_session_that_produced_them() {
        let mut listener = talking_listener("count me", 3);
        assert_eq!(listener.last_metrics(), None);
        listener.start(None);
        let result = wait_result(&mut listener);
        assert!(matches!(result, Some(CaptureResult::Success(_))));
        let metrics = listener.last_metrics().expect("finished session reports metrics");
        assert_eq!(metrics.stop_cause, StopCause::EndSilence);
        assert!(metrics.frames_processed > 0);
    }

    #[test]
    fn cancelled_session_still_reports_metrics() {
        let mut listener = talking_listener("cut off", 200);
        listener.start(None);
        thread::sleep(Duration::from_millis(50));
        listener.stop();
        let deadline = Instant::now() + Duration::from_secs(5);
        while listener.last_metrics().is_none() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        let metrics = listener.last_metrics().expect("cancelled session reports metrics");
        assert_eq!(metrics.stop_cause, StopCause::Cancelled);
    }

    #[test]
    fn status_reports_result_ready_before_poll() {
        let mut listener = talking_listener("ready check", 2);
        listener.start(None);
        let deadline = Instant::now() + Duration::from_secs(5);
        while listener.is_listening() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(listener.status(), ListenerStatus::ResultReady);
        assert!(listener.poll_result().is_some());
        assert_eq!(listener.status(), ListenerStatus::Idle);
    }
}
