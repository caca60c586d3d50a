//! Command-line parsing, validation, and the timing parameters that make
//! segmenter behavior deterministic.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use clap::Parser;
use std::time::Duration;

pub use defaults::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_END_SILENCE_MS, DEFAULT_FRAME_SAMPLES,
    DEFAULT_MIN_UTTERANCE_MS, DEFAULT_RECORD_TIMEOUT_MS, DEFAULT_SAMPLE_RATE,
    MAX_RECORD_TIMEOUT_MS,
};

/// CLI options for the one-shot `hark` binary. Validated values feed
/// straight into `ListenerConfig`.
#[derive(Debug, Parser, Clone)]
#[command(name = "hark", about = "Listen for one utterance and print the transcript", version)]
pub struct AppConfig {
    /// Preferred audio input device name
    #[arg(long = "input-device")]
    pub input_device: Option<String>,

    /// Audio input device index, resolved against --list-input-devices order
    #[arg(long = "input-device-index", conflicts_with = "input_device")]
    pub input_device_index: Option<usize>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Decoder sample rate in Hz
    #[arg(long = "sample-rate", default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Samples per frame fed to the decoder
    #[arg(long = "frame-samples", default_value_t = DEFAULT_FRAME_SAMPLES)]
    pub frame_samples: usize,

    /// Overall capture ceiling in milliseconds
    #[arg(long = "record-timeout-ms", default_value_t = DEFAULT_RECORD_TIMEOUT_MS)]
    pub record_timeout_ms: u64,

    /// Shortest speech span accepted as an utterance, in milliseconds
    #[arg(long = "min-utterance-ms", default_value_t = DEFAULT_MIN_UTTERANCE_MS)]
    pub min_utterance_ms: u64,

    /// Silence span that ends an utterance, in milliseconds
    #[arg(long = "end-silence-ms", default_value_t = DEFAULT_END_SILENCE_MS)]
    pub end_silence_ms: u64,

    /// Recognizer model directory
    #[arg(long = "model-path", env = "VOSK_MODEL_PATH")]
    pub model_path: Option<String>,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "HARK_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "HARK_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,
}

impl AppConfig {
    /// Build the listener timing parameters from validated CLI values.
    /// `device` must already be resolved to a concrete name, if any.
    pub fn listener_config(&self, device: Option<String>) -> ListenerConfig {
        ListenerConfig {
            sample_rate: self.sample_rate,
            frame_samples: self.frame_samples,
            device,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            record_timeout: Duration::from_millis(self.record_timeout_ms),
            min_utterance: Duration::from_millis(self.min_utterance_ms),
            end_silence: Duration::from_millis(self.end_silence_ms),
        }
    }
}

/// Everything one capture session needs to behave deterministically.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub sample_rate: u32,
    pub frame_samples: usize,
    /// Input device name; `None` selects the host default.
    pub device: Option<String>,
    pub channel_capacity: usize,
    pub record_timeout: Duration,
    pub min_utterance: Duration,
    pub end_silence: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            frame_samples: DEFAULT_FRAME_SAMPLES,
            device: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            record_timeout: Duration::from_millis(DEFAULT_RECORD_TIMEOUT_MS),
            min_utterance: Duration::from_millis(DEFAULT_MIN_UTTERANCE_MS),
            end_silence: Duration::from_millis(DEFAULT_END_SILENCE_MS),
        }
    }
}

impl ListenerConfig {
    /// Wall-clock span one frame covers; also the per-cycle read timeout,
    /// which bounds cancellation latency.
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_samples as f64 / f64::from(self.sample_rate.max(1)))
    }
}
