use super::{AppConfig, MAX_RECORD_TIMEOUT_MS};
use anyhow::{bail, Result};
use clap::Parser;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values before any device or model is touched.
    pub fn validate(&self) -> Result<()> {
        if !(8_000..=96_000).contains(&self.sample_rate) {
            bail!(
                "--sample-rate must be between 8000 and 96000 Hz, got {}",
                self.sample_rate
            );
        }

        // Frames shorter than 5 ms burn CPU on decoder calls; frames longer
        // than 1 s make cancellation and endpointing unacceptably coarse.
        let frame_ms = (self.frame_samples as u64 * 1_000) / u64::from(self.sample_rate);
        if !(5..=1_000).contains(&frame_ms) {
            bail!(
                "--frame-samples {} is {}ms at {} Hz; must be between 5 and 1000 ms",
                self.frame_samples,
                frame_ms,
                self.sample_rate
            );
        }

        if self.record_timeout_ms == 0 || self.record_timeout_ms > MAX_RECORD_TIMEOUT_MS {
            bail!(
                "--record-timeout-ms must be between 1 and {MAX_RECORD_TIMEOUT_MS}, got {}",
                self.record_timeout_ms
            );
        }
        if self.end_silence_ms < 100 || self.end_silence_ms >= self.record_timeout_ms {
            bail!(
                "--end-silence-ms must be >=100 and < --record-timeout-ms ({}), got {}",
                self.record_timeout_ms,
                self.end_silence_ms
            );
        }
        if self.min_utterance_ms >= self.record_timeout_ms {
            bail!(
                "--min-utterance-ms must be < --record-timeout-ms ({}), got {}",
                self.record_timeout_ms,
                self.min_utterance_ms
            );
        }
        Ok(())
    }
}
