//! Vosk/Kaldi streaming recognizer behind the `vosk` feature.
//!
//! Requires libvosk at link time and a model directory on disk, so the
//! feature is off by default. The model path comes from an explicit argument
//! or the `VOSK_MODEL_PATH` environment variable.

use super::{Hypothesis, StreamingDecoder};
use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::Path;
use vosk::{CompleteResult, DecodingState, Model, Recognizer};

/// Streaming recognizer over a local Vosk model.
pub struct VoskDecoder {
    // Held so the model outlives the recognizer that borrows it at creation.
    _model: Model,
    recognizer: Recognizer,
}

impl VoskDecoder {
    /// Load the model and build a recognizer for `sample_rate` Hz input.
    pub fn new(model_path: Option<&str>, sample_rate: u32) -> Result<Self> {
        let path = match model_path {
            Some(path) => path.to_owned(),
            None => env::var("VOSK_MODEL_PATH").map_err(|_| {
                anyhow!("no vosk model path given and VOSK_MODEL_PATH is not set")
            })?,
        };
        if !Path::new(&path).is_dir() {
            return Err(anyhow!("vosk model directory '{path}' not found"));
        }
        let model = Model::new(path.as_str())
            .ok_or_else(|| anyhow!("failed to load vosk model from '{path}'"))?;
        let mut recognizer = Recognizer::new(&model, sample_rate as f32)
            .ok_or_else(|| anyhow!("failed to create vosk recognizer at {sample_rate} Hz"))?;
        recognizer.set_words(true);
        Ok(Self {
            _model: model,
            recognizer,
        })
    }
}

fn complete_text(result: CompleteResult) -> String {
    match result {
        CompleteResult::Single(single) => single.text.to_string(),
        CompleteResult::Multiple(multi) => multi
            .alternatives
            .first()
            .map(|alt| alt.text.to_string())
            .unwrap_or_default(),
    }
}

impl StreamingDecoder for VoskDecoder {
    fn feed(&mut self, samples: &[f32]) -> Result<Hypothesis> {
        let pcm: Vec<i16> = samples
            .iter()
            .map(|s| (s.clamp(-1.0, 1.0) * 32_767.0) as i16)
            .collect();
        let state = self
            .recognizer
            .accept_waveform(&pcm)
            .context("vosk rejected waveform")?;
        match state {
            DecodingState::Finalized => {
                Ok(Hypothesis::Final(complete_text(self.recognizer.result())))
            }
            DecodingState::Running => Ok(Hypothesis::Partial(
                self.recognizer.partial_result().partial.to_string(),
            )),
            DecodingState::Failed => Err(anyhow!("vosk recognizer entered failed state")),
        }
    }

    fn force_finalize(&mut self) -> Result<String> {
        Ok(complete_text(self.recognizer.final_result()))
    }

    fn reset(&mut self) {
        self.recognizer.reset();
    }
}
