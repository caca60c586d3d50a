//! Utterance endpointing: deciding where speech starts and ends inside a
//! continuous stream of decoder hypotheses.
//!
//! The state machine never touches audio or the decoder itself. It is fed one
//! timestamped hypothesis per frame-decode cycle and tells the capture loop
//! whether to keep reading, accept a decoder-closed segment, or finalize
//! because the speaker went quiet.

use crate::decoder::Hypothesis;
use std::time::{Duration, Instant};

/// Where the segmenter believes the current utterance stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceState {
    /// No speech heard yet.
    Idle,
    /// Speech in progress.
    Speaking {
        started_at: Instant,
        last_speech_at: Instant,
    },
    /// End of speech detected; the decoder is being flushed.
    Finalizing { started_at: Instant },
}

/// What the capture loop should do after one observed hypothesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Keep reading frames.
    Pending,
    /// The decoder closed the segment itself; accept this text as-is.
    DecoderFinal(String),
    /// End silence elapsed; flush the decoder and gate the result.
    SilenceElapsed,
}

pub struct UtteranceSegmenter {
    min_utterance: Duration,
    end_silence: Duration,
    state: UtteranceState,
}

impl UtteranceSegmenter {
    pub fn new(min_utterance: Duration, end_silence: Duration) -> Self {
        Self {
            min_utterance,
            end_silence,
            state: UtteranceState::Idle,
        }
    }

    pub fn state(&self) -> UtteranceState {
        self.state
    }

    /// True once any non-empty partial has been heard this session.
    pub fn saw_speech(&self) -> bool {
        !matches!(self.state, UtteranceState::Idle)
    }

    /// Feed one hypothesis observed at `now`.
    ///
    /// A non-empty `Final` short-circuits: the decoder has better endpointing
    /// information than we do for its own closed segment, so no duration gate
    /// applies. Empty hypotheses of either kind count as silence.
    pub fn observe(&mut self, hypothesis: &Hypothesis, now: Instant) -> Endpoint {
        if let Hypothesis::Final(text) = hypothesis {
            if !text.trim().is_empty() {
                self.state = UtteranceState::Finalizing {
                    started_at: self.started_at().unwrap_or(now),
                };
                return Endpoint::DecoderFinal(text.clone());
            }
        }

        if !hypothesis.text().trim().is_empty() {
            self.state = match self.state {
                UtteranceState::Speaking { started_at, .. }
                | UtteranceState::Finalizing { started_at } => UtteranceState::Speaking {
                    started_at,
                    last_speech_at: now,
                },
                UtteranceState::Idle => UtteranceState::Speaking {
                    started_at: now,
                    last_speech_at: now,
                },
            };
            return Endpoint::Pending;
        }

        // Silence tick. Only meaningful while speech is in progress; silence
        // before the first partial must not trigger finalization.
        match self.state {
            UtteranceState::Speaking {
                started_at,
                last_speech_at,
            } if now.duration_since(last_speech_at) >= self.end_silence => {
                self.state = UtteranceState::Finalizing { started_at };
                Endpoint::SilenceElapsed
            }
            _ => Endpoint::Pending,
        }
    }

    /// Minimum-duration gate for text recovered on the silence path. Rejects
    /// short noise blips that momentarily tripped the partial threshold.
    pub fn meets_minimum(&self, now: Instant) -> bool {
        match self.started_at() {
            Some(started_at) => now.duration_since(started_at) >= self.min_utterance,
            None => false,
        }
    }

    /// How long the utterance has been running, if one started.
    pub fn utterance_duration(&self, now: Instant) -> Option<Duration> {
        self.started_at().map(|started_at| now.duration_since(started_at))
    }

    fn started_at(&self) -> Option<Instant> {
        match self.state {
            UtteranceState::Idle => None,
            UtteranceState::Speaking { started_at, .. }
            | UtteranceState::Finalizing { started_at } => Some(started_at),
        }
    }
}
