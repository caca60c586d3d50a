//! Streaming speech-to-text seam.
//!
//! The engine never talks to a recognition backend directly; it consumes this
//! trait. Backends that close segments on their own (Kaldi-style) report
//! `Hypothesis::Final` from `feed`; backends that only ever produce partials
//! still work because the segmenter finalizes on silence or timeout.

use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

#[cfg(feature = "vosk")]
mod vosk;
#[cfg(feature = "vosk")]
pub use self::vosk::VoskDecoder;

/// One decode step's output. Text may be empty when nothing has been heard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hypothesis {
    /// In-progress, unstable transcript guess for audio not yet finalized.
    Partial(String),
    /// Best transcript for a segment the decoder considers complete.
    Final(String),
}

impl Hypothesis {
    pub fn text(&self) -> &str {
        match self {
            Hypothesis::Partial(text) | Hypothesis::Final(text) => text,
        }
    }
}

/// Incremental speech decoder fed one PCM frame at a time.
pub trait StreamingDecoder: Send {
    /// Consume one mono PCM frame and report the current hypothesis.
    fn feed(&mut self, samples: &[f32]) -> Result<Hypothesis>;

    /// Flush internal state and return the best transcript for all audio fed
    /// so far. May be empty.
    fn force_finalize(&mut self) -> Result<String>;

    /// Discard any buffered audio and partial state. Called at the start of
    /// every session so a reused decoder cannot leak the previous utterance.
    fn reset(&mut self) {}
}

/// Strip non-speech markers some decoders embed (`[noise]`, `(silence)`, ...)
/// and collapse runs of whitespace.
pub fn sanitize_transcript(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    static NON_SPEECH_RE: OnceLock<Regex> = OnceLock::new();
    let re = NON_SPEECH_RE.get_or_init(|| {
        Regex::new(
            r"(?i)\[\s*\]|\(\s*\)|\[(?:\s*(?:silence|noise|inaudible|blank_audio|blank audio|music|laughter|applause|cough|breath(?:ing)?|background)\s*)\]|\((?:\s*(?:silence|noise|inaudible|blank audio|music|laughter|applause|cough|breath(?:ing)?|background)\s*)\)",
        )
        .expect("non-speech regex should compile")
    });
    let without_markers = re.replace_all(trimmed, " ");
    without_markers
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hypothesis_text_reads_both_variants() {
        assert_eq!(Hypothesis::Partial("hi".into()).text(), "hi");
        assert_eq!(Hypothesis::Final("bye".into()).text(), "bye");
    }

    #[test]
    fn sanitize_trims_and_collapses_whitespace() {
        assert_eq!(sanitize_transcript("  hello   there "), "hello there");
    }

    #[test]
    fn sanitize_strips_non_speech_markers() {
        assert_eq!(sanitize_transcript("[noise] hello (silence) there"), "hello there");
        assert_eq!(sanitize_transcript("[ BLANK_AUDIO ]"), "");
    }

    #[test]
    fn sanitize_keeps_real_brackets() {
        assert_eq!(sanitize_transcript("open [the door]"), "open [the door]");
    }
}
