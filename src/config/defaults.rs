//! Named defaults shared by the CLI surface and `ListenerConfig`.

/// Decoder-side sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Samples per frame fed to the decoder (250 ms at 16 kHz).
pub const DEFAULT_FRAME_SAMPLES: usize = 4_000;

/// Overall ceiling for one capture session.
pub const DEFAULT_RECORD_TIMEOUT_MS: u64 = 30_000;

/// Shortest speech span accepted as a real utterance.
pub const DEFAULT_MIN_UTTERANCE_MS: u64 = 800;

/// Silence span that ends an utterance.
pub const DEFAULT_END_SILENCE_MS: u64 = 1_000;

/// Bounded frame-queue depth between the audio callback and the capture loop.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Hard ceiling for `--record-timeout-ms`.
pub const MAX_RECORD_TIMEOUT_MS: u64 = 600_000;
