//! Per-frame sample-rate conversion.
//!
//! Microphones rarely run at the decoder's rate, so each captured frame is
//! linearly resampled to the configured rate and padded or trimmed to the
//! exact frame length the decoder expects. Linear interpolation is adequate
//! for speech recognition input.

use std::cmp::Ordering as CmpOrdering;

/// Convert one device-rate frame into exactly `desired_len` samples at
/// `target_rate`.
pub(super) fn convert_frame(
    frame: Vec<f32>,
    device_rate: u32,
    target_rate: u32,
    desired_len: usize,
) -> Vec<f32> {
    if device_rate == target_rate || device_rate == 0 || target_rate == 0 {
        return adjust_frame_length(frame, desired_len);
    }
    let ratio = target_rate as f32 / device_rate as f32;
    adjust_frame_length(resample_linear(&frame, ratio), desired_len)
}

pub(super) fn resample_linear(input: &[f32], ratio: f32) -> Vec<f32> {
    if input.is_empty() || ratio <= 0.0 {
        return Vec::new();
    }
    let output_len = (input.len() as f32 * ratio).round() as usize;
    let mut output = Vec::with_capacity(output_len);
    for i in 0..output_len {
        let src = i as f32 / ratio;
        let idx = src.floor() as usize;
        let frac = src - idx as f32;
        let sample = if idx + 1 < input.len() {
            input[idx] * (1.0 - frac) + input[idx + 1] * frac
        } else {
            input.last().copied().unwrap_or(0.0)
        };
        output.push(sample);
    }
    output
}

/// Pad (repeating the last sample) or trim so every frame reaching the
/// decoder has the same length.
pub(super) fn adjust_frame_length(mut data: Vec<f32>, desired: usize) -> Vec<f32> {
    match data.len().cmp(&desired) {
        CmpOrdering::Greater => data.truncate(desired),
        CmpOrdering::Less => {
            let pad = data.last().copied().unwrap_or(0.0);
            data.resize(desired, pad);
        }
        CmpOrdering::Equal => {}
    }
    data
}
