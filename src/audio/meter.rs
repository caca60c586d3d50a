//! Lock-free input level snapshot for host UIs.
//!
//! The capture thread publishes a dB level per frame; the caller's render
//! loop reads it whenever it likes. Levels are stored as raw f32 bits in an
//! atomic so neither side ever blocks.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Meter floor reported when nothing is being captured.
const FLOOR_DB: f32 = -60.0;

#[derive(Clone, Debug)]
pub struct LiveMeter {
    level_bits: Arc<AtomicU32>,
}

impl LiveMeter {
    pub fn new() -> Self {
        Self {
            level_bits: Arc::new(AtomicU32::new(FLOOR_DB.to_bits())),
        }
    }

    pub fn set_db(&self, db: f32) {
        self.level_bits.store(db.to_bits(), Ordering::Relaxed);
    }

    pub fn level_db(&self) -> f32 {
        f32::from_bits(self.level_bits.load(Ordering::Relaxed))
    }

    /// Drop back to the floor, used when a session ends.
    pub fn clear(&self) {
        self.set_db(FLOOR_DB);
    }
}

impl Default for LiveMeter {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn rms_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return FLOOR_DB;
    }
    let energy: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    let rms = energy.sqrt().max(1e-6);
    20.0 * rms.log10()
}
