//! Deterministic expansion of a master seed into per-sample streams.
//!
//! Each (unit, trial) pair gets its own counter-derived seed, so availability
//! sampling is reproducible bit-for-bit no matter how trials are scheduled
//! across worker threads.

use crate::unit::UnitId;

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// splitmix64 finalizer. Scrambles a counter into a well-mixed 64-bit value.
fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed for the sample stream of one unit in one trial.
pub(crate) fn stream_seed(master: u64, unit_id: UnitId, trial: usize) -> u64 {
    let keyed = mix(master.wrapping_add(GOLDEN_GAMMA.wrapping_mul(u64::from(unit_id) + 1)));
    mix(keyed.wrapping_add(GOLDEN_GAMMA.wrapping_mul(trial as u64 + 1)))
}
