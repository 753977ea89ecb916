//! Deterministic random streams.
//!
//! A run is seeded exactly once. Every consumer gets its own stream derived
//! from that seed and a fixed stream identifier, so the draws a patient sees
//! do not depend on how the engine interleaves patients.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::patient::PatientId;

const ENROLLMENT_STREAM: u64 = 0x454e_524f_4c4c_4d54;
const PATIENT_STREAM: u64 = 0x5041_5449_454e_5453;

/// Factory for the per-run random streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngStreams {
    seed: u64,
}

impl RngStreams {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Stream consumed by the enrollment scheduler.
    pub fn enrollment(&self) -> StdRng {
        StdRng::seed_from_u64(mix(self.seed ^ ENROLLMENT_STREAM))
    }

    /// Stream owned by a single patient for the whole run.
    pub fn patient(&self, id: PatientId) -> StdRng {
        let stream = PATIENT_STREAM.wrapping_add(u64::from(id.get()));
        StdRng::seed_from_u64(mix(self.seed ^ mix(stream)))
    }
}

/// SplitMix64 finalizer.
#[inline]
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
