//! Tracking code generation.

use std::sync::{Mutex, PoisonError};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use shopkeep_core::{TrackingNumber, TrackingNumberError};

const CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const CODE_LENGTH: usize = 6;

/// Source of tracking numbers for staff placements.
pub trait TrackingCodeGenerator: Send + Sync {
    /// Produce a fresh candidate. Uniqueness is enforced by the store.
    ///
    /// # Errors
    ///
    /// Returns `TrackingNumberError` if the generated code is not a valid
    /// tracking number.
    fn generate(&self) -> Result<TrackingNumber, TrackingNumberError>;
}

/// Prefix plus six characters drawn uniformly from `[0-9A-Z]`.
pub struct RandomTrackingCodes {
    prefix: String,
    rng: Mutex<StdRng>,
}

impl RandomTrackingCodes {
    /// Generator seeded from the operating system.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_rng(prefix, StdRng::from_os_rng())
    }

    /// Generator with an explicit random source.
    #[must_use]
    pub fn with_rng(prefix: impl Into<String>, rng: StdRng) -> Self {
        Self {
            prefix: prefix.into(),
            rng: Mutex::new(rng),
        }
    }
}

impl std::fmt::Debug for RandomTrackingCodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomTrackingCodes")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl TrackingCodeGenerator for RandomTrackingCodes {
    fn generate(&self) -> Result<TrackingNumber, TrackingNumberError> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let code: String = (0..CODE_LENGTH)
            .filter_map(|_| CHARSET.choose(&mut *rng))
            .map(|&b| char::from(b))
            .collect();
        TrackingNumber::parse(&format!("{}{code}", self.prefix))
    }
}
