//! Stable entity identity
//!
//! A `Uuid` is a random 64-bit value attached to every Scene-created entity.
//! It is the only identifier that survives save/load and prefab capture;
//! raw `Entity` handles do not.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Stable unique identifier component.
///
/// Zero is reserved to mean "no identity" (e.g. a document record without a
/// uuid), so `Uuid::new()` never returns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uuid(pub u64);

impl Uuid {
    /// The reserved "no identity" value.
    pub const NIL: Uuid = Uuid(0);

    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let value: u64 = rng.gen();
            if value != 0 {
                return Uuid(value);
            }
        }
    }

    pub fn is_nil(&self) -> bool {
        self.0 == 0
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Default for Uuid {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for Uuid {
    fn from(value: u64) -> Self {
        Uuid(value)
    }
}

impl std::fmt::Display for Uuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
