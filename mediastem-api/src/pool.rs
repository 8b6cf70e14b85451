//! Round-robin pool of equivalent provider endpoints
//!
//! One cursor is shared process-wide: a failing instance is rotated past
//! for every subsequent caller, not just the request that observed the
//! failure. Instances are never removed; a dead endpoint costs one
//! failed attempt per full cycle, and total provider failure is handled
//! one level up by the fallback chain.

use mediastem_common::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct InstancePool {
    endpoints: Vec<String>,
    cursor: AtomicUsize,
}

impl InstancePool {
    /// Construct from an ordered endpoint list. Fails on an empty list;
    /// a pool is never empty post-construction.
    pub fn new(endpoints: Vec<String>) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(Error::Config(
                "instance pool requires at least one endpoint".to_string(),
            ));
        }
        Ok(Self {
            endpoints,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Endpoint at `cursor mod N`
    pub fn current(&self) -> &str {
        let index = self.cursor.load(Ordering::Relaxed) % self.endpoints.len();
        &self.endpoints[index]
    }

    /// Rotate to the next endpoint. Called only after an attempt against
    /// `current()` failed; wrap is implicit via modulo on the next read.
    pub fn advance(&self) {
        self.cursor.fetch_add(1, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
