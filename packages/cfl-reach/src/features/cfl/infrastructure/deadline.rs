//! Cooperative solving deadline
//!
//! The solver polls the deadline every `CHECK_INTERVAL` worklist pops (and
//! once per generation in batch mode) and bails out with
//! `CflError::Timeout`.

use crate::errors::{CflError, Result};
use std::time::{Duration, Instant};

/// Pops between two clock reads
pub const CHECK_INTERVAL: u64 = 256;

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started_at: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    /// `None` never expires
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            started_at: Instant::now(),
            limit,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn is_expired(&self) -> bool {
        self.limit.map_or(false, |limit| self.started_at.elapsed() > limit)
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn check(&self) -> Result<()> {
        if self.is_expired() {
            Err(CflError::Timeout {
                elapsed_ms: self.started_at.elapsed().as_millis(),
            })
        } else {
            Ok(())
        }
    }

    /// Check only on every `CHECK_INTERVAL`-th tick
    #[inline]
    pub fn check_every(&self, tick: u64) -> Result<()> {
        if tick % CHECK_INTERVAL == 0 {
            self.check()
        } else {
            Ok(())
        }
    }
}
