//! Time source used by expiring tables

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Source of "now" for TTL checks
pub trait Clock: Send + Sync
{   fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock
{   fn now(&self) -> Instant
    {   Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock
{   now: Mutex<Instant>
}

impl ManualClock
{   pub fn new() -> Self
    {   ManualClock { now: Mutex::new(Instant::now()) }
    }

    pub fn advance(&self, by: Duration)
    {   let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock
{   fn default() -> Self
    {   ManualClock::new()
    }
}

impl Clock for ManualClock
{   fn now(&self) -> Instant
    {   *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
