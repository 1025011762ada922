// src/interfaces/clock.rs

//! An injectable clock. Build-ids must not depend on wall-clock time
//! (`spec.md` §4.6), but timeouts and progress reporting need a notion of
//! "now" — routed through this trait so tests can use a fake clock instead
//! of advancing real time.

use std::time::{Instant, SystemTime};

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn system_time(&self) -> SystemTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}
