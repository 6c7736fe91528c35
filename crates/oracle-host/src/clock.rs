//! Time source behind WASI `clock_time_get`

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use oracle_core::ClockMode;

pub const CLOCK_REALTIME: u32 = 0;
pub const CLOCK_MONOTONIC: u32 = 1;
pub const CLOCK_PROCESS_CPUTIME: u32 = 2;
pub const CLOCK_THREAD_CPUTIME: u32 = 3;

/// WASI errno values returned by the clock override
pub const ERRNO_SUCCESS: i32 = 0;
pub const ERRNO_FAULT: i32 = 21;
pub const ERRNO_INVAL: i32 = 28;

/// Clock seen by the guest
///
/// Replay runs must see the same times on every run, so the deterministic
/// clock never consults the host: realtime is the epoch, the CPU-time clocks
/// advance a shared tick counter once per query, and monotonic time reads
/// that counter without advancing it.
#[derive(Debug, Clone, Copy)]
pub enum GuestClock {
    Host { started: Instant },
    Deterministic { ticks: u64 },
}

impl GuestClock {
    pub fn new(mode: ClockMode) -> Self {
        match mode {
            ClockMode::Host => GuestClock::Host {
                started: Instant::now(),
            },
            ClockMode::Deterministic => GuestClock::Deterministic { ticks: 0 },
        }
    }

    /// Nanoseconds on clock `id`, or `None` for an unknown clock
    pub fn now(&mut self, id: u32) -> Option<u64> {
        match self {
            GuestClock::Host { started } => match id {
                CLOCK_REALTIME => Some(
                    SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .unwrap_or_default()
                        .as_nanos() as u64,
                ),
                CLOCK_MONOTONIC | CLOCK_PROCESS_CPUTIME | CLOCK_THREAD_CPUTIME => {
                    Some(started.elapsed().as_nanos() as u64)
                }
                _ => None,
            },
            GuestClock::Deterministic { ticks } => match id {
                CLOCK_REALTIME => Some(0),
                CLOCK_MONOTONIC => Some(*ticks),
                CLOCK_PROCESS_CPUTIME | CLOCK_THREAD_CPUTIME => {
                    *ticks += 1;
                    Some(*ticks)
                }
                _ => None,
            },
        }
    }
}
