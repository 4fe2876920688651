//! Bounded readiness probing
//!
//! A freshly started database container accepts TCP connections a little
//! before it answers queries. `await_ready` polls a liveness probe a fixed
//! number of times with a fixed pause between attempts.

use crate::errors::{MigrunError, Result};
use std::thread;
use std::time::{Duration, Instant};

/// Something that can answer a cheap "are you there" request
pub trait Probe {
    /// Issue one liveness probe
    ///
    /// # Errors
    ///
    /// Returns an error describing why the database did not answer.
    fn ping(&mut self) -> Result<()>;
}

impl<P: Probe + ?Sized> Probe for &mut P {
    fn ping(&mut self) -> Result<()> {
        (**self).ping()
    }
}

/// How many times to probe and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            interval: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }
}

/// Probe until the database answers or the attempts run out
///
/// Sleeps `interval` between attempts, never after the last one. A policy
/// with `max_attempts == 0` still probes once. Returns the number of probes
/// issued.
///
/// # Errors
///
/// Returns `ProbeTimeout` carrying the last probe failure once every attempt
/// has failed.
pub fn await_ready<P: Probe + ?Sized>(probe: &mut P, policy: &RetryPolicy) -> Result<u32> {
    let max_attempts = policy.max_attempts.max(1);
    let start = Instant::now();
    crate::log_op_start!("await_ready", max_attempts = max_attempts);

    let mut last_error = String::new();
    for attempt in 1..=max_attempts {
        match probe.ping() {
            Ok(()) => {
                crate::log_op_end!(
                    "await_ready",
                    duration_ms = start.elapsed().as_millis() as u64,
                    attempts = attempt
                );
                return Ok(attempt);
            }
            Err(err) => {
                last_error = err.to_string();
                tracing::info!(
                    component = module_path!(),
                    op = "await_ready",
                    event = migrun_core_types::schema::EVENT_RETRY,
                    attempt = attempt,
                    error = %last_error,
                    "waiting for database"
                );
                if attempt < max_attempts {
                    thread::sleep(policy.interval);
                }
            }
        }
    }

    let err = MigrunError::ProbeTimeout {
        attempts: max_attempts,
        last_error,
    };
    crate::log_op_error!(
        "await_ready",
        &err,
        duration_ms = start.elapsed().as_millis() as u64
    );
    Err(err)
}
