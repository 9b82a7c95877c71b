//! Admission control for the accept loop.
//!
//! The dispatcher awaits [`Gate::admit`] before every accept. The default
//! strategy admits immediately, which gives one task per connection with no
//! upper bound.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{Interval, MissedTickBehavior};

/// Upper bound for `rate_limited.per_second`.
pub const MAX_RATE_PER_SECOND: u32 = 1_000_000;

/// Upper bound for `bounded.max_connections`.
pub const MAX_CONNECTIONS: usize = Semaphore::MAX_PERMITS;

/// How the dispatcher decides when to accept the next connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Admission {
    /// Accept as fast as connections arrive.
    #[default]
    Unbounded,
    /// At most `max_connections` handlers alive at once.
    Bounded { max_connections: usize },
    /// At most `per_second` accepts per second.
    RateLimited { per_second: u32 },
}

/// Held by a handler task for as long as its connection is open.
#[derive(Debug)]
pub struct Permit {
    _slot: Option<OwnedSemaphorePermit>,
}

impl Permit {
    fn free() -> Self {
        Self { _slot: None }
    }
}

/// Runtime state for an [`Admission`] strategy.
///
/// Must be created inside a tokio runtime.
pub enum Gate {
    Unbounded,
    Bounded(Arc<Semaphore>),
    RateLimited(Interval),
}

impl Gate {
    pub fn new(admission: Admission) -> Self {
        match admission {
            Admission::Unbounded => Gate::Unbounded,
            Admission::Bounded { max_connections } => {
                Gate::Bounded(Arc::new(Semaphore::new(max_connections.clamp(1, MAX_CONNECTIONS))))
            }
            Admission::RateLimited { per_second } => {
                let period = Duration::from_secs(1) / per_second.clamp(1, MAX_RATE_PER_SECOND);
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                Gate::RateLimited(interval)
            }
        }
    }

    /// Waits until the next connection may be accepted.
    pub async fn admit(&mut self) -> Permit {
        match self {
            Gate::Unbounded => Permit::free(),
            // The semaphore is never closed, so acquiring only fails in theory.
            Gate::Bounded(semaphore) => Permit {
                _slot: semaphore.clone().acquire_owned().await.ok(),
            },
            Gate::RateLimited(interval) => {
                interval.tick().await;
                Permit::free()
            }
        }
    }

    /// Free handler slots, for bounded gates only.
    pub fn available(&self) -> Option<usize> {
        match self {
            Gate::Bounded(semaphore) => Some(semaphore.available_permits()),
            _ => None,
        }
    }
}
