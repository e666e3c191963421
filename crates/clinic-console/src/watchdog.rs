//! Single-shot deadline attached to one in-flight request.
//!
//! A [`Watchdog`] is armed when a request starts and is consumed when it
//! settles, either by [`Watchdog::disarm`] or by [`Watchdog::race`]. Dropping
//! an armed watchdog cancels it, so a deadline can never outlive the request
//! it guards or fire twice.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep, sleep};

/// Deadline guarding a single request.
#[derive(Debug)]
#[must_use = "an armed watchdog does nothing unless raced or disarmed"]
pub struct Watchdog {
    duration: Duration,
    armed_at: Instant,
    deadline: Pin<Box<Sleep>>,
}

/// Result of racing work against a watchdog.
#[derive(Debug)]
pub enum Raced<T> {
    /// The work finished first; the watchdog was disarmed.
    Finished {
        /// Output of the work.
        output: T,
        /// Time between arming and completion.
        elapsed: Duration,
    },
    /// The deadline elapsed first; the work was dropped.
    Expired {
        /// The armed duration.
        after: Duration,
    },
}

impl Watchdog {
    /// Arm a deadline `duration` from now.
    pub fn arm(duration: Duration) -> Self {
        Self {
            duration,
            armed_at: Instant::now(),
            deadline: Box::pin(sleep(duration)),
        }
    }

    /// Armed duration.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Time since arming.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.armed_at.elapsed()
    }

    /// Whether the deadline has already passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline.is_elapsed()
    }

    /// Cancel the deadline and report how long the request took.
    #[must_use]
    pub fn disarm(self) -> Duration {
        self.elapsed()
    }

    /// Wait for the deadline alone.
    pub async fn expired(mut self) -> Duration {
        self.deadline.as_mut().await;
        self.duration
    }

    /// Drive `work` until it finishes or the deadline elapses, whichever is first.
    ///
    /// Completion is polled before the deadline, so work that is ready at the
    /// same instant the deadline fires counts as finished.
    pub async fn race<F>(mut self, work: F) -> Raced<F::Output>
    where
        F: Future,
    {
        tokio::pin!(work);
        let output = tokio::select! {
            biased;
            output = &mut work => Some(output),
            () = self.deadline.as_mut() => None,
        };
        match output {
            Some(output) => Raced::Finished {
                output,
                elapsed: self.disarm(),
            },
            None => Raced::Expired {
                after: self.duration,
            },
        }
    }
}
