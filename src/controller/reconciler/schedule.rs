//! # Scheduler
//!
//! Period-based rescheduling of environments.
//!
//! [`next_cycle`] computes the delay until an environment's next cycle from
//! when its last cycle started. [`ScheduleState`] keeps the resulting due
//! times per resource so a requeue only runs the environments that are due.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};
use tracing::warn;

/// Environments due within this window of a wakeup run in the same cycle
const DUE_SLACK: Duration = Duration::from_secs(1);

/// When the next cycle should start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextCycle {
    pub delay: Duration,
    /// The previous cycle took at least one whole period
    pub skipped: bool,
}

/// Delay until the next cycle of a cycle that started at `started_at`
///
/// Only meaningful for a positive `period`; run-once environments are never
/// rescheduled. After an overrun the next cycle is a full period away.
#[must_use]
pub fn next_cycle(started_at: Instant, now: Instant, period: Duration) -> NextCycle {
    let elapsed = now.saturating_duration_since(started_at);
    if elapsed >= period {
        NextCycle {
            delay: period,
            skipped: true,
        }
    } else {
        NextCycle {
            delay: period - elapsed,
            skipped: false,
        }
    }
}

/// Due times of one resource's environments
#[derive(Debug, Clone, Default)]
pub struct ScheduleState {
    /// UID of the resource instance the state belongs to
    uid: Option<String>,
    generation: Option<i64>,
    observed: bool,
    due: BTreeMap<String, Instant>,
    /// Whether the latest cycle of each environment succeeded
    results: BTreeMap<String, bool>,
}

impl ScheduleState {
    /// Select the environments to run at `now`
    ///
    /// A new resource generation, or a resource recreated under the same
    /// name (new `uid`), makes every environment in `keys` due. Otherwise only
    /// periodic environments whose due time has come are returned. Entries for
    /// environments no longer declared are dropped.
    pub fn due_environments<'a>(
        &mut self,
        uid: Option<&str>,
        generation: Option<i64>,
        keys: impl IntoIterator<Item = &'a String>,
        now: Instant,
    ) -> BTreeSet<String> {
        let keys: BTreeSet<String> = keys.into_iter().cloned().collect();
        self.due.retain(|key, _| keys.contains(key));
        self.results.retain(|key, _| keys.contains(key));

        if !self.observed || self.uid.as_deref() != uid || self.generation != generation {
            self.observed = true;
            self.uid = uid.map(ToString::to_string);
            self.generation = generation;
            self.due.clear();
            self.results.clear();
            return keys;
        }

        let horizon = now + DUE_SLACK;
        self.due
            .iter()
            .filter(|(_, due_at)| **due_at <= horizon)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Record a cycle of `key` that ran from `started_at` to `finished_at`
    ///
    /// A `None` period means the environment is not rescheduled.
    pub fn record(
        &mut self,
        key: &str,
        succeeded: bool,
        period: Option<Duration>,
        started_at: Instant,
        finished_at: Instant,
    ) {
        self.results.insert(key.to_string(), succeeded);
        match period {
            Some(period) => {
                let next = next_cycle(started_at, finished_at, period);
                if next.skipped {
                    warn!(
                        environment = key,
                        "Cycle of environment {} overran its period of {}s, skipping to the next period",
                        key,
                        period.as_secs()
                    );
                }
                match finished_at.checked_add(next.delay) {
                    Some(due_at) => {
                        self.due.insert(key.to_string(), due_at);
                    }
                    None => {
                        warn!(
                            environment = key,
                            "Period of environment {} is out of range, not rescheduling",
                            key
                        );
                        self.due.remove(key);
                    }
                }
            }
            None => {
                self.due.remove(key);
            }
        }
    }

    /// Time from `now` until the earliest pending environment, if any
    #[must_use]
    pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        self.due
            .values()
            .min()
            .map(|due_at| due_at.saturating_duration_since(now))
    }

    /// Number of environments waiting for a periodic cycle
    #[must_use]
    pub fn pending(&self) -> usize {
        self.due.len()
    }

    /// Latest result of every environment that ran since the last generation change
    #[must_use]
    pub fn results(&self) -> &BTreeMap<String, bool> {
        &self.results
    }
}
