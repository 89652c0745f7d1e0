//! Suppression of advisories repeated within a cooldown window.

use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Keep the first item, then every item that differs from the last kept one
/// or repeats it after at least `cooldown`. The clock is read once per item
/// and restarts whenever an item is kept.
pub fn filter_repeats<C>(items: &[String], cooldown: Duration, clock: &C) -> Vec<String>
where
    C: Clock + ?Sized,
{
    let mut kept: Vec<String> = Vec::new();
    let mut last_kept_at: Option<Instant> = None;

    for item in items {
        let now = clock.now();
        let keep = match (kept.last(), last_kept_at) {
            (Some(last), Some(at)) if last == item => now.saturating_duration_since(at) >= cooldown,
            _ => true,
        };
        if keep {
            kept.push(item.clone());
            last_kept_at = Some(now);
        }
    }
    kept
}
