//! Debouncing of viewport changes.
//!
//! The gate never touches a clock. It asks an injected [`Scheduler`] to fire a
//! [`TimerToken`] after the quiet interval; whoever owns the scheduler routes the
//! token back through [`DebounceGate::on_timer`]. Tokens that are no longer the
//! pending one are ignored, which makes late or duplicate firings harmless.
use std::time::Duration;

use crate::bounds::ViewportBounds;

pub const DEFAULT_QUIET_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerToken(u64);

impl TimerToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// One-shot timer capability.
pub trait Scheduler {
    fn schedule(&mut self, token: TimerToken, delay: Duration);
    fn cancel(&mut self, token: TimerToken);
}

#[derive(Debug)]
pub struct DebounceGate {
    quiet_interval: Duration,
    next_token: u64,
    pending: Option<(TimerToken, ViewportBounds)>,
}

impl Default for DebounceGate {
    fn default() -> Self {
        DebounceGate::new(DEFAULT_QUIET_INTERVAL)
    }
}

impl DebounceGate {
    pub fn new(quiet_interval: Duration) -> Self {
        DebounceGate {
            quiet_interval,
            next_token: 0,
            pending: None,
        }
    }

    pub fn quiet_interval(&self) -> Duration {
        self.quiet_interval
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Record new bounds and (re)start the quiet period.
    pub fn on_bounds_changed<S: Scheduler + ?Sized>(
        &mut self,
        bounds: ViewportBounds,
        scheduler: &mut S,
    ) -> TimerToken {
        if let Some((previous, _)) = self.pending.take() {
            scheduler.cancel(previous);
        }
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        scheduler.schedule(token, self.quiet_interval);
        self.pending = Some((token, bounds));
        token
    }

    /// Returns the settled bounds if `token` is the pending emission.
    pub fn on_timer(&mut self, token: TimerToken) -> Option<ViewportBounds> {
        match self.pending {
            Some((pending, bounds)) if pending == token => {
                self.pending = None;
                Some(bounds)
            }
            _ => None,
        }
    }

    pub fn cancel<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if let Some((token, _)) = self.pending.take() {
            scheduler.cancel(token);
        }
    }
}

/// Scheduler driven by explicit calls to [`ManualScheduler::advance`].
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    timers: Vec<(Duration, TimerToken)>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Move time forward and return the tokens that came due, earliest first.
    pub fn advance(&mut self, by: Duration) -> Vec<TimerToken> {
        self.now += by;
        let now = self.now;
        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.timers.drain(..).partition(|(deadline, _)| *deadline <= now);
        self.timers = rest;
        due.sort();
        due.into_iter().map(|(_, token)| token).collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, token: TimerToken, delay: Duration) {
        self.timers.push((self.now + delay, token));
    }

    fn cancel(&mut self, token: TimerToken) {
        self.timers.retain(|(_, t)| *t != token);
    }
}
