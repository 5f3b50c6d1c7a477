use std::rc::Rc;
use std::time::Duration;

use asphalt_shared::debounce::{Scheduler, TimerToken};
use gloo_timers::callback::Timeout;

/// `setTimeout`-backed scheduler. Holds one outstanding timer, which is all a
/// debounce gate ever asks for; scheduling another replaces it.
pub struct BrowserScheduler {
    active: Option<(TimerToken, Timeout)>,
    dispatch: Rc<dyn Fn(TimerToken)>,
}

impl BrowserScheduler {
    pub fn new(dispatch: impl Fn(TimerToken) + 'static) -> Self {
        BrowserScheduler {
            active: None,
            dispatch: Rc::new(dispatch),
        }
    }
}

impl Scheduler for BrowserScheduler {
    fn schedule(&mut self, token: TimerToken, delay: Duration) {
        let dispatch = Rc::clone(&self.dispatch);
        let millis = timeout_millis(delay);
        // Dropping a pending Timeout clears it.
        self.active = Some((token, Timeout::new(millis, move || dispatch(token))));
    }

    fn cancel(&mut self, token: TimerToken) {
        if matches!(self.active, Some((active, _)) if active == token) {
            self.active = None;
        }
    }
}

fn timeout_millis(delay: Duration) -> u32 {
    u32::try_from(delay.as_millis()).unwrap_or(u32::MAX)
}
