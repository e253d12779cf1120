// ── Restart suppression window ──
//
// A user-triggered restart produces a predictable burst of connection
// failures. While the window is open, poll errors are swallowed instead of
// surfacing in the view. The window closes on its own after `window`, or
// early once a poll that was issued after the restart succeeds at least
// `min_window` after it. A request in flight before the restart was
// triggered can never close it.
//
// All methods take `now` explicitly so the policy is testable without a
// clock; views pass `Instant::now()`.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::{DEFAULT_MIN_RESTART_WINDOW, DEFAULT_RESTART_WINDOW};

/// Restart time observed when a request was issued.
///
/// Captured before the request goes out and handed back with its result, so
/// the policy can tell which restart (if any) the request belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestartToken(Option<Instant>);

impl RestartToken {
    pub fn is_none(self) -> bool {
        self.0.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    /// No restart pending; errors surface normally.
    Idle,
    /// Within `window` of a restart; poll errors are discarded.
    Suppressing,
    /// Past `window`; becomes `Idle` at the next check.
    Expiring,
}

#[derive(Debug, Clone)]
pub struct RestartSuppressionWindow {
    restart_time: Option<Instant>,
    window: Duration,
    min_window: Duration,
}

impl Default for RestartSuppressionWindow {
    fn default() -> Self {
        Self::new(DEFAULT_RESTART_WINDOW, DEFAULT_MIN_RESTART_WINDOW)
    }
}

impl RestartSuppressionWindow {
    pub fn new(window: Duration, min_window: Duration) -> Self {
        Self {
            restart_time: None,
            window,
            min_window: min_window.min(window),
        }
    }

    /// Open (or re-open) the window at `now`.
    pub fn trigger(&mut self, now: Instant) {
        info!(window_secs = self.window.as_secs(), "restart window opened");
        self.restart_time = Some(now);
    }

    pub fn clear(&mut self) {
        self.restart_time = None;
    }

    pub fn restart_time(&self) -> Option<Instant> {
        self.restart_time
    }

    /// Snapshot to attach to a request about to be issued.
    pub fn token(&self) -> RestartToken {
        RestartToken(self.restart_time)
    }

    pub fn phase(&self, now: Instant) -> WindowPhase {
        match self.restart_time {
            None => WindowPhase::Idle,
            Some(t) if now > t + self.window => WindowPhase::Expiring,
            Some(_) => WindowPhase::Suppressing,
        }
    }

    /// Should an error for a request issued under `issued` be discarded?
    ///
    /// Expires a stale window first. A request issued before the restart is
    /// suppressed while the window is still open; one issued during it is
    /// suppressed until its own restart's window has passed. That still holds
    /// after [`observe_success`](Self::observe_success) closed the window early.
    pub fn should_suppress(&mut self, issued: RestartToken, now: Instant) -> bool {
        if issued.is_none() && self.restart_time.is_none() {
            return false;
        }
        if self.phase(now) == WindowPhase::Expiring {
            info!("restart window expired");
            self.restart_time = None;
        }
        let suppress = match issued.0 {
            None => self.restart_time.is_some(),
            Some(t) => now <= t + self.window,
        };
        if suppress {
            debug!("error suppressed during restart");
        }
        suppress
    }

    /// Record a successful response. Returns `true` if this closed the window.
    pub fn observe_success(&mut self, issued: RestartToken, now: Instant) -> bool {
        match (issued.0, self.restart_time) {
            (Some(issued), Some(current)) if issued == current && now >= current + self.min_window => {
                info!("restart window cleared by successful poll");
                self.restart_time = None;
                true
            }
            _ => false,
        }
    }
}
