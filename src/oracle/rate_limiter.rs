// src/oracle/rate_limiter.rs

use log::info;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Extra pause added to each computed wait so the oldest call has surely
/// left the window when the caller wakes up.
pub const BOUNDARY_MARGIN: Duration = Duration::from_secs(1);

/// Sliding-window limiter: at most `max_requests` calls within any `window`.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    requests: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            requests: VecDeque::new(),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.requests.front() {
            if now.duration_since(oldest) >= self.window {
                self.requests.pop_front();
            } else {
                break;
            }
        }
    }

    /// Calls currently counted in the window.
    pub fn in_window(&mut self) -> usize {
        self.prune(Instant::now());
        self.requests.len()
    }

    pub fn can_proceed(&mut self) -> bool {
        self.in_window() < self.max_requests
    }

    /// Counts a call made now. Refuses, and records nothing, when the window is full.
    pub fn record(&mut self) -> bool {
        if !self.can_proceed() {
            return false;
        }
        self.requests.push_back(Instant::now());
        true
    }

    /// Time until the oldest call leaves the window; zero when a call may go now.
    pub fn wait_time(&mut self) -> Duration {
        let now = Instant::now();
        self.prune(now);
        if self.requests.len() < self.max_requests {
            return Duration::ZERO;
        }
        match self.requests.front() {
            Some(&oldest) => (oldest + self.window).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Sleeps until a call may proceed. Each pause is the remaining wait
    /// rounded up to the whole second, plus `BOUNDARY_MARGIN`.
    pub async fn wait_if_needed(&mut self) -> Duration {
        let mut waited = Duration::ZERO;
        while !self.can_proceed() {
            let pause = round_up_to_secs(self.wait_time()) + BOUNDARY_MARGIN;
            info!(
                "⏳ Oracle rate limit reached ({} calls per {}s), waiting {}s",
                self.max_requests,
                self.window.as_secs(),
                pause.as_secs()
            );
            sleep(pause).await;
            waited += pause;
        }
        waited
    }
}

fn round_up_to_secs(duration: Duration) -> Duration {
    let extra = if duration.subsec_nanos() > 0 { 1 } else { 0 };
    Duration::from_secs(duration.as_secs() + extra)
}
