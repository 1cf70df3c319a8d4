/// FT API rate limiter - sliding one-second window shared by every session of a client
use std::sync::Mutex;
use std::time::{Duration, Instant};
use std::collections::VecDeque;

pub struct RateLimiter {
    /// Admission times inside the current window, oldest first
    admitted: VecDeque<Instant>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize) -> Self {
        Self::with_window(max_requests, Duration::from_secs(1))
    }

    pub fn with_window(max_requests: usize, window: Duration) -> Self {
        Self {
            admitted: VecDeque::with_capacity(max_requests),
            max_requests: max_requests.max(1),
            window,
        }
    }

    /// Admit a request now, or return how long until a slot frees up
    fn check_and_record(&mut self) -> Duration {
        let now = Instant::now();
        let window_start = now.checked_sub(self.window);
        while self
            .admitted
            .front()
            .is_some_and(|&t| window_start.map_or(false, |start| t < start))
        {
            self.admitted.pop_front();
        }

        if self.admitted.len() < self.max_requests {
            self.admitted.push_back(now);
            return Duration::ZERO;
        }

        // full window: wait until the oldest admission ages out
        let wait = match self.admitted.front() {
            Some(&oldest) => (oldest + self.window).saturating_duration_since(now),
            None => Duration::ZERO,
        };
        if wait.is_zero() {
            self.admitted.pop_front();
            self.admitted.push_back(now);
        }
        wait
    }
}

/// Wait until the limiter admits one more request
pub async fn acquire(limiter: &Mutex<RateLimiter>) {
    loop {
        let wait_duration = {
            let mut limiter = limiter.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            limiter.check_and_record()
        };

        if wait_duration.is_zero() {
            return;
        }

        tracing::debug!("FT API rate limit: waiting {}ms", wait_duration.as_millis());
        tokio::time::sleep(wait_duration).await;
    }
}
