//! Per-client sliding-window rate limiter (§4.D.1).

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    recent: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            recent: Mutex::new(HashMap::new()),
        }
    }

    /// Records the attempt and returns whether it's within the limit. Stale
    /// timestamps (older than the window) are evicted from the front of
    /// each client's deque on every call, so the window slides rather than
    /// resetting on a fixed tick.
    pub fn check_and_record(&self, client_id: &str) -> bool {
        let now = Instant::now();
        let mut recent = self.recent.lock().expect("rate limiter mutex poisoned");
        let deque = recent.entry(client_id.to_owned()).or_default();

        while let Some(&front) = deque.front() {
            if now.duration_since(front) > self.window {
                deque.pop_front();
            } else {
                break;
            }
        }

        if deque.len() as u32 >= self.max_requests {
            return false;
        }
        deque.push_back(now);
        true
    }

    pub fn remove_client(&self, client_id: &str) {
        self.recent.lock().expect("rate limiter mutex poisoned").remove(client_id);
    }
}
