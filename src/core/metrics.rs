//! Elapsed time and throughput for the active generation.
//!
//! Token counts are a heuristic: each fragment contributes the number of
//! whitespace-delimited words in its text, not the model's real token count.

use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone)]
pub struct Metrics {
    approx_token_count: usize,
    started_at: Option<Instant>,
    frozen_elapsed: Option<Duration>,
}

pub fn approximate_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Tokens per second, `0.0` when no time has elapsed.
pub fn rate(tokens: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        0.0
    } else {
        tokens as f64 / secs
    }
}

impl Metrics {
    /// Reset counters and start the timer at `now`.
    pub fn start(&mut self, now: Instant) {
        self.approx_token_count = 0;
        self.started_at = Some(now);
        self.frozen_elapsed = None;
    }

    pub fn record_fragment(&mut self, text: &str) {
        self.approx_token_count += approximate_tokens(text);
    }

    /// Stop the timer, keeping the elapsed time up to `now` for display.
    pub fn freeze(&mut self, now: Instant) {
        if let Some(started_at) = self.started_at.take() {
            self.frozen_elapsed = Some(now.saturating_duration_since(started_at));
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn approx_token_count(&self) -> usize {
        self.approx_token_count
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Live elapsed time while running, the frozen value afterwards.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        match self.started_at {
            Some(started_at) => Some(now.saturating_duration_since(started_at)),
            None => self.frozen_elapsed,
        }
    }

    pub fn rate(&self, now: Instant) -> f64 {
        rate(
            self.approx_token_count,
            self.elapsed(now).unwrap_or_default(),
        )
    }
}
