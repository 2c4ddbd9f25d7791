//! Best-effort throughput and ETA strings for progress reports.

use std::time::{Duration, Instant};

/// Minimum time between rate samples; shorter windows produce jittery speeds.
const SAMPLE_WINDOW: Duration = Duration::from_millis(500);

/// Tracks bytes over time and formats speed / remaining time.
#[derive(Debug)]
pub struct RateMeter {
    total: u64,
    started: Instant,
    last_sample: Instant,
    last_bytes: u64,
    bytes_per_sec: Option<f64>,
}

impl RateMeter {
    pub fn new(total: u64) -> Self {
        let now = Instant::now();
        Self {
            total,
            started: now,
            last_sample: now,
            last_bytes: 0,
            bytes_per_sec: None,
        }
    }

    /// Record `done` bytes completed so far; returns (speed, time_remaining).
    pub fn sample(&mut self, done: u64) -> (Option<String>, Option<String>) {
        self.sample_at(done, Instant::now())
    }

    fn sample_at(&mut self, done: u64, now: Instant) -> (Option<String>, Option<String>) {
        let window = now.saturating_duration_since(self.last_sample);
        if window >= SAMPLE_WINDOW {
            let delta = done.saturating_sub(self.last_bytes) as f64;
            let current = delta / window.as_secs_f64();
            // Exponential smoothing keeps the display readable.
            self.bytes_per_sec = Some(match self.bytes_per_sec {
                Some(prev) => prev * 0.7 + current * 0.3,
                None => current,
            });
            self.last_sample = now;
            self.last_bytes = done;
        }

        let Some(bps) = self.bytes_per_sec else {
            return (None, None);
        };
        let speed = format!("{}/s", human_bytes(bps as u64));
        let remaining = if bps > 0.0 && self.total >= done {
            let secs = (self.total - done) as f64 / bps;
            Some(format!("{} remaining", human_duration(Duration::from_secs_f64(secs))))
        } else {
            None
        };
        (Some(speed), remaining)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Decimal units, one fractional digit ("1.5 MB").
pub fn human_bytes(n: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", n, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// "MM:SS", or "H:MM:SS" past an hour.
pub fn human_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
