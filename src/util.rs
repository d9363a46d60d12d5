//! Utility module for common functionality
//!
//! This module provides common utility functions used across the SDK.

use std::time::{Duration, Instant};

/// Measure the execution time of a future-producing closure
pub async fn measure_time_async<F, T, Fut>(f: F) -> (T, Duration)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let result = f().await;
    let duration = start.elapsed();
    (result, duration)
}

/// Truncate a string to a maximum byte length, adding ellipsis if truncated
///
/// The cut always lands on a UTF-8 character boundary, so the result may be
/// a few bytes shorter than `max_len` for multibyte text.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }

    let budget = if max_len <= 3 { max_len } else { max_len - 3 };
    let mut end = budget;
    while !s.is_char_boundary(end) {
        end -= 1;
    }

    if max_len <= 3 {
        s[..end].to_string()
    } else {
        format!("{}...", &s[..end])
    }
}

/// Parse a duration from a string (e.g., "30s", "5m", "1h")
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim().to_lowercase();

    if s.ends_with("ms") {
        s[..s.len() - 2].parse::<u64>().ok().map(Duration::from_millis)
    } else if s.ends_with('s') {
        s[..s.len() - 1].parse::<u64>().ok().map(Duration::from_secs)
    } else if s.ends_with('m') {
        s[..s.len() - 1].parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else if s.ends_with('h') {
        s[..s.len() - 1].parse::<u64>().ok().map(|h| Duration::from_secs(h * 3600))
    } else {
        // Try parsing as seconds
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
