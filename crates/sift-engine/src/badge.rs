//! Badge forwarding
//!
//! The ratio is pushed to an external display at most once per interval.
//! Values arriving inside the interval are dropped, not queued.

use std::fmt;
use std::time::{Duration, Instant};

use crate::EngineConfig;

/// Badge label: `"N%"`, or empty for 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeText(String);

impl BadgeText {
    pub fn from_ratio(ratio: u8) -> Self {
        if ratio > 0 {
            Self(format!("{ratio}%"))
        } else {
            Self(String::new())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tooltip shown next to the badge
    pub fn title(&self, name: &str) -> String {
        format!("{name} \nRatio of noise in your feed: {}", self.0)
    }
}

impl fmt::Display for BadgeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Leading-edge throttle
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    /// Whether a call at `now` passes; a passing call starts a new interval
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BadgeError {
    #[error("badge display is unavailable: {0}")]
    Unavailable(String),
}

/// External badge display
pub trait BadgeSink {
    fn update(&mut self, text: &BadgeText, title: &str) -> Result<(), BadgeError>;
}

/// Throttled forwarding of ratios to a sink
pub struct BadgeForwarder<S: BadgeSink> {
    sink: S,
    throttle: Throttle,
    name: String,
    available: bool,
}

impl<S: BadgeSink> BadgeForwarder<S> {
    pub fn new(sink: S, config: &EngineConfig) -> Self {
        Self {
            sink,
            throttle: Throttle::new(config.badge_interval()),
            name: config.badge_title.clone(),
            available: true,
        }
    }

    /// Offer a ratio. Returns whether it reached the sink.
    pub fn offer(&mut self, ratio: u8, now: Instant) -> bool {
        if !self.available || !self.throttle.ready(now) {
            return false;
        }
        let text = BadgeText::from_ratio(ratio);
        let title = text.title(&self.name);
        match self.sink.update(&text, &title) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("Badge forwarding disabled: {}", err);
                self.available = false;
                false
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
