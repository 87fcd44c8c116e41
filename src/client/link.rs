use std::time::{Duration, Instant};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_DEDUP_WINDOW_MS: u64 = 300;

/// Connection state of the client stream consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Connecting,
    Listening,
    Error,
}

impl LinkState {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkState::Idle => "idle",
            LinkState::Connecting => "connecting",
            LinkState::Listening => "listening",
            LinkState::Error => "error",
        }
    }
}

/// Idle -start-> Connecting -ack-> Listening; a failed connection or a
/// dropped stream goes back to Connecting until `max_attempts` consecutive
/// failures, which lands in Error. `stop` returns to Idle from anywhere.
#[derive(Debug, Clone)]
pub struct LinkMachine {
    state: LinkState,
    attempts: u32,
    max_attempts: u32,
}

impl LinkMachine {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: LinkState::Idle,
            attempts: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn start(&mut self) -> LinkState {
        self.attempts = 0;
        self.state = LinkState::Connecting;
        self.state
    }

    pub fn ack(&mut self) -> LinkState {
        if self.state == LinkState::Connecting {
            self.attempts = 0;
            self.state = LinkState::Listening;
        }
        self.state
    }

    /// Record a failed connection attempt or a dropped stream.
    pub fn fail(&mut self) -> LinkState {
        if matches!(self.state, LinkState::Idle | LinkState::Error) {
            return self.state;
        }
        self.attempts += 1;
        self.state = if self.attempts >= self.max_attempts {
            LinkState::Error
        } else {
            LinkState::Connecting
        };
        self.state
    }

    pub fn stop(&mut self) -> LinkState {
        self.attempts = 0;
        self.state = LinkState::Idle;
        self.state
    }
}

/// Drops an expression identical to the last accepted one when it arrives
/// within the window.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    window: Duration,
    last: Option<(String, Instant)>,
}

impl Deduplicator {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn accept(&mut self, expression: &str, now: Instant) -> bool {
        if let Some((last, at)) = &self.last {
            if last == expression && now.saturating_duration_since(*at) < self.window {
                return false;
            }
        }
        self.last = Some((expression.to_string(), now));
        true
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Keep only characters the calculator input accepts.
pub fn sanitize_expression(expression: &str) -> String {
    expression
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '*' | '/' | '%' | '(' | ')' | '.'))
        .collect()
}
