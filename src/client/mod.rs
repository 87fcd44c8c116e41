//! Client side of the event stream: reconnecting consumer that feeds a
//! host calculator.

mod consumer;
mod link;
mod sse;

pub use consumer::{
    CalculatorHost, ClientSettings, StopHandle, StreamConsumer, DEFAULT_IDLE_TIMEOUT_MS,
    DEFAULT_RECONNECT_DELAY_MS,
};
pub use link::{
    sanitize_expression, Deduplicator, LinkMachine, LinkState, DEFAULT_DEDUP_WINDOW_MS,
    DEFAULT_MAX_ATTEMPTS,
};
pub use sse::{SseFrame, SseParser};
