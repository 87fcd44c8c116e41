//! Command-line parsing and validation helpers.

mod validation;

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::client::{
    DEFAULT_DEDUP_WINDOW_MS, DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_RECONNECT_DELAY_MS,
};
use crate::hub::{DEFAULT_HEARTBEAT_SECS, DEFAULT_SUBSCRIBER_CAPACITY};
use crate::intent::LOW_CONFIDENCE_THRESHOLD;
use crate::session::{DEFAULT_SEGMENT_CAPACITY, DEFAULT_TICK_MS};
use crate::trigger::DEFAULT_DEBOUNCE_MS;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DATASET_FILE_NAME: &str = "intent_dataset.json";
pub const MODEL_FILE_NAME: &str = "intent_model.json";

/// CLI options for the voice calculator service.
#[derive(Debug, Parser, Clone)]
#[command(about = "Voice calculator control service", author, version)]
pub struct AppConfig {
    /// Interface the HTTP server binds to
    #[arg(long, env = "VOICE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port the HTTP server binds to
    #[arg(long, env = "VOICE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory holding the training dataset and the persisted model
    #[arg(long = "data-dir", env = "VOICECALC_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Training dataset override (defaults to <data-dir>/intent_dataset.json)
    #[arg(long = "dataset")]
    pub dataset: Option<PathBuf>,

    /// Persisted model override (defaults to <data-dir>/intent_model.json)
    #[arg(long = "model")]
    pub model: Option<PathBuf>,

    /// Minimum spacing between partial expression updates (milliseconds)
    #[arg(long = "debounce-ms", default_value_t = DEFAULT_DEBOUNCE_MS)]
    pub debounce_ms: u64,

    /// Idle interval before a heartbeat is sent to stream subscribers (seconds)
    #[arg(long = "heartbeat-secs", default_value_t = DEFAULT_HEARTBEAT_SECS)]
    pub heartbeat_secs: u64,

    /// Per-subscriber event queue size
    #[arg(long = "subscriber-capacity", default_value_t = DEFAULT_SUBSCRIBER_CAPACITY)]
    pub subscriber_capacity: usize,

    /// Pending transcript segment queue size
    #[arg(long = "segment-capacity", default_value_t = DEFAULT_SEGMENT_CAPACITY)]
    pub segment_capacity: usize,

    /// Ingestion worker tick (milliseconds)
    #[arg(long = "tick-ms", default_value_t = DEFAULT_TICK_MS)]
    pub tick_ms: u64,

    /// Classifier confidence below which a repeat hint is published
    #[arg(long = "low-confidence", default_value_t = LOW_CONFIDENCE_THRESHOLD)]
    pub low_confidence_threshold: f32,

    /// Read transcript segments from stdin, one per line
    #[arg(long = "stdin-feed", default_value_t = false)]
    pub stdin_feed: bool,

    /// Start listening as soon as the server is up
    #[arg(long = "auto-start", default_value_t = false)]
    pub auto_start: bool,

    /// Refuse to start a session unless a microphone is present
    #[arg(long = "require-mic", default_value_t = false)]
    pub require_mic: bool,

    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Write JSON trace logs to this file instead of stderr
    #[arg(long = "trace-log", env = "VOICECALC_TRACE_LOG")]
    pub trace_log: Option<PathBuf>,

    /// Maximum log level
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Disable all logging (overrides --trace-log and --log-level)
    #[arg(long = "no-logs", env = "VOICECALC_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow transcript text in debug logs
    #[arg(
        long = "log-content",
        env = "VOICECALC_LOG_CONTENT",
        default_value_t = false
    )]
    pub log_content: bool,
}

/// CLI options for the reference stream client.
#[derive(Debug, Parser, Clone)]
#[command(about = "Voice calculator stream client", author, version)]
pub struct ClientConfig {
    /// Base URL of the voice calculator service
    #[arg(long = "server", env = "VOICECALC_SERVER", default_value = "http://127.0.0.1:8000")]
    pub server_url: String,

    /// Delay between reconnect attempts (milliseconds)
    #[arg(long = "reconnect-delay-ms", default_value_t = DEFAULT_RECONNECT_DELAY_MS)]
    pub reconnect_delay_ms: u64,

    /// Consecutive failed attempts before giving up
    #[arg(long = "max-attempts", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Window in which a repeated expression is ignored (milliseconds)
    #[arg(long = "dedup-window-ms", default_value_t = DEFAULT_DEDUP_WINDOW_MS)]
    pub dedup_window_ms: u64,

    /// Silence on a connected stream before it is treated as lost (milliseconds)
    #[arg(long = "idle-timeout-ms", default_value_t = DEFAULT_IDLE_TIMEOUT_MS)]
    pub idle_timeout_ms: u64,

    /// Maximum log level
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,
}

/// Log verbosity accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_tracing(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
