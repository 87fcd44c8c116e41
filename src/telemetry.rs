use crate::config::{AppConfig, LogLevel};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use tracing_subscriber::fmt::time::UtcTime;

static TRACING_INIT: OnceLock<()> = OnceLock::new();
static LOG_CONTENT_ENABLED: AtomicBool = AtomicBool::new(false);

/// Whether transcript text may appear in logs.
pub fn log_content_enabled() -> bool {
    LOG_CONTENT_ENABLED.load(Ordering::Relaxed)
}

/// Install the global subscriber for the service. Safe to call more than once;
/// only the first call takes effect. Returns the trace file in use, if any.
pub fn init_tracing(config: &AppConfig) -> Option<PathBuf> {
    LOG_CONTENT_ENABLED.store(config.log_content && !config.no_logs, Ordering::Relaxed);
    if config.no_logs {
        return None;
    }

    let level = config.log_level.as_tracing();
    match &config.trace_log {
        Some(path) => {
            let mut installed = None;
            TRACING_INIT.get_or_init(|| match open_trace_file(path) {
                Ok(file) => {
                    let subscriber = tracing_subscriber::fmt()
                        .json()
                        .with_timer(UtcTime::rfc_3339())
                        .with_max_level(level)
                        .with_writer(file)
                        .with_current_span(false)
                        .with_span_list(false)
                        .finish();
                    if tracing::subscriber::set_global_default(subscriber).is_ok() {
                        installed = Some(path.clone());
                    }
                }
                Err(err) => eprintln!("trace log {} unavailable: {err}", path.display()),
            });
            installed
        }
        None => {
            init_stderr_tracing(config.log_level);
            None
        }
    }
}

/// Human-readable logs on stderr, used by the client and by the service when
/// no trace file is configured.
pub fn init_stderr_tracing(level: LogLevel) {
    let _ = TRACING_INIT.get_or_init(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level.as_tracing())
            .with_timer(UtcTime::rfc_3339())
            .with_target(false)
            .with_writer(io::stderr)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

fn open_trace_file(path: &Path) -> io::Result<fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
