use super::{AppConfig, ClientConfig, DATASET_FILE_NAME, MODEL_FILE_NAME};
use crate::client::ClientSettings;
use crate::session::SessionSettings;
use crate::trigger::TriggerSettings;
use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

const MAX_DEBOUNCE_MS: u64 = 10_000;
const MAX_HEARTBEAT_SECS: u64 = 3_600;
const MAX_QUEUE_CAPACITY: usize = 4_096;
const MIN_TICK_MS: u64 = 5;
const MAX_TICK_MS: u64 = 1_000;
const MAX_DEVICE_NAME_LEN: usize = 256;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize paths.
    pub fn validate(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            bail!("--host must not be empty");
        }
        self.host = self.host.trim().to_string();
        if self.port == 0 {
            bail!("--port must be between 1 and 65535");
        }
        if self.debounce_ms > MAX_DEBOUNCE_MS {
            bail!(
                "--debounce-ms must be between 0 and {MAX_DEBOUNCE_MS}, got {}",
                self.debounce_ms
            );
        }
        if !(1..=MAX_HEARTBEAT_SECS).contains(&self.heartbeat_secs) {
            bail!(
                "--heartbeat-secs must be between 1 and {MAX_HEARTBEAT_SECS}, got {}",
                self.heartbeat_secs
            );
        }
        if !(1..=MAX_QUEUE_CAPACITY).contains(&self.subscriber_capacity) {
            bail!(
                "--subscriber-capacity must be between 1 and {MAX_QUEUE_CAPACITY}, got {}",
                self.subscriber_capacity
            );
        }
        if !(1..=MAX_QUEUE_CAPACITY).contains(&self.segment_capacity) {
            bail!(
                "--segment-capacity must be between 1 and {MAX_QUEUE_CAPACITY}, got {}",
                self.segment_capacity
            );
        }
        if !(MIN_TICK_MS..=MAX_TICK_MS).contains(&self.tick_ms) {
            bail!(
                "--tick-ms must be between {MIN_TICK_MS} and {MAX_TICK_MS}, got {}",
                self.tick_ms
            );
        }
        if !(0.0..=1.0).contains(&self.low_confidence_threshold) {
            bail!(
                "--low-confidence must be between 0.0 and 1.0, got {}",
                self.low_confidence_threshold
            );
        }
        if let Some(device) = &self.input_device {
            if device.trim().is_empty()
                || device.len() > MAX_DEVICE_NAME_LEN
                || device.chars().any(char::is_control)
            {
                bail!(
                    "--input-device must be 1-{MAX_DEVICE_NAME_LEN} characters with no control characters"
                );
            }
        }
        if self.data_dir.as_os_str().is_empty() {
            bail!("--data-dir must not be empty");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.dataset
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DATASET_FILE_NAME))
    }

    pub fn model_path(&self) -> PathBuf {
        self.model
            .clone()
            .unwrap_or_else(|| self.data_dir.join(MODEL_FILE_NAME))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    /// Snapshot the CLI-controlled ingestion settings for the session manager.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            segment_capacity: self.segment_capacity,
            tick: Duration::from_millis(self.tick_ms),
            trigger: TriggerSettings {
                debounce: Duration::from_millis(self.debounce_ms),
                low_confidence_threshold: self.low_confidence_threshold,
            },
        }
    }
}

impl ClientConfig {
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&mut self) -> Result<()> {
        let url = self.server_url.trim().trim_end_matches('/');
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("--server must be an http:// or https:// URL, got '{}'", self.server_url);
        }
        self.server_url = url.to_string();
        if !(1..=10).contains(&self.max_attempts) {
            bail!(
                "--max-attempts must be between 1 and 10, got {}",
                self.max_attempts
            );
        }
        if self.reconnect_delay_ms > 60_000 {
            bail!(
                "--reconnect-delay-ms must be at most 60000, got {}",
                self.reconnect_delay_ms
            );
        }
        if self.dedup_window_ms > 5_000 {
            bail!(
                "--dedup-window-ms must be at most 5000, got {}",
                self.dedup_window_ms
            );
        }
        if !(100..=600_000).contains(&self.idle_timeout_ms) {
            bail!(
                "--idle-timeout-ms must be between 100 and 600000, got {}",
                self.idle_timeout_ms
            );
        }
        Ok(())
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            server_url: self.server_url.clone(),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            max_attempts: self.max_attempts,
            dedup_window: Duration::from_millis(self.dedup_window_ms),
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
        }
    }
}
