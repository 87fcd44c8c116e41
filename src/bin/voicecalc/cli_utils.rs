use anyhow::Result;
use std::sync::Arc;
use voicecalc::config::AppConfig;
use voicecalc::session::{ExternalFeed, SpeechSource};

pub(crate) fn list_input_devices() -> Result<()> {
    // Support VOICECALC_TEST_DEVICES for testing
    let devices = if let Ok(raw) = std::env::var("VOICECALC_TEST_DEVICES") {
        raw.split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    } else {
        detected_devices()
    };

    if devices.is_empty() {
        println!("No audio input devices detected.");
    } else {
        println!("Available audio input devices:");
        for name in devices {
            println!("  - {name}");
        }
    }
    Ok(())
}

#[cfg(feature = "mic-probe")]
fn detected_devices() -> Vec<String> {
    voicecalc::session::MicrophoneProbe::list_devices().unwrap_or_else(|err| {
        eprintln!("Failed to list audio input devices: {err}");
        Vec::new()
    })
}

#[cfg(not(feature = "mic-probe"))]
fn detected_devices() -> Vec<String> {
    eprintln!("Failed to list audio input devices: built without the 'mic-probe' feature");
    Vec::new()
}

/// Pick the speech source the session acquires on start.
pub(crate) fn select_source(config: &AppConfig) -> Arc<dyn SpeechSource> {
    if !config.require_mic {
        return Arc::new(ExternalFeed);
    }
    microphone_source(config)
}

#[cfg(feature = "mic-probe")]
fn microphone_source(config: &AppConfig) -> Arc<dyn SpeechSource> {
    Arc::new(voicecalc::session::MicrophoneProbe::new(
        config.input_device.clone(),
    ))
}

#[cfg(not(feature = "mic-probe"))]
fn microphone_source(_config: &AppConfig) -> Arc<dyn SpeechSource> {
    Arc::new(voicecalc::session::UnavailableSource::new(
        "microphone support not built (enable the 'mic-probe' feature)",
    ))
}

pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!("Ctrl+C handler unavailable: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!("SIGTERM handler unavailable: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
