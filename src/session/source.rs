use crate::error::VoiceError;

/// The speech resource a session acquires before it starts listening.
///
/// Recognized text never flows through this trait; the speech engine pushes
/// segments through the session's ingestion entry point. The source only
/// answers whether the resource is there and holds it while listening.
pub trait SpeechSource: Send + Sync {
    fn name(&self) -> String;

    /// Availability check that acquires nothing.
    fn probe(&self) -> Result<(), VoiceError>;

    fn acquire(&self) -> Result<(), VoiceError> {
        self.probe()
    }

    fn release(&self) {}
}

/// Segments arrive from an external speech engine over HTTP or stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExternalFeed;

impl SpeechSource for ExternalFeed {
    fn name(&self) -> String {
        "external transcript feed".to_string()
    }

    fn probe(&self) -> Result<(), VoiceError> {
        Ok(())
    }
}

/// A source that can never be acquired, e.g. a microphone was required but
/// the binary was built without device support.
#[derive(Debug, Clone)]
pub struct UnavailableSource {
    reason: String,
}

impl UnavailableSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl SpeechSource for UnavailableSource {
    fn name(&self) -> String {
        "unavailable".to_string()
    }

    fn probe(&self) -> Result<(), VoiceError> {
        Err(VoiceError::ResourceUnavailable(self.reason.clone()))
    }
}

/// Checks that a capture device exists before a session starts.
#[cfg(feature = "mic-probe")]
#[derive(Debug, Clone, Default)]
pub struct MicrophoneProbe {
    preferred_device: Option<String>,
}

#[cfg(feature = "mic-probe")]
impl MicrophoneProbe {
    pub fn new(preferred_device: Option<String>) -> Self {
        Self { preferred_device }
    }

    pub fn list_devices() -> Result<Vec<String>, VoiceError> {
        use cpal::traits::{DeviceTrait, HostTrait};

        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|err| VoiceError::ResourceUnavailable(format!("no input devices: {err}")))?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }

    fn device_name(&self) -> Result<String, VoiceError> {
        use cpal::traits::{DeviceTrait, HostTrait};

        let host = cpal::default_host();
        let device = match self.preferred_device.as_deref() {
            Some(name) => {
                let mut devices = host.input_devices().map_err(|err| {
                    VoiceError::ResourceUnavailable(format!("no input devices: {err}"))
                })?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| {
                        VoiceError::ResourceUnavailable(format!("input device '{name}' not found"))
                    })?
            }
            None => host.default_input_device().ok_or_else(|| {
                VoiceError::ResourceUnavailable("no microphone detected on this host".to_string())
            })?,
        };
        Ok(device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string()))
    }
}

#[cfg(feature = "mic-probe")]
impl SpeechSource for MicrophoneProbe {
    fn name(&self) -> String {
        self.device_name()
            .unwrap_or_else(|_| "microphone (missing)".to_string())
    }

    fn probe(&self) -> Result<(), VoiceError> {
        self.device_name().map(|_| ())
    }

    fn acquire(&self) -> Result<(), VoiceError> {
        let name = self.device_name()?;
        tracing::info!(device = %name, "microphone acquired");
        Ok(())
    }
}
