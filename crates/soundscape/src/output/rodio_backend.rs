//! Rodio audio backend implementation
//!
//! Uses the Rodio library for cross-platform audio output. The whole engine
//! is a single infinite [`MixerSource`] appended to one [`Sink`].

use super::{MixerSource, OutputBackend};
use crate::error::AudioError;
use rodio::{OutputStream, OutputStreamHandle, Sink};

/// Rodio-based output backend
pub struct RodioBackend {
    /// Audio output stream (must be kept alive)
    _output_stream: Option<OutputStream>,
    /// Output stream handle for creating sinks
    stream_handle: Option<OutputStreamHandle>,
    /// Sink playing the mixer
    sink: Option<Sink>,
}

impl RodioBackend {
    /// Create a backend; the device is opened on `start`
    pub fn new() -> Self {
        Self {
            _output_stream: None,
            stream_handle: None,
            sink: None,
        }
    }

    fn open_stream(&mut self) -> Result<&OutputStreamHandle, AudioError> {
        if self.stream_handle.is_none() {
            let (stream, handle) = OutputStream::try_default()
                .map_err(|e| AudioError::DeviceUnavailable(format!("Failed to create audio output: {e}")))?;
            self._output_stream = Some(stream);
            self.stream_handle = Some(handle);
        }
        self.stream_handle.as_ref().ok_or(AudioError::BackendNotInitialized)
    }
}

impl OutputBackend for RodioBackend {
    fn name(&self) -> &'static str {
        "rodio"
    }

    fn start(&mut self, source: MixerSource) -> Result<(), AudioError> {
        if let Some(old) = self.sink.take() {
            old.stop();
        }

        let sink = match Sink::try_new(self.open_stream()?) {
            Ok(sink) => sink,
            Err(e) => {
                // The device may have changed underneath us; reopen next time
                self.stream_handle = None;
                self._output_stream = None;
                return Err(AudioError::DeviceUnavailable(format!("Failed to create sink: {e}")));
            }
        };

        sink.append(source);
        sink.play();
        self.sink = Some(sink);
        Ok(())
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        let sink = self.sink.as_ref().ok_or(AudioError::BackendNotInitialized)?;
        if sink.is_paused() {
            sink.play();
        }
        Ok(())
    }
}

impl Default for RodioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RodioBackend {
    fn drop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        log::info!("Rodio audio backend shutdown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_before_start_fails() {
        let mut backend = RodioBackend::new();
        assert!(matches!(backend.resume(), Err(AudioError::BackendNotInitialized)));
    }

    #[test]
    fn test_start_with_real_device() {
        use crate::output::BusGains;
        use std::sync::atomic::AtomicU64;
        use std::sync::{mpsc, Arc};

        let mut backend = RodioBackend::new();
        let (_tx, rx) = mpsc::channel();
        let source = MixerSource::new(rx, Arc::new(BusGains::new(0.0)), Arc::new(AtomicU64::new(0)), 44_100, 512);

        // May fail in CI/test environments without audio device
        if backend.start(source).is_ok() {
            assert!(backend.resume().is_ok());
        }
    }
}
