//! Audio error types

use thiserror::Error;

/// Errors produced inside the audio engine
///
/// None of these ever reach the public playback API: callers of
/// [`crate::SoundSystem`] only observe "less sound", never a failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// The output device could not be opened or has gone away
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The output stream was used before being opened
    #[error("Audio backend not initialized")]
    BackendNotInitialized,

    /// A node could not be handed to the render thread
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    /// A primitive was built with an unusable parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Reject non-finite or non-positive values before they reach the render thread
pub(crate) fn ensure_positive(name: &str, value: f32) -> Result<f32, AudioError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(AudioError::InvalidParameter(format!("{name} must be positive, got {value}")))
    }
}

/// Reject NaN/infinite values, allowing zero and negatives
pub(crate) fn ensure_finite(name: &str, value: f32) -> Result<f32, AudioError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AudioError::InvalidParameter(format!("{name} must be finite, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_validation() {
        assert_eq!(ensure_positive("freq", 440.0), Ok(440.0));
        assert!(ensure_positive("freq", 0.0).is_err());
        assert!(ensure_positive("freq", f32::NAN).is_err());
        assert_eq!(ensure_finite("delay", 0.0), Ok(0.0));
        assert!(ensure_finite("delay", f32::INFINITY).is_err());
    }
}
