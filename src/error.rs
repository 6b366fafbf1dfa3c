// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the pose trainer.

use std::fmt;

/// Result type alias for pose trainer operations.
pub type Result<T> = std::result::Result<T, TrainerError>;

/// Main error type for the pose trainer.
#[derive(Debug)]
pub enum TrainerError {
    /// The camera stream could not be acquired (denied, missing, no matching facing).
    AcquisitionError(String),
    /// Every inference backend candidate failed to initialize.
    BackendError(String),
    /// A reference pose definition could not be fetched or parsed.
    PoseLoadError(String),
    /// No display asset candidate could be loaded for a pose.
    AssetError(String),
    /// The pose estimator failed on a frame.
    InferenceError(String),
    /// Error decoding or encoding images.
    ImageError(String),
    /// Error drawing or presenting a frame.
    RenderError(String),
    /// Invalid configuration provided.
    ConfigError(String),
    /// Malformed JSON input.
    JsonError(String),
    /// Wrapped `std::io::Error`
    Io(std::io::Error),
}

impl TrainerError {
    /// Whether this error prevents a session from starting.
    #[must_use]
    pub const fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            Self::AcquisitionError(_)
                | Self::BackendError(_)
                | Self::PoseLoadError(_)
                | Self::AssetError(_)
                | Self::ConfigError(_)
        )
    }
}

impl fmt::Display for TrainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AcquisitionError(msg) => write!(f, "Camera acquisition error: {msg}"),
            Self::BackendError(msg) => write!(f, "Backend selection error: {msg}"),
            Self::PoseLoadError(msg) => write!(f, "Pose load error: {msg}"),
            Self::AssetError(msg) => write!(f, "Asset error: {msg}"),
            Self::InferenceError(msg) => write!(f, "Inference error: {msg}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::RenderError(msg) => write!(f, "Render error: {msg}"),
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::JsonError(msg) => write!(f, "JSON error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for TrainerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TrainerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for TrainerError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}

impl From<serde_json::Error> for TrainerError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrainerError::PoseLoadError("pose4.json".to_string());
        assert_eq!(err.to_string(), "Pose load error: pose4.json");

        let err = TrainerError::AcquisitionError("permission denied".to_string());
        assert_eq!(err.to_string(), "Camera acquisition error: permission denied");
    }

    #[test]
    fn test_startup_classification() {
        assert!(TrainerError::BackendError("none".into()).is_startup_failure());
        assert!(TrainerError::AssetError("none".into()).is_startup_failure());
        assert!(!TrainerError::InferenceError("oops".into()).is_startup_failure());
    }

    #[test]
    fn test_io_source() {
        use std::error::Error;
        let err = TrainerError::from(std::io::Error::other("disk"));
        assert!(err.source().is_some());
    }
}
