use std::path::PathBuf;

/// Result alias that carries the crate's [`RingsideError`].
pub type Result<T> = std::result::Result<T, RingsideError>;

/// Failures at the edges of the timer: settings persistence, file watching,
/// audio output and the terminal. The timer engine itself never fails.
#[derive(Debug, thiserror::Error)]
pub enum RingsideError {
    #[error("failed to read settings from {path}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write settings to {path}")]
    WriteConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode settings")]
    Encode(#[from] serde_json::Error),

    #[error("failed to watch settings file {path}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// The audio device could not be opened or refused a stream.
    #[error("audio output unavailable: {0}")]
    Audio(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RingsideError {
    pub fn audio<T: Into<String>>(msg: T) -> Self {
        Self::Audio(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_error_names_the_path() {
        let err = RingsideError::WriteConfig {
            path: PathBuf::from("/tmp/settings.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/tmp/settings.json"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn audio_helper_wraps_message() {
        let err = RingsideError::audio("no default device");
        assert_eq!(err.to_string(), "audio output unavailable: no default device");
    }
}
