use std::fmt;

/// Outcome category reported alongside every fetched or produced resource.
///
/// Failures are delivered to callbacks as data; nothing crossing a worker
/// thread boundary is ever propagated as a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum ErrorKind {
    #[default]
    None = 0,
    /// The fetch work panicked and the job caught it
    Exception = 1,
    /// Empty URL supplied
    NoResourceName = 2,
    /// File target missing or unreadable
    NoResource = 3,
    /// Short read from a local file
    IoError = 4,
    /// Transport failure that is not worth retrying
    Curl = 5,
    /// Retry budget exhausted
    HttpFailed = 6,
    /// Payload arrived but the resource could not be built from it
    CouldNotCreateResource = 7,
    JsonParseError = 8,
    /// Success path produced zero bytes
    EmptyResponse = 9,
}

impl ErrorKind {
    pub fn is_ok(self) -> bool {
        self == ErrorKind::None
    }

    /// Stable numeric code
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorKind::None => "none",
            ErrorKind::Exception => "exception",
            ErrorKind::NoResourceName => "no resource name",
            ErrorKind::NoResource => "no resource",
            ErrorKind::IoError => "I/O error",
            ErrorKind::Curl => "transport error",
            ErrorKind::HttpFailed => "HTTP failed",
            ErrorKind::CouldNotCreateResource => "could not create resource",
            ErrorKind::JsonParseError => "JSON parse error",
            ErrorKind::EmptyResponse => "empty response",
        };
        f.write_str(text)
    }
}

/// Errors raised while setting the engine up
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorKind::None.code(), 0);
        assert_eq!(ErrorKind::Curl.code(), 5);
        assert_eq!(ErrorKind::HttpFailed.code(), 6);
        assert_eq!(ErrorKind::EmptyResponse.code(), 9);
        assert!(ErrorKind::default().is_ok());
        assert!(!ErrorKind::NoResource.is_ok());
    }

    #[test]
    fn engine_error_messages() {
        let err = EngineError::InvalidConfig("workers must be greater than 0".into());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: workers must be greater than 0"
        );
        assert_eq!(ErrorKind::JsonParseError.to_string(), "JSON parse error");
    }
}
