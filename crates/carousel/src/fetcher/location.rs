use std::path::PathBuf;

use url::Url;

const FILE_PREFIX: &str = "file://";

/// Where a resource URL points to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    Network(Url),
    /// Unparseable URL or a scheme the fetcher does not speak
    Unsupported(String),
}

impl Location {
    pub fn parse(raw: &str) -> Self {
        if let Some(path) = raw.strip_prefix(FILE_PREFIX) {
            // Percent-encoded file URLs decode through `url`; raw paths are taken as-is
            return match Url::parse(raw).ok().and_then(|u| u.to_file_path().ok()) {
                Some(decoded) => Location::File(decoded),
                None => Location::File(PathBuf::from(path)),
            };
        }

        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Location::Network(url),
            Ok(url) => Location::Unsupported(format!("unsupported scheme {}", url.scheme())),
            Err(e) => Location::Unsupported(e.to_string()),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Location::Network(_))
    }
}
