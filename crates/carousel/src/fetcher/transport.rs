//! Network transport used by fetch jobs.
//!
//! The HTTP implementation runs on rustls, which is thread-safe on its own;
//! no process-wide locking setup is needed before workers start issuing
//! requests.

use std::net::{IpAddr, Ipv4Addr};

use bytes::Bytes;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use tracing::debug;
use url::Url;

use crate::EngineError;
use crate::config::FetchConfig;

/// Response of one completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code, `0` when the server sent none
    pub status: u32,
    pub body: Bytes,
}

/// Transport failure of one attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Transient failure: timeouts, connect/DNS failures, send/receive errors, malformed replies
    #[error("Retryable transport error: {0}")]
    Retryable(String),

    #[error("Transport error: {0}")]
    Fatal(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Retryable(_))
    }
}

/// A single blocking GET.
///
/// Implementations are shared by every worker thread.
pub trait Transport: Send + Sync {
    fn get(&self, url: &Url) -> Result<TransportResponse, TransportError>;
}

/// Create a blocking reqwest Client with the provided configuration
pub fn create_client(config: &FetchConfig) -> Result<Client, EngineError> {
    let mut client_builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(if config.follow_redirects {
            Policy::limited(config.max_redirects)
        } else {
            Policy::none()
        });

    if !config.timeout.is_zero() {
        client_builder = client_builder.timeout(config.timeout);
    }

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    if config.force_ipv4 {
        // Binding the unspecified IPv4 address keeps every connection on IPv4
        client_builder = client_builder.local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }

    if !config.use_system_proxy {
        client_builder = client_builder.no_proxy();
        debug!("Proxy disabled for fetches");
    }

    client_builder.build().map_err(EngineError::from)
}

/// Classify a reqwest failure for the retry loop
pub fn classify(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() || err.is_decode()
    {
        TransportError::Retryable(err.to_string())
    } else {
        TransportError::Fatal(err.to_string())
    }
}

/// [`Transport`] backed by a blocking reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &FetchConfig) -> Result<Self, EngineError> {
        Ok(Self {
            client: create_client(config)?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &Url) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| classify(&e))?;

        let status = u32::from(response.status().as_u16());
        let body = response.bytes().map_err(|e| classify(&e))?;

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::fetcher::fetch_network;
    use crate::test_utils::{http_reply, init_tracing, refused_url, serve};
    use std::time::Duration;

    fn local_config() -> FetchConfig {
        FetchConfig {
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            use_system_proxy: false,
            ..FetchConfig::default()
        }
    }

    fn transport() -> HttpTransport {
        HttpTransport::new(&local_config()).unwrap()
    }

    #[test]
    fn refused_connection_is_retryable() {
        init_tracing();
        let url = Url::parse(&refused_url()).unwrap();
        let err = transport().get(&url).unwrap_err();
        assert!(err.is_retryable(), "{err}");
    }

    #[test]
    fn malformed_reply_is_retryable() {
        let (base, server) = serve(vec![b"definitely not http\r\n\r\n".to_vec()]);
        let url = Url::parse(&format!("{base}/feed.json")).unwrap();
        let err = transport().get(&url).unwrap_err();
        assert!(err.is_retryable(), "{err}");
        server.join().unwrap();
    }

    #[test]
    fn returns_status_and_body() {
        let (base, server) = serve(vec![http_reply("404 Not Found", "gone")]);
        let url = Url::parse(&format!("{base}/missing.png")).unwrap();
        let response = transport().get(&url).unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.body, Bytes::from_static(b"gone"));
        server.join().unwrap();
    }

    #[test]
    fn server_error_then_success_over_http() {
        init_tracing();
        let (base, server) = serve(vec![
            http_reply("503 Service Unavailable", ""),
            http_reply("200 OK", "ABC"),
        ]);
        let url = Url::parse(&format!("{base}/feed.json")).unwrap();
        let mut sleeps = Vec::new();

        let outcome = fetch_network(&url, &transport(), &local_config(), &mut |d| {
            sleeps.push(d)
        });

        assert_eq!(outcome.error, ErrorKind::None);
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.payload, Bytes::from_static(b"ABC"));
        assert_eq!(sleeps, vec![Duration::from_millis(100)]);
        server.join().unwrap();
    }

    #[test]
    fn client_honours_disabled_redirects() {
        let redirect = concat!(
            "HTTP/1.1 302 Found\r\n",
            "Location: /elsewhere\r\n",
            "Content-Length: 0\r\n",
            "Connection: close\r\n\r\n"
        );
        let (base, server) = serve(vec![redirect.as_bytes().to_vec()]);
        let config = FetchConfig {
            follow_redirects: false,
            ..local_config()
        };
        let transport = HttpTransport::from_client(create_client(&config).unwrap());
        let url = Url::parse(&format!("{base}/feed.json")).unwrap();

        let response = transport.get(&url).unwrap();
        assert_eq!(response.status, 302);
        assert!(response.body.is_empty());
        server.join().unwrap();
    }
}
