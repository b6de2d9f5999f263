use std::fs::File;
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::ErrorKind;
use crate::config::FetchConfig;
use crate::fetcher::location::Location;
use crate::fetcher::retry::RetryState;
use crate::fetcher::transport::{Transport, TransportError};
use crate::pool::Job;

/// Result of one fetch, handed to the fetch callback
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchOutcome {
    pub error: ErrorKind,
    /// HTTP status of the last attempt; `0` for file fetches
    pub status: u32,
    pub payload: Bytes,
}

impl FetchOutcome {
    pub fn success(status: u32, payload: Bytes) -> Self {
        Self {
            error: ErrorKind::None,
            status,
            payload,
        }
    }

    pub fn failure(error: ErrorKind, status: u32) -> Self {
        Self {
            error,
            status,
            payload: Bytes::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_ok()
    }
}

/// Completion callback of a fetch. Runs on the worker thread that executed the job.
pub type FetchCallback = Box<dyn FnOnce(FetchOutcome) + Send + 'static>;

/// Read a whole local file
pub fn load_file(path: &Path) -> FetchOutcome {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Cannot open file");
            return FetchOutcome::failure(ErrorKind::NoResource, 0);
        }
    };

    let expected = match file.metadata() {
        Ok(metadata) => metadata.len(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Cannot stat file");
            return FetchOutcome::failure(ErrorKind::IoError, 0);
        }
    };

    let mut buffer = Vec::with_capacity(usize::try_from(expected).unwrap_or(0));
    match file.read_to_end(&mut buffer) {
        Ok(read) if read as u64 == expected => FetchOutcome::success(0, Bytes::from(buffer)),
        Ok(read) => {
            debug!(path = %path.display(), read, expected, "Short read");
            FetchOutcome::failure(ErrorKind::IoError, 0)
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Read failed");
            FetchOutcome::failure(ErrorKind::IoError, 0)
        }
    }
}

/// GET `url` with the retry/backoff policy of `config`.
///
/// `sleep` is called once per retry with the backoff to wait.
pub fn fetch_network(
    url: &Url,
    transport: &dyn Transport,
    config: &FetchConfig,
    sleep: &mut dyn FnMut(Duration),
) -> FetchOutcome {
    let mut retry = RetryState::new(config.max_retries);

    let (mut error, status, payload) = loop {
        let status = match transport.get(url) {
            Ok(response) => {
                // A 200 must carry a body; anything else below 500 ends the loop as-is
                let settled = response.status > 0
                    && response.status < 500
                    && (response.status != 200 || !response.body.is_empty());
                if settled {
                    break (ErrorKind::None, response.status, response.body);
                }
                response.status
            }
            Err(TransportError::Retryable(reason)) => {
                debug!(%url, %reason, "Retryable transport failure");
                0
            }
            Err(TransportError::Fatal(reason)) => {
                warn!(%url, %reason, "Transport failure");
                break (ErrorKind::Curl, 0, Bytes::new());
            }
        };

        if !retry.can_retry() {
            warn!(%url, status, retries = retry.retry_count, "Retry budget exhausted");
            break (ErrorKind::HttpFailed, status, Bytes::new());
        }

        let backoff = retry.next_backoff(config.backoff_base, config.jitter);
        debug!(
            %url,
            status,
            retry = retry.retry_count + 1,
            backoff_ms = backoff.as_millis() as u64,
            "Retrying fetch"
        );
        sleep(backoff);
        retry.record(backoff);
    };

    if error.is_ok() && payload.is_empty() {
        error = ErrorKind::EmptyResponse;
    }

    FetchOutcome {
        error,
        status,
        payload,
    }
}

/// Resolve and fetch one URL, dispatching on its scheme
pub fn retrieve(
    raw_url: &str,
    transport: &dyn Transport,
    config: &FetchConfig,
    sleep: &mut dyn FnMut(Duration),
) -> FetchOutcome {
    if raw_url.is_empty() {
        return FetchOutcome::failure(ErrorKind::NoResourceName, 0);
    }
    fetch_location(raw_url, &Location::parse(raw_url), transport, config, sleep)
}

fn fetch_location(
    raw_url: &str,
    location: &Location,
    transport: &dyn Transport,
    config: &FetchConfig,
    sleep: &mut dyn FnMut(Duration),
) -> FetchOutcome {
    match location {
        Location::File(path) => load_file(path),
        Location::Network(url) => fetch_network(url, transport, config, sleep),
        Location::Unsupported(reason) => {
            warn!(url = raw_url, %reason, "Cannot fetch URL");
            FetchOutcome::failure(ErrorKind::Curl, 0)
        }
    }
}

/// One queued fetch
pub struct FetchJob {
    url: String,
    callback: FetchCallback,
    transport: Arc<dyn Transport>,
    config: Arc<FetchConfig>,
}

impl FetchJob {
    pub fn new(
        url: String,
        callback: FetchCallback,
        transport: Arc<dyn Transport>,
        config: Arc<FetchConfig>,
    ) -> Self {
        Self {
            url,
            callback,
            transport,
            config,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Job for FetchJob {
    fn execute(self) {
        let FetchJob {
            url,
            callback,
            transport,
            config,
        } = self;

        debug!(%url, "Fetching");
        let work = panic::catch_unwind(AssertUnwindSafe(|| {
            if url.is_empty() {
                return FetchOutcome::failure(ErrorKind::NoResourceName, 0);
            }
            let location = Location::parse(&url);
            let outcome =
                fetch_location(&url, &location, transport.as_ref(), &config, &mut thread::sleep);
            if !config.stress.is_zero() && location.is_network() {
                thread::sleep(config.stress);
            }
            outcome
        }));

        let outcome = match work {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(%url, "Fetch panicked");
                FetchOutcome::failure(ErrorKind::Exception, 0)
            }
        };

        debug!(
            %url,
            error = %outcome.error,
            status = outcome.status,
            bytes = outcome.payload.len(),
            "Fetch done"
        );
        if config.verbose && !is_image_url(&url) {
            trace!(%url, body = %String::from_utf8_lossy(&outcome.payload), "Response body");
        }

        callback(outcome);
    }
}

fn is_image_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    [".jpg", ".jpeg", ".png"]
        .iter()
        .any(|ext| path.to_ascii_lowercase().ends_with(ext))
}
