//! # Resource fetcher
//!
//! Asynchronous retrieval of `file://` and `http(s)://` resources on a
//! [`WorkerPool`]. Every fetch ends in exactly one callback invocation on a
//! worker thread, carrying an [`ErrorKind`], the last HTTP status and the
//! payload.
//!
//! Network fetches retry transient failures and 5xx replies with exponential
//! backoff; see [`FetchConfig`] for the knobs.

mod job;
mod location;
mod retry;
mod transport;

use std::sync::Arc;

use tracing::{debug, info};

pub use job::{FetchCallback, FetchJob, FetchOutcome, fetch_network, load_file, retrieve};
pub use location::Location;
pub use retry::{RetryState, backoff_for};
pub use transport::{
    HttpTransport, Transport, TransportError, TransportResponse, classify, create_client,
};

use crate::config::FetchConfig;
use crate::pool::WorkerPool;
use crate::{EngineError, ErrorKind};

/// Fetches resources on a pool of worker threads
pub struct ResourceFetcher {
    pool: WorkerPool<FetchJob>,
    transport: Arc<dyn Transport>,
    config: Arc<FetchConfig>,
}

impl ResourceFetcher {
    /// Create a fetcher backed by a blocking HTTP client.
    ///
    /// # Errors
    ///
    /// Fails when `workers` is zero, a worker thread cannot be spawned or the
    /// HTTP client cannot be built.
    pub fn new(workers: usize, config: FetchConfig) -> Result<Self, EngineError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Self::with_transport(workers, config, transport)
    }

    /// Create a fetcher over a custom transport
    pub fn with_transport(
        workers: usize,
        config: FetchConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, EngineError> {
        let pool = WorkerPool::new(workers)?;
        info!(
            workers,
            max_retries = config.max_retries,
            "Resource fetcher started"
        );
        Ok(Self {
            pool,
            transport,
            config: Arc::new(config),
        })
    }

    /// Queue a fetch of `url`.
    ///
    /// An empty URL completes synchronously with [`ErrorKind::NoResourceName`]
    /// and queues nothing.
    pub fn fetch<F>(&self, url: impl Into<String>, callback: F)
    where
        F: FnOnce(FetchOutcome) + Send + 'static,
    {
        let url = url.into();
        if url.is_empty() {
            debug!("Fetch requested without a resource name");
            callback(FetchOutcome::failure(ErrorKind::NoResourceName, 0));
            return;
        }

        self.pool.add(FetchJob::new(
            url,
            Box::new(callback),
            Arc::clone(&self.transport),
            Arc::clone(&self.config),
        ));
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn pool(&self) -> &WorkerPool<FetchJob> {
        &self.pool
    }

    /// Number of fetch jobs executed so far
    pub fn executions(&self) -> u64 {
        self.pool.executions()
    }

    /// Stop the workers. Queued fetches are dropped without a callback.
    pub fn shutdown(&self) -> Result<(), EngineError> {
        self.pool.shutdown()
    }
}
