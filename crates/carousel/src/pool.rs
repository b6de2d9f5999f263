//! Fixed-size worker pool draining one shared FIFO queue.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info};

use crate::EngineError;

/// A unit of work executed on a pool thread.
///
/// `execute` must not panic: a job is responsible for turning its own
/// failures into a reported outcome. A panic takes the worker thread down
/// with it.
pub trait Job: Send + 'static {
    fn execute(self);
}

/// Execution counters of a single worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub executions: u64,
    pub total_time: Duration,
    pub longest_time: Duration,
}

impl WorkerStats {
    fn record(&mut self, elapsed: Duration) {
        self.executions += 1;
        self.total_time += elapsed;
        if elapsed > self.longest_time {
            self.longest_time = elapsed;
        }
    }

    pub fn average_time(&self) -> Duration {
        if self.executions == 0 {
            return Duration::ZERO;
        }
        self.total_time.div_f64(self.executions as f64)
    }
}

struct Queue<J> {
    jobs: VecDeque<J>,
    running: bool,
    max_depth: usize,
}

struct Shared<J> {
    queue: Mutex<Queue<J>>,
    available: Condvar,
    stats: Mutex<Vec<WorkerStats>>,
}

/// A fixed set of OS threads pulling jobs of type `J` in submission order.
///
/// Shutdown lets every in-flight job finish and drops whatever is still
/// queued; dropped jobs are never executed.
pub struct WorkerPool<J: Job> {
    shared: Arc<Shared<J>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<J: Job> WorkerPool<J> {
    /// Spawn `workers` threads.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] for zero workers and
    /// [`EngineError::WorkerSpawn`] if the OS refuses a thread.
    pub fn new(workers: usize) -> Result<Self, EngineError> {
        if workers == 0 {
            return Err(EngineError::InvalidConfig(
                "workers must be greater than 0".into(),
            ));
        }

        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                jobs: VecDeque::new(),
                running: true,
                max_depth: 0,
            }),
            available: Condvar::new(),
            stats: Mutex::new(vec![WorkerStats::default(); workers]),
        });

        let pool = Self {
            shared,
            workers: Mutex::new(Vec::with_capacity(workers)),
        };

        for worker_id in 0..workers {
            let shared = Arc::clone(&pool.shared);
            let spawned = thread::Builder::new()
                .name(format!("fetch-worker-{worker_id}"))
                .spawn(move || run_worker(worker_id, shared));

            match spawned {
                Ok(handle) => pool.workers.lock().push(handle),
                Err(e) => {
                    // Dropping `pool` stops and joins whatever already started
                    return Err(EngineError::WorkerSpawn(e));
                }
            }
        }

        info!(workers, "Worker pool started");
        Ok(pool)
    }

    /// Append a job to the tail of the queue and wake one idle worker.
    ///
    /// After shutdown the job is dropped without running.
    pub fn add(&self, job: J) {
        {
            let mut queue = self.shared.queue.lock();
            if !queue.running {
                drop(queue);
                debug!("Pool stopped, dropping job");
                drop(job);
                return;
            }
            queue.jobs.push_back(job);
            if queue.jobs.len() > queue.max_depth {
                queue.max_depth = queue.jobs.len();
            }
        }
        self.shared.available.notify_one();
    }

    /// Highest queue depth observed since the pool started
    pub fn max_depth(&self) -> usize {
        self.shared.queue.lock().max_depth
    }

    /// Jobs waiting for a worker
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().jobs.len()
    }

    pub fn is_running(&self) -> bool {
        self.shared.queue.lock().running
    }

    pub fn worker_count(&self) -> usize {
        self.shared.stats.lock().len()
    }

    pub fn worker_stats(&self) -> Vec<WorkerStats> {
        self.shared.stats.lock().clone()
    }

    /// Total jobs executed across all workers
    pub fn executions(&self) -> u64 {
        self.shared.stats.lock().iter().map(|s| s.executions).sum()
    }

    /// Stop the pool and join every worker.
    ///
    /// Calling this more than once is harmless. When invoked from one of the
    /// pool's own threads (e.g. the last owner dropped inside a callback) that
    /// thread is left to exit on its own instead of being joined.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::WorkerPanicked`] if a worker died from a
    /// panicking job.
    pub fn shutdown(&self) -> Result<(), EngineError> {
        let dropped = {
            let mut queue = self.shared.queue.lock();
            queue.running = false;
            std::mem::take(&mut queue.jobs)
        };
        self.shared.available.notify_all();

        if !dropped.is_empty() {
            debug!(dropped = dropped.len(), "Discarding queued jobs at shutdown");
        }
        drop(dropped);

        let handles = std::mem::take(&mut *self.workers.lock());
        if handles.is_empty() {
            return Ok(());
        }

        let current = thread::current().id();
        let mut panicked = Vec::new();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            let name = handle.thread().name().unwrap_or("fetch-worker").to_owned();
            if handle.join().is_err() {
                error!(worker = %name, "Worker panicked");
                panicked.push(name);
            }
        }

        if !panicked.is_empty() {
            return Err(EngineError::WorkerPanicked(panicked.join(", ")));
        }

        info!("All workers shut down successfully");
        Ok(())
    }
}

impl<J: Job> Drop for WorkerPool<J> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!(error = %e, "Error shutting down worker pool");
        }
    }
}

fn run_worker<J: Job>(worker_id: usize, shared: Arc<Shared<J>>) {
    debug!(worker_id, "Worker starting");

    loop {
        let job = {
            let mut queue = shared.queue.lock();
            while queue.running && queue.jobs.is_empty() {
                shared.available.wait(&mut queue);
            }
            if !queue.running {
                break;
            }
            match queue.jobs.pop_front() {
                Some(job) => job,
                None => continue,
            }
        };

        let started = Instant::now();
        job.execute();
        let elapsed = started.elapsed();

        if let Some(stats) = shared.stats.lock().get_mut(worker_id) {
            stats.record(elapsed);
        }
    }

    debug!(worker_id, "Worker shutting down");
}
