//! On-disk tile cache with deduplicated, bounded-concurrency downloads.
//!
//! ## Thread Safety
//!
//! `TileCache` is shared by reference between any number of threads:
//! - [`TileCache::ensure`] queues a download only if the tile is neither on
//!   disk nor already in flight; both checks happen under one lock, so
//!   concurrent requests for the same tile produce one fetch
//! - a fixed pool of `max_downloads` workers performs the fetches
//! - entries are written to a temporary file and renamed into place, so
//!   readers never see a partial tile and [`TileCache::get`] takes no lock
//!
//! [`TileCache::wait`] is the batch barrier: it returns once every queued
//! download has resolved.

use crate::metrics::metric_defs;
use crate::{
    codec, stitch, transport, CancelToken, DemError, Result, Tile, TileKey, TileTransport,
};
use crossbeam_channel::{Receiver, Sender};
use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use topoline_contour::ElevationGrid;
use tracing::{debug, info, warn};

/// Default edge length of a terrarium tile in pixels.
pub const DEFAULT_TILE_SIZE: usize = 256;

/// Default number of concurrent downloads.
pub const DEFAULT_MAX_DOWNLOADS: usize = 8;

/// What a batch does when one of its fetches fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Cancel the rest of the batch and report the first failure from
    /// [`TileCache::wait`].
    #[default]
    Abort,
    /// Keep going and list failures in the [`BatchReport`].
    Skip,
}

/// Bounded retry with exponential backoff for failed fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per fetch, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each further one.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// A single attempt.
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
        }
    }
}

/// Tile cache settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Root directory; entries live at `{directory}/{z}/{x}/{y}.png`.
    pub directory: PathBuf,
    /// Expected tile edge length in pixels.
    pub tile_size: usize,
    /// Number of download workers.
    pub max_downloads: usize,
    /// Batch failure handling.
    pub failure_policy: FailurePolicy,
    /// Per-fetch retry.
    pub retry: RetryPolicy,
}

impl CacheConfig {
    /// Defaults for a cache rooted at `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            tile_size: DEFAULT_TILE_SIZE,
            max_downloads: DEFAULT_MAX_DOWNLOADS,
            failure_policy: FailurePolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Reject settings the cache cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(DemError::InvalidConfig("tile_size must be positive".into()));
        }
        if self.max_downloads == 0 {
            return Err(DemError::InvalidConfig("max_downloads must be positive".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(DemError::InvalidConfig("retry.max_attempts must be positive".into()));
        }
        if self.directory.as_os_str().is_empty() {
            return Err(DemError::InvalidConfig("cache directory is empty".into()));
        }
        Ok(())
    }
}

/// Outcome of one batch of `ensure` calls.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Tiles downloaded and written.
    pub fetched: usize,
    /// Requests that needed no download.
    pub already_cached: usize,
    /// Queued fetches dropped because the batch aborted.
    pub dropped: usize,
    /// Failed fetches, under [`FailurePolicy::Skip`].
    pub failures: Vec<(TileKey, DemError)>,
}

impl BatchReport {
    /// Whether every fetch in the batch succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.dropped == 0
    }
}

/// Download statistics for the cache's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    /// Number of tiles downloaded.
    pub tiles_downloaded: usize,
    /// Total bytes downloaded.
    pub bytes_downloaded: u64,
}

/// Resolution of one queued fetch.
enum JobOutcome {
    Fetched(usize),
    Dropped,
    Failed(DemError),
}

/// Accounting for the current batch.
#[derive(Default)]
struct BatchState {
    /// Queued or running fetches.
    pending: usize,
    fetched: usize,
    already_cached: usize,
    dropped: usize,
    failures: Vec<(TileKey, DemError)>,
    /// First failure under [`FailurePolicy::Abort`]; set once per batch.
    abort_error: Option<DemError>,
}

/// State shared between the cache handle and its workers.
struct Shared {
    directory: PathBuf,
    failure_policy: FailurePolicy,
    retry: RetryPolicy,
    transport: Arc<dyn TileTransport>,
    cancel: CancelToken,
    /// Keys queued or being fetched. Lock order: `in_flight` before `batch`.
    in_flight: Mutex<HashSet<TileKey>>,
    batch: Mutex<BatchState>,
    batch_done: Condvar,
    tiles_downloaded: AtomicUsize,
    bytes_downloaded: AtomicU64,
}

/// Lock a mutex, recovering the data if a worker panicked while holding it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn aborted(&self) -> bool {
        lock(&self.batch).abort_error.is_some()
    }

    /// Fetch and persist one tile, retrying transport failures.
    fn fetch(&self, key: TileKey) -> Result<usize> {
        let mut attempt = 1;
        loop {
            self.cancel.check(key)?;
            let result = self
                .transport
                .fetch(key)
                .and_then(|bytes| self.persist(key, &bytes).map(|()| bytes.len()));

            match result {
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    warn!(%key, attempt, ?delay, error = %err, "tile fetch failed, retrying");
                    metrics::counter!(metric_defs::FETCH_RETRIES.name).increment(1);
                    thread::sleep(delay);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Write `bytes` to a temporary sibling and rename it over the entry.
    ///
    /// The temporary file is removed if any step fails.
    fn persist(&self, key: TileKey, bytes: &[u8]) -> Result<()> {
        let io_err = |source| DemError::CacheIo { key, source };
        let path = key.cache_path(&self.directory);
        let parent = path
            .parent()
            .ok_or_else(|| io_err(std::io::Error::new(ErrorKind::InvalidInput, "cache path has no parent")))?;
        fs::create_dir_all(parent).map_err(io_err)?;

        let mut temp = tempfile::Builder::new()
            .prefix(&format!("{}.png.tmp-", key.y))
            .tempfile_in(parent)
            .map_err(io_err)?;
        temp.write_all(bytes).map_err(io_err)?;
        temp.persist(&path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    /// Record a resolved job and wake `wait` when the batch drains.
    fn finish(&self, key: TileKey, outcome: JobOutcome) {
        lock(&self.in_flight).remove(&key);

        let mut batch = lock(&self.batch);
        match outcome {
            JobOutcome::Fetched(bytes) => {
                batch.fetched += 1;
                self.tiles_downloaded.fetch_add(1, Ordering::Relaxed);
                self.bytes_downloaded.fetch_add(bytes as u64, Ordering::Relaxed);
                metrics::counter!(metric_defs::TILES_FETCHED.name).increment(1);
                metrics::counter!(metric_defs::TILE_BYTES.name).increment(bytes as u64);
            }
            JobOutcome::Dropped => batch.dropped += 1,
            JobOutcome::Failed(err) => {
                metrics::counter!(metric_defs::FETCH_FAILURES.name).increment(1);
                match self.failure_policy {
                    FailurePolicy::Skip => {
                        warn!(%key, error = %err, "tile fetch failed, skipping");
                        batch.failures.push((key, err));
                    }
                    FailurePolicy::Abort if batch.abort_error.is_none() => {
                        warn!(%key, error = %err, "tile fetch failed, aborting batch");
                        batch.abort_error = Some(err);
                    }
                    FailurePolicy::Abort => {
                        debug!(%key, error = %err, "tile fetch failed after abort");
                        batch.dropped += 1;
                    }
                }
            }
        }

        batch.pending -= 1;
        metrics::gauge!(metric_defs::FETCHES_IN_FLIGHT.name).set(batch.pending as f64);
        if batch.pending == 0 {
            self.batch_done.notify_all();
        }
    }
}

fn run_worker(shared: Arc<Shared>, jobs: Receiver<TileKey>) {
    for key in jobs.iter() {
        let outcome = if shared.aborted() {
            JobOutcome::Dropped
        } else {
            let start = Instant::now();
            match shared.fetch(key) {
                Ok(bytes) => {
                    let elapsed = start.elapsed();
                    debug!(%key, bytes, ?elapsed, "tile cached");
                    metrics::histogram!(metric_defs::FETCH_DURATION.name).record(elapsed.as_secs_f64());
                    JobOutcome::Fetched(bytes)
                }
                Err(err) => JobOutcome::Failed(err),
            }
        };
        shared.finish(key, outcome);
    }
}

/// Disk-backed elevation tile cache.
pub struct TileCache {
    shared: Arc<Shared>,
    tile_size: usize,
    jobs: Option<Sender<TileKey>>,
    workers: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for TileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCache")
            .field("directory", &self.shared.directory)
            .field("tile_size", &self.tile_size)
            .field("workers", &self.workers.len())
            .finish()
    }
}

impl TileCache {
    /// Create a cache and start its download workers.
    pub fn new(config: CacheConfig, transport: Arc<dyn TileTransport>) -> Result<Self> {
        Self::with_cancel(config, transport, CancelToken::new())
    }

    /// Create a cache whose workers stop fetching once `cancel` fires.
    pub fn with_cancel(
        config: CacheConfig,
        transport: Arc<dyn TileTransport>,
        cancel: CancelToken,
    ) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.directory)?;

        let shared = Arc::new(Shared {
            directory: config.directory,
            failure_policy: config.failure_policy,
            retry: config.retry,
            transport,
            cancel,
            in_flight: Mutex::new(HashSet::new()),
            batch: Mutex::new(BatchState::default()),
            batch_done: Condvar::new(),
            tiles_downloaded: AtomicUsize::new(0),
            bytes_downloaded: AtomicU64::new(0),
        });

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut cache = Self {
            shared,
            tile_size: config.tile_size,
            jobs: Some(tx),
            workers: Vec::with_capacity(config.max_downloads),
        };
        for i in 0..config.max_downloads {
            let shared = Arc::clone(&cache.shared);
            let rx = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("tile-fetch-{i}"))
                .spawn(move || run_worker(shared, rx))?;
            cache.workers.push(handle);
        }

        info!(
            directory = %cache.shared.directory.display(),
            workers = config.max_downloads,
            "tile cache ready"
        );
        Ok(cache)
    }

    /// Cache root directory.
    pub fn directory(&self) -> &Path {
        &self.shared.directory
    }

    /// Expected tile edge length.
    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// The cancellation token the workers observe.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.shared.cancel
    }

    /// Path of the entry for `key`.
    pub fn path_for(&self, key: TileKey) -> PathBuf {
        key.cache_path(&self.shared.directory)
    }

    /// Whether the entry for `key` is on disk.
    pub fn is_cached(&self, key: TileKey) -> bool {
        self.path_for(key).is_file()
    }

    /// Get download statistics.
    pub fn download_stats(&self) -> DownloadStats {
        DownloadStats {
            tiles_downloaded: self.shared.tiles_downloaded.load(Ordering::Relaxed),
            bytes_downloaded: self.shared.bytes_downloaded.load(Ordering::Relaxed),
        }
    }

    /// Make sure `key` will be on disk once [`TileCache::wait`] returns.
    ///
    /// Queues a fetch unless the tile is cached or already in flight. Never
    /// blocks on the network.
    pub fn ensure(&self, key: TileKey) -> Result<()> {
        crate::coord::check_zoom(key.z)?;
        let key = key.canonical();
        self.shared.cancel.check(key)?;
        let jobs = self
            .jobs
            .as_ref()
            .ok_or_else(|| DemError::InvalidConfig("tile cache is shut down".into()))?;

        {
            let mut in_flight = lock(&self.shared.in_flight);
            if in_flight.contains(&key) || self.is_cached(key) {
                lock(&self.shared.batch).already_cached += 1;
                metrics::counter!(metric_defs::CACHE_HITS.name).increment(1);
                return Ok(());
            }
            in_flight.insert(key);
            let mut batch = lock(&self.shared.batch);
            batch.pending += 1;
            metrics::gauge!(metric_defs::FETCHES_IN_FLIGHT.name).set(batch.pending as f64);
        }

        debug!(%key, "queueing tile fetch");
        if jobs.send(key).is_err() {
            // Every worker has exited; resolve the job here so `wait` cannot hang.
            self.shared.finish(key, JobOutcome::Dropped);
            return Err(DemError::InvalidConfig("tile download workers have stopped".into()));
        }
        Ok(())
    }

    /// Block until every fetch queued since the last `wait` has resolved.
    ///
    /// Under [`FailurePolicy::Abort`] the first failure is returned as the
    /// error; the fetches still queued at that point are dropped.
    pub fn wait(&self) -> Result<BatchReport> {
        let mut batch = lock(&self.shared.batch);
        while batch.pending > 0 {
            batch = self
                .shared
                .batch_done
                .wait(batch)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let state = std::mem::take(&mut *batch);
        drop(batch);

        if let Some(err) = state.abort_error {
            return Err(err);
        }
        let report = BatchReport {
            fetched: state.fetched,
            already_cached: state.already_cached,
            dropped: state.dropped,
            failures: state.failures,
        };
        info!(
            fetched = report.fetched,
            cached = report.already_cached,
            failed = report.failures.len(),
            "tile batch complete"
        );
        Ok(report)
    }

    /// Load and decode the cached tile for `key`.
    pub fn get(&self, key: TileKey) -> Result<Tile> {
        crate::coord::check_zoom(key.z)?;
        let key = key.canonical();
        Ok(Tile::new(key, self.tile_size, self.load_grid(key)?))
    }

    /// Load `key` stitched to its east, south and south-east neighbours.
    pub fn get_stitched(&self, key: TileKey) -> Result<Tile> {
        crate::coord::check_zoom(key.z)?;
        let key = key.canonical();
        let base = self.load_grid(key)?;
        let right = self.load_grid(key.neighbor(1, 0))?;
        let bottom = self.load_grid(key.neighbor(0, 1))?;
        let diagonal = self.load_grid(key.neighbor(1, 1))?;
        let grid = stitch::stitch(&base, &right, &bottom, &diagonal)?;
        Ok(Tile::new(key, self.tile_size, grid))
    }

    fn load_grid(&self, key: TileKey) -> Result<ElevationGrid> {
        let bytes = match fs::read(self.path_for(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(DemError::NotFound(key)),
            Err(source) => return Err(DemError::CacheIo { key, source }),
        };

        let grid = codec::decode_png(key, &bytes)?;
        if grid.width() != self.tile_size || grid.height() != self.tile_size {
            return Err(DemError::Format {
                key: Some(key),
                reason: format!(
                    "tile is {}x{}, expected {size}x{size}",
                    grid.width(),
                    grid.height(),
                    size = self.tile_size
                ),
            });
        }
        Ok(grid)
    }
}

impl Drop for TileCache {
    fn drop(&mut self) {
        // Closing the channel lets workers drain the queue and exit.
        self.jobs.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("tile download worker panicked");
            }
        }
    }
}

/// Convenience constructor for the public terrarium tileset.
pub fn terrarium_cache(config: CacheConfig) -> Result<TileCache> {
    let transport = transport::HttpTransport::terrarium()?;
    TileCache::new(config, Arc::new(transport))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let retry = RetryPolicy {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(100),
        };
        assert_eq!(retry.backoff(1), Duration::from_millis(100));
        assert_eq!(retry.backoff(2), Duration::from_millis(200));
        assert_eq!(retry.backoff(3), Duration::from_millis(400));
        assert_eq!(RetryPolicy::none().backoff(5), Duration::ZERO);
    }

    #[test]
    fn test_config_validation() {
        assert!(CacheConfig::new("cache").validate().is_ok());

        let mut config = CacheConfig::new("cache");
        config.tile_size = 0;
        assert!(matches!(config.validate(), Err(DemError::InvalidConfig(_))));

        let mut config = CacheConfig::new("cache");
        config.max_downloads = 0;
        assert!(config.validate().is_err());

        let mut config = CacheConfig::new("cache");
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        assert!(CacheConfig::new("").validate().is_err());
    }

    #[test]
    fn test_report_completeness() {
        let mut report = BatchReport::default();
        assert!(report.is_complete());
        report.dropped = 1;
        assert!(!report.is_complete());
    }
}
