//! Cache Warming Task
//!
//! Background scheduler that refreshes registered keys before they expire,
//! so readers of those keys never see a cold miss.
//!
//! A single driver loop ticks on a fixed interval, snapshots the overdue
//! jobs under a read lock and dispatches each refresh as its own task.
//! `stop` cancels the driver and drains every in-flight refresh before
//! returning.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use futures::future::{BoxFuture, FutureExt};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::cache::{namespace_of, Cache, CacheMonitor};
use crate::codec::{Codec, JsonCodec};
use crate::error::{CacheError, Result};

/// Default driver tick.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(30);

// == Warmer Config ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmerConfig {
    /// How often the driver scans for overdue jobs
    pub tick_interval: Duration,
    /// Upper bound on one data-function call, None = unbounded
    pub refresh_timeout: Option<Duration>,
}

impl Default for WarmerConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            refresh_timeout: None,
        }
    }
}

/// Encoded value plus the time spent encoding it.
struct Loaded {
    bytes: Vec<u8>,
    serialize_latency: Duration,
}

type Loader = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<Loaded>> + Send + Sync>;

// == Warming Job ==
struct WarmingJob {
    loader: Loader,
    interval: Duration,
    ttl: Duration,
    last_update: Option<Instant>,
    enabled: bool,
    /// Distinguishes a re-registered key from the job it replaced
    generation: u64,
    in_flight: Arc<AtomicBool>,
    refresh_count: u64,
    failure_count: u64,
    last_error: Option<String>,
}

impl WarmingJob {
    fn is_due(&self, now: Instant) -> bool {
        self.enabled
            && self
                .last_update
                .map_or(true, |last| now.duration_since(last) >= self.interval)
    }
}

/// What a refresh task needs, copied out of the registry.
struct Dispatch {
    key: String,
    loader: Loader,
    ttl: Duration,
    generation: u64,
    in_flight: Arc<AtomicBool>,
}

// == Job Status ==
/// Read-only view of a registered job.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WarmingJobStatus {
    pub key: String,
    pub interval_secs: f64,
    pub ttl_secs: f64,
    pub enabled: bool,
    pub in_flight: bool,
    pub refresh_count: u64,
    pub failure_count: u64,
    pub last_error: Option<String>,
    /// Seconds since the last successful refresh, None if never refreshed
    pub last_update_secs_ago: Option<f64>,
}

// == Shared State ==
struct WarmerInner<C> {
    cache: Arc<dyn Cache>,
    codec: Arc<C>,
    config: WarmerConfig,
    jobs: RwLock<HashMap<String, WarmingJob>>,
    tracker: TaskTracker,
    monitor: RwLock<Option<Arc<CacheMonitor>>>,
    next_generation: AtomicU64,
}

enum Lifecycle {
    Idle,
    Running {
        token: CancellationToken,
        driver: JoinHandle<()>,
    },
    Stopped,
}

// == Cache Warmer ==
/// Proactively repopulates registered keys on their own intervals.
pub struct CacheWarmer<C: Codec = JsonCodec> {
    inner: Arc<WarmerInner<C>>,
    lifecycle: Mutex<Lifecycle>,
}

impl CacheWarmer<JsonCodec> {
    /// Creates a warmer that JSON-encodes warmed values.
    pub fn new(cache: Arc<dyn Cache>, config: WarmerConfig) -> Self {
        Self::with_codec(cache, config, JsonCodec)
    }
}

impl<C: Codec> CacheWarmer<C> {
    pub fn with_codec(cache: Arc<dyn Cache>, config: WarmerConfig, codec: C) -> Self {
        Self {
            inner: Arc::new(WarmerInner {
                cache,
                codec: Arc::new(codec),
                config,
                jobs: RwLock::new(HashMap::new()),
                tracker: TaskTracker::new(),
                monitor: RwLock::new(None),
                next_generation: AtomicU64::new(1),
            }),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Reports encoding time of warmed values to `monitor`. Set counts come
    /// from a `MonitoredCache` in the wrapped chain.
    pub fn set_monitor(&self, monitor: Arc<CacheMonitor>) {
        *self.inner.monitor.write() = Some(monitor);
    }

    // == Registration ==
    /// Registers (or replaces) the job refreshing `key` every `interval`
    /// with the value produced by `data_fn`, stored with `ttl`.
    pub fn add_warming_job<T, F, Fut>(
        &self,
        key: impl Into<String>,
        data_fn: F,
        interval: Duration,
        ttl: Duration,
    ) where
        T: Serialize + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let key = key.into();
        let codec = self.inner.codec.clone();
        let loader: Loader = Arc::new(move || {
            let pending = data_fn();
            let codec = codec.clone();
            async move {
                let value = pending.await?;
                let started = std::time::Instant::now();
                let bytes = codec.encode(&value)?;
                Ok::<_, anyhow::Error>(Loaded {
                    bytes,
                    serialize_latency: started.elapsed(),
                })
            }
            .boxed()
        });

        let job = WarmingJob {
            loader,
            interval,
            ttl,
            last_update: None,
            enabled: true,
            generation: self.inner.next_generation.fetch_add(1, Ordering::Relaxed),
            in_flight: Arc::new(AtomicBool::new(false)),
            refresh_count: 0,
            failure_count: 0,
            last_error: None,
        };

        let replaced = self.inner.jobs.write().insert(key.clone(), job).is_some();
        info!(
            key = %key,
            interval_secs = interval.as_secs_f64(),
            replaced,
            "Registered warming job"
        );
    }

    /// Unregisters the job for `key`. A refresh already running finishes.
    pub fn remove_warming_job(&self, key: &str) -> bool {
        let removed = self.inner.jobs.write().remove(key).is_some();
        if removed {
            info!(key, "Removed warming job");
        }
        removed
    }

    /// Pauses or resumes a job; false if no such job.
    pub fn set_job_enabled(&self, key: &str, enabled: bool) -> bool {
        match self.inner.jobs.write().get_mut(key) {
            Some(job) => {
                job.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn jobs(&self) -> Vec<WarmingJobStatus> {
        let now = Instant::now();
        let jobs = self.inner.jobs.read();
        let mut statuses: Vec<WarmingJobStatus> = jobs
            .iter()
            .map(|(key, job)| WarmingJobStatus {
                key: key.clone(),
                interval_secs: job.interval.as_secs_f64(),
                ttl_secs: job.ttl.as_secs_f64(),
                enabled: job.enabled,
                in_flight: job.in_flight.load(Ordering::Acquire),
                refresh_count: job.refresh_count,
                failure_count: job.failure_count,
                last_error: job.last_error.clone(),
                last_update_secs_ago: job
                    .last_update
                    .map(|last| now.duration_since(last).as_secs_f64()),
            })
            .collect();
        statuses.sort_by(|a, b| a.key.cmp(&b.key));
        statuses
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lifecycle.lock(), Lifecycle::Running { .. })
    }

    // == Lifecycle ==
    /// Starts the driver loop. It ends when `parent` is cancelled or
    /// `stop` is called.
    pub fn start(&self, parent: &CancellationToken) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Idle => {}
            Lifecycle::Running { .. } => {
                return Err(CacheError::Warmer("warmer already started".to_string()))
            }
            Lifecycle::Stopped => {
                return Err(CacheError::Warmer("warmer has been stopped".to_string()))
            }
        }

        let token = parent.child_token();
        let driver = tokio::spawn(run_driver(self.inner.clone(), token.clone()));
        *lifecycle = Lifecycle::Running { token, driver };
        Ok(())
    }

    /// Stops the driver and waits for every in-flight refresh to finish.
    /// No refresh writes to the cache after this returns. Later calls are
    /// no-ops.
    pub async fn stop(&self) {
        let previous = std::mem::replace(&mut *self.lifecycle.lock(), Lifecycle::Stopped);

        match previous {
            Lifecycle::Stopped => {
                debug!("Warmer already stopped");
                return;
            }
            Lifecycle::Idle => {}
            Lifecycle::Running { token, driver } => {
                token.cancel();
                if let Err(err) = driver.await {
                    warn!("Warmer driver ended abnormally: {}", err);
                }
            }
        }

        self.inner.tracker.close();
        let in_flight = self.inner.tracker.len();
        if in_flight > 0 {
            info!("Waiting for {} in-flight refreshes", in_flight);
        }
        self.inner.tracker.wait().await;
        info!("Cache warmer stopped");
    }

    /// Refreshes `key` immediately, regardless of its interval.
    pub async fn refresh_now(&self, key: &str) -> Result<()> {
        let handle = {
            let lifecycle = self.lifecycle.lock();
            if matches!(*lifecycle, Lifecycle::Stopped) {
                return Err(CacheError::Warmer("warmer has been stopped".to_string()));
            }

            let dispatch = self
                .inner
                .snapshot(key)
                .ok_or_else(|| CacheError::Warmer(format!("no warming job for '{}'", key)))?;
            if dispatch
                .in_flight
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return Err(CacheError::Warmer(format!("refresh of '{}' already running", key)));
            }
            self.inner.tracker.spawn(self.inner.clone().refresh(dispatch))
        };

        match handle.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(CacheError::Warmer(format!("{:#}", err))),
            Err(err) => Err(CacheError::Warmer(err.to_string())),
        }
    }
}

impl<C: Codec> WarmerInner<C> {
    fn snapshot(&self, key: &str) -> Option<Dispatch> {
        self.jobs.read().get(key).map(|job| Dispatch {
            key: key.to_string(),
            loader: job.loader.clone(),
            ttl: job.ttl,
            generation: job.generation,
            in_flight: job.in_flight.clone(),
        })
    }

    /// Spawns a refresh for every enabled, overdue job not already running.
    fn dispatch_due(self: &Arc<Self>) {
        let now = Instant::now();
        let due: Vec<Dispatch> = {
            let jobs = self.jobs.read();
            jobs.iter()
                .filter(|(_, job)| job.is_due(now))
                .map(|(key, job)| Dispatch {
                    key: key.clone(),
                    loader: job.loader.clone(),
                    ttl: job.ttl,
                    generation: job.generation,
                    in_flight: job.in_flight.clone(),
                })
                .collect()
        };

        for dispatch in due {
            if dispatch
                .in_flight
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                debug!(key = %dispatch.key, "Refresh still running, skipping");
                continue;
            }
            self.tracker.spawn(self.clone().refresh(dispatch));
        }
    }

    /// Runs one refresh and records its outcome on the job.
    async fn refresh(self: Arc<Self>, dispatch: Dispatch) -> anyhow::Result<()> {
        let outcome = self.execute(&dispatch).await;

        // Cleared under the registry lock, after last_update, so a scan
        // never sees an idle job with a stale timestamp.
        let mut jobs = self.jobs.write();
        let job = jobs
            .get_mut(&dispatch.key)
            .filter(|job| job.generation == dispatch.generation);

        match (&outcome, job) {
            (Ok(()), Some(job)) => {
                job.last_update = Some(Instant::now());
                job.refresh_count += 1;
                job.last_error = None;
                debug!(key = %dispatch.key, "Warmed cache key");
            }
            (Err(err), Some(job)) => {
                job.failure_count += 1;
                job.last_error = Some(format!("{:#}", err));
                warn!(key = %dispatch.key, "Warming job failed: {:#}", err);
            }
            (Err(err), None) => {
                warn!(key = %dispatch.key, "Warming job failed after removal: {:#}", err);
            }
            (Ok(()), None) => {}
        }
        dispatch.in_flight.store(false, Ordering::Release);
        drop(jobs);
        outcome
    }

    async fn execute(&self, dispatch: &Dispatch) -> anyhow::Result<()> {
        let pending = (dispatch.loader)();
        let loaded = match self.config.refresh_timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| anyhow!("data function timed out after {:?}", limit))??,
            None => pending.await?,
        };

        self.cache
            .set(&dispatch.key, loaded.bytes, dispatch.ttl)
            .await
            .context("storing warmed value")?;

        // The set itself is counted by the monitored cache chain
        if let Some(monitor) = self.monitor.read().as_ref() {
            monitor.record_serialization(namespace_of(&dispatch.key), loaded.serialize_latency);
        }
        Ok(())
    }
}

async fn run_driver<C: Codec>(inner: Arc<WarmerInner<C>>, token: CancellationToken) {
    let tick = inner.config.tick_interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Starting cache warmer with tick interval of {:?}", tick);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => inner.dispatch_due(),
        }
    }

    debug!("Cache warmer driver exited");
}
