//! Read-through lookup chain, write-back fan-out, and scheduled refresh
//!
//! [`AssetProxy`] is the serving core. Each request runs its own lookup
//! chain: bucketed cache entry, then permanent entry, then origin fetch.
//! A miss answers the client straight from the origin response while the
//! cache write fans out in a tracked background task, pre-warming the next
//! few hourly windows so one fetch covers them all.
//!
//! # Example
//!
//! ```no_run
//! use asset_cache::{AssetProxy, Destinations};
//! use chrono::Utc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let destinations = Destinations::from_json_str(
//!     r#"{"gh-badge-rust": "https://img.shields.io/badge/lang-rust-informational"}"#,
//! )?;
//!
//! let proxy = AssetProxy::builder().destinations(destinations).build()?;
//!
//! // First call fetches the origin and pre-warms upcoming buckets
//! let response = proxy.handle("gh-badge-rust", None, Utc::now()).await?;
//! println!("{} ({} bytes)", response.media_type, response.bytes.len());
//!
//! // Subsequent calls within the window are served from cache
//! let cached = proxy.handle("gh-badge-rust", None, Utc::now()).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::header::HeaderMap;
use tokio::{sync::Mutex, task::JoinSet, time::MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::{
    bucket::{PRE_WARM_HOURS, TimeBucket, bucketed_key},
    config::Destinations,
    error::{Error, Result},
    origin::OriginClient,
    payload::CachedPayload,
    store::{CacheStore, MemoryStore},
};

/// How long the origin grants us reuse of a fetched payload (2 hours).
///
/// Bucketed entries are stored with twice this TTL so they outlive the
/// bucket granularity plus the pre-warm horizon.
pub const WORKER_CACHE_TTL: Duration = Duration::from_secs(7200);

/// Which state of the lookup chain produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    /// Hit on the current time-bucketed entry
    BucketCache,
    /// Hit on the permanent (non-expiring) entry
    PermanentCache,
    /// Both cache states missed; fetched from the origin
    Origin,
}

/// A served asset, ready for the routing layer
#[derive(Debug, Clone)]
pub struct AssetResponse {
    /// The asset body
    pub bytes: Bytes,
    /// The asset's media type
    pub media_type: String,
    /// Which lookup state produced the body
    pub served_from: ServedFrom,
}

/// Read-through cache proxy for a fixed set of remote assets
pub struct AssetProxy {
    store: Arc<dyn CacheStore>,
    destinations: Destinations,
    origin: OriginClient,
    cache_ttl: Duration,
    pre_warm_hours: u32,
    /// In-flight write-back tasks; drained on demand, never cancelled by
    /// a client disconnect.
    writebacks: Mutex<JoinSet<()>>,
}

impl AssetProxy {
    /// Start building a proxy
    pub fn builder() -> AssetProxyBuilder {
        AssetProxyBuilder::new()
    }

    /// The destination table this proxy serves
    pub fn destinations(&self) -> &Destinations {
        &self.destinations
    }

    /// Serve one asset request.
    ///
    /// Tries the current bucketed entry, then the permanent entry, then the
    /// origin, terminal on the first hit. On an origin fetch the response is
    /// returned immediately and the cache write-back runs as a tracked
    /// background task. Unknown names fail with [`Error::UnknownAsset`]
    /// without ever reaching the origin; origin failures propagate the
    /// origin's status and are not written back.
    pub async fn handle(
        &self,
        name: &str,
        forwarded_headers: Option<&HeaderMap>,
        now: DateTime<Utc>,
    ) -> Result<AssetResponse> {
        let bucket = TimeBucket::at(now);
        let bucket_key = bucketed_key(name, bucket);

        if let Some(payload) = self.lookup(&bucket_key).await {
            debug!("Serving {} from bucket {}", name, bucket);
            return Ok(respond(payload, ServedFrom::BucketCache));
        }

        if let Some(payload) = self.lookup(name).await {
            debug!("Serving {} from permanent entry", name);
            return Ok(respond(payload, ServedFrom::PermanentCache));
        }

        let Some(url) = self.destinations.resolve(name) else {
            return Err(Error::UnknownAsset(name.to_string()));
        };

        debug!("Cache miss for {}, fetching origin", name);
        let fetched = self.origin.fetch(url, forwarded_headers).await?;
        let payload = CachedPayload::new(fetched.bytes, fetched.media_type);

        self.spawn_writeback(name.to_string(), payload.clone(), now)
            .await;

        Ok(respond(payload, ServedFrom::Origin))
    }

    /// Store a payload under the current bucket and the pre-warm buckets.
    ///
    /// This is the awaited write path used by [`refresh_all`](Self::refresh_all);
    /// the serving path wraps it in a background task instead.
    pub async fn populate(&self, name: &str, payload: CachedPayload, now: DateTime<Utc>) {
        populate_store(
            &self.store,
            name,
            &payload,
            now,
            self.cache_ttl * 2,
            self.pre_warm_hours,
        )
        .await;
    }

    /// Store a payload under the bare asset name with no expiration.
    ///
    /// Permanent entries are for assets that never change; they are only
    /// created through this deliberate call, never by the write-back path.
    pub async fn populate_permanent(&self, name: &str, payload: &CachedPayload) -> Result<()> {
        self.store.put(name, payload.to_blob(), None).await
    }

    /// Refresh every known asset from its origin, independent of client
    /// traffic.
    ///
    /// Fetches are unconditioned (no forwarded headers). A fetch or store
    /// failure for one asset is logged and the loop continues; nothing is
    /// returned to any caller.
    pub async fn refresh_all(&self, now: DateTime<Utc>) {
        debug!("Refreshing {} known assets", self.destinations.len());

        for (name, url) in self.destinations.iter() {
            match self.origin.fetch(url, None).await {
                Ok(fetched) => {
                    let payload = CachedPayload::new(fetched.bytes, fetched.media_type);
                    self.populate(name, payload, now).await;
                    trace!("Refreshed asset {}", name);
                }
                Err(e) => {
                    warn!("Refresh failed for {}: {}", name, e);
                }
            }
        }

        debug!("Scheduled asset refresh complete");
    }

    /// Drive [`refresh_all`](Self::refresh_all) on a fixed period.
    ///
    /// Runs until the owning task is aborted. The first refresh fires
    /// immediately, warming the cache at startup.
    pub async fn run_refresh_loop(self: Arc<Self>, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.refresh_all(Utc::now()).await;
        }
    }

    /// Wait for every in-flight write-back to finish.
    ///
    /// Intended for graceful shutdown and tests; the tasks make progress on
    /// the runtime whether or not anyone drains them.
    pub async fn drain_writebacks(&self) {
        let mut tasks = self.writebacks.lock().await;
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!("Write-back task failed: {}", e);
            }
        }
    }

    /// Read one key, demoting store and decode failures to a miss so the
    /// chain can fall through to its next state.
    async fn lookup(&self, key: &str) -> Option<CachedPayload> {
        let blob = match self.store.get(key).await {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        match CachedPayload::from_blob(&blob) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!("Discarding malformed cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Hand the write-back to the runtime without making the caller wait.
    async fn spawn_writeback(&self, name: String, payload: CachedPayload, now: DateTime<Utc>) {
        let store = Arc::clone(&self.store);
        let ttl = self.cache_ttl * 2;
        let pre_warm_hours = self.pre_warm_hours;

        let mut tasks = self.writebacks.lock().await;
        // Reap finished tasks so the set does not grow with request count
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            populate_store(&store, &name, &payload, now, ttl, pre_warm_hours).await;
        });
    }
}

fn respond(payload: CachedPayload, served_from: ServedFrom) -> AssetResponse {
    let (media_type, bytes) = payload.into_parts();
    AssetResponse {
        bytes,
        media_type,
        served_from,
    }
}

/// Write one payload under the capture-moment bucket plus the next
/// `pre_warm_hours` buckets, fanning the puts out concurrently.
///
/// Each put succeeds or fails on its own; a failed key is logged and its
/// siblings proceed. There is no ordering among the writes and no rollback.
async fn populate_store(
    store: &Arc<dyn CacheStore>,
    name: &str,
    payload: &CachedPayload,
    captured_at: DateTime<Utc>,
    ttl: Duration,
    pre_warm_hours: u32,
) {
    let blob = payload.to_blob();

    let mut buckets = vec![TimeBucket::at(captured_at)];
    buckets.extend(TimeBucket::upcoming(captured_at, pre_warm_hours));

    let writes = buckets.into_iter().map(|bucket| {
        let key = bucketed_key(name, bucket);
        let blob = blob.clone();
        async move {
            match store.put(&key, blob, Some(ttl)).await {
                Ok(()) => trace!("Cached {} (ttl {:?})", key, ttl),
                Err(e) => warn!("Cache write failed for {}: {}", key, e),
            }
        }
    });

    join_all(writes).await;
}

/// Builder for [`AssetProxy`]
pub struct AssetProxyBuilder {
    store: Option<Arc<dyn CacheStore>>,
    destinations: Destinations,
    origin: Option<OriginClient>,
    cache_ttl: Duration,
    pre_warm_hours: u32,
}

impl AssetProxyBuilder {
    fn new() -> Self {
        Self {
            store: None,
            destinations: Destinations::default(),
            origin: None,
            cache_ttl: WORKER_CACHE_TTL,
            pre_warm_hours: PRE_WARM_HOURS,
        }
    }

    /// Use a custom cache store backend
    pub fn store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the destination table
    pub fn destinations(mut self, destinations: Destinations) -> Self {
        self.destinations = destinations;
        self
    }

    /// Use a custom origin client
    pub fn origin(mut self, origin: OriginClient) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Override the base cache TTL (bucketed entries live twice this long)
    pub fn cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    /// Override how many future buckets each write-back pre-warms
    pub fn pre_warm_hours(mut self, hours: u32) -> Self {
        self.pre_warm_hours = hours;
        self
    }

    /// Build the proxy.
    ///
    /// Defaults: an in-memory store, an origin client with the standard
    /// timeouts, [`WORKER_CACHE_TTL`], and a 3-hour pre-warm horizon.
    pub fn build(self) -> Result<AssetProxy> {
        let origin = match self.origin {
            Some(origin) => origin,
            None => OriginClient::new()?,
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn CacheStore>);

        Ok(AssetProxy {
            store,
            destinations: self.destinations,
            origin,
            cache_ttl: self.cache_ttl,
            pre_warm_hours: self.pre_warm_hours,
            writebacks: Mutex::new(JoinSet::new()),
        })
    }
}
