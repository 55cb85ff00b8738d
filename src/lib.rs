//! Time-bucketed read-through cache for proxied image and badge assets
//!
//! This crate fronts a small, fixed set of remote assets (badges, stat
//! cards) with a key-value cache segmented into hour-wide time buckets:
//! - Lookup chain: current bucket entry, then permanent entry, then origin
//! - Write-back that pre-warms the next few hourly windows on every miss
//! - Scheduled refresh that repopulates all known assets independent of
//!   client traffic
//!
//! Cache keys are `"<name>@<DD-HH>"` for bucketed entries (UTC day and
//! hour) or the bare name for permanent entries; values are self-describing
//! `"<mediaType>;base64,<bytes>"` blobs. See [`proxy::AssetProxy`] for the
//! serving entry points.

pub mod bucket;
pub mod config;
pub mod error;
pub mod origin;
pub mod payload;
pub mod proxy;
pub mod store;

pub use bucket::{PRE_WARM_HOURS, TimeBucket, bucketed_key};
pub use config::Destinations;
pub use error::{Error, Result};
pub use origin::{FetchedAsset, OriginClient};
pub use payload::{CachedPayload, DEFAULT_MEDIA_TYPE};
pub use proxy::{
    AssetProxy, AssetProxyBuilder, AssetResponse, ServedFrom, WORKER_CACHE_TTL,
};
pub use store::{CacheStore, MemoryStore};
