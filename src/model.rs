//! Metrics snapshot collected from one Varnish host.
//!
//! A snapshot is built once from a single remote round trip and is not
//! mutated afterwards. Raw counters are kept as-is; the formatted views used
//! by the renderers are derived on demand.

use crate::fmt::{format_percent, format_size};

/// One origin server as listed by `varnishadm backend.list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    /// Backend identifier as reported (e.g. `boot.default`).
    pub name: String,
    /// Health state as reported (e.g. `Healthy`, `Sick`).
    pub state: String,
}

impl Backend {
    pub fn new(name: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: state.into(),
        }
    }

    /// Name with a leading `boot.` VCL prefix removed.
    pub fn short_name(&self) -> &str {
        self.name.strip_prefix("boot.").unwrap_or(&self.name)
    }

    /// State normalized to lowercase.
    pub fn normalized_state(&self) -> String {
        self.state.to_lowercase()
    }
}

/// Point-in-time cache statistics and backend health.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Total cache storage capacity (`SMA.s0.g_space`).
    pub cache_size_bytes: u64,
    /// Occupied cache storage (`SMA.s0.c_bytes`).
    pub cache_used_bytes: u64,
    /// `MAIN.cache_hit`.
    pub cache_hit_count: u64,
    /// `MAIN.cache_miss`.
    pub cache_miss_count: u64,
    /// `hits / (hits + misses)`, `0.0` when no lookups were recorded.
    pub cache_hit_rate: f64,
    /// Backends in the order the host listed them.
    pub backends: Vec<Backend>,
}

impl Snapshot {
    pub fn new(
        cache_hit_count: u64,
        cache_miss_count: u64,
        cache_size_bytes: u64,
        cache_used_bytes: u64,
        backends: Vec<Backend>,
    ) -> Self {
        Self {
            cache_size_bytes,
            cache_used_bytes,
            cache_hit_count,
            cache_miss_count,
            cache_hit_rate: hit_rate(cache_hit_count, cache_miss_count),
            backends,
        }
    }

    /// Cache capacity, e.g. `"256MB"`.
    pub fn cache_size(&self) -> String {
        format_size(self.cache_size_bytes)
    }

    /// Occupied cache bytes, e.g. `"12.5MB"`.
    pub fn cache_filling(&self) -> String {
        format_size(self.cache_used_bytes)
    }

    /// Hit rate as a percentage, e.g. `"80%"`.
    pub fn cache_hit_rate_percent(&self) -> String {
        format_percent(self.cache_hit_rate)
    }
}

fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits as f64 + misses as f64;
    if total == 0.0 {
        0.0
    } else {
        hits as f64 / total
    }
}
