//! Shell commands issued on the Varnish host.

/// Prints hits, misses, storage size and used bytes, one value per line.
///
/// `varnishstat -1` emits `name value rate description`; awk keeps the value.
/// The field order matches [`super::parser::COUNTER_FIELDS`].
pub const CACHE_COUNTERS: &str = "varnishstat -1 -f MAIN.cache_hit -f MAIN.cache_miss \
     -f SMA.s0.g_space -f SMA.s0.c_bytes | awk '{print $2}'";

/// Prints `<name> <state>` for every backend, skipping the header row.
pub const BACKEND_LIST: &str = "varnishadm backend.list | awk 'NR>1 {print $1, $3}'";
