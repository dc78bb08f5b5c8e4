//! Pre-built mock Varnish hosts for testing.
//!
//! Outputs are shaped like the real queries after the awk post-processing.

use super::shell::MockShell;
use crate::collector::queries::{BACKEND_LIST, CACHE_COUNTERS};

impl MockShell {
    /// A mock host answering both queries with the given output.
    pub fn varnish(counters: &str, backends: &str) -> Self {
        let mut shell = Self::new();
        shell.add_command(CACHE_COUNTERS, counters);
        shell.add_command(BACKEND_LIST, backends);
        shell
    }

    /// A healthy cache: 80% hit rate, 256MB storage, two backends.
    pub fn typical_varnish() -> Self {
        Self::varnish(
            "\
80
20
268435456
1048576
",
            "\
backend1 Healthy
boot.backend2 Sick
",
        )
    }

    /// A freshly started cache that has not served any request yet.
    pub fn idle_varnish() -> Self {
        Self::varnish("0\n0\n1073741824\n0\n", "boot.default healthy\n")
    }

    /// A host whose counters query prints garbage (e.g. varnishstat missing).
    pub fn broken_varnishstat() -> Self {
        Self::varnish(
            "sh: 1: varnishstat: not found\n",
            "boot.default healthy\n",
        )
    }
}
