//! Mock remote shell for testing.
//!
//! This module provides `MockShell` and pre-built Varnish scenarios for
//! testing the collector without a reachable cache host.

mod scenarios;
mod shell;

pub use shell::{MockEvent, MockSession, MockShell};
