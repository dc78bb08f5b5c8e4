//! Varnish metrics collector.
//!
//! This module fetches cache counters and backend health from a Varnish
//! host through a pluggable remote shell, with support for mocking in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  Collector                   │
//! │  queries ──► RemoteSession ──► parser        │
//! │                    │              │          │
//! │             ┌──────▼──────┐   Snapshot       │
//! │             │ RemoteShell │ (trait)          │
//! │             └──────┬──────┘                  │
//! └────────────────────┼─────────────────────────┘
//!            ┌─────────┴─────────┐
//!     ┌──────▼──────┐     ┌──────▼──────┐
//!     │  SshShell   │     │  MockShell  │
//!     │ (OpenSSH)   │     │ (Testing)   │
//!     └─────────────┘     └─────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production
//!
//! ```ignore
//! use varnish_metrics::collector::{Collector, SshShell, Target};
//!
//! let collector = Collector::new(SshShell::new());
//! let snapshot = collector.collect(&Target::new("10.10.10.10")).unwrap();
//! ```
//!
//! ## Testing (with MockShell)
//!
//! ```
//! use varnish_metrics::collector::{Collector, MockShell, Target};
//!
//! let collector = Collector::new(MockShell::typical_varnish());
//! let snapshot = collector.collect(&Target::new("10.10.10.10")).unwrap();
//! assert_eq!(snapshot.backends.len(), 2);
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod mock;
pub mod parser;
pub mod queries;
pub mod traits;

pub use collector::{CollectError, Collector, Request};
pub use mock::MockShell;
pub use parser::{ParseError, build_snapshot};
pub use traits::{RemoteSession, RemoteShell, SshSession, SshShell, Target, TransportError};
