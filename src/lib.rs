//! varnish-metrics - cache and backend health statistics for a Varnish host.
//!
//! The library fetches a point-in-time [`model::Snapshot`] over SSH and
//! renders it as text, JSON, YAML or XML. It backs the `varnish-metrics`
//! command-line tool.

pub mod collector;
pub mod fmt;
pub mod model;
pub mod render;
