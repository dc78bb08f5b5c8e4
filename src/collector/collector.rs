//! Collection of one snapshot from one Varnish host.
//!
//! The `Collector` opens a single remote session, runs the two fixed
//! queries over it, closes it, and turns the captured output into a
//! [`Snapshot`] that is handed to the renderer.

use std::io::{self, Write};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collector::parser::{ParseError, build_snapshot};
use crate::collector::queries::{BACKEND_LIST, CACHE_COUNTERS};
use crate::collector::traits::{RemoteSession, RemoteShell, Target, TransportError};
use crate::model::Snapshot;
use crate::render::{OutputFormat, RenderError, render};

/// Error returned by a collection run.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("malformed output from {host}: {source}")]
    Parse {
        host: String,
        #[source]
        source: ParseError,
    },
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("cannot write output: {0}")]
    Io(#[from] io::Error),
}

impl CollectError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            CollectError::Transport(_) => 1,
            CollectError::Render(RenderError::UnknownFormat(_)) => 2,
            CollectError::Parse { .. } => 3,
            CollectError::Render(_) | CollectError::Io(_) => 4,
        }
    }
}

/// Everything one invocation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub target: Target,
    pub format: OutputFormat,
    /// Dump the request and the parsed snapshot before the output.
    pub debug: bool,
}

/// Runs the metric queries through a [`RemoteShell`].
pub struct Collector<S: RemoteShell> {
    shell: S,
}

impl<S: RemoteShell> Collector<S> {
    pub fn new(shell: S) -> Self {
        Self { shell }
    }

    /// Collects one snapshot from `target` over a single session.
    pub fn collect(&self, target: &Target) -> Result<Snapshot, CollectError> {
        let mut session = self.shell.open(target)?;

        let counters = session.exec(CACHE_COUNTERS)?;
        debug!(bytes = counters.len(), "received cache counters");
        let backends = session.exec(BACKEND_LIST)?;
        debug!(bytes = backends.len(), "received backend list");

        // The data is already in hand; a failed close does not void it.
        if let Err(e) = session.close() {
            warn!("failed to close session to {}: {}", target, e);
        }

        let snapshot =
            build_snapshot(&counters, &backends).map_err(|source| CollectError::Parse {
                host: target.host.clone(),
                source,
            })?;
        info!(
            backends = snapshot.backends.len(),
            "collected snapshot from {}", target
        );
        Ok(snapshot)
    }

    /// Collects a snapshot and writes it to `out` in the requested format.
    ///
    /// With `request.debug`, a dump of the request and the snapshot goes to
    /// `diag` first. Nothing reaches `out` unless every step succeeded.
    pub fn collect_and_render<W: Write, D: Write>(
        &self,
        request: &Request,
        out: &mut W,
        diag: &mut D,
    ) -> Result<Snapshot, CollectError> {
        let snapshot = self.collect(&request.target)?;
        if request.debug {
            write_debug_dump(diag, request, &snapshot)?;
        }
        let rendered = render(&snapshot, request.format)?;
        out.write_all(rendered.as_bytes())?;
        out.flush()?;
        Ok(snapshot)
    }
}

fn write_debug_dump<D: Write>(
    diag: &mut D,
    request: &Request,
    snapshot: &Snapshot,
) -> io::Result<()> {
    let banner = "-".repeat(20);
    writeln!(diag, "{banner}\nDebug:\n{banner}")?;
    writeln!(diag, "Options:\n{:?}", request)?;
    writeln!(diag, "Metrics:\n{:?}", snapshot)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockEvent, MockShell};
    use crate::model::Backend;

    fn request(format: OutputFormat) -> Request {
        Request {
            target: Target::new("10.10.10.10"),
            format,
            debug: false,
        }
    }

    #[test]
    fn test_collect_uses_one_session_and_two_queries() {
        let shell = MockShell::typical_varnish();
        let collector = Collector::new(shell.clone());

        let snapshot = collector.collect(&Target::new("10.10.10.10")).unwrap();

        assert_eq!(snapshot.cache_hit_count, 80);
        assert_eq!(snapshot.cache_miss_count, 20);
        assert_eq!(
            snapshot.backends,
            vec![
                Backend::new("backend1", "Healthy"),
                Backend::new("boot.backend2", "Sick"),
            ]
        );
        assert_eq!(
            shell.events(),
            vec![
                MockEvent::Open("10.10.10.10".to_string()),
                MockEvent::Exec(CACHE_COUNTERS.to_string()),
                MockEvent::Exec(BACKEND_LIST.to_string()),
                MockEvent::Close,
            ]
        );
    }

    #[test]
    fn test_collect_and_render_text() {
        let collector = Collector::new(MockShell::typical_varnish());
        let mut out = Vec::new();
        let mut diag = Vec::new();

        collector
            .collect_and_render(&request(OutputFormat::Text), &mut out, &mut diag)
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\
cachesize=256MB
cache_filling=1MB
cache_hit_rate=80%
backend_server_backend1=healthy
backend_server_backend2=sick
"
        );
        assert!(diag.is_empty());
    }

    #[test]
    fn test_collect_and_render_debug_dump() {
        let collector = Collector::new(MockShell::typical_varnish());
        let mut req = request(OutputFormat::Json);
        req.debug = true;
        let mut out = Vec::new();
        let mut diag = Vec::new();

        collector.collect_and_render(&req, &mut out, &mut diag).unwrap();

        let diag = String::from_utf8(diag).unwrap();
        assert!(diag.starts_with("--------------------\nDebug:\n--------------------\n"));
        assert!(diag.contains("Options:\nRequest {"));
        assert!(diag.contains("10.10.10.10"));
        assert!(diag.contains("Metrics:\nSnapshot {"));
        assert!(diag.contains("boot.backend2"));

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["cache_hit_rate"], "80%");
    }

    #[test]
    fn test_idle_cache_reports_zero_hit_rate() {
        let collector = Collector::new(MockShell::idle_varnish());
        let mut out = Vec::new();

        collector
            .collect_and_render(&request(OutputFormat::Text), &mut out, &mut io::sink())
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("cachesize=1GB\n"));
        assert!(text.contains("cache_hit_rate=0%\n"));
        assert!(text.contains("backend_server_default=healthy\n"));
    }

    #[test]
    fn test_connection_timeout_produces_no_output() {
        let mut shell = MockShell::typical_varnish();
        shell.fail_with_timeout();
        let collector = Collector::new(shell);
        let mut out = Vec::new();

        let err = collector
            .collect_and_render(&request(OutputFormat::Text), &mut out, &mut io::sink())
            .unwrap_err();

        assert!(matches!(err, CollectError::Transport(TransportError::Timeout { .. })));
        assert_eq!(err.exit_code(), 1);
        assert!(out.is_empty());
    }

    #[test]
    fn test_malformed_counters_produce_no_output() {
        let shell = MockShell::broken_varnishstat();
        let collector = Collector::new(shell.clone());
        let mut out = Vec::new();

        let err = collector
            .collect_and_render(&request(OutputFormat::Json), &mut out, &mut io::sink())
            .unwrap_err();

        assert!(matches!(err, CollectError::Parse { .. }));
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("malformed output from 10.10.10.10"));
        assert!(out.is_empty());
        // The session is still closed before parsing.
        assert_eq!(shell.events().last(), Some(&MockEvent::Close));
    }

    #[test]
    fn test_failed_query_aborts_collection() {
        let mut shell = MockShell::typical_varnish();
        shell.add_failing_command(BACKEND_LIST, "Could not connect to varnishd");
        let collector = Collector::new(shell);

        let err = collector.collect(&Target::new("cache1")).unwrap_err();
        assert!(matches!(err, CollectError::Transport(TransportError::Command { .. })));
    }

    #[test]
    fn test_every_format_renders_collected_snapshot() {
        for format in OutputFormat::ALL {
            let collector = Collector::new(MockShell::typical_varnish());
            let mut out = Vec::new();
            collector
                .collect_and_render(&request(format), &mut out, &mut io::sink())
                .unwrap();
            let out = String::from_utf8(out).unwrap();
            assert!(out.contains("80%"), "{}: {}", format, out);
            assert!(out.contains("256MB"), "{}: {}", format, out);
        }
    }

    #[test]
    fn test_exit_codes() {
        let err = CollectError::from(RenderError::UnknownFormat("bogus".into()));
        assert_eq!(err.exit_code(), 2);
        let err = CollectError::from(io::Error::other("closed pipe"));
        assert_eq!(err.exit_code(), 4);
    }
}
