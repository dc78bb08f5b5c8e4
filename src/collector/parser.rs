//! Parsers for `varnishstat` and `varnishadm` output.
//!
//! These are pure functions over the captured text of the two remote
//! queries, so they can be tested with plain string inputs.

use thiserror::Error;
use tracing::debug;

use crate::model::{Backend, Snapshot};

/// Error type for malformed remote output.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Parse error: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

/// Counter names in the order the counters query prints them.
pub const COUNTER_FIELDS: [&str; 4] = ["cache_hit", "cache_miss", "g_space", "c_bytes"];

/// Raw counters from the counters query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
    pub size_bytes: u64,
    pub used_bytes: u64,
}

/// Parses the counters block: one value per line, in [`COUNTER_FIELDS`] order.
///
/// Blank lines are ignored. Exactly four values are required and each must
/// be a non-negative integer; the position alone decides the field.
pub fn parse_cache_counters(content: &str) -> Result<CacheCounters, ParseError> {
    let values: Vec<(usize, &str)> = content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect();

    if values.len() != COUNTER_FIELDS.len() {
        return Err(ParseError::new(format!(
            "expected {} counter lines, got {}",
            COUNTER_FIELDS.len(),
            values.len()
        )));
    }

    let mut parsed = [0u64; 4];
    for (slot, ((line_no, raw), name)) in values.iter().zip(COUNTER_FIELDS).enumerate() {
        parsed[slot] = raw.parse().map_err(|_| {
            ParseError::new(format!("invalid {} on line {}: '{}'", name, line_no, raw))
        })?;
    }

    let counters = CacheCounters {
        hits: parsed[0],
        misses: parsed[1],
        size_bytes: parsed[2],
        used_bytes: parsed[3],
    };
    debug!(?counters, "parsed cache counters");
    Ok(counters)
}

/// Parses the backend block: `<name> <state>` per line.
///
/// Blank lines are ignored. Any other line that does not split into exactly
/// two tokens fails the whole block.
pub fn parse_backend_list(content: &str) -> Result<Vec<Backend>, ParseError> {
    let mut backends = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [name, state] => backends.push(Backend::new(*name, *state)),
            _ => {
                return Err(ParseError::new(format!(
                    "malformed backend line {}: expected '<name> <state>', got '{}'",
                    idx + 1,
                    line
                )));
            }
        }
    }

    debug!(count = backends.len(), "parsed backend list");
    Ok(backends)
}

/// Builds a [`Snapshot`] from the output of both queries.
pub fn build_snapshot(
    counters_output: &str,
    backends_output: &str,
) -> Result<Snapshot, ParseError> {
    let counters = parse_cache_counters(counters_output)?;
    let backends = parse_backend_list(backends_output)?;

    Ok(Snapshot::new(
        counters.hits,
        counters.misses,
        counters.size_bytes,
        counters.used_bytes,
        backends,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cache_counters_basic() {
        let content = "80\n20\n268435456\n1048576\n";
        let counters = parse_cache_counters(content).unwrap();

        assert_eq!(counters.hits, 80);
        assert_eq!(counters.misses, 20);
        assert_eq!(counters.size_bytes, 268_435_456);
        assert_eq!(counters.used_bytes, 1_048_576);
    }

    #[test]
    fn test_parse_cache_counters_ignores_blank_lines_and_padding() {
        let content = "\n  5 \n7\n\n100\n  50\n\n";
        let counters = parse_cache_counters(content).unwrap();

        assert_eq!(counters.hits, 5);
        assert_eq!(counters.misses, 7);
        assert_eq!(counters.size_bytes, 100);
        assert_eq!(counters.used_bytes, 50);
    }

    #[test]
    fn test_parse_cache_counters_too_few_lines() {
        let err = parse_cache_counters("1\n2\n3\n").unwrap_err();
        assert!(err.message.contains("expected 4 counter lines, got 3"));

        assert!(parse_cache_counters("").is_err());
    }

    #[test]
    fn test_parse_cache_counters_too_many_lines() {
        let err = parse_cache_counters("1\n2\n3\n4\n5\n").unwrap_err();
        assert!(err.message.contains("got 5"));
    }

    #[test]
    fn test_parse_cache_counters_non_numeric() {
        let err = parse_cache_counters("1\nabc\n3\n4\n").unwrap_err();
        assert!(err.message.contains("cache_miss"));
        assert!(err.message.contains("line 2"));
        assert!(err.message.contains("'abc'"));
    }

    #[test]
    fn test_parse_cache_counters_rejects_negative_and_multi_token() {
        assert!(parse_cache_counters("-1\n2\n3\n4\n").is_err());
        assert!(parse_cache_counters("MAIN.cache_hit 1\n2\n3\n4\n").is_err());
    }

    #[test]
    fn test_parse_backend_list_preserves_order() {
        let content = "backend1 healthy\nboot.backend2 sick\n";
        let backends = parse_backend_list(content).unwrap();

        assert_eq!(
            backends,
            vec![
                Backend::new("backend1", "healthy"),
                Backend::new("boot.backend2", "sick"),
            ]
        );
    }

    #[test]
    fn test_parse_backend_list_empty() {
        assert!(parse_backend_list("").unwrap().is_empty());
        assert!(parse_backend_list("\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_backend_list_keeps_raw_case() {
        let backends = parse_backend_list("boot.default   Healthy\n").unwrap();
        assert_eq!(backends[0].name, "boot.default");
        assert_eq!(backends[0].state, "Healthy");
    }

    #[test]
    fn test_parse_backend_list_malformed_line_fails() {
        let err = parse_backend_list("web1 healthy\nweb2\n").unwrap_err();
        assert!(err.message.contains("line 2"));
        assert!(err.message.contains("'web2'"));

        let err = parse_backend_list("web1 probe healthy\n").unwrap_err();
        assert!(err.message.contains("line 1"));
    }

    #[test]
    fn test_build_snapshot() {
        let snapshot = build_snapshot(
            "80\n20\n268435456\n1048576\n",
            "backend1 healthy\nboot.backend2 sick\n",
        )
        .unwrap();

        assert_eq!(snapshot.cache_hit_count, 80);
        assert_eq!(snapshot.cache_miss_count, 20);
        assert_eq!(snapshot.cache_size_bytes, 268_435_456);
        assert_eq!(snapshot.cache_used_bytes, 1_048_576);
        assert_eq!(snapshot.cache_hit_rate_percent(), "80%");
        assert_eq!(snapshot.backends.len(), 2);
        assert_eq!(snapshot.backends[0], Backend::new("backend1", "healthy"));
        assert_eq!(snapshot.backends[1], Backend::new("boot.backend2", "sick"));
    }

    #[test]
    fn test_build_snapshot_propagates_backend_errors() {
        assert!(build_snapshot("1\n2\n3\n4\n", "only-name\n").is_err());
    }
}
