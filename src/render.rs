//! Output encodings for a metrics [`Snapshot`].
//!
//! Every format exposes the same fields: `cachesize`, `cache_filling`,
//! `cache_hit_rate` as human-readable strings, plus the backend list with
//! lowercased states. Only the text format shortens `boot.` backend names.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::model::{Backend, Snapshot};

const VALID_FORMATS: &str = "text, json, json-pretty, yaml, xml";

/// Rendering failures.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(
        "'{0}' is not a valid output format. Please use one of: {formats}",
        formats = VALID_FORMATS
    )]
    UnknownFormat(String),
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml encoding failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Supported output encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `key=value` lines.
    #[default]
    Text,
    /// Compact JSON object.
    Json,
    /// Indented JSON object.
    JsonPretty,
    /// Block-style YAML mapping.
    Yaml,
    /// XML document rooted at `<metric>`.
    Xml,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Text,
        OutputFormat::Json,
        OutputFormat::JsonPretty,
        OutputFormat::Yaml,
        OutputFormat::Xml,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::JsonPretty => "json-pretty",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Xml => "xml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| RenderError::UnknownFormat(s.to_string()))
    }
}

/// Serializable view of a snapshot shared by the structured formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report<'a> {
    pub cachesize: String,
    pub cache_filling: String,
    pub cache_hit_rate: String,
    pub backends: Vec<BackendReport<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendReport<'a> {
    pub name: &'a str,
    pub state: String,
}

impl<'a> Report<'a> {
    pub fn from_snapshot(snapshot: &'a Snapshot) -> Self {
        Self {
            cachesize: snapshot.cache_size(),
            cache_filling: snapshot.cache_filling(),
            cache_hit_rate: snapshot.cache_hit_rate_percent(),
            backends: snapshot.backends.iter().map(BackendReport::from).collect(),
        }
    }
}

impl<'a> From<&'a Backend> for BackendReport<'a> {
    fn from(backend: &'a Backend) -> Self {
        Self {
            name: &backend.name,
            state: backend.normalized_state(),
        }
    }
}

/// Renders `snapshot` in the given format. The result ends with a newline.
pub fn render(snapshot: &Snapshot, format: OutputFormat) -> Result<String, RenderError> {
    let report = Report::from_snapshot(snapshot);
    let rendered = match format {
        OutputFormat::Text => render_text(snapshot, &report),
        OutputFormat::Json => serde_json::to_string(&report)? + "\n",
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&report)? + "\n",
        OutputFormat::Yaml => serde_yaml::to_string(&report)?,
        OutputFormat::Xml => render_xml(&report),
    };
    Ok(rendered)
}

/// Renders `snapshot` in the format named by `format`.
///
/// An unknown name produces no output and returns [`RenderError::UnknownFormat`].
pub fn render_named(snapshot: &Snapshot, format: &str) -> Result<String, RenderError> {
    render(snapshot, format.parse()?)
}

fn render_text(snapshot: &Snapshot, report: &Report<'_>) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "cachesize={}", report.cachesize);
    let _ = writeln!(out, "cache_filling={}", report.cache_filling);
    let _ = writeln!(out, "cache_hit_rate={}", report.cache_hit_rate);
    for backend in &snapshot.backends {
        let _ = writeln!(
            out,
            "backend_server_{}={}",
            backend.short_name(),
            backend.normalized_state()
        );
    }
    out
}

fn render_xml(report: &Report<'_>) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<metric>\n");
    xml_element(&mut out, 1, "cachesize", &report.cachesize);
    xml_element(&mut out, 1, "cache-filling", &report.cache_filling);
    xml_element(&mut out, 1, "cache-hit-rate", &report.cache_hit_rate);
    if report.backends.is_empty() {
        out.push_str("  <backends/>\n");
    } else {
        out.push_str("  <backends>\n");
        for backend in &report.backends {
            out.push_str("    <backend>\n");
            xml_element(&mut out, 3, "name", backend.name);
            xml_element(&mut out, 3, "state", &backend.state);
            out.push_str("    </backend>\n");
        }
        out.push_str("  </backends>\n");
    }
    out.push_str("</metric>\n");
    out
}

fn xml_element(out: &mut String, depth: usize, tag: &str, text: &str) {
    let _ = writeln!(
        out,
        "{:indent$}<{tag}>{}</{tag}>",
        "",
        xml_escape(text),
        indent = depth * 2,
    );
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
