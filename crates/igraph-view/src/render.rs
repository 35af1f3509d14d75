//! Rendering of a graph snapshot
//!
//! Each issue node shows its key linking to the issue page, the summary and
//! a status banner coloured by status category.

use crate::view::{GraphSnapshot, Phase};
use igraph_core::StatusCategory;
use std::fmt::Write as _;

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Graphviz DOT with pinned positions
    #[default]
    Dot,
    /// JSON snapshot
    Json,
    /// Plain listing
    Text,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dot" => Ok(Self::Dot),
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown format '{other}', expected dot, json or text")),
        }
    }
}

/// Banner fill colour for a status category
#[must_use]
pub fn status_colour(category: &StatusCategory) -> &'static str {
    match category {
        StatusCategory::New => "#dfe1e6",
        StatusCategory::Indeterminate => "#deebff",
        StatusCategory::Done => "#e3fcef",
        StatusCategory::Undefined | StatusCategory::Other(_) => "#f4f5f7",
    }
}

/// Render in the given format
///
/// # Errors
/// Only JSON serialisation can fail.
pub fn render(snapshot: &GraphSnapshot, format: Format, base_url: Option<&str>) -> Result<String, serde_json::Error> {
    match format {
        Format::Dot => Ok(to_dot(snapshot, base_url)),
        Format::Json => to_json(snapshot),
        Format::Text => Ok(to_text(snapshot)),
    }
}

/// Graphviz DOT; render with `neato -n` to keep the computed positions
#[must_use]
pub fn to_dot(snapshot: &GraphSnapshot, base_url: Option<&str>) -> String {
    let base = base_url.unwrap_or("").trim_end_matches('/');
    let mut out = String::from("digraph subtasks {\n");
    out.push_str("  node [shape=box, style=\"rounded,filled\", fontname=\"Helvetica\"];\n");

    for node in &snapshot.nodes {
        let issue = &node.data;
        let label = format!("{}\\n{}\\n[{}]", escape(&issue.key), escape(&issue.summary), escape(&issue.status));
        // DOT's y axis points up
        let _ = writeln!(
            out,
            "  \"{}\" [label=\"{}\", pos=\"{},{}!\", fillcolor=\"{}\", URL=\"{}{}\"];",
            escape(&node.id),
            label,
            node.position.x,
            -node.position.y,
            status_colour(&issue.status_category),
            escape(base),
            escape(&issue.browse_path()),
        );
    }

    for edge in &snapshot.edges {
        let style = if edge.data.is_pending() { ", style=dashed" } else { "" };
        let _ = writeln!(
            out,
            "  \"{}\" -> \"{}\" [id=\"{}\", label=\"{}\"{}];",
            escape(&edge.source),
            escape(&edge.target),
            escape(&edge.id),
            escape(&edge.data.link_type),
            style,
        );
    }

    out.push_str("}\n");
    out
}

/// Pretty JSON snapshot
///
/// # Errors
/// Passes through the `serde_json` error. Snapshot types hold only string
/// keys, so this does not fail in practice; non-finite positions come out as `null`.
pub fn to_json(snapshot: &GraphSnapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(snapshot)
}

/// Plain listing of issues and links
#[must_use]
pub fn to_text(snapshot: &GraphSnapshot) -> String {
    let mut out = String::new();
    match &snapshot.phase {
        Phase::Loading => out.push_str("Loading...\n"),
        Phase::Failed(message) => {
            let _ = writeln!(out, "Failed: {message}");
        }
        Phase::Idle | Phase::Ready => {}
    }

    let _ = writeln!(out, "Subtasks ({}):", snapshot.nodes.len());
    for node in &snapshot.nodes {
        let issue = &node.data;
        let _ = writeln!(
            out,
            "  {:<12} [{}] {} ({})",
            issue.key, issue.status_category, issue.summary, issue.status
        );
    }

    let _ = writeln!(out, "Links ({}):", snapshot.edges.len());
    for edge in &snapshot.edges {
        let marker = if edge.data.is_pending() { " (pending)" } else { "" };
        let _ = writeln!(
            out,
            "  {} --{}--> {}  #{}{}",
            edge.source, edge.data.link_type, edge.target, edge.id, marker
        );
    }
    out
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
