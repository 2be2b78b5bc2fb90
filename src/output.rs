//! CLI output formatting for the build and check commands.
//!
//! Output is an inventory of what was produced, grouped by kind, with
//! one header line per entity and indented context lines underneath.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! CSS generation: skipped (tool missing)
//! Static: 14 files
//!
//! Pages
//! 001 index.html
//!     lastmod: 2024-06-15
//! 002 404.html
//!     not in sitemap
//!
//! Posts
//! 001 blog/newest/index.html
//!     lastmod: 2024-03-01
//!
//! Bundles
//!     home-styles → /static/bundles/home-styles-3f9a1c0b2e.css (1.2 KB)
//!
//! Sitemap: 6 entries
//! Built 5 pages, 1 post, 1 bundle → dist
//! ```
//!
//! ## Check
//!
//! ```text
//! 3 posts, 5 pages, 12 bundle sources
//! Missing post bodies
//!     draft-notes
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::build::{BuildSummary, CheckSummary};
use crate::pregen::CssGeneration;
use crate::types::WrittenPage;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 post`, `3 posts`.
fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Human-readable byte size.
fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

fn format_css_generation(outcome: &CssGeneration) -> String {
    match outcome {
        CssGeneration::Ok => "CSS generation: ok".to_string(),
        CssGeneration::ToolMissing => "CSS generation: skipped (tool missing)".to_string(),
        CssGeneration::Failed(reason) => format!("CSS generation: failed ({reason})"),
    }
}

fn page_lines(pages: &[WrittenPage], lines: &mut Vec<String>) {
    for (i, page) in pages.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), page.output));
        match page.lastmod {
            Some(date) => lines.push(format!("{}lastmod: {}", indent(1), date.format("%Y-%m-%d"))),
            None => lines.push(format!("{}not in sitemap", indent(1))),
        }
    }
}

pub fn format_build_output(summary: &BuildSummary) -> Vec<String> {
    let mut lines = vec![
        format_css_generation(&summary.css_generation),
        format!("Static: {}", plural(summary.static_files, "file")),
    ];

    if !summary.pages.is_empty() {
        lines.push(String::new());
        lines.push("Pages".to_string());
        page_lines(&summary.pages, &mut lines);
    }

    if !summary.posts.is_empty() {
        lines.push(String::new());
        lines.push("Posts".to_string());
        page_lines(&summary.posts, &mut lines);
    }

    if !summary.bundles.is_empty() {
        lines.push(String::new());
        lines.push("Bundles".to_string());
        for bundle in &summary.bundles {
            lines.push(format!(
                "{}{} → {} ({})",
                indent(1),
                bundle.name,
                bundle.url,
                format_size(bundle.size)
            ));
        }
    }

    lines.push(String::new());
    if summary.sitemap_written() {
        let entries = match summary.sitemap_entries {
            1 => "1 entry".to_string(),
            n => format!("{n} entries"),
        };
        lines.push(format!("Sitemap: {entries}"));
    } else {
        lines.push("Sitemap: none (no entries)".to_string());
    }
    lines.push(format!(
        "Built {}, {}, {} → {}",
        plural(summary.pages.len(), "page"),
        plural(summary.posts.len(), "post"),
        plural(summary.bundles.len(), "bundle"),
        summary.output_dir.display()
    ));
    lines
}

pub fn print_build_output(summary: &BuildSummary) {
    for line in format_build_output(summary) {
        println!("{}", line);
    }
}

pub fn format_check_output(summary: &CheckSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "{}, {}, {}",
        plural(summary.posts, "post"),
        plural(summary.pages, "page"),
        plural(summary.bundle_sources, "bundle source")
    )];
    if !summary.missing_bodies.is_empty() {
        lines.push("Missing post bodies".to_string());
        for slug in &summary.missing_bodies {
            lines.push(format!("{}{}", indent(1), slug));
        }
    }
    lines
}

pub fn print_check_output(summary: &CheckSummary) {
    for line in format_check_output(summary) {
        println!("{}", line);
    }
}
