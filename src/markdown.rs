//! Markdown rendering and the section outline.
//!
//! Post bodies come in two shapes: markdown files rendered here, and
//! hand-authored HTML fragments read verbatim. Both end up as HTML, and the
//! outline of both is computed by the same function, [`extract_headings`],
//! run over that HTML. This keeps "what counts as a section" identical no
//! matter how a post was written.
//!
//! ## Heading contract
//!
//! A section is an `<h2>` element in the body HTML, in document order:
//!
//! - **id**: the element's `id` attribute; when absent, the slugified text
//!   (deduplicated with `-2`, `-3`, … suffixes)
//! - **title**: the element's text with tags stripped, basic entities decoded
//!   and whitespace collapsed
//!
//! The markdown renderer assigns ids to every level-2 heading before emitting
//! HTML, so rendered markdown always carries explicit anchors.

use crate::naming::slugify;
use crate::types::Heading;
use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Output of rendering a markdown body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub headings: Vec<Heading>,
}

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options
}

/// Render markdown to HTML and collect its level-2 outline.
pub fn render(source: &str) -> Rendered {
    let mut events: Vec<Event<'_>> = Parser::new_ext(source, parser_options()).collect();
    assign_heading_ids(&mut events);

    let mut out = String::with_capacity(source.len() + source.len() / 2);
    html::push_html(&mut out, events.into_iter());
    let headings = extract_headings(&out);
    Rendered { html: out, headings }
}

/// Give every level-2 heading without an explicit `{#id}` a slug id.
fn assign_heading_ids(events: &mut [Event<'_>]) {
    let mut used: HashSet<String> = events
        .iter()
        .filter_map(|e| match e {
            Event::Start(Tag::Heading { id: Some(id), .. }) => Some(id.to_string()),
            _ => None,
        })
        .collect();

    let mut i = 0;
    while i < events.len() {
        let needs_id = matches!(
            &events[i],
            Event::Start(Tag::Heading {
                level: HeadingLevel::H2,
                id: None,
                ..
            })
        );
        if needs_id {
            let mut text = String::new();
            let mut end = i + 1;
            while end < events.len() && !matches!(events[end], Event::End(TagEnd::Heading(_))) {
                if let Event::Text(t) | Event::Code(t) = &events[end] {
                    text.push_str(t);
                }
                end += 1;
            }
            let id = unique_id(slugify(&text), &mut used);
            if let Event::Start(Tag::Heading { id: slot, .. }) = &mut events[i] {
                *slot = Some(CowStr::from(id));
            }
            i = end;
        }
        i += 1;
    }
}

fn unique_id(base: String, used: &mut HashSet<String>) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

static H2_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h2\b([^>]*)>(.*?)</h2\s*>").unwrap());

static ID_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(?:^|\s)id\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

fn explicit_id(attrs: &str) -> Option<String> {
    ID_ATTR
        .captures(attrs)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_string())
        .filter(|id| !id.is_empty())
}

/// Extract the level-2 outline from an HTML body.
///
/// Explicit ids are reserved up front so a generated anchor never collides
/// with one that appears later in the body.
pub fn extract_headings(body_html: &str) -> Vec<Heading> {
    let elements: Vec<(Option<String>, String)> = H2_ELEMENT
        .captures_iter(body_html)
        .map(|caps| {
            let attrs = caps.get(1).map_or("", |m| m.as_str());
            let inner = caps.get(2).map_or("", |m| m.as_str());
            let title = collapse_whitespace(&decode_entities(&strip_tags(inner)));
            (explicit_id(attrs), title)
        })
        .collect();

    let mut used: HashSet<String> = elements.iter().filter_map(|(id, _)| id.clone()).collect();
    elements
        .into_iter()
        .map(|(explicit, title)| {
            let id = explicit.unwrap_or_else(|| unique_id(slugify(&title), &mut used));
            Heading { id, title }
        })
        .collect()
}

/// Strip HTML tags from a string (simple angle-bracket stripping).
pub fn strip_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                if in_tag {
                    in_tag = false;
                    // Keep words on either side of a tag apart.
                    result.push(' ');
                } else {
                    result.push(c);
                }
            }
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Count whitespace-delimited tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
