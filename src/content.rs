//! Post loading and derived metadata.
//!
//! Posts are declared as a JSON array of records (`posts.json`). Each record
//! points at its body in one of two ways:
//!
//! ```json
//! [
//!   { "slug": "hello", "title": "Hello", "date": "2024-03-01",
//!     "tags": ["rust"], "content": "posts/hello.md" },
//!   { "slug": "essay", "title": "An Essay", "date": "2024-01-01",
//!     "updated": "2024-02-10T09:00:00+01:00", "template": "posts/essay.html" }
//! ]
//! ```
//!
//! - **`content`**: a markdown file, relative to the site source directory.
//! - **`template`**: a hand-authored HTML fragment under `templates/`.
//!
//! The two are modelled as [`PostBody`] variants, each with its own
//! [`DeriveBody`] strategy producing the same [`DerivedBody`] shape. The
//! outline is always computed by [`markdown::extract_headings`] over the
//! resulting HTML, so both authoring paths agree on what a section is.
//!
//! ## Validation
//!
//! The record set is validated as a whole before any body is read:
//! malformed JSON, unknown fields, an invalid or duplicate slug, an
//! unparsable date, or a record without exactly one body reference aborts
//! the load. A body file that simply doesn't exist is *not* an error: the
//! post renders with empty content and no reading time.
//!
//! ## Ordering
//!
//! Posts are sorted by date, newest first. The sort is stable, so posts
//! sharing a date keep their order from the input file.

use crate::context::BuildContext;
use crate::lastmod::normalize_date;
use crate::markdown;
use crate::naming::is_valid_slug;
use crate::types::Heading;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Reading speed used for `reading_time_minutes`.
const WORDS_PER_MINUTE: f64 = 200.0;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed content records in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid post record #{index} ('{slug}'): {reason}")]
    InvalidRecord {
        index: usize,
        slug: String,
        reason: String,
    },
    #[error("Duplicate post slug '{0}'")]
    DuplicateSlug(String),
}

/// One record as written in `posts.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRecord {
    pub slug: String,
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub summary: Option<String>,
    /// Markdown body path.
    #[serde(default)]
    pub content: Option<String>,
    /// Template-authored body id.
    #[serde(default)]
    pub template: Option<String>,
}

/// Where a post's body comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "source", rename_all = "lowercase")]
pub enum PostBody {
    Markdown(MarkdownBody),
    Template(TemplateBody),
}

impl PostBody {
    pub fn strategy(&self) -> &dyn DeriveBody {
        match self {
            PostBody::Markdown(body) => body,
            PostBody::Template(body) => body,
        }
    }

    /// Body source relative to the source directory, for history lookups.
    pub fn relative_source(&self, templates_dir: &str) -> PathBuf {
        match self {
            PostBody::Markdown(body) => PathBuf::from(&body.path),
            PostBody::Template(body) => Path::new(templates_dir).join(&body.id),
        }
    }
}

/// Rendered body plus the numbers metadata is computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedBody {
    pub html: String,
    pub headings: Vec<Heading>,
    pub word_count: usize,
}

/// Turns a body reference into HTML, an outline, and a word count.
pub trait DeriveBody {
    /// The file this body is read from.
    fn source_path(&self, ctx: &BuildContext) -> PathBuf;

    /// Read and render the body. `Ok(None)` when the source doesn't exist.
    fn derive(&self, ctx: &BuildContext) -> Result<Option<DerivedBody>, ContentError>;
}

/// Markdown file, relative to the source directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MarkdownBody {
    pub path: String,
}

impl DeriveBody for MarkdownBody {
    fn source_path(&self, ctx: &BuildContext) -> PathBuf {
        ctx.source_path(&self.path)
    }

    fn derive(&self, ctx: &BuildContext) -> Result<Option<DerivedBody>, ContentError> {
        let Some(source) = read_optional(&self.source_path(ctx))? else {
            return Ok(None);
        };
        let rendered = markdown::render(&source);
        Ok(Some(DerivedBody {
            html: rendered.html,
            headings: rendered.headings,
            word_count: markdown::word_count(&source),
        }))
    }
}

/// Hand-authored HTML fragment, relative to the templates directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TemplateBody {
    pub id: String,
}

impl DeriveBody for TemplateBody {
    fn source_path(&self, ctx: &BuildContext) -> PathBuf {
        ctx.templates_dir().join(&self.id)
    }

    fn derive(&self, ctx: &BuildContext) -> Result<Option<DerivedBody>, ContentError> {
        let Some(html) = read_optional(&self.source_path(ctx))? else {
            return Ok(None);
        };
        let headings = markdown::extract_headings(&html);
        let word_count = markdown::word_count(&markdown::strip_tags(&html));
        Ok(Some(DerivedBody {
            html,
            headings,
            word_count,
        }))
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, ContentError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ContentError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// A fully loaded post.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub slug: String,
    pub title: String,
    pub date: NaiveDate,
    /// Explicit last-modified override, verbatim from the record.
    pub updated: Option<String>,
    pub tags: BTreeSet<String>,
    pub summary: Option<String>,
    pub body: PostBody,
    /// Empty when the body source is missing.
    pub content_html: String,
    pub headings: Vec<Heading>,
    /// Present only when the body resolved to non-empty text.
    pub reading_time_minutes: Option<u32>,
}

impl Post {
    /// Root-relative URL of the post page.
    pub fn url(&self) -> String {
        format!("/blog/{}/", self.slug)
    }

    /// Output path relative to the output directory.
    pub fn output_path(&self) -> String {
        format!("blog/{}/index.html", self.slug)
    }
}

/// `max(1, round(words / 200))`, or `None` for an empty body.
pub fn reading_time_minutes(word_count: usize) -> Option<u32> {
    if word_count == 0 {
        return None;
    }
    let minutes = (word_count as f64 / WORDS_PER_MINUTE).round() as u32;
    Some(minutes.max(1))
}

/// Posts in display order (newest first) with an O(1) slug index.
#[derive(Debug, Clone, Default)]
pub struct Posts {
    items: Vec<Post>,
    by_slug: HashMap<String, usize>,
}

impl Posts {
    /// Sort posts newest-first (stable) and index them by slug.
    pub fn new(mut items: Vec<Post>) -> Result<Self, ContentError> {
        items.sort_by(|a, b| b.date.cmp(&a.date));
        let mut by_slug = HashMap::with_capacity(items.len());
        for (idx, post) in items.iter().enumerate() {
            if by_slug.insert(post.slug.clone(), idx).is_some() {
                return Err(ContentError::DuplicateSlug(post.slug.clone()));
            }
        }
        Ok(Self { items, by_slug })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Post> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, slug: &str) -> Option<&Post> {
        self.by_slug.get(slug).map(|&idx| &self.items[idx])
    }

    /// Newest post, if any.
    pub fn latest(&self) -> Option<&Post> {
        self.items.first()
    }

    /// `(previous, next)` around `index`: previous is the newer post, next
    /// the older one. `None` at either end.
    pub fn neighbors(&self, index: usize) -> (Option<&Post>, Option<&Post>) {
        let previous = index.checked_sub(1).and_then(|i| self.items.get(i));
        let next = self.items.get(index + 1);
        (previous, next)
    }

    /// Union of all tags, sorted.
    pub fn tags(&self) -> BTreeSet<&str> {
        self.items
            .iter()
            .flat_map(|p| p.tags.iter().map(String::as_str))
            .collect()
    }
}

/// Load `posts.json` from the source directory.
///
/// A missing file is an empty collection; a malformed one aborts.
pub fn load(ctx: &BuildContext) -> Result<Posts, ContentError> {
    let path = ctx.source_path(&ctx.config.content_file);
    let Some(json) = read_optional(&path)? else {
        info!(path = %path.display(), "no content records, building without posts");
        return Ok(Posts::default());
    };
    let records = parse_records(&json, &path)?;
    let posts = from_records(records, ctx)?;
    info!(count = posts.len(), "loaded posts");
    Ok(posts)
}

/// Parse the record array. Any structural problem is fatal.
pub fn parse_records(json: &str, path: &Path) -> Result<Vec<RawRecord>, ContentError> {
    serde_json::from_str(json).map_err(|source| ContentError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Validate records, derive every body, then sort and index.
pub fn from_records(records: Vec<RawRecord>, ctx: &BuildContext) -> Result<Posts, ContentError> {
    let validated = validate_records(records)?;

    let mut items = Vec::with_capacity(validated.len());
    for (record, date, body) in validated {
        let derived = body.strategy().derive(ctx)?;
        let (content_html, headings, reading_time) = match derived {
            Some(d) => (d.html, d.headings, reading_time_minutes(d.word_count)),
            None => {
                warn!(
                    slug = %record.slug,
                    source = %body.strategy().source_path(ctx).display(),
                    "post body not found, rendering with empty content"
                );
                (String::new(), Vec::new(), None)
            }
        };
        debug!(slug = %record.slug, headings = headings.len(), ?reading_time, "derived post body");

        items.push(Post {
            slug: record.slug,
            title: record.title,
            date,
            updated: record.updated.filter(|u| !u.trim().is_empty()),
            tags: record.tags.unwrap_or_default().into_iter().collect(),
            summary: record.summary,
            body,
            content_html,
            headings,
            reading_time_minutes: reading_time,
        });
    }

    Posts::new(items)
}

fn validate_records(
    records: Vec<RawRecord>,
) -> Result<Vec<(RawRecord, NaiveDate, PostBody)>, ContentError> {
    let mut seen = HashSet::new();
    let mut validated = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let invalid = |reason: String| ContentError::InvalidRecord {
            index,
            slug: record.slug.clone(),
            reason,
        };

        if !is_valid_slug(&record.slug) {
            return Err(invalid(
                "slug must be non-empty lowercase letters, digits and single dashes".into(),
            ));
        }
        if !seen.insert(record.slug.clone()) {
            return Err(ContentError::DuplicateSlug(record.slug.clone()));
        }
        if record.title.trim().is_empty() {
            return Err(invalid("title must not be empty".into()));
        }
        let date = normalize_date(&record.date)
            .ok_or_else(|| invalid(format!("unparsable date '{}'", record.date)))?;

        let body = match (&record.content, &record.template) {
            (Some(path), None) => {
                check_body_path(path).map_err(&invalid)?;
                PostBody::Markdown(MarkdownBody { path: path.clone() })
            }
            (None, Some(id)) => {
                check_body_path(id).map_err(&invalid)?;
                PostBody::Template(TemplateBody { id: id.clone() })
            }
            (Some(_), Some(_)) => {
                return Err(invalid(
                    "set either 'content' or 'template', not both".into(),
                ));
            }
            (None, None) => {
                return Err(invalid(
                    "a body reference ('content' or 'template') is required".into(),
                ));
            }
        };

        validated.push((record, date, body));
    }
    Ok(validated)
}

fn check_body_path(path: &str) -> Result<(), String> {
    let p = Path::new(path);
    if path.trim().is_empty()
        || p.is_absolute()
        || p.components().any(|c| matches!(c, Component::ParentDir))
    {
        return Err(format!("body path '{path}' must be relative and stay inside the site"));
    }
    Ok(())
}
