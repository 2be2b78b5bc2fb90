//! Page rendering.
//!
//! The build hands every page to a [`TemplateEngine`] as a template id plus
//! a [`RenderContext`]. The context is a plain serializable value, so any
//! engine that can consume serde data can sit behind the trait; the stock
//! engine is [`Theme`], a set of [maud](https://maud.lambda.xyz/) layouts
//! compiled into the binary.
//!
//! ## Theme templates
//!
//! | id              | page                                                 |
//! |-----------------|------------------------------------------------------|
//! | `index.html`    | home: tagline and the latest post                    |
//! | `404.html`      | not-found page with the holiday banner               |
//! | `blog.html`     | every post, newest first, with a tag filter          |
//! | `projects.html` | cards from the page's JSON data file                 |
//! | `resume.html`   | the page's markdown data file                        |
//! | `post.html`     | one post with its outline and previous/next links    |
//!
//! Asking for any other id is a [`RenderError::MissingTemplate`].

use crate::bundle::BundleRefs;
use crate::config::{HolidayDetails, SiteMeta};
use crate::content::Post;
use crate::context::BuildContext;
use chrono::NaiveDate;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Template '{0}' not found")]
    MissingTemplate(String),
}

/// Renders a template id against a context.
pub trait TemplateEngine {
    fn render(&self, template: &str, ctx: &RenderContext<'_>) -> Result<String, RenderError>;
}

/// Everything a template can see.
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext<'a> {
    pub site: &'a SiteMeta,
    pub base_url: &'a str,
    /// Page key of the page being rendered; selects the active nav entry.
    pub active_page: &'a str,
    pub bundles: BundleRefs,
    pub build_date: NaiveDate,
    /// Every post, newest first. Filled for the blog listing.
    pub posts: Vec<&'a Post>,
    /// Sorted union of all post tags. Filled for the blog listing.
    pub tags: Vec<&'a str>,
    /// Filled for the home page.
    pub latest_post: Option<&'a Post>,
    /// The post being rendered, for the post layout.
    pub post: Option<&'a Post>,
    /// Newer neighbor.
    pub previous: Option<&'a Post>,
    /// Older neighbor.
    pub next: Option<&'a Post>,
    /// Rendered markdown data file.
    pub body_html: Option<String>,
    /// Parsed JSON data file.
    pub data: Option<Value>,
}

impl<'a> RenderContext<'a> {
    pub fn new(ctx: &'a BuildContext, active_page: &'a str, bundles: BundleRefs) -> Self {
        Self {
            site: &ctx.site,
            base_url: &ctx.base_url,
            active_page,
            bundles,
            build_date: ctx.build_date,
            posts: Vec::new(),
            tags: Vec::new(),
            latest_post: None,
            post: None,
            previous: None,
            next: None,
            body_html: None,
            data: None,
        }
    }
}

/// The built-in maud theme.
#[derive(Debug, Clone, Copy, Default)]
pub struct Theme;

impl TemplateEngine for Theme {
    fn render(&self, template: &str, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        let markup = match template {
            "index.html" => render_home(ctx),
            "404.html" => render_not_found(ctx),
            "blog.html" => render_blog(ctx),
            "projects.html" => render_projects(ctx),
            "resume.html" => render_resume(ctx),
            "post.html" => render_post(ctx),
            other => return Err(RenderError::MissingTemplate(other.to_string())),
        };
        Ok(markup.into_string())
    }
}

/// Navigation entries: (page key, label, href).
const NAV: &[(&str, &str, &str)] = &[
    ("home", "Home", "/"),
    ("blog", "Blog", "/blog/"),
    ("projects", "Projects", "/projects/"),
    ("resume", "Resume", "/resume/"),
];

/// Whether the holiday banner shows on `date`.
///
/// `start`/`end` are inclusive `MM-DD` bounds; a window whose end is before
/// its start wraps over the new year. Missing bounds mean always on.
pub fn holiday_active(holiday: &HolidayDetails, date: NaiveDate) -> bool {
    if !holiday.enabled {
        return false;
    }
    let today = date.format("%m-%d").to_string();
    match (holiday.start.as_deref(), holiday.end.as_deref()) {
        (Some(start), Some(end)) if start <= end => start <= today.as_str() && today.as_str() <= end,
        (Some(start), Some(end)) => today.as_str() >= start || today.as_str() <= end,
        (Some(start), None) => today.as_str() >= start,
        (None, Some(end)) => today.as_str() <= end,
        (None, None) => true,
    }
}

fn display_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(ctx: &RenderContext<'_>, title: &str, body_class: &str, content: Markup) -> Markup {
    let full_title = if title == ctx.site.title {
        title.to_string()
    } else {
        format!("{title} · {}", ctx.site.title)
    };
    html! {
        (DOCTYPE)
        html lang=(ctx.site.language) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                meta name="description" content=(ctx.site.description);
                meta name="author" content=(ctx.site.author);
                title { (full_title) }
                @if let Some(css) = &ctx.bundles.css {
                    link rel="stylesheet" href=(css);
                }
                @if let Some(js) = &ctx.bundles.js {
                    script src=(js) defer {}
                }
            }
            body class=(body_class) {
                (site_header(ctx))
                (holiday_banner(ctx))
                main { (content) }
                footer.site-footer {
                    p { "© " (ctx.build_date.format("%Y").to_string()) " " (ctx.site.author) }
                }
            }
        }
    }
}

/// Renders the site header with the active nav entry marked
fn site_header(ctx: &RenderContext<'_>) -> Markup {
    html! {
        header.site-header {
            a.site-title href="/" { (ctx.site.title) }
            button.menu-toggle type="button" aria-expanded="false" aria-controls="site-nav" { "Menu" }
            nav.site-nav id="site-nav" {
                ul {
                    @for (key, label, href) in NAV {
                        @let current = *key == ctx.active_page
                            || (*key == "blog" && ctx.post.is_some());
                        li class=[current.then_some("current")] {
                            a href=(href) aria-current=[current.then_some("page")] { (label) }
                        }
                    }
                }
            }
        }
    }
}

fn holiday_banner(ctx: &RenderContext<'_>) -> Markup {
    let holiday = &ctx.site.holiday;
    html! {
        @if holiday_active(holiday, ctx.build_date) {
            aside.holiday-banner data-holiday=[holiday.name.as_deref()] {
                @if let Some(emoji) = &holiday.emoji {
                    span.holiday-emoji { (emoji) }
                    " "
                }
                @if let Some(message) = &holiday.message {
                    (message)
                } @else if let Some(name) = &holiday.name {
                    "Happy " (name) "!"
                }
            }
        }
    }
}

fn post_meta(post: &Post) -> Markup {
    html! {
        p.post-meta {
            time datetime=(post.date.format("%Y-%m-%d").to_string()) { (display_date(post.date)) }
            @if let Some(minutes) = post.reading_time_minutes {
                " · " span.reading-time { (minutes) " min read" }
            }
        }
    }
}

fn tag_list(post: &Post) -> Markup {
    html! {
        @if !post.tags.is_empty() {
            ul.tags {
                @for tag in &post.tags {
                    li.tag { (tag) }
                }
            }
        }
    }
}

fn post_card(post: &Post) -> Markup {
    let tags = post.tags.iter().cloned().collect::<Vec<_>>().join(" ");
    html! {
        article.post-card data-tags=(tags) {
            h2 { a href=(post.url()) { (post.title) } }
            (post_meta(post))
            @if let Some(summary) = &post.summary {
                p.summary { (summary) }
            }
            (tag_list(post))
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

fn render_home(ctx: &RenderContext<'_>) -> Markup {
    let content = html! {
        section.intro {
            h1 { (ctx.site.title) }
            p.tagline { (ctx.site.tagline) }
            p { (ctx.site.description) }
        }
        @if let Some(post) = ctx.latest_post {
            section.latest-post {
                h2 { "Latest writing" }
                (post_card(post))
                p { a href="/blog/" { "All posts →" } }
            }
        }
    };
    base_document(ctx, &ctx.site.title, "home-page", content)
}

fn render_not_found(ctx: &RenderContext<'_>) -> Markup {
    let content = html! {
        section.not-found {
            h1 { "Page not found" }
            p { "The page you were looking for doesn't exist or has moved." }
            p { a href="/" { "Back to the home page" } }
        }
    };
    base_document(ctx, "Page not found", "not-found-page", content)
}

fn render_blog(ctx: &RenderContext<'_>) -> Markup {
    let content = html! {
        h1 { "Blog" }
        @if !ctx.tags.is_empty() {
            nav.tag-filter aria-label="Filter posts by tag" {
                button.tag-filter-button.active type="button" data-tag="" { "All" }
                @for tag in &ctx.tags {
                    button.tag-filter-button type="button" data-tag=(tag) { (tag) }
                }
            }
        }
        @if ctx.posts.is_empty() {
            p.empty { "Nothing here yet." }
        } @else {
            section.post-list {
                @for post in &ctx.posts {
                    (post_card(post))
                }
            }
        }
    };
    base_document(ctx, "Blog", "blog-page", content)
}

/// Project entries from a JSON data file: either a bare array or an object
/// with a `projects` array.
fn project_items(data: Option<&Value>) -> &[Value] {
    match data {
        Some(Value::Array(items)) => items,
        Some(Value::Object(map)) => match map.get("projects") {
            Some(Value::Array(items)) => items,
            _ => &[],
        },
        _ => &[],
    }
}

fn str_field<'v>(item: &'v Value, keys: &[&str]) -> Option<&'v str> {
    keys.iter().find_map(|k| item.get(*k).and_then(Value::as_str))
}

fn render_projects(ctx: &RenderContext<'_>) -> Markup {
    let items = project_items(ctx.data.as_ref());
    let content = html! {
        h1 { "Projects" }
        section.project-grid {
            @for item in items {
                @let name = str_field(item, &["name", "title"]).unwrap_or("Untitled");
                article.project-card {
                    h2 {
                        @if let Some(url) = str_field(item, &["url", "link"]) {
                            a href=(url) rel="noopener" { (name) }
                        } @else {
                            (name)
                        }
                    }
                    @if let Some(desc) = str_field(item, &["description", "summary"]) {
                        p { (desc) }
                    }
                    @if let Some(Value::Array(tags)) = item.get("tags") {
                        ul.tags {
                            @for tag in tags.iter().filter_map(Value::as_str) {
                                li.tag { (tag) }
                            }
                        }
                    }
                }
            }
        }
    };
    base_document(ctx, "Projects", "projects-page", content)
}

fn render_resume(ctx: &RenderContext<'_>) -> Markup {
    let content = html! {
        article.resume {
            @if let Some(body) = &ctx.body_html {
                (PreEscaped(body))
            } @else {
                h1 { "Resume" }
            }
        }
    };
    base_document(ctx, "Resume", "resume-page", content)
}

fn render_post(ctx: &RenderContext<'_>) -> Markup {
    let Some(post) = ctx.post else {
        return base_document(ctx, "Post", "post-page", html! {});
    };
    let content = html! {
        article.post {
            header.post-header {
                h1 { (post.title) }
                (post_meta(post))
                (tag_list(post))
            }
            @if !post.headings.is_empty() {
                nav.post-sections aria-label="Sections" {
                    ol {
                        @for heading in &post.headings {
                            li { a href={ "#" (heading.id) } { (heading.title) } }
                        }
                    }
                }
            }
            div.post-content {
                (PreEscaped(&post.content_html))
            }
        }
        nav.post-nav {
            @if let Some(prev) = ctx.previous {
                a.post-nav-previous href=(prev.url()) rel="prev" { "← " (prev.title) }
            }
            @if let Some(next) = ctx.next {
                a.post-nav-next href=(next.url()) rel="next" { (next.title) " →" }
            }
        }
    };
    base_document(ctx, &post.title, "post-page", content)
}
