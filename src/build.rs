//! The build pipeline.
//!
//! One call to [`build`] turns a site source directory into a complete
//! output tree:
//!
//! ```text
//! 1. Pre-generate   optional CSS generation script (warn on failure)
//! 2. Clean          wipe and recreate the output directory
//! 3. Static         copy static/ verbatim
//! 4. Load           read and validate posts.json, derive post bodies
//! 5. Pages          bundles → context → render → write → sitemap entry
//! 6. Posts          same, once per post, with previous/next neighbors
//! 7. Finalize       sitemap.xml (when non-empty) and robots.txt
//! ```
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html
//! ├── 404.html
//! ├── blog/
//! │   ├── index.html
//! │   └── {slug}/index.html
//! ├── projects/index.html
//! ├── resume/index.html
//! ├── static/
//! │   ├── ...                       # copied from site/static
//! │   └── bundles/
//! │       ├── blog-styles-3f9a1c0b2e.css
//! │       └── blog-scripts-8d41e07a55.js
//! ├── sitemap.xml
//! └── robots.txt
//! ```
//!
//! Everything that varies per invocation (base URL, build date, paths) comes
//! in through the [`BuildContext`]; the template engine and the version
//! history are passed in so tests can swap them.

use crate::bundle::{self, AssetBundler, Bundle, BundleError};
use crate::config::{ConfigError, PageConfig};
use crate::content::{self, ContentError, Posts};
use crate::context::BuildContext;
use crate::lastmod::{History, LastModifiedResolver};
use crate::markdown;
use crate::pregen::{self, CssGeneration};
use crate::render::{RenderContext, RenderError, TemplateEngine};
use crate::sitemap::{self, SitemapBuilder};
use crate::types::WrittenPage;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Where `static/` lands inside the output directory.
const STATIC_OUTPUT_DIR: &str = "static";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Content error: {0}")]
    Content(#[from] ContentError),
    #[error("Bundle error: {0}")]
    Bundle(#[from] BundleError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("Refusing to clear {output}: it contains the source directory {site}")]
    UnsafeOutput { output: PathBuf, site: PathBuf },
    #[error("Invalid JSON in data file {path}: {source}")]
    DataJson {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to copy static files: {0}")]
    Walk(#[from] walkdir::Error),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> BuildError + '_ {
    move |source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// What a build produced.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub output_dir: PathBuf,
    pub css_generation: CssGeneration,
    pub static_files: usize,
    /// Static pages, in configuration order.
    pub pages: Vec<WrittenPage>,
    /// Post pages, newest first.
    pub posts: Vec<WrittenPage>,
    pub bundles: Vec<Bundle>,
    pub sitemap_entries: usize,
}

impl BuildSummary {
    pub fn sitemap_written(&self) -> bool {
        self.sitemap_entries > 0
    }
}

/// Build the whole site.
pub fn build(
    ctx: &BuildContext,
    engine: &dyn TemplateEngine,
    history: &dyn History,
) -> Result<BuildSummary, BuildError> {
    info!(
        source = %ctx.source_dir.display(),
        output = %ctx.output_dir.display(),
        base_url = %ctx.base_url,
        "starting build"
    );

    let css_generation = pregen::generate_css(ctx);
    prepare_output(ctx)?;
    let static_files = copy_static(ctx)?;
    let posts = content::load(ctx)?;

    let mut bundler = AssetBundler::new();
    let resolver = LastModifiedResolver::new(ctx, history);
    let mut sitemap = SitemapBuilder::new(&ctx.base_url);

    let mut pages = Vec::with_capacity(ctx.config.pages.len());
    for page in &ctx.config.pages {
        let bundles = bundler.resolve(ctx, &page.key)?;
        let mut rc = RenderContext::new(ctx, &page.key, bundles);
        match page.key.as_str() {
            "blog" => {
                rc.posts = posts.iter().collect();
                rc.tags = posts.tags().into_iter().collect();
            }
            "home" => rc.latest_post = posts.latest(),
            _ => {}
        }
        if let Some(data) = &page.data {
            load_page_data(ctx, data, &mut rc)?;
        }

        let html = engine.render(&page.template, &rc)?;
        write_output(ctx, &page.output, &html)?;

        let lastmod = page.sitemap.then(|| {
            let date = resolver.resolve(&page_candidates(ctx, page), None, None);
            sitemap.accumulate(&page.output, date);
            date
        });
        debug!(page = %page.key, output = %page.output, ?lastmod, "wrote page");
        pages.push(WrittenPage {
            output: page.output.clone(),
            lastmod,
        });
    }

    let written_posts = render_posts(ctx, engine, &resolver, &mut bundler, &mut sitemap, &posts)?;

    let sitemap_entries = sitemap.len();
    match sitemap.finalize() {
        Some(xml) => {
            write_output(ctx, "sitemap.xml", &xml)?;
        }
        None => info!("no sitemap entries, skipping sitemap.xml"),
    }
    write_output(ctx, "robots.txt", &sitemap::robots_txt(&ctx.base_url))?;

    info!(
        pages = pages.len(),
        posts = written_posts.len(),
        bundles = bundler.bundles().len(),
        sitemap_entries,
        "build complete"
    );

    Ok(BuildSummary {
        output_dir: ctx.output_dir.clone(),
        css_generation,
        static_files,
        pages,
        posts: written_posts,
        bundles: bundler.bundles().to_vec(),
        sitemap_entries,
    })
}

fn render_posts(
    ctx: &BuildContext,
    engine: &dyn TemplateEngine,
    resolver: &LastModifiedResolver<'_>,
    bundler: &mut AssetBundler,
    sitemap: &mut SitemapBuilder,
    posts: &Posts,
) -> Result<Vec<WrittenPage>, BuildError> {
    if posts.is_empty() {
        return Ok(Vec::new());
    }
    let bundles = bundler.resolve(ctx, &ctx.config.post_bundle)?;

    let mut written = Vec::with_capacity(posts.len());
    for (idx, post) in posts.iter().enumerate() {
        let (previous, next) = posts.neighbors(idx);
        let mut rc = RenderContext::new(ctx, &ctx.config.post_bundle, bundles.clone());
        rc.post = Some(post);
        rc.previous = previous;
        rc.next = next;

        let html = engine.render(&ctx.config.post_layout, &rc)?;
        let output = post.output_path();
        write_output(ctx, &output, &html)?;

        let candidate = post.body.relative_source(&ctx.config.templates_dir);
        let lastmod = resolver.resolve(&[candidate], post.updated.as_deref(), Some(post.date));
        sitemap.accumulate(&output, lastmod);
        debug!(slug = %post.slug, %lastmod, "wrote post");

        written.push(WrittenPage {
            output,
            lastmod: Some(lastmod),
        });
    }
    Ok(written)
}

/// Source files a static page is built from, relative to the source directory.
///
/// The stock theme is compiled in, so a `templates/<id>` file only counts
/// when the site actually ships one. Pages that list posts also depend on
/// the content file.
fn page_candidates(ctx: &BuildContext, page: &PageConfig) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    let template = Path::new(&ctx.config.templates_dir).join(&page.template);
    if ctx.source_dir.join(&template).is_file() {
        candidates.push(template);
    }
    if page.lists_posts {
        candidates.push(PathBuf::from(&ctx.config.content_file));
    }
    if let Some(data) = &page.data {
        candidates.push(PathBuf::from(data));
    }
    candidates
}

/// Attach a page's data file to its render context.
///
/// Markdown becomes `body_html`, JSON becomes `data`, anything else is
/// passed through as `body_html`. A missing file only warns.
fn load_page_data(
    ctx: &BuildContext,
    relative: &str,
    rc: &mut RenderContext<'_>,
) -> Result<(), BuildError> {
    let path = ctx.source_path(relative);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "page data file not found, rendering without it");
            return Ok(());
        }
        Err(source) => return Err(BuildError::Io { path, source }),
    };
    match Path::new(relative).extension().and_then(|e| e.to_str()) {
        Some("md" | "markdown") => rc.body_html = Some(markdown::render(&text).html),
        Some("json") => {
            let value = serde_json::from_str(&text)
                .map_err(|source| BuildError::DataJson { path, source })?;
            rc.data = Some(value);
        }
        _ => rc.body_html = Some(text),
    }
    Ok(())
}

/// Canonical form of a path for containment checks; falls back to the
/// absolute path when it doesn't exist yet.
fn comparable(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Wipe the previous output tree and recreate an empty output directory.
fn prepare_output(ctx: &BuildContext) -> Result<(), BuildError> {
    let output = comparable(&ctx.output_dir);
    let site = comparable(&ctx.source_dir);
    if site.starts_with(&output) {
        return Err(BuildError::UnsafeOutput {
            output: ctx.output_dir.clone(),
            site: ctx.source_dir.clone(),
        });
    }
    if ctx.output_dir.exists() {
        debug!(output = %ctx.output_dir.display(), "removing previous output");
        fs::remove_dir_all(&ctx.output_dir).map_err(io_err(&ctx.output_dir))?;
    }
    fs::create_dir_all(&ctx.output_dir).map_err(io_err(&ctx.output_dir))
}

/// Copy the static directory verbatim. Returns the number of files copied.
fn copy_static(ctx: &BuildContext) -> Result<usize, BuildError> {
    let src = ctx.static_dir();
    if !src.is_dir() {
        debug!(dir = %src.display(), "no static directory");
        return Ok(0);
    }
    let dst = ctx.output_dir.join(STATIC_OUTPUT_DIR);
    let mut copied = 0;
    for entry in WalkDir::new(&src).sort_by_file_name() {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(&src) else {
            continue;
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(io_err(&target))?;
        } else {
            fs::copy(entry.path(), &target).map_err(io_err(&target))?;
            copied += 1;
        }
    }
    info!(files = copied, "copied static files");
    Ok(copied)
}

fn write_output(ctx: &BuildContext, relative: &str, contents: &str) -> Result<(), BuildError> {
    let path = ctx.output_path(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    fs::write(&path, contents).map_err(io_err(&path))
}

/// What a check found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSummary {
    pub posts: usize,
    /// Posts whose body source could not be found.
    pub missing_bodies: Vec<String>,
    pub pages: usize,
    pub bundle_sources: usize,
}

/// Validate posts, bundle sources and templates without writing anything.
pub fn check(ctx: &BuildContext, engine: &dyn TemplateEngine) -> Result<CheckSummary, BuildError> {
    let posts = content::load(ctx)?;
    let bundle_sources = bundle::verify_sources(ctx)?;

    for page in &ctx.config.pages {
        if !ctx.config.bundles.contains_key(&page.key) {
            return Err(BundleError::UnknownPageKey(page.key.clone()).into());
        }
        let rc = RenderContext::new(ctx, &page.key, Default::default());
        engine.render(&page.template, &rc)?;
    }
    if !posts.is_empty() {
        if !ctx.config.bundles.contains_key(&ctx.config.post_bundle) {
            return Err(BundleError::UnknownPageKey(ctx.config.post_bundle.clone()).into());
        }
        let rc = RenderContext::new(ctx, &ctx.config.post_bundle, Default::default());
        engine.render(&ctx.config.post_layout, &rc)?;
    }

    let missing_bodies = posts
        .iter()
        .filter(|p| !p.body.strategy().source_path(ctx).is_file())
        .map(|p| p.slug.clone())
        .collect();

    Ok(CheckSummary {
        posts: posts.len(),
        missing_bodies,
        pages: ctx.config.pages.len(),
        bundle_sources,
    })
}
