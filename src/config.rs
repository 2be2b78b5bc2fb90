//! Build configuration and site metadata.
//!
//! Two independent inputs live here:
//!
//! - **`config.toml`** describes the build itself: where inputs live, which
//!   pages exist, which assets each page bundles, and the base URL. Stock
//!   defaults are overridden by a sparse user file, unknown keys are rejected,
//!   and a broken file aborts the build.
//! - **`site.json`** is the site-metadata overlay (title, author, holiday
//!   banner) handed to templates. It is best-effort: missing keys keep their
//!   defaults, `null` never overrides a default, and a missing or unparsable
//!   file falls back to defaults with a warning.
//!
//! ## Config File
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! base_url = "https://www.example.com"   # SITE_BASE_URL env var wins if set
//! content_file = "posts.json"
//! site_file = "site.json"
//! static_dir = "static"
//! templates_dir = "templates"
//! bundle_dir = "static/bundles"          # relative to the output directory
//! post_layout = "post.html"
//! post_bundle = "post"
//!
//! [css_generator]
//! enabled = true
//! command = "node"
//! script = "static/js/generate-theme-css.js"
//!
//! [[pages]]
//! key = "blog"
//! template = "blog.html"
//! output = "blog/index.html"
//! lists_posts = true
//! sitemap = true
//!
//! [bundles.blog]
//! css = ["static/css/base.css", "static/css/blog.css"]
//! js = ["static/js/theme-init.js", "static/js/blog-tags.js"]
//! ```
//!
//! ## Base URL Resolution
//!
//! `SITE_BASE_URL` (when set and non-empty) → `base_url` in `config.toml` →
//! [`DEFAULT_BASE_URL`]. Trailing slashes are always stripped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Production URL used when neither the environment nor the config sets one.
pub const DEFAULT_BASE_URL: &str = "https://www.example.com";

/// Environment variable that overrides the configured base URL.
pub const BASE_URL_ENV: &str = "SITE_BASE_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Build configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Absolute site URL used for sitemap locations and robots.txt.
    pub base_url: String,
    /// JSON array of post records, relative to the source directory.
    pub content_file: String,
    /// Site metadata overlay, relative to the source directory.
    pub site_file: String,
    /// Directory copied verbatim to `{output}/static`.
    pub static_dir: String,
    /// Directory holding template-authored post bodies.
    pub templates_dir: String,
    /// Bundle output directory, relative to the output directory.
    pub bundle_dir: String,
    /// Template id used to render every post.
    pub post_layout: String,
    /// Bundle key shared by every post page.
    pub post_bundle: String,
    /// Optional pre-build CSS generation step.
    pub css_generator: CssGeneratorConfig,
    /// Static (non-post) pages, rendered in order.
    pub pages: Vec<PageConfig>,
    /// Asset bundles keyed by page key.
    pub bundles: BTreeMap<String, BundleSpec>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            content_file: "posts.json".to_string(),
            site_file: "site.json".to_string(),
            static_dir: "static".to_string(),
            templates_dir: "templates".to_string(),
            bundle_dir: "static/bundles".to_string(),
            post_layout: "post.html".to_string(),
            post_bundle: "post".to_string(),
            css_generator: CssGeneratorConfig::default(),
            pages: default_pages(),
            bundles: default_bundles(),
        }
    }
}

impl BuildConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(ConfigError::Validation(format!(
                "base_url must be an absolute http(s) URL, got '{}'",
                self.base_url
            )));
        }
        for (field, value) in [
            ("content_file", &self.content_file),
            ("site_file", &self.site_file),
            ("static_dir", &self.static_dir),
            ("templates_dir", &self.templates_dir),
            ("bundle_dir", &self.bundle_dir),
        ] {
            check_relative(field, value)?;
        }
        if self.post_layout.is_empty() {
            return Err(ConfigError::Validation(
                "post_layout must not be empty".into(),
            ));
        }

        let mut outputs = std::collections::HashSet::new();
        for page in &self.pages {
            if page.key.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "page '{}' has an empty key",
                    page.output
                )));
            }
            check_relative("pages.output", &page.output)?;
            if !outputs.insert(page.output.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "two pages write to the same output '{}'",
                    page.output
                )));
            }
            if let Some(data) = &page.data {
                check_relative("pages.data", data)?;
            }
        }
        Ok(())
    }

}

fn check_relative(field: &str, value: &str) -> Result<(), ConfigError> {
    let path = Path::new(value);
    if value.is_empty()
        || path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(ConfigError::Validation(format!(
            "{field} must be a relative path inside the site, got '{value}'"
        )));
    }
    Ok(())
}

/// External CSS generation script run before the build.
///
/// The step is best-effort: a missing interpreter or script, or a failing
/// run, only produces a warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CssGeneratorConfig {
    pub enabled: bool,
    /// Interpreter looked up on `PATH`.
    pub command: String,
    /// Script path relative to the source directory.
    pub script: String,
}

impl Default for CssGeneratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "node".to_string(),
            script: "static/js/generate-theme-css.js".to_string(),
        }
    }
}

/// A static page: one template rendered to one output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageConfig {
    /// Page key; selects the bundle and the active navigation entry.
    pub key: String,
    /// Template id passed to the template engine.
    pub template: String,
    /// Output path relative to the output directory.
    pub output: String,
    /// Optional data file: `.md` is rendered to HTML, `.json` is parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// The page renders post listings, so the content file is one of its
    /// sources for last-modified lookups.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub lists_posts: bool,
    /// Whether the page is listed in the sitemap.
    #[serde(default = "default_true")]
    pub sitemap: bool,
}

fn default_true() -> bool {
    true
}

fn default_pages() -> Vec<PageConfig> {
    let page = |key: &str, template: &str, output: &str, data: Option<&str>, sitemap: bool| {
        PageConfig {
            key: key.to_string(),
            template: template.to_string(),
            output: output.to_string(),
            data: data.map(str::to_string),
            lists_posts: matches!(key, "home" | "blog"),
            sitemap,
        }
    };
    vec![
        page("home", "index.html", "index.html", None, true),
        page("404", "404.html", "404.html", None, false),
        page("blog", "blog.html", "blog/index.html", None, true),
        page(
            "projects",
            "projects.html",
            "projects/index.html",
            Some("data/projects.json"),
            true,
        ),
        page(
            "resume",
            "resume.html",
            "resume/index.html",
            Some("data/resume.md"),
            true,
        ),
    ]
}

/// Ordered CSS and JS sources for one page key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleSpec {
    pub css: Vec<String>,
    pub js: Vec<String>,
}

fn default_bundles() -> BTreeMap<String, BundleSpec> {
    let spec = |css: &[&str], js: &[&str]| BundleSpec {
        css: css.iter().map(|s| s.to_string()).collect(),
        js: js.iter().map(|s| s.to_string()).collect(),
    };
    let base_js = ["static/js/theme-init.js", "static/js/header-menu.js"];
    BTreeMap::from([
        (
            "home".to_string(),
            spec(&["static/css/base.css", "static/css/home.css"], &base_js),
        ),
        (
            "404".to_string(),
            spec(
                &["static/css/base.css"],
                &[
                    "static/js/theme-init.js",
                    "static/js/header-menu.js",
                    "static/js/holiday.js",
                ],
            ),
        ),
        (
            "blog".to_string(),
            spec(
                &["static/css/base.css", "static/css/blog.css"],
                &[
                    "static/js/theme-init.js",
                    "static/js/header-menu.js",
                    "static/js/blog-tags.js",
                ],
            ),
        ),
        (
            "post".to_string(),
            spec(
                &["static/css/base.css", "static/css/blog.css"],
                &[
                    "static/js/theme-init.js",
                    "static/js/header-menu.js",
                    "static/js/post-sections.js",
                ],
            ),
        ),
        (
            "projects".to_string(),
            spec(&["static/css/base.css", "static/css/projects.css"], &base_js),
        ),
        (
            "resume".to_string(),
            spec(&["static/css/base.css", "static/css/resume.css"], &base_js),
        ),
    ])
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(BuildConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely. This includes
///   arrays, so a user `[[pages]]` list replaces the stock page list.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BuildConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BuildConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<BuildConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Pick the effective base URL.
///
/// `env_value` is the raw value of [`BASE_URL_ENV`]; empty counts as unset.
pub fn resolve_base_url(configured: &str, env_value: Option<&str>) -> String {
    let chosen = env_value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(configured);
    let chosen = if chosen.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        chosen.trim()
    };
    chosen.trim_end_matches('/').to_string()
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# sitebake configuration
# ======================
#
# Every key is optional. Values shown are the stock defaults; delete what you
# don't change. Unknown keys are rejected to catch typos early.

# Absolute site URL used in sitemap.xml and robots.txt.
# The SITE_BASE_URL environment variable overrides this when set.
base_url = "https://www.example.com"

# JSON array of post records (relative to the site source directory).
content_file = "posts.json"

# Site metadata overlay merged onto built-in defaults (best-effort).
site_file = "site.json"

# Copied verbatim to <output>/static.
static_dir = "static"

# Template-authored post bodies live here (posts with "template": "...").
templates_dir = "templates"

# Where hashed bundles are written, relative to the output directory.
bundle_dir = "static/bundles"

# Template id used for every post page, and the bundle key posts share.
post_layout = "post.html"
post_bundle = "post"

# ---------------------------------------------------------------------------
# Pre-build CSS generation
# ---------------------------------------------------------------------------
# Runs `<command> <script>` in the source directory before the build. A
# missing interpreter or script, or a failing run, only logs a warning.
[css_generator]
enabled = true
command = "node"
script = "static/js/generate-theme-css.js"

# ---------------------------------------------------------------------------
# Bundles
# ---------------------------------------------------------------------------
# Per page key, ordered CSS and JS sources (relative to the source
# directory). Each list is concatenated in order and written once as
# <key>-styles-<hash>.css / <key>-scripts-<hash>.js. A missing source
# aborts the build.
[bundles.home]
css = ["static/css/base.css", "static/css/home.css"]
js = ["static/js/theme-init.js", "static/js/header-menu.js"]

[bundles.404]
css = ["static/css/base.css"]
js = ["static/js/theme-init.js", "static/js/header-menu.js", "static/js/holiday.js"]

[bundles.blog]
css = ["static/css/base.css", "static/css/blog.css"]
js = ["static/js/theme-init.js", "static/js/header-menu.js", "static/js/blog-tags.js"]

[bundles.post]
css = ["static/css/base.css", "static/css/blog.css"]
js = ["static/js/theme-init.js", "static/js/header-menu.js", "static/js/post-sections.js"]

[bundles.projects]
css = ["static/css/base.css", "static/css/projects.css"]
js = ["static/js/theme-init.js", "static/js/header-menu.js"]

[bundles.resume]
css = ["static/css/base.css", "static/css/resume.css"]
js = ["static/js/theme-init.js", "static/js/header-menu.js"]

# ---------------------------------------------------------------------------
# Pages
# ---------------------------------------------------------------------------
# Declaring any [[pages]] entry replaces the whole stock list.
# `data` is optional: .md files are rendered to HTML, .json files parsed.
# `lists_posts = true` makes the content file count toward the page's lastmod.
# `sitemap = false` keeps a page out of sitemap.xml.
[[pages]]
key = "home"
template = "index.html"
output = "index.html"
lists_posts = true

[[pages]]
key = "404"
template = "404.html"
output = "404.html"
sitemap = false

[[pages]]
key = "blog"
template = "blog.html"
output = "blog/index.html"
lists_posts = true

[[pages]]
key = "projects"
template = "projects.html"
output = "projects/index.html"
data = "data/projects.json"

[[pages]]
key = "resume"
template = "resume.html"
output = "resume/index.html"
data = "data/resume.md"
"##
}

// =============================================================================
// Site metadata overlay
// =============================================================================

/// Site-wide metadata available to every template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteMeta {
    pub title: String,
    pub author: String,
    pub description: String,
    pub tagline: String,
    pub language: String,
    pub holiday: HolidayDetails,
}

impl Default for SiteMeta {
    fn default() -> Self {
        Self {
            title: "Personal Site".to_string(),
            author: "Site Author".to_string(),
            description: "Writing, projects and a resume.".to_string(),
            tagline: "Notes from the workbench".to_string(),
            language: "en".to_string(),
            holiday: HolidayDetails::default(),
        }
    }
}

/// Seasonal banner shown on the 404 page and the header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HolidayDetails {
    pub enabled: bool,
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub message: Option<String>,
    /// First day shown, `MM-DD`.
    pub start: Option<String>,
    /// Last day shown, `MM-DD`.
    pub end: Option<String>,
}

/// Recursively merge a JSON overlay onto a base value.
///
/// Objects merge key-by-key; `null` in the overlay never replaces a base
/// value; any other overlay value replaces the base value.
pub fn merge_json(base: serde_json::Value, overlay: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                if overlay_val.is_null() {
                    continue;
                }
                let merged = match base_map.remove(&key) {
                    Some(base_val) => merge_json(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Load the site metadata overlay, falling back to defaults on any problem.
pub fn load_site_meta(path: &Path) -> SiteMeta {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no site metadata overlay, using defaults");
            return SiteMeta::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read site metadata, using defaults");
            return SiteMeta::default();
        }
    };
    let overlay: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "site metadata is not valid JSON, using defaults");
            return SiteMeta::default();
        }
    };
    let base = serde_json::to_value(SiteMeta::default()).expect("default site meta must serialize");
    match serde_json::from_value(merge_json(base, overlay)) {
        Ok(meta) => meta,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "site metadata has unexpected shape, using defaults");
            SiteMeta::default()
        }
    }
}
