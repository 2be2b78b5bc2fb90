//! End-to-end builds of a small fixture site.
//!
//! Each test writes a complete site source into a temp directory, runs the
//! full pipeline with the built-in theme, and inspects the output tree.

use chrono::NaiveDate;
use sitebake::build::{BuildError, build};
use sitebake::config::{self, BuildConfig, SiteMeta};
use sitebake::content::ContentError;
use sitebake::context::BuildContext;
use sitebake::lastmod::{History, NoHistory};
use sitebake::render::Theme;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

const POSTS_JSON: &str = r#"[
  {"slug": "january", "title": "January Notes", "date": "2024-01-01",
   "tags": ["life"], "content": "posts/january.md"},
  {"slug": "march", "title": "March Notes", "date": "2024-03-01",
   "tags": ["rust", "web"], "updated": "2024-04-02T08:00:00+02:00",
   "content": "posts/march.md"},
  {"slug": "february", "title": "February Essay", "date": "2024-02-01",
   "tags": ["rust"], "template": "posts/february.html"}
]"#;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn words(n: usize) -> String {
    vec!["word"; n].join(" ")
}

/// Write a complete site: config, metadata, three posts, data files, and
/// every bundle source the stock config references.
fn write_site(root: &Path) {
    write(
        root,
        "config.toml",
        "base_url = \"https://config.test\"\n\n[css_generator]\nenabled = false\n",
    );
    write(root, "site.json", r#"{"title": "Fixture Site", "author": null}"#);
    write(root, "posts.json", POSTS_JSON);
    write(
        root,
        "posts/january.md",
        &format!("## Resolutions\n\n{}\n", words(50)),
    );
    write(
        root,
        "posts/march.md",
        &format!("## Spring\n\n{}\n\n## Spring\n\n{}\n", words(400), words(40)),
    );
    write(
        root,
        "templates/posts/february.html",
        &format!(
            "<p>{}</p>\n<h2 id=\"argument\">The Argument</h2>\n<p>{}</p>",
            words(500),
            words(500)
        ),
    );
    write(root, "data/projects.json", r#"[{"name": "Widget", "url": "https://widget.test"}]"#);
    write(root, "data/resume.md", "# Jo Doe\n\n## Experience\n\nLots.\n");

    for css in ["base", "home", "blog", "projects", "resume"] {
        write(root, &format!("static/css/{css}.css"), &format!(".{css} {{}}"));
    }
    for js in ["theme-init", "header-menu", "holiday", "blog-tags", "post-sections"] {
        write(root, &format!("static/js/{js}.js"), &format!("// {js}"));
    }
    write(root, "static/img/logo.svg", "<svg/>");
}

fn build_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn context(root: &Path, base_url_env: Option<&str>) -> BuildContext {
    BuildContext::load(root, &root.join("dist"), base_url_env, build_date()).unwrap()
}

fn read(ctx: &BuildContext, relative: &str) -> String {
    fs::read_to_string(ctx.output_dir.join(relative))
        .unwrap_or_else(|e| panic!("reading {relative}: {e}"))
}

/// Every output file, relative path → bytes.
fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(dir)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(dir).unwrap().to_path_buf();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

/// History that knows one file.
struct OneFileHistory {
    path: PathBuf,
    stamp: &'static str,
}

impl History for OneFileHistory {
    fn last_commit(&self, paths: &[PathBuf]) -> Option<String> {
        paths
            .iter()
            .any(|p| *p == self.path)
            .then(|| self.stamp.to_string())
    }
}

// =============================================================================
// Ordering and navigation
// =============================================================================

#[test]
fn blog_lists_posts_newest_first() {
    let tmp = TempDir::new().unwrap();
    write_site(tmp.path());
    let ctx = context(tmp.path(), None);
    build(&ctx, &Theme, &NoHistory).unwrap();

    let blog = read(&ctx, "blog/index.html");
    let march = blog.find("/blog/march/").unwrap();
    let february = blog.find("/blog/february/").unwrap();
    let january = blog.find("/blog/january/").unwrap();
    assert!(march < february && february < january);
}

#[test]
fn post_pages_link_to_neighbors() {
    let tmp = TempDir::new().unwrap();
    write_site(tmp.path());
    let ctx = context(tmp.path(), None);
    build(&ctx, &Theme, &NoHistory).unwrap();

    let middle = read(&ctx, "blog/february/index.html");
    assert!(middle.contains(r#"href="/blog/march/" rel="prev""#));
    assert!(middle.contains(r#"href="/blog/january/" rel="next""#));

    let newest = read(&ctx, "blog/march/index.html");
    assert!(!newest.contains(r#"rel="prev""#));
    assert!(newest.contains(r#"href="/blog/february/" rel="next""#));

    let oldest = read(&ctx, "blog/january/index.html");
    assert!(oldest.contains(r#"href="/blog/february/" rel="prev""#));
    assert!(!oldest.contains(r#"rel="next""#));
}

#[test]
fn home_shows_latest_post() {
    let tmp = TempDir::new().unwrap();
    write_site(tmp.path());
    let ctx = context(tmp.path(), None);
    build(&ctx, &Theme, &NoHistory).unwrap();

    let home = read(&ctx, "index.html");
    assert!(home.contains("March Notes"));
    assert!(!home.contains("January Notes"));
}

// =============================================================================
// Post bodies
// =============================================================================

#[test]
fn both_authoring_paths_produce_outlines_and_reading_times() {
    let tmp = TempDir::new().unwrap();
    write_site(tmp.path());
    let ctx = context(tmp.path(), None);
    build(&ctx, &Theme, &NoHistory).unwrap();

    let march = read(&ctx, "blog/march/index.html");
    assert!(march.contains(r##"<a href="#spring">Spring</a>"##));
    assert!(march.contains(r##"<a href="#spring-2">Spring</a>"##));
    assert!(march.contains("2 min read"));

    let february = read(&ctx, "blog/february/index.html");
    assert!(february.contains(r##"<a href="#argument">The Argument</a>"##));
    assert!(february.contains("5 min read"));

    let january = read(&ctx, "blog/january/index.html");
    assert!(january.contains("1 min read"));
}

#[test]
fn missing_body_still_renders_post() {
    let tmp = TempDir::new().unwrap();
    write_site(tmp.path());
    fs::remove_file(tmp.path().join("posts/january.md")).unwrap();
    let ctx = context(tmp.path(), None);
    let summary = build(&ctx, &Theme, &NoHistory).unwrap();

    let january = read(&ctx, "blog/january/index.html");
    assert!(january.contains("January Notes"));
    assert!(!january.contains("min read"));
    assert_eq!(summary.posts.len(), 3);
}

#[test]
fn duplicate_slug_aborts_build() {
    let tmp = TempDir::new().unwrap();
    write_site(tmp.path());
    write(
        tmp.path(),
        "posts.json",
        r#"[{"slug":"a","title":"A","date":"2024-01-01","content":"posts/a.md"},
            {"slug":"a","title":"B","date":"2024-01-02","content":"posts/b.md"}]"#,
    );
    let ctx = context(tmp.path(), None);
    assert!(matches!(
        build(&ctx, &Theme, &NoHistory),
        Err(BuildError::Content(ContentError::DuplicateSlug(_)))
    ));
}

// =============================================================================
// Bundles
// =============================================================================

#[test]
fn pages_reference_hashed_bundles_that_exist() {
    let tmp = TempDir::new().unwrap();
    write_site(tmp.path());
    let ctx = context(tmp.path(), None);
    let summary = build(&ctx, &Theme, &NoHistory).unwrap();

    // Five pages plus the shared post bundle, CSS and JS each.
    assert_eq!(summary.bundles.len(), 12);
    for bundle in &summary.bundles {
        assert!(ctx.output_dir.join("static/bundles").join(&bundle.file_name).is_file());
        assert_eq!(bundle.hash.len(), 10);
    }

    let blog = read(&ctx, "blog/index.html");
    let blog_css = summary.bundles.iter().find(|b| b.name == "blog-styles").unwrap();
    assert!(blog.contains(&blog_css.url));
    let bundle_text = read(&ctx, &format!("static/bundles/{}", blog_css.file_name));
    assert_eq!(
        bundle_text,
        "/* static/css/base.css */\n.base {}\n/* static/css/blog.css */\n.blog {}\n"
    );
}

#[test]
fn changing_a_source_changes_bundle_name() {
    let tmp = TempDir::new().unwrap();
    write_site(tmp.path());
    let ctx = context(tmp.path(), None);
    let before = build(&ctx, &Theme, &NoHistory).unwrap();

    write(tmp.path(), "static/css/blog.css", ".blog { color: red }");
    let after = build(&ctx, &Theme, &NoHistory).unwrap();

    let url = |s: &sitebake::build::BuildSummary, name: &str| {
        s.bundles.iter().find(|b| b.name == name).unwrap().url.clone()
    };
    assert_ne!(url(&before, "blog-styles"), url(&after, "blog-styles"));
    assert_eq!(url(&before, "home-styles"), url(&after, "home-styles"));
}

// =============================================================================
// Sitemap and robots
// =============================================================================

#[test]
fn sitemap_lists_pages_then_posts_with_lastmod() {
    let tmp = TempDir::new().unwrap();
    write_site(tmp.path());
    let ctx = context(tmp.path(), None);
    let summary = build(&ctx, &Theme, &NoHistory).unwrap();

    let xml = read(&ctx, "sitemap.xml");
    let locs: Vec<&str> = xml
        .lines()
        .filter_map(|l| l.trim().strip_prefix("<loc>"))
        .map(|l| l.trim_end_matches("</loc>"))
        .collect();
    assert_eq!(
        locs,
        vec![
            "https://config.test/",
            "https://config.test/blog/",
            "https://config.test/projects/",
            "https://config.test/resume/",
            "https://config.test/blog/march/",
            "https://config.test/blog/february/",
            "https://config.test/blog/january/",
        ]
    );
    assert_eq!(summary.sitemap_entries, 7);

    // Pages fall back to the build date, posts to their override or date.
    assert_eq!(xml.matches("<lastmod>2024-06-15</lastmod>").count(), 4);
    assert!(xml.contains("<lastmod>2024-04-02</lastmod>"));
    assert!(xml.contains("<lastmod>2024-02-01</lastmod>"));
    assert!(xml.contains("<lastmod>2024-01-01</lastmod>"));
}

#[test]
fn history_date_used_when_no_override() {
    let tmp = TempDir::new().unwrap();
    write_site(tmp.path());
    let ctx = context(tmp.path(), None);
    let history = OneFileHistory {
        path: PathBuf::from("posts/january.md"),
        stamp: "2024-05-20T10:00:00+00:00",
    };
    let summary = build(&ctx, &Theme, &history).unwrap();

    let january = summary
        .posts
        .iter()
        .find(|p| p.output == "blog/january/index.html")
        .unwrap();
    assert_eq!(january.lastmod, NaiveDate::from_ymd_opt(2024, 5, 20));
}

#[test]
fn env_base_url_wins_over_config() {
    let tmp = TempDir::new().unwrap();
    write_site(tmp.path());
    let ctx = context(tmp.path(), Some("https://env.test/"));
    build(&ctx, &Theme, &NoHistory).unwrap();

    assert!(read(&ctx, "sitemap.xml").contains("<loc>https://env.test/blog/</loc>"));
    assert!(read(&ctx, "robots.txt").ends_with("Sitemap: https://env.test/sitemap.xml\n"));
}

#[test]
fn empty_sitemap_is_not_written_but_robots_is() {
    let tmp = TempDir::new().unwrap();
    write_site(tmp.path());
    fs::remove_file(tmp.path().join("posts.json")).unwrap();

    let mut build_config = BuildConfig::default();
    build_config.css_generator.enabled = false;
    for page in &mut build_config.pages {
        page.sitemap = false;
    }
    let ctx = BuildContext::new(
        build_config,
        SiteMeta::default(),
        tmp.path(),
        &tmp.path().join("dist"),
        None,
        build_date(),
    );
    let summary = build(&ctx, &Theme, &NoHistory).unwrap();

    assert_eq!(summary.sitemap_entries, 0);
    assert!(!ctx.output_dir.join("sitemap.xml").exists());
    assert_eq!(
        read(&ctx, "robots.txt"),
        format!(
            "User-agent: *\nAllow: /\nDisallow: /404.html\n\nSitemap: {}/sitemap.xml\n",
            config::DEFAULT_BASE_URL
        )
    );
}

// =============================================================================
// Whole-build properties
// =============================================================================

#[test]
fn rebuilding_unchanged_site_is_byte_identical() {
    let tmp = TempDir::new().unwrap();
    write_site(tmp.path());
    let ctx = context(tmp.path(), None);

    build(&ctx, &Theme, &NoHistory).unwrap();
    let first = snapshot(&ctx.output_dir);
    build(&ctx, &Theme, &NoHistory).unwrap();
    let second = snapshot(&ctx.output_dir);

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn site_metadata_overlay_reaches_templates() {
    let tmp = TempDir::new().unwrap();
    write_site(tmp.path());
    let ctx = context(tmp.path(), None);
    build(&ctx, &Theme, &NoHistory).unwrap();

    let home = read(&ctx, "index.html");
    assert!(home.contains("<title>Fixture Site</title>"));
    // `"author": null` keeps the default author.
    assert!(home.contains(&SiteMeta::default().author));
}

#[test]
fn static_files_and_data_pages_are_written() {
    let tmp = TempDir::new().unwrap();
    write_site(tmp.path());
    let ctx = context(tmp.path(), None);
    build(&ctx, &Theme, &NoHistory).unwrap();

    assert_eq!(read(&ctx, "static/img/logo.svg"), "<svg/>");
    assert!(read(&ctx, "projects/index.html").contains("Widget"));
    assert!(read(&ctx, "resume/index.html").contains("<h1>Jo Doe</h1>"));
    assert!(read(&ctx, "404.html").contains("Page not found"));
}
