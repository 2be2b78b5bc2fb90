//! # sitebake
//!
//! A small static site builder for a personal site: a blog, a handful of
//! fixed pages, content-hashed CSS/JS bundles, and a sitemap.
//!
//! # Architecture: One Pass, Explicit Inputs
//!
//! A build is a single sequential pass over the site source:
//!
//! ```text
//! config.toml + site.json + env  →  BuildContext
//! posts.json + bodies            →  Posts            (content)
//! [bundles.<key>] sources        →  hashed files     (bundle)
//! Posts + pages + bundles        →  HTML             (render)
//! written pages + history        →  sitemap.xml      (lastmod, sitemap)
//! ```
//!
//! Everything that varies per invocation is resolved once into a
//! [`context::BuildContext`] and passed by reference. The template engine
//! and the version history sit behind traits ([`render::TemplateEngine`],
//! [`lastmod::History`]) so the whole pipeline runs in tests against a
//! temporary directory without git or a real theme.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`build`] | The orchestrator: clean, copy static, render pages and posts, finalize |
//! | [`config`] | `config.toml` loading and validation, `site.json` overlay |
//! | [`context`] | The immutable per-build context |
//! | [`content`] | Post records: validation, body derivation, ordering, lookup |
//! | [`markdown`] | Markdown rendering and the shared `<h2>` outline contract |
//! | [`bundle`] | Content-hashed CSS/JS bundles with per-build memoization |
//! | [`lastmod`] | Last-modified resolution: override → history → date → build date |
//! | [`sitemap`] | `sitemap.xml` accumulation and `robots.txt` |
//! | [`pregen`] | Optional CSS generation script run before the build |
//! | [`render`] | The template engine seam and the built-in maud theme |
//! | [`naming`] | Slug validation and slugification |
//! | [`types`] | Small serializable types shared across modules |
//! | [`output`] | CLI output formatting for build and check |
//!
//! # Design Decisions
//!
//! ## Hash Bundles, Don't Version Them
//!
//! Bundle file names carry a truncated SHA-256 of their content. Identical
//! sources always produce the same file under the same name, and any change
//! produces a new name, so bundles can be served with far-future cache
//! headers and never need a manual version bump.
//!
//! ## One Outline Contract
//!
//! Posts can be written in markdown or as hand-authored HTML. Both paths end
//! as HTML, and the section outline is always read from the `<h2>` elements
//! of that HTML by [`markdown::extract_headings`]. There is no second,
//! source-format-specific notion of a section.
//!
//! ## Fail Loudly on Structure, Degrade on Content
//!
//! A malformed `posts.json`, an invalid slug, a missing bundle source or an
//! unknown template aborts the build: these are authoring mistakes that would
//! otherwise ship a broken site. A missing post body, a missing `site.json`,
//! no git history, or a failing CSS generator only log a warning.

pub mod build;
pub mod bundle;
pub mod config;
pub mod content;
pub mod context;
pub mod lastmod;
pub mod markdown;
pub mod naming;
pub mod output;
pub mod pregen;
pub mod render;
pub mod sitemap;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
