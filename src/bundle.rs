//! Content-hashed CSS/JS bundles.
//!
//! Each page key declares an ordered list of CSS sources and JS sources
//! (`[bundles.<key>]` in `config.toml`). The bundler concatenates them into
//! one file per kind and names the file after its content:
//!
//! ```text
//! static/bundles/blog-styles-3f9a1c0b2e.css
//! static/bundles/blog-scripts-8d41e07a55.js
//! ```
//!
//! ## Naming
//!
//! - **logical name**: `{key}-styles` for CSS, `{key}-scripts` for JS
//! - **hash**: SHA-256 of the concatenated text, lowercase hex, first 10 chars
//!
//! Each source is preceded by a `/* path */` comment so a bundle can be
//! traced back to its parts in the browser. Identical input always yields a
//! byte-identical file under the same name; any change to any source changes
//! the name, so bundles can be cached forever.
//!
//! ## Caching
//!
//! An [`AssetBundler`] lives for one build. Bundles are memoized per logical
//! name and source texts per path, so a bundle shared by every post page is
//! built and written once. Two keys with identical sources still get
//! separate entries and separate files under their own names.

use crate::config::BundleSpec;
use crate::context::BuildContext;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Length of the truncated content hash in bundle file names.
const HASH_LEN: usize = 10;

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("No bundle declared for page key '{0}'")]
    UnknownPageKey(String),
    #[error("Bundle '{bundle}' source not found: {path}")]
    MissingSource { bundle: String, path: PathBuf },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Css,
    Js,
}

impl AssetKind {
    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Css => "css",
            AssetKind::Js => "js",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            AssetKind::Css => "styles",
            AssetKind::Js => "scripts",
        }
    }

    /// Logical bundle name for a page key, e.g. `blog-styles`.
    pub fn logical_name(self, key: &str) -> String {
        format!("{key}-{}", self.suffix())
    }
}

/// A bundle that has been written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub name: String,
    pub kind: AssetKind,
    pub hash: String,
    /// File name inside the bundle directory.
    pub file_name: String,
    /// Root-relative URL, e.g. `/static/bundles/blog-styles-3f9a1c0b2e.css`.
    pub url: String,
    /// Number of bytes in the bundle.
    pub size: usize,
}

/// Bundle URLs handed to templates. `None` when the page declares no
/// sources of that kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BundleRefs {
    pub css: Option<String>,
    pub js: Option<String>,
}

/// Per-build bundle cache.
#[derive(Debug, Default)]
pub struct AssetBundler {
    /// Logical name → index into `created`.
    by_name: HashMap<String, usize>,
    created: Vec<Bundle>,
    /// Source path → file text.
    sources: HashMap<PathBuf, String>,
}

impl AssetBundler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the CSS and JS bundles for `page_key`, building and writing
    /// them on first use.
    pub fn resolve(
        &mut self,
        ctx: &BuildContext,
        page_key: &str,
    ) -> Result<BundleRefs, BundleError> {
        let spec = ctx
            .config
            .bundles
            .get(page_key)
            .ok_or_else(|| BundleError::UnknownPageKey(page_key.to_string()))?;

        let css = self.resolve_kind(ctx, page_key, AssetKind::Css, &spec.css)?;
        let js = self.resolve_kind(ctx, page_key, AssetKind::Js, &spec.js)?;
        Ok(BundleRefs { css, js })
    }

    fn resolve_kind(
        &mut self,
        ctx: &BuildContext,
        page_key: &str,
        kind: AssetKind,
        sources: &[String],
    ) -> Result<Option<String>, BundleError> {
        if sources.is_empty() {
            return Ok(None);
        }
        let name = kind.logical_name(page_key);
        if let Some(&idx) = self.by_name.get(&name) {
            return Ok(Some(self.created[idx].url.clone()));
        }

        let text = self.concatenate(ctx, &name, sources)?;
        let hash = content_hash(&text);
        let file_name = format!("{name}-{hash}.{}", kind.extension());
        write_once(&ctx.bundle_dir().join(&file_name), &text)?;

        let bundle = Bundle {
            url: format!("{}/{file_name}", ctx.bundle_url_prefix()),
            name: name.clone(),
            kind,
            hash,
            file_name,
            size: text.len(),
        };
        debug!(bundle = %bundle.name, url = %bundle.url, sources = sources.len(), "built bundle");

        let url = bundle.url.clone();
        self.by_name.insert(name, self.created.len());
        self.created.push(bundle);
        Ok(Some(url))
    }

    fn concatenate(
        &mut self,
        ctx: &BuildContext,
        name: &str,
        sources: &[String],
    ) -> Result<String, BundleError> {
        let mut out = String::new();
        for source in sources {
            let text = self.source_text(&ctx.source_path(source), name)?;
            out.push_str(&format!("/* {source} */\n"));
            out.push_str(text);
            out.push('\n');
        }
        Ok(out)
    }

    fn source_text(&mut self, path: &Path, bundle: &str) -> Result<&str, BundleError> {
        if !self.sources.contains_key(path) {
            let text = match fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(BundleError::MissingSource {
                        bundle: bundle.to_string(),
                        path: path.to_path_buf(),
                    });
                }
                Err(e) => return Err(e.into()),
            };
            self.sources.insert(path.to_path_buf(), text);
        }
        Ok(self.sources[path].as_str())
    }

    /// Every bundle written so far, in creation order.
    pub fn bundles(&self) -> &[Bundle] {
        &self.created
    }
}

/// Truncated SHA-256 of bundle text, lowercase hex.
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(HASH_LEN);
    hex
}

fn write_once(path: &Path, text: &str) -> io::Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)
}

/// Check that every source of every bundle exists, without writing anything.
pub fn verify_sources(ctx: &BuildContext) -> Result<usize, BundleError> {
    let mut checked = 0;
    for (key, BundleSpec { css, js }) in &ctx.config.bundles {
        for (kind, sources) in [(AssetKind::Css, css), (AssetKind::Js, js)] {
            for source in sources {
                let path = ctx.source_path(source);
                if !path.is_file() {
                    return Err(BundleError::MissingSource {
                        bundle: kind.logical_name(key),
                        path,
                    });
                }
                checked += 1;
            }
        }
    }
    Ok(checked)
}
