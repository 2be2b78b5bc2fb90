//! The immutable per-build context.
//!
//! Everything a component needs to know about "this build" is resolved once,
//! up front, into a [`BuildContext`] and passed by reference. Nothing in the
//! pipeline reads the environment, the clock, or config files on its own.

use crate::config::{self, BuildConfig, ConfigError, SiteMeta};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct BuildContext {
    pub config: BuildConfig,
    pub site: SiteMeta,
    /// Absolute base URL without a trailing slash.
    pub base_url: String,
    /// Date of this build; the last resort for last-modified resolution.
    pub build_date: NaiveDate,
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl BuildContext {
    /// Load config and site metadata from `source_dir` and resolve the base URL.
    ///
    /// `base_url_env` is the raw value of the base-URL environment variable,
    /// passed in rather than read here so callers (and tests) control it.
    pub fn load(
        source_dir: &Path,
        output_dir: &Path,
        base_url_env: Option<&str>,
        build_date: NaiveDate,
    ) -> Result<Self, ConfigError> {
        let config = config::load_config(source_dir)?;
        let site = config::load_site_meta(&source_dir.join(&config.site_file));
        Ok(Self::new(
            config,
            site,
            source_dir,
            output_dir,
            base_url_env,
            build_date,
        ))
    }

    pub fn new(
        config: BuildConfig,
        site: SiteMeta,
        source_dir: &Path,
        output_dir: &Path,
        base_url_env: Option<&str>,
        build_date: NaiveDate,
    ) -> Self {
        let base_url = config::resolve_base_url(&config.base_url, base_url_env);
        Self {
            config,
            site,
            base_url,
            build_date,
            source_dir: source_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Resolve a path relative to the site source directory.
    pub fn source_path(&self, relative: &str) -> PathBuf {
        self.source_dir.join(relative)
    }

    /// Resolve a path relative to the output directory.
    pub fn output_path(&self, relative: &str) -> PathBuf {
        self.output_dir.join(relative)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.source_path(&self.config.templates_dir)
    }

    pub fn static_dir(&self) -> PathBuf {
        self.source_path(&self.config.static_dir)
    }

    pub fn bundle_dir(&self) -> PathBuf {
        self.output_path(&self.config.bundle_dir)
    }

    /// Root-relative URL prefix of the bundle directory, e.g. `/static/bundles`.
    pub fn bundle_url_prefix(&self) -> String {
        format!("/{}", self.config.bundle_dir.trim_matches('/').replace('\\', "/"))
    }
}
