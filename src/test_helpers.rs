//! Shared test utilities for the sitebake test suite.
//!
//! Every test works in its own `TempDir` used as the site source directory,
//! with output going to `<tmp>/dist`.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_file(tmp.path(), "posts/hello.md", &words(450));
//! let ctx = test_context(tmp.path());
//! ```

use std::path::Path;

use chrono::NaiveDate;

use crate::config::{BuildConfig, SiteMeta};
use crate::context::BuildContext;

/// Fixed build date so last-modified fallbacks are deterministic.
pub fn test_build_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

/// A context over `root` with stock config, default site metadata and CSS
/// generation switched off.
pub fn test_context(root: &Path) -> BuildContext {
    let mut config = BuildConfig::default();
    config.css_generator.enabled = false;
    BuildContext::new(
        config,
        SiteMeta::default(),
        root,
        &root.join("dist"),
        None,
        test_build_date(),
    )
}

/// Write `contents` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// `n` space-separated filler words.
pub fn words(n: usize) -> String {
    vec!["word"; n].join(" ")
}
