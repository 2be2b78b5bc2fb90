//! Small value types shared between the loader, the renderer and the
//! templating seam.
//!
//! Everything here is serializable so an external template engine can read
//! it from the render context without knowing about the pipeline internals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A level-2 section of a post body, used for the in-page outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// Fragment id (`#id`) of the `<h2>` element.
    pub id: String,
    /// Plain-text heading title.
    pub title: String,
}

impl Heading {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// A page written by the build, as reported in the build summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenPage {
    /// Output path relative to the output directory.
    pub output: String,
    /// Sitemap date; `None` for pages kept out of the sitemap.
    pub lastmod: Option<NaiveDate>,
}
