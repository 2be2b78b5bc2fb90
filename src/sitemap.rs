//! Sitemap and robots.txt generation.
//!
//! Pages are accumulated as they are written, in build order, and
//! serialized once at the end:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://www.example.com/blog/</loc>
//!     <lastmod>2024-03-01</lastmod>
//!   </url>
//! </urlset>
//! ```

use chrono::NaiveDate;

/// XML namespace for sitemap
const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Single URL entry in the sitemap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlEntry {
    /// Full URL location
    pub loc: String,
    /// Omitted from the XML when unknown
    pub lastmod: Option<NaiveDate>,
}

/// Collects sitemap entries for one build.
#[derive(Debug, Clone)]
pub struct SitemapBuilder {
    base_url: String,
    entries: Vec<UrlEntry>,
}

impl SitemapBuilder {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.strip_suffix('/').unwrap_or(base_url).to_string(),
            entries: Vec::new(),
        }
    }

    /// Record a written page by its output path.
    pub fn accumulate(&mut self, output_path: &str, lastmod: impl Into<Option<NaiveDate>>) {
        let loc = format!("{}{}", self.base_url, url_for_output_path(output_path));
        self.entries.push(UrlEntry {
            loc,
            lastmod: lastmod.into(),
        });
    }

    pub fn entries(&self) -> &[UrlEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the sitemap. `None` when nothing was accumulated.
    pub fn finalize(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let mut xml = String::with_capacity(128 + self.entries.len() * 96);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#));
        xml.push('\n');
        for entry in &self.entries {
            xml.push_str("  <url>\n");
            xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.loc)));
            if let Some(lastmod) = entry.lastmod {
                xml.push_str(&format!("    <lastmod>{}</lastmod>\n", lastmod.format("%Y-%m-%d")));
            }
            xml.push_str("  </url>\n");
        }
        xml.push_str("</urlset>\n");
        Some(xml)
    }
}

/// Map an output file path to the root-relative URL it is served at.
///
/// `index.html` files are served as their directory.
pub fn url_for_output_path(output_path: &str) -> String {
    let path = output_path.replace('\\', "/");
    let path = path.trim_start_matches('/');
    if path == "index.html" {
        return "/".to_string();
    }
    match path.strip_suffix("/index.html") {
        Some(dir) => format!("/{dir}/"),
        None => format!("/{path}"),
    }
}

/// robots.txt allowing everything but the 404 page.
pub fn robots_txt(base_url: &str) -> String {
    let base = base_url.strip_suffix('/').unwrap_or(base_url);
    format!("User-agent: *\nAllow: /\nDisallow: /404.html\n\nSitemap: {base}/sitemap.xml\n")
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
