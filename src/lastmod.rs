//! Last-modified date resolution.
//!
//! Every sitemap entry carries a `lastmod` date. It is resolved from several
//! sources in priority order, and the first one that yields a usable date
//! wins:
//!
//! 1. **Explicit override**: a post's `updated` field.
//! 2. **Version history**: the most recent commit touching any of the
//!    page's candidate source files.
//! 3. **Nominal date**: a post's publication date.
//! 4. **Build date**: today, from the [`BuildContext`].
//!
//! Sources that are present but can't be normalized to a calendar date are
//! skipped, never fatal. The result is always a plain `YYYY-MM-DD` date.
//!
//! The history lookup sits behind the [`History`] trait so the build can run
//! against a fake in tests and without git installed.

use crate::context::BuildContext;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Source of "when was this file last changed" answers.
pub trait History {
    /// Timestamp string of the most recent change to any of `paths`, or
    /// `None` when no history is available.
    fn last_commit(&self, paths: &[PathBuf]) -> Option<String>;
}

/// [`History`] backed by `git log` in a working directory.
///
/// Any failure (git missing, not a repository, untracked files) is `None`.
#[derive(Debug, Clone)]
pub struct GitHistory {
    workdir: PathBuf,
}

impl GitHistory {
    pub fn new(workdir: &Path) -> Self {
        Self {
            workdir: workdir.to_path_buf(),
        }
    }
}

impl History for GitHistory {
    fn last_commit(&self, paths: &[PathBuf]) -> Option<String> {
        if paths.is_empty() {
            return None;
        }
        let output = Command::new("git")
            .args(["log", "-1", "--format=%cI", "--"])
            .args(paths)
            .current_dir(&self.workdir)
            .output()
            .ok()?;
        if !output.status.success() {
            debug!(status = %output.status, "git log failed, skipping history");
            return None;
        }
        let stamp = String::from_utf8(output.stdout).ok()?;
        let stamp = stamp.trim();
        (!stamp.is_empty()).then(|| stamp.to_string())
    }
}

/// [`History`] that never knows anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

impl History for NoHistory {
    fn last_commit(&self, _paths: &[PathBuf]) -> Option<String> {
        None
    }
}

/// Normalize a date or timestamp string to a calendar date.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps (the date is taken in the
/// timestamp's own offset), naive `YYYY-MM-DDTHH:MM:SS` / `YYYY-MM-DD HH:MM:SS`
/// datetimes, and anything whose first ten characters form a date.
pub fn normalize_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }
    value
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Resolves `lastmod` dates for one build.
pub struct LastModifiedResolver<'a> {
    history: &'a dyn History,
    build_date: NaiveDate,
}

impl<'a> LastModifiedResolver<'a> {
    pub fn new(ctx: &BuildContext, history: &'a dyn History) -> Self {
        Self {
            history,
            build_date: ctx.build_date,
        }
    }

    /// Resolve the last-modified date for a page.
    ///
    /// `candidates` are the source files the page was built from;
    /// `explicit_override` and `nominal` are the post's `updated` and `date`
    /// values, when the page is a post.
    pub fn resolve(
        &self,
        candidates: &[PathBuf],
        explicit_override: Option<&str>,
        nominal: Option<NaiveDate>,
    ) -> NaiveDate {
        if let Some(value) = explicit_override {
            match normalize_date(value) {
                Some(date) => return date,
                None => debug!(value, "unparsable last-modified override, skipping"),
            }
        }
        if let Some(stamp) = self.history.last_commit(candidates) {
            match normalize_date(&stamp) {
                Some(date) => return date,
                None => debug!(%stamp, "unparsable history timestamp, skipping"),
            }
        }
        nominal.unwrap_or(self.build_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::test_context;
    use std::cell::RefCell;
    use tempfile::TempDir;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Records every lookup and answers with a fixed value.
    struct FakeHistory {
        answer: Option<String>,
        calls: RefCell<Vec<Vec<PathBuf>>>,
    }

    impl FakeHistory {
        fn answering(answer: Option<&str>) -> Self {
            Self {
                answer: answer.map(str::to_string),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl History for FakeHistory {
        fn last_commit(&self, paths: &[PathBuf]) -> Option<String> {
            self.calls.borrow_mut().push(paths.to_vec());
            self.answer.clone()
        }
    }

    // =========================================================================
    // normalize_date
    // =========================================================================

    #[test]
    fn normalize_plain_date() {
        assert_eq!(normalize_date("2024-03-01"), Some(ymd(2024, 3, 1)));
        assert_eq!(normalize_date("  2024-03-01\n"), Some(ymd(2024, 3, 1)));
    }

    #[test]
    fn normalize_rfc3339_keeps_own_offset() {
        assert_eq!(
            normalize_date("2024-03-01T23:30:00-05:00"),
            Some(ymd(2024, 3, 1))
        );
        assert_eq!(normalize_date("2024-03-01T00:10:00Z"), Some(ymd(2024, 3, 1)));
    }

    #[test]
    fn normalize_naive_datetimes() {
        assert_eq!(normalize_date("2024-03-01T08:00:00"), Some(ymd(2024, 3, 1)));
        assert_eq!(normalize_date("2024-03-01 08:00:00"), Some(ymd(2024, 3, 1)));
    }

    #[test]
    fn normalize_date_prefix() {
        assert_eq!(normalize_date("2024-03-01 (revised)"), Some(ymd(2024, 3, 1)));
    }

    #[test]
    fn normalize_rejects_garbage() {
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("yesterday"), None);
        assert_eq!(normalize_date("2024-13-45"), None);
        assert_eq!(normalize_date("2024-03"), None);
    }

    // =========================================================================
    // Resolution priority
    // =========================================================================

    #[test]
    fn override_beats_history() {
        let tmp = TempDir::new().unwrap();
        let ctx = test_context(tmp.path());
        let history = FakeHistory::answering(Some("2024-05-05T10:00:00+00:00"));
        let resolver = LastModifiedResolver::new(&ctx, &history);

        let date = resolver.resolve(
            &[PathBuf::from("posts/a.md")],
            Some("2024-06-10T09:00:00Z"),
            Some(ymd(2024, 1, 1)),
        );
        assert_eq!(date, ymd(2024, 6, 10));
    }

    #[test]
    fn history_beats_nominal() {
        let tmp = TempDir::new().unwrap();
        let ctx = test_context(tmp.path());
        let history = FakeHistory::answering(Some("2024-05-05T10:00:00+00:00"));
        let resolver = LastModifiedResolver::new(&ctx, &history);

        let date = resolver.resolve(&[PathBuf::from("posts/a.md")], None, Some(ymd(2024, 1, 1)));
        assert_eq!(date, ymd(2024, 5, 5));
    }

    #[test]
    fn unparsable_override_falls_through() {
        let tmp = TempDir::new().unwrap();
        let ctx = test_context(tmp.path());
        let history = FakeHistory::answering(None);
        let resolver = LastModifiedResolver::new(&ctx, &history);

        let date = resolver.resolve(&[], Some("soon"), Some(ymd(2024, 1, 1)));
        assert_eq!(date, ymd(2024, 1, 1));
    }

    #[test]
    fn unparsable_history_falls_through() {
        let tmp = TempDir::new().unwrap();
        let ctx = test_context(tmp.path());
        let history = FakeHistory::answering(Some("not a date"));
        let resolver = LastModifiedResolver::new(&ctx, &history);

        let date = resolver.resolve(&[PathBuf::from("x")], None, Some(ymd(2023, 7, 7)));
        assert_eq!(date, ymd(2023, 7, 7));
    }

    #[test]
    fn build_date_is_last_resort() {
        let tmp = TempDir::new().unwrap();
        let ctx = test_context(tmp.path());
        let resolver = LastModifiedResolver::new(&ctx, &NoHistory);
        assert_eq!(resolver.resolve(&[], None, None), ctx.build_date);
    }

    #[test]
    fn candidates_are_passed_to_history() {
        let tmp = TempDir::new().unwrap();
        let ctx = test_context(tmp.path());
        let history = FakeHistory::answering(None);
        let resolver = LastModifiedResolver::new(&ctx, &history);

        let candidates = vec![PathBuf::from("templates/blog.html"), PathBuf::from("posts.json")];
        resolver.resolve(&candidates, None, None);
        assert_eq!(*history.calls.borrow(), vec![candidates]);
    }

    #[test]
    fn override_short_circuits_history_lookup() {
        let tmp = TempDir::new().unwrap();
        let ctx = test_context(tmp.path());
        let history = FakeHistory::answering(Some("2024-05-05"));
        let resolver = LastModifiedResolver::new(&ctx, &history);

        resolver.resolve(&[PathBuf::from("a")], Some("2024-01-02"), None);
        assert!(history.calls.borrow().is_empty());
    }

    // =========================================================================
    // GitHistory
    // =========================================================================

    #[test]
    fn git_history_without_candidates_is_none() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(GitHistory::new(tmp.path()).last_commit(&[]), None);
    }

    #[test]
    fn git_history_outside_repository_is_none() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.md"), "x").unwrap();
        let history = GitHistory::new(tmp.path());
        assert_eq!(history.last_commit(&[PathBuf::from("a.md")]), None);
    }
}
