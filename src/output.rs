//! CLI output formatting.
//!
//! Each outcome has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout or stderr.
//! Format functions are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! ==> Built public/ in 0.12s
//! Articles: 12 sources, 1 rendered, 11 unchanged
//! Views: 3 rendered, 0 unchanged
//! Pruned
//!     2011-05-01-old-post
//! Registry: 12 articles
//! ```
//!
//! ## Failure
//!
//! ```text
//! ==> Build failed with 2 error(s) (stopped after Phase1Barrier)
//! 001 article: bad.md
//!     missing or invalid field `title` in content/articles/bad.md
//! 002 article: worse.md
//!     failed to parse front matter in content/articles/worse.md: ...
//! ```

use crate::error::BuildFailure;
use crate::orchestrator::{BuildReport, PhaseCounts, Stage};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn phase_line(label: &str, counts: PhaseCounts) -> String {
    format!(
        "{label}: {} rendered, {} unchanged",
        counts.executed, counts.skipped
    )
}

// ============================================================================
// Build
// ============================================================================

/// Format the summary of a successful build.
pub fn format_build_report(report: &BuildReport, target: &Path) -> Vec<String> {
    let mut lines = vec![format!(
        "==> Built {} in {:.2}s{}",
        target.display(),
        report.elapsed.as_secs_f64(),
        if report.forced { " (forced)" } else { "" }
    )];
    // robots.txt runs in the article phase but is not an article
    let robots = usize::from(report.robots);
    lines.push(format!(
        "Articles: {} sources, {} rendered, {} unchanged",
        report.sources,
        report.parse.executed.saturating_sub(robots),
        report.parse.skipped.saturating_sub(1 - robots),
    ));
    lines.push(phase_line("Views", report.views));
    if !report.pruned.is_empty() {
        lines.push("Pruned".to_string());
        for identifier in &report.pruned {
            lines.push(format!("{}{}", indent(1), identifier));
        }
    }
    lines.push(format!("Registry: {} articles", report.articles));
    if !report.wrote_anything() {
        lines.push("Nothing changed".to_string());
    }
    lines
}

pub fn print_build_report(report: &BuildReport, target: &Path) {
    for line in format_build_report(report, target) {
        println!("{}", line);
    }
}

// ============================================================================
// Failure
// ============================================================================

/// Format every error of a failed build, numbered, with the stage it
/// stopped after.
pub fn format_failure(failure: &BuildFailure) -> Vec<String> {
    let last_stage = failure
        .trace
        .iter()
        .rev()
        .find(|s| **s != Stage::Failed)
        .copied()
        .unwrap_or(Stage::Setup);
    let mut lines = vec![format!(
        "==> Build failed with {} error(s) (stopped after {:?})",
        failure.errors.len(),
        last_stage
    )];
    for (i, err) in failure.errors.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), err.job));
        lines.push(format!("{}{}", indent(1), err.error));
    }
    lines
}

pub fn print_failure(failure: &BuildFailure) {
    for line in format_failure(failure) {
        eprintln!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check_output(valid: usize, source: &Path) -> Vec<String> {
    vec![
        format!("==> Checked {}", source.display()),
        format!("{valid} articles are valid"),
    ]
}

pub fn print_check_output(valid: usize, source: &Path) {
    for line in format_check_output(valid, source) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BuildError, JobError};
    use std::path::PathBuf;
    use std::time::Duration;

    fn report(executed: usize, skipped: usize, views: usize) -> BuildReport {
        BuildReport {
            trace: vec![Stage::Setup, Stage::Done],
            forced: false,
            sources: 2,
            parse: PhaseCounts { executed, skipped },
            views: PhaseCounts {
                executed: views,
                skipped: 3 - views,
            },
            robots: false,
            pruned: vec![],
            articles: 2,
            elapsed: Duration::from_millis(120),
        }
    }

    #[test]
    fn build_report_summary() {
        let lines = format_build_report(&report(1, 2, 3), Path::new("public"));
        assert_eq!(lines[0], "==> Built public in 0.12s");
        assert_eq!(lines[1], "Articles: 2 sources, 1 rendered, 1 unchanged");
        assert_eq!(lines[2], "Views: 3 rendered, 0 unchanged");
        assert_eq!(lines[3], "Registry: 2 articles");
    }

    #[test]
    fn robots_job_is_not_counted_as_an_article() {
        let mut r = report(3, 0, 3);
        r.robots = true;
        let lines = format_build_report(&r, Path::new("public"));
        assert_eq!(lines[1], "Articles: 2 sources, 2 rendered, 0 unchanged");
    }

    #[test]
    fn idle_build_says_nothing_changed() {
        let lines = format_build_report(&report(0, 3, 0), Path::new("public"));
        assert_eq!(lines.last().unwrap(), "Nothing changed");
    }

    #[test]
    fn pruned_articles_are_listed() {
        let mut r = report(0, 3, 3);
        r.pruned = vec!["old-post".into()];
        let lines = format_build_report(&r, Path::new("public"));
        let pos = lines.iter().position(|l| l == "Pruned").unwrap();
        assert_eq!(lines[pos + 1], "    old-post");
    }

    #[test]
    fn failure_lists_every_error() {
        let failure = BuildFailure {
            trace: vec![
                Stage::Setup,
                Stage::Phase1Submit,
                Stage::Phase1Barrier,
                Stage::Failed,
            ],
            errors: vec![
                JobError {
                    job: "article: bad.md".into(),
                    error: BuildError::Validation {
                        path: PathBuf::from("content/articles/bad.md"),
                        field: "title",
                    },
                },
                JobError {
                    job: "article: worse.md".into(),
                    error: BuildError::render("worse", "boom"),
                },
            ],
        };
        let lines = format_failure(&failure);
        assert_eq!(
            lines[0],
            "==> Build failed with 2 error(s) (stopped after Phase1Barrier)"
        );
        assert_eq!(lines[1], "001 article: bad.md");
        assert_eq!(
            lines[2],
            "    missing or invalid field `title` in content/articles/bad.md"
        );
        assert_eq!(lines[3], "002 article: worse.md");
    }

    #[test]
    fn check_output() {
        let lines = format_check_output(4, Path::new("site"));
        assert_eq!(lines, vec!["==> Checked site", "4 articles are valid"]);
    }
}
