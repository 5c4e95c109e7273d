//! The build orchestrator.
//!
//! A build walks a fixed sequence of stages:
//!
//! ```text
//! Setup ─► Phase1Submit ─► Phase1Barrier ─► Phase2Submit ─► Phase2Barrier ─► Done
//!   │                           │                                │
//!   └───────────────────────────┴───────────── Failed ◄──────────┘
//! ```
//!
//! - **Setup** computes the universal source set, lists the article sources
//!   and prepares the output tree. Any error here ends the build before a
//!   single job is submitted.
//! - **Phase 1** runs one [`parse::render_article`] job per source, plus the
//!   robots.txt job. Sources that vanished are pruned from the registry
//!   first.
//! - **Phase 2** sorts the registry newest-first and runs the home, archive
//!   and feed jobs against it. It is never submitted if phase 1 reported an
//!   error, so aggregate pages are never built from a partial registry.
//!
//! Every error of a failing phase is returned together in a
//! [`BuildFailure`].
//!
//! ## State across builds
//!
//! The orchestrator owns the [`ArticleRegistry`] and the [`ChangeOracle`]
//! and keeps both between builds, so `folio loop` reuses them in memory.
//! After a successful build the oracle commits its fingerprints and the
//! registry is snapshotted to the state directory, so the next process
//! starts where this one stopped. A failed build commits nothing.

use crate::config::{self, SiteConfig, SitePaths};
use crate::derived;
use crate::error::{BuildError, BuildFailure, JobError};
use crate::feed::ARTICLES_FEED;
use crate::files;
use crate::markdown::{Cmark, MarkdownRenderer};
use crate::naming;
use crate::oracle::{ChangeOracle, FingerprintOracle};
use crate::parse;
use crate::registry::ArticleRegistry;
use crate::scheduler::{PhaseOutcome, Scheduler, SchedulerError};
use crate::templates::{self, Renderer, View};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Where a build is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Setup,
    Phase1Submit,
    Phase1Barrier,
    Phase2Submit,
    Phase2Barrier,
    Done,
    Failed,
}

/// Read-only state shared by every job of a build.
pub struct BuildContext<'a> {
    pub config: &'a SiteConfig,
    pub paths: &'a SitePaths,
    pub oracle: &'a dyn ChangeOracle,
    pub markdown: &'a dyn MarkdownRenderer,
    pub renderer: Renderer<'a>,
    /// Sources whose change invalidates every page.
    pub universal: Vec<PathBuf>,
}

impl BuildContext<'_> {
    /// Universal sources plus the view's own fragment.
    pub fn view_dependencies(&self, view: View) -> Vec<PathBuf> {
        let mut deps = self.universal.clone();
        deps.push(self.renderer.fragment_path(view));
        deps
    }
}

/// Job counts of one phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseCounts {
    pub executed: usize,
    pub skipped: usize,
}

impl From<&PhaseOutcome> for PhaseCounts {
    fn from(outcome: &PhaseOutcome) -> Self {
        Self {
            executed: outcome.executed,
            skipped: outcome.skipped,
        }
    }
}

/// Summary of a successful build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub trace: Vec<Stage>,
    pub forced: bool,
    /// Article sources found.
    pub sources: usize,
    /// Phase 1 jobs, robots.txt included.
    pub parse: PhaseCounts,
    pub views: PhaseCounts,
    /// Whether robots.txt was (re)written.
    pub robots: bool,
    /// Identifiers dropped because their source disappeared.
    pub pruned: Vec<String>,
    /// Articles in the registry after the build.
    pub articles: usize,
    pub elapsed: Duration,
}

impl BuildReport {
    /// Whether the build produced or rewrote any output file.
    pub fn wrote_anything(&self) -> bool {
        self.parse.executed + self.views.executed > 0
    }
}

/// What Setup hands to the phases.
struct Prepared {
    sources: Vec<PathBuf>,
    universal: Vec<PathBuf>,
    stylesheets: Vec<String>,
}

pub struct Orchestrator {
    config: SiteConfig,
    paths: SitePaths,
    scheduler: Scheduler,
    oracle: Box<dyn ChangeOracle + Send>,
    markdown: Box<dyn MarkdownRenderer + Send>,
    registry: Mutex<ArticleRegistry>,
    /// No committed fingerprints existed when the orchestrator was created.
    first_run: bool,
    /// The snapshot on disk is behind the in-memory registry.
    snapshot_stale: bool,
}

impl Orchestrator {
    /// Orchestrator with persisted state loaded from `paths.state_dir`.
    ///
    /// Fingerprints are only trusted together with a registry snapshot;
    /// without one everything is rebuilt.
    pub fn new(config: SiteConfig, paths: SitePaths) -> Result<Self, SchedulerError> {
        let scheduler = Scheduler::new(config::effective_threads(&config.processing))?;
        let state_dir = paths.state_dir.clone();
        let (oracle, registry, snapshot_stale) = match ArticleRegistry::load(&state_dir) {
            Some(registry) => (FingerprintOracle::load(&state_dir), registry, false),
            None => (FingerprintOracle::empty(&state_dir), ArticleRegistry::new(), true),
        };
        let mut orchestrator = Self::with_parts(
            config,
            paths,
            scheduler,
            Box::new(oracle),
            Box::new(Cmark::default()),
            registry,
        );
        orchestrator.snapshot_stale = snapshot_stale;
        Ok(orchestrator)
    }

    /// Orchestrator built from explicit collaborators.
    pub fn with_parts(
        config: SiteConfig,
        paths: SitePaths,
        scheduler: Scheduler,
        oracle: Box<dyn ChangeOracle + Send>,
        markdown: Box<dyn MarkdownRenderer + Send>,
        registry: ArticleRegistry,
    ) -> Self {
        let first_run = oracle.is_fresh();
        Self {
            config,
            paths,
            scheduler,
            oracle,
            markdown,
            registry: Mutex::new(registry),
            first_run,
            snapshot_stale: false,
        }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn paths(&self) -> &SitePaths {
        &self.paths
    }

    /// The registry as of the last barrier.
    pub fn registry(&mut self) -> &ArticleRegistry {
        self.registry
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one build. `forced` rebuilds everything regardless of changes.
    pub fn build(&mut self, forced: bool) -> Result<BuildReport, BuildFailure> {
        let started = Instant::now();
        let mut trace = vec![Stage::Setup];
        tracing::debug!(stage = ?Stage::Setup, forced, "build started");

        self.oracle.begin(forced);
        let prepared = match self.setup() {
            Ok(prepared) => prepared,
            Err(error) => {
                tracing::error!(%error, "setup failed");
                return Err(self.fail(
                    trace,
                    vec![JobError {
                        job: "setup".to_string(),
                        error,
                    }],
                ));
            }
        };

        // ---- Phase 1: one job per article, plus robots.txt ----
        trace.push(Stage::Phase1Submit);
        tracing::debug!(stage = ?Stage::Phase1Submit, sources = prepared.sources.len());
        let pruned = self.prune(&prepared.sources);

        let ctx = BuildContext {
            config: &self.config,
            paths: &self.paths,
            oracle: self.oracle.as_ref(),
            markdown: self.markdown.as_ref(),
            renderer: Renderer::new(&self.config, &self.paths, prepared.stylesheets),
            universal: prepared.universal,
        };
        let ctx_ref = &ctx;
        let robots_due = forced || self.first_run;
        let registry = &self.registry;

        let mut phase = self.scheduler.phase("parse");
        for source in &prepared.sources {
            phase.submit(job_name("article", source), move || {
                parse::render_article(ctx_ref, source, registry)
            });
        }
        phase.submit(derived::ROBOTS_FILE, move || {
            derived::render_robots(ctx_ref, robots_due)
        });

        trace.push(Stage::Phase1Barrier);
        tracing::debug!(stage = ?Stage::Phase1Barrier, jobs = phase.len());
        let parse_outcome = phase.barrier();
        if !parse_outcome.is_ok() {
            tracing::error!(
                errors = parse_outcome.errors.len(),
                "cancelling next phase due to build errors"
            );
            return Err(self.fail(trace, parse_outcome.errors));
        }
        let conflicts = short_id_conflicts(
            self.registry.get_mut().unwrap_or_else(PoisonError::into_inner),
            &self.paths.articles_dir(),
        );
        if !conflicts.is_empty() {
            tracing::error!(
                errors = conflicts.len(),
                "cancelling next phase due to shared short ids"
            );
            return Err(self.fail(trace, conflicts));
        }

        // ---- Phase 2: views over the complete registry ----
        trace.push(Stage::Phase2Submit);
        let registry = self
            .registry
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        registry.sort_descending_by_publish_date();
        // An unsaved or forced registry counts as changed even when empty.
        let articles_changed = registry.changed() || self.snapshot_stale || forced;
        let articles = registry.articles();
        tracing::debug!(
            stage = ?Stage::Phase2Submit,
            articles = articles.len(),
            articles_changed
        );

        let mut phase = self.scheduler.phase("views");
        phase.submit(derived::HOME_PAGE, move || {
            derived::render_home(ctx_ref, articles, articles_changed)
        });
        phase.submit(derived::ARCHIVE_PAGE, move || {
            derived::render_archive(ctx_ref, articles, articles_changed)
        });
        phase.submit(ARTICLES_FEED, move || {
            derived::render_feed(ctx_ref, articles, articles_changed)
        });

        trace.push(Stage::Phase2Barrier);
        tracing::debug!(stage = ?Stage::Phase2Barrier, jobs = phase.len());
        let views_outcome = phase.barrier();
        drop(ctx);
        if !views_outcome.is_ok() {
            return Err(self.fail(trace, views_outcome.errors));
        }

        if let Err(error) = self.persist() {
            return Err(self.fail(
                trace,
                vec![JobError {
                    job: "state".to_string(),
                    error,
                }],
            ));
        }

        trace.push(Stage::Done);
        let report = BuildReport {
            trace,
            forced,
            sources: prepared.sources.len(),
            parse: PhaseCounts::from(&parse_outcome),
            views: PhaseCounts::from(&views_outcome),
            robots: robots_due,
            pruned,
            articles: self.registry().len(),
            elapsed: started.elapsed(),
        };
        tracing::info!(
            articles = report.articles,
            rendered = report.parse.executed + report.views.executed,
            skipped = report.parse.skipped + report.views.skipped,
            elapsed = ?report.elapsed,
            "build complete"
        );
        Ok(report)
    }

    /// Parse every article without writing output. Returns the number of
    /// valid articles, or every error found.
    pub fn check(&self) -> Result<usize, BuildFailure> {
        let articles_dir = self.paths.articles_dir();
        let sources = match files::list_files(&articles_dir, Some("md")) {
            Ok(sources) => sources,
            Err(source) => {
                return Err(BuildFailure {
                    trace: vec![Stage::Setup, Stage::Failed],
                    errors: vec![JobError {
                        job: "setup".to_string(),
                        error: BuildError::Setup {
                            path: articles_dir,
                            source,
                        },
                    }],
                });
            }
        };

        let mut trace = vec![Stage::Setup, Stage::Phase1Submit];
        let markdown = self.markdown.as_ref();
        let parsed = Mutex::new(ArticleRegistry::new());
        let parsed_ref = &parsed;
        let mut phase = self.scheduler.phase("check");
        for source in &sources {
            phase.submit(job_name("article", source), move || {
                let article = parse::parse_article(source, markdown)?;
                parsed_ref
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert_or_replace(article);
                Ok(true)
            });
        }
        trace.push(Stage::Phase1Barrier);
        let mut outcome = phase.barrier();
        let parsed = parsed.into_inner().unwrap_or_else(PoisonError::into_inner);
        outcome
            .errors
            .extend(short_id_conflicts(&parsed, &articles_dir));
        if outcome.is_ok() {
            Ok(outcome.executed)
        } else {
            trace.push(Stage::Failed);
            Err(BuildFailure {
                trace,
                errors: outcome.errors,
            })
        }
    }

    // ========================================================================
    // Stages
    // ========================================================================

    fn setup(&self) -> Result<Prepared, BuildError> {
        let paths = &self.paths;

        let assets = paths.versioned_assets_dir(&self.config.release);
        for dir in [&paths.target_dir, &paths.short_links_dir(), &assets] {
            files::ensure_dir(dir).map_err(setup_error(dir))?;
        }
        let links = [
            (paths.images_dir(), paths.target_dir.join("assets/images")),
            (paths.javascripts_dir(), assets.join("javascripts")),
            (paths.stylesheets_dir(), assets.join("stylesheets")),
        ];
        for (source, link) in &links {
            if files::ensure_symlink(source, link).map_err(setup_error(link))? {
                tracing::debug!(link = %link.display(), "created symlink");
            }
        }

        let universal = universal_sources(paths).map_err(setup_error(&paths.source_dir))?;
        let stylesheets =
            stylesheet_names(paths).map_err(setup_error(&paths.stylesheets_dir()))?;
        let sources = files::list_files(&paths.articles_dir(), Some("md"))
            .map_err(setup_error(&paths.articles_dir()))?;

        Ok(Prepared {
            sources,
            universal,
            stylesheets,
        })
    }

    /// Drop articles whose source file is gone. Their pages stay on disk.
    fn prune(&mut self, sources: &[PathBuf]) -> Vec<String> {
        let live: HashSet<String> = sources
            .iter()
            .filter_map(|s| naming::extract_identifier(s))
            .collect();
        let removed = self
            .registry
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .retain_identifiers(&live);
        for identifier in &removed {
            tracing::info!(%identifier, "source removed, dropping article");
        }
        removed
    }

    /// Commit fingerprints and snapshot the registry after a good build.
    fn persist(&mut self) -> Result<(), BuildError> {
        let state_dir = self.paths.state_dir.clone();
        let registry = self
            .registry
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if registry.changed() || self.snapshot_stale {
            registry
                .save(&state_dir)
                .map_err(|e| BuildError::io(&state_dir, e))?;
            self.snapshot_stale = false;
        }
        registry.clear_changed();

        let saved = self
            .oracle
            .commit()
            .map_err(|e| BuildError::io(&state_dir, e))?;
        if saved {
            tracing::debug!(state = %state_dir.display(), "fingerprints saved");
        }
        self.first_run = false;
        Ok(())
    }

    fn fail(&mut self, mut trace: Vec<Stage>, errors: Vec<JobError>) -> BuildFailure {
        self.oracle.discard();
        trace.push(Stage::Failed);
        tracing::debug!(stage = ?Stage::Failed, errors = errors.len());
        BuildFailure { trace, errors }
    }
}

fn setup_error(path: &Path) -> impl FnOnce(io::Error) -> BuildError + use<> {
    let path = path.to_path_buf();
    move |source| BuildError::Setup { path, source }
}

/// One `Validation` error per article whose short id another article
/// also claims, since both would write `a/<short_id>`.
fn short_id_conflicts(registry: &ArticleRegistry, articles_dir: &Path) -> Vec<JobError> {
    registry
        .short_id_conflicts()
        .into_iter()
        .flat_map(|(short_id, identifiers)| {
            identifiers.into_iter().map(move |identifier| JobError {
                job: format!("short link: {short_id}"),
                error: BuildError::Validation {
                    path: articles_dir.join(format!("{identifier}.md")),
                    field: "short_id",
                },
            })
        })
        .collect()
}

fn job_name(kind: &str, source: &Path) -> String {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string());
    format!("{kind}: {name}")
}

/// Paths whose change invalidates every page: the `views/_*` partials, the
/// stylesheets and their directory listing, and the config file.
pub fn universal_sources(paths: &SitePaths) -> io::Result<Vec<PathBuf>> {
    let views_dir = paths.views_dir();
    let mut universal: Vec<PathBuf> = files::list_files(&views_dir, None)?
        .into_iter()
        .filter(|p| {
            p.file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with('_'))
        })
        .collect();
    // Partials read by the layout are tracked even before they exist.
    for partial in templates::PARTIALS {
        let path = views_dir.join(partial);
        if !universal.contains(&path) {
            universal.push(path);
        }
    }

    let stylesheets_dir = paths.stylesheets_dir();
    universal.extend(files::list_files(&stylesheets_dir, None)?);
    universal.push(stylesheets_dir);
    universal.push(paths.config_file());
    Ok(universal)
}

/// Stylesheet file names linked from every page.
pub fn stylesheet_names(paths: &SitePaths) -> io::Result<Vec<String>> {
    Ok(files::list_files(&paths.stylesheets_dir(), Some("css"))?
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::tests::FailingMarkdown;
    use crate::oracle::AlwaysChanged;
    use crate::test_helpers::{SiteFixture, article_source};

    fn orchestrator(site: &SiteFixture) -> Orchestrator {
        Orchestrator::new(site.config().clone(), site.paths().clone()).unwrap()
    }

    // =========================================================================
    // Stage trace
    // =========================================================================

    #[test]
    fn successful_build_walks_every_stage() {
        let site =
            SiteFixture::new().article("first.md", &article_source("A", "2020-01-01", "body"));
        let report = orchestrator(&site).build(false).unwrap();
        assert_eq!(
            report.trace,
            vec![
                Stage::Setup,
                Stage::Phase1Submit,
                Stage::Phase1Barrier,
                Stage::Phase2Submit,
                Stage::Phase2Barrier,
                Stage::Done,
            ]
        );
        assert_eq!(report.sources, 1);
        assert_eq!(report.articles, 1);
        // One article plus robots.txt, then home, archive and feed.
        assert_eq!(report.parse.executed, 2);
        assert_eq!(report.views.executed, 3);
    }

    #[test]
    fn phase_one_failure_stops_before_phase_two() {
        let site = SiteFixture::new()
            .article("good.md", &article_source("Good", "2020-01-01", "body"))
            .article("bad.md", "+++\npublished_at = 2020-01-01\n+++\nbody");
        let failure = orchestrator(&site).build(false).unwrap_err();

        assert_eq!(failure.trace.last(), Some(&Stage::Failed));
        assert!(!failure.trace.contains(&Stage::Phase2Submit));
        assert!(!failure.is_setup_failure());
        assert_eq!(failure.errors.len(), 1);
        assert!(matches!(
            failure.errors[0].error,
            BuildError::Validation { field: "title", .. }
        ));

        assert!(site.output_exists("good"));
        assert!(!site.output_exists("bad"));
        assert!(!site.output_exists(derived::HOME_PAGE));
        assert!(!site.output_exists(derived::ARCHIVE_PAGE));
        assert!(!site.output_exists(ARTICLES_FEED));
    }

    #[test]
    fn every_phase_error_is_reported() {
        let site = SiteFixture::new()
            .article("one.md", "+++\ntitle = \"One\"\n+++\n")
            .article("two.md", "no front matter")
            .article("three.md", &article_source("Three", "2020-01-01", "BOOM"));
        let mut orchestrator = Orchestrator::with_parts(
            site.config().clone(),
            site.paths().clone(),
            Scheduler::new(2).unwrap(),
            Box::new(AlwaysChanged),
            Box::new(FailingMarkdown { marker: "BOOM" }),
            ArticleRegistry::new(),
        );
        let failure = orchestrator.build(false).unwrap_err();
        let mut kinds: Vec<&str> = failure.errors.iter().map(|e| e.error.kind()).collect();
        kinds.sort();
        assert_eq!(kinds, vec!["parse", "render", "validation"]);
    }

    #[test]
    fn setup_failure_submits_nothing() {
        let site =
            SiteFixture::new().article("first.md", &article_source("A", "2020-01-01", "body"));
        // A file where the target directory should be.
        std::fs::create_dir_all(site.paths().target_dir.parent().unwrap()).unwrap();
        std::fs::write(&site.paths().target_dir, "not a directory").unwrap();

        let failure = orchestrator(&site).build(false).unwrap_err();
        assert!(failure.is_setup_failure());
        assert_eq!(failure.trace, vec![Stage::Setup, Stage::Failed]);
        assert!(matches!(failure.errors[0].error, BuildError::Setup { .. }));
    }

    #[test]
    fn view_failure_fails_build() {
        let site =
            SiteFixture::new().article("first.md", &article_source("A", "2020-01-01", "body"));
        std::fs::create_dir_all(site.paths().views_dir().join("archive.html")).unwrap();

        let failure = orchestrator(&site).build(false).unwrap_err();
        assert!(failure.trace.contains(&Stage::Phase2Barrier));
        assert_eq!(failure.errors.len(), 1);
        assert_eq!(failure.errors[0].job, derived::ARCHIVE_PAGE);
        // Siblings in the same phase still ran.
        assert!(site.output_exists(derived::HOME_PAGE));
        assert!(site.output_exists(ARTICLES_FEED));
    }

    // =========================================================================
    // Incremental behavior
    // =========================================================================

    #[test]
    fn second_build_skips_everything() {
        let site =
            SiteFixture::new().article("first.md", &article_source("A", "2020-01-01", "body"));
        let mut orchestrator = orchestrator(&site);
        orchestrator.build(false).unwrap();

        let report = orchestrator.build(false).unwrap();
        assert!(!report.wrote_anything());
        assert_eq!(report.parse.skipped, 2);
        assert_eq!(report.views.skipped, 3);
    }

    #[test]
    fn edited_article_rebuilds_it_and_the_views() {
        let site = SiteFixture::new()
            .article("first.md", &article_source("A", "2020-01-01", "body"))
            .article("second.md", &article_source("B", "2021-01-01", "body"));
        let mut orchestrator = orchestrator(&site);
        orchestrator.build(false).unwrap();

        site.write_article("first.md", &article_source("A, revised", "2020-01-01", "body"));
        let report = orchestrator.build(false).unwrap();
        assert_eq!(report.parse.executed, 1);
        assert_eq!(report.views.executed, 3);
        assert_eq!(orchestrator.registry().get("first").unwrap().title, "A, revised");
        assert_eq!(orchestrator.registry().len(), 2);
    }

    #[test]
    fn partial_change_rebuilds_every_page() {
        let site =
            SiteFixture::new().article("first.md", &article_source("A", "2020-01-01", "body"));
        let mut orchestrator = orchestrator(&site);
        orchestrator.build(false).unwrap();

        site.write_view("_footer.html", "<footer>new</footer>");
        let report = orchestrator.build(false).unwrap();
        assert_eq!(report.parse.executed, 1);
        assert!(site.read_output("first").contains("<footer>new</footer>"));
        // Re-parsing replaced the article, so the registry changed too.
        assert_eq!(report.views.executed, 3);
    }

    #[test]
    fn fragment_change_rebuilds_only_its_view() {
        let site =
            SiteFixture::new().article("first.md", &article_source("A", "2020-01-01", "body"));
        let mut orchestrator = orchestrator(&site);
        orchestrator.build(false).unwrap();

        site.write_view("archive.html", "<p>Everything I wrote.</p>");
        let report = orchestrator.build(false).unwrap();
        assert_eq!(report.parse.executed, 0);
        assert_eq!(report.views.executed, 1);
        assert!(site.read_output(derived::ARCHIVE_PAGE).contains("Everything I wrote."));
    }

    #[test]
    fn failed_build_is_retried_next_time() {
        let site = SiteFixture::new().article("first.md", "+++\ntitle = \"A\"\n+++\n");
        let mut orchestrator = orchestrator(&site);
        assert!(orchestrator.build(false).is_err());
        assert!(orchestrator.build(false).is_err());

        site.write_article("first.md", &article_source("A", "2020-01-01", "body"));
        let report = orchestrator.build(false).unwrap();
        assert_eq!(report.articles, 1);
        assert!(site.output_exists(derived::HOME_PAGE));
    }

    #[test]
    fn removed_source_is_pruned() {
        let site = SiteFixture::new()
            .article("first.md", &article_source("A", "2020-01-01", "body"))
            .article("second.md", &article_source("B", "2021-01-01", "body"));
        let mut orchestrator = orchestrator(&site);
        orchestrator.build(false).unwrap();

        site.remove_article("second.md");
        let report = orchestrator.build(false).unwrap();
        assert_eq!(report.pruned, vec!["second"]);
        assert_eq!(report.articles, 1);
        assert_eq!(report.views.executed, 3);
        assert!(!site.read_output(derived::ARCHIVE_PAGE).contains("href=\"/second\""));
    }

    #[test]
    fn restored_source_returns_to_the_registry() {
        let site = SiteFixture::new()
            .article("first.md", &article_source("A", "2020-01-01", "body"))
            .article("second.md", &article_source("B", "2021-01-01", "body"));
        let mut orchestrator = orchestrator(&site);
        orchestrator.build(false).unwrap();

        site.remove_article("second.md");
        orchestrator.build(false).unwrap();
        assert_eq!(orchestrator.registry().len(), 1);

        // Byte-identical content, as after undoing the delete.
        site.write_article("second.md", &article_source("B", "2021-01-01", "body"));
        let report = orchestrator.build(false).unwrap();
        assert_eq!(report.articles, 2);
        assert_eq!(report.parse.executed, 1);
        assert!(site.read_output(derived::ARCHIVE_PAGE).contains("href=\"/second\""));
    }

    #[test]
    fn removed_source_leaves_the_baseline() {
        let site = SiteFixture::new()
            .article("first.md", &article_source("A", "2020-01-01", "body"))
            .article("second.md", &article_source("B", "2021-01-01", "body"));
        let mut orchestrator = orchestrator(&site);
        orchestrator.build(false).unwrap();
        let before = FingerprintOracle::load(&site.paths().state_dir).committed_len();

        site.remove_article("second.md");
        orchestrator.build(false).unwrap();
        let after = FingerprintOracle::load(&site.paths().state_dir).committed_len();
        assert_eq!(after, before - 1);
    }

    #[test]
    fn shared_short_id_fails_before_views() {
        let site = SiteFixture::new()
            .article(
                "first.md",
                "+++\ntitle = \"A\"\npublished_at = 2020-01-01\nshort_id = \"xy\"\n+++\nbody",
            )
            .article(
                "second.md",
                "+++\ntitle = \"B\"\npublished_at = 2021-01-01\nshort_id = \"xy\"\n+++\nbody",
            );
        let mut orchestrator = orchestrator(&site);
        let failure = orchestrator.build(false).unwrap_err();

        assert!(!failure.trace.contains(&Stage::Phase2Submit));
        let paths: Vec<String> = failure
            .errors
            .iter()
            .map(|e| match &e.error {
                BuildError::Validation {
                    path,
                    field: "short_id",
                } => path.file_name().unwrap().to_string_lossy().into_owned(),
                other => panic!("unexpected error: {other}"),
            })
            .collect();
        assert_eq!(paths, vec!["first.md", "second.md"]);
        assert!(!site.output_exists(derived::HOME_PAGE));

        // Renaming one of them fixes the build.
        site.write_article(
            "second.md",
            "+++\ntitle = \"B\"\npublished_at = 2021-01-01\nshort_id = \"zz\"\n+++\nbody",
        );
        orchestrator.build(false).unwrap();
        assert!(site.output_exists("a/zz"));
    }

    #[test]
    fn forced_build_rewrites_everything() {
        let site =
            SiteFixture::new().article("first.md", &article_source("A", "2020-01-01", "body"));
        let mut orchestrator = orchestrator(&site);
        orchestrator.build(false).unwrap();

        let report = orchestrator.build(true).unwrap();
        assert!(report.forced);
        assert_eq!(report.parse.executed, 2);
        assert_eq!(report.views.executed, 3);
    }

    #[test]
    fn empty_site_still_gets_every_view() {
        let site = SiteFixture::new();
        let mut orchestrator = orchestrator(&site);
        let report = orchestrator.build(false).unwrap();
        assert_eq!(report.views.executed, 3);
        assert!(site.output_exists(ARTICLES_FEED));

        let report = orchestrator.build(false).unwrap();
        assert!(!report.wrote_anything());
    }

    #[test]
    fn registry_is_sorted_after_build() {
        let site = SiteFixture::new()
            .article("old.md", &article_source("Old", "2010-01-01", "body"))
            .article("new.md", &article_source("New", "2022-01-01", "body"))
            .article("mid.md", &article_source("Mid", "2015-01-01", "body"));
        let mut orchestrator = orchestrator(&site);
        orchestrator.build(false).unwrap();

        let ids: Vec<&str> = orchestrator
            .registry()
            .articles()
            .iter()
            .map(|a| a.identifier.as_str())
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    // =========================================================================
    // Setup
    // =========================================================================

    #[test]
    fn setup_creates_output_tree() {
        let site = SiteFixture::new()
            .article("first.md", &article_source("A", "2020-01-01", "body"))
            .stylesheet("main.css", "body {}");
        orchestrator(&site).build(false).unwrap();

        assert!(site.paths().target_dir.join("first").is_file());
        assert!(site.paths().short_links_dir().is_dir());
        assert!(site.paths().versioned_assets_dir("1").is_dir());
        #[cfg(unix)]
        assert!(
            site.paths()
                .versioned_assets_dir("1")
                .join("stylesheets/main.css")
                .is_file()
        );
        assert!(site.read_output("first").contains("/assets/1/stylesheets/main.css"));
    }

    #[test]
    fn universal_sources_cover_partials_stylesheets_and_config() {
        let site = SiteFixture::new()
            .view("_head.html", "<meta>")
            .view("_extra.html", "x")
            .view("article.html", "x")
            .stylesheet("main.css", "body {}");
        let universal = universal_sources(site.paths()).unwrap();
        let views = site.paths().views_dir();

        assert!(universal.contains(&views.join("_head.html")));
        assert!(universal.contains(&views.join("_extra.html")));
        assert!(universal.contains(&views.join("_footer.html")));
        assert!(!universal.contains(&views.join("article.html")));
        assert!(!universal.contains(&views));
        assert!(universal.contains(&site.paths().stylesheets_dir().join("main.css")));
        assert!(universal.contains(&site.paths().stylesheets_dir()));
        assert!(universal.contains(&site.paths().config_file()));
    }

    // =========================================================================
    // Check
    // =========================================================================

    #[test]
    fn check_writes_nothing() {
        let site =
            SiteFixture::new().article("first.md", &article_source("A", "2020-01-01", "body"));
        assert_eq!(orchestrator(&site).check().unwrap(), 1);
        assert!(!site.paths().target_dir.exists());
    }

    #[test]
    fn check_reports_all_errors() {
        let site = SiteFixture::new()
            .article("first.md", "+++\ntitle = \"A\"\n+++\n")
            .article("second.md", "+++\npublished_at = 2020-01-01\n+++\n");
        let failure = orchestrator(&site).check().unwrap_err();
        assert_eq!(failure.errors.len(), 2);
    }

    #[test]
    fn check_reports_shared_short_ids() {
        let site = SiteFixture::new()
            .article(
                "first.md",
                "+++\ntitle = \"A\"\npublished_at = 2020-01-01\nshort_id = \"xy\"\n+++\n",
            )
            .article(
                "second.md",
                "+++\ntitle = \"B\"\npublished_at = 2020-01-02\ntiny_slug = \"xy\"\n+++\n",
            );
        let failure = orchestrator(&site).check().unwrap_err();
        assert_eq!(failure.errors.len(), 2);
        assert!(failure.errors.iter().all(|e| e.job == "short link: xy"));
    }
}
