//! Shared test utilities for the folio test suite.
//!
//! [`SiteFixture`] lays out a throwaway site (sources, output and state
//! directories under one temp dir) and offers readers for the output tree.
//! [`article`] and [`article_source`] produce registry records and source
//! files without going through the parser.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let site = SiteFixture::new()
//!     .article("2020-01-01-hello.md", &article_source("Hello", "2020-01-01", "# Hi"))
//!     .view("_footer.html", "<footer>bye</footer>");
//!
//! let mut orchestrator = Orchestrator::new(site.config().clone(), site.paths().clone())?;
//! orchestrator.build(false)?;
//! assert!(site.read_output("2020-01-01-hello").contains("<h1>Hi</h1>"));
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::article::Article;
use crate::config::{SiteConfig, SitePaths};
use crate::markdown::Cmark;
use crate::oracle::ChangeOracle;
use crate::orchestrator::{self, BuildContext};
use crate::templates::Renderer;

// =========================================================================
// Records
// =========================================================================

/// An article published at midnight UTC on `date` (`YYYY-MM-DD`).
pub fn article(identifier: &str, date: &str) -> Article {
    let day = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .unwrap_or_else(|e| panic!("bad test date '{date}': {e}"));
    Article {
        identifier: identifier.to_string(),
        title: format!("Title {identifier}"),
        published_at: day.and_time(chrono::NaiveTime::default()).and_utc(),
        location: None,
        short_id: None,
        content: format!("<p>Body of {identifier}</p>"),
    }
}

/// Source text of a valid article.
pub fn article_source(title: &str, date: &str, body: &str) -> String {
    format!("+++\ntitle = \"{title}\"\npublished_at = {date}\n+++\n\n{body}\n")
}

// =========================================================================
// Site fixture
// =========================================================================

/// A site under a temp dir: `site/` (sources), `out/` (target) and
/// `state/`. Only `site/content/articles` exists up front.
pub struct SiteFixture {
    _tmp: TempDir,
    config: SiteConfig,
    paths: SitePaths,
    markdown: Cmark,
}

impl SiteFixture {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let paths = SitePaths::new(
            tmp.path().join("site"),
            tmp.path().join("out"),
            tmp.path().join("state"),
        );
        fs::create_dir_all(paths.articles_dir()).unwrap();
        Self {
            _tmp: tmp,
            config: SiteConfig::default(),
            paths,
            markdown: Cmark::default(),
        }
    }

    /// Add an article source (builder form of [`SiteFixture::write_article`]).
    pub fn article(self, name: &str, content: &str) -> Self {
        self.write_article(name, content);
        self
    }

    /// Add a file under `views/`.
    pub fn view(self, name: &str, content: &str) -> Self {
        self.write_view(name, content);
        self
    }

    /// Add a stylesheet under `content/stylesheets/`.
    pub fn stylesheet(self, name: &str, content: &str) -> Self {
        write(&self.paths.stylesheets_dir().join(name), content);
        self
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn paths(&self) -> &SitePaths {
        &self.paths
    }

    pub fn article_path(&self, name: &str) -> PathBuf {
        self.paths.articles_dir().join(name)
    }

    pub fn write_article(&self, name: &str, content: &str) {
        write(&self.article_path(name), content);
    }

    pub fn remove_article(&self, name: &str) {
        fs::remove_file(self.article_path(name)).unwrap();
    }

    pub fn write_view(&self, name: &str, content: &str) {
        write(&self.paths.views_dir().join(name), content);
    }

    /// Job context over this site, as Setup would compute it.
    pub fn context<'a>(&'a self, oracle: &'a dyn ChangeOracle) -> BuildContext<'a> {
        let stylesheets = orchestrator::stylesheet_names(&self.paths).unwrap();
        BuildContext {
            config: &self.config,
            paths: &self.paths,
            oracle,
            markdown: &self.markdown,
            renderer: Renderer::new(&self.config, &self.paths, stylesheets),
            universal: orchestrator::universal_sources(&self.paths).unwrap(),
        }
    }

    // =====================================================================
    // Output readers: panic with a clear message on miss
    // =====================================================================

    /// Read a file relative to the output directory. Panics if missing.
    pub fn read_output(&self, relative: &str) -> String {
        let path = self.paths.target_dir.join(relative);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("output '{relative}' not readable: {e}"))
    }

    pub fn output_exists(&self, relative: &str) -> bool {
        self.paths.target_dir.join(relative).exists()
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}
