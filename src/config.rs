//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. A single optional
//! file lives in the site root; its values override the stock defaults and
//! command-line flags override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! title = "Folio"                       # Site name, used on the home page
//! title_suffix = " — folio"             # Appended to page and feed titles
//! absolute_url = "https://example.com"  # Canonical URL, used in the Atom feed
//! release = "1"                         # Versioned asset directory name
//! drafts = false                        # Drafts mode (robots.txt policy)
//!
//! [atom]
//! tag = "example.com"       # Authority part of feed and entry tag URIs
//! author_name = "Folio"     # Entry author
//! num_entries = 20          # Maximum entries in articles.atom
//!
//! [home]
//! num_articles = 10         # Articles listed on the home page
//!
//! [robots]
//! allow_agent = "Twitterbot" # Crawler still allowed in drafts mode
//!
//! [short_links]
//! style = "stub"            # stub | refresh | off
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! ## Site Layout
//!
//! [`SitePaths`] fixes where sources are read from and where output and
//! persisted build state go. The directory conventions are documented on
//! each accessor.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the site config file in the source root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site name, used as the home page title.
    pub title: String,
    /// Suffix appended to every page title and the feed title.
    pub title_suffix: String,
    /// Absolute URL the site is hosted at. No trailing slash.
    pub absolute_url: String,
    /// Release stamp for the versioned assets directory.
    pub release: String,
    /// Drafts mode. Emits a robots.txt that keeps crawlers away.
    pub drafts: bool,
    /// Atom feed settings.
    pub atom: AtomConfig,
    /// Home page settings.
    pub home: HomeConfig,
    /// robots.txt settings.
    pub robots: RobotsConfig,
    /// Short-alias output settings.
    pub short_links: ShortLinksConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Folio".to_string(),
            title_suffix: " — folio".to_string(),
            absolute_url: "https://example.com".to_string(),
            release: "1".to_string(),
            drafts: false,
            atom: AtomConfig::default(),
            home: HomeConfig::default(),
            robots: RobotsConfig::default(),
            short_links: ShortLinksConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.atom.num_entries == 0 {
            return Err(ConfigError::Validation(
                "atom.num_entries must be at least 1".into(),
            ));
        }
        if self.home.num_articles == 0 {
            return Err(ConfigError::Validation(
                "home.num_articles must be at least 1".into(),
            ));
        }
        if self.atom.tag.is_empty() {
            return Err(ConfigError::Validation("atom.tag must not be empty".into()));
        }
        if self.release.is_empty() || self.release.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "release must be a single non-empty path segment".into(),
            ));
        }
        if !self.absolute_url.starts_with("http://") && !self.absolute_url.starts_with("https://")
        {
            return Err(ConfigError::Validation(
                "absolute_url must start with http:// or https://".into(),
            ));
        }
        Ok(())
    }

    /// Absolute URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.absolute_url.trim_end_matches('/')
    }
}

/// Atom feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AtomConfig {
    /// Stable authority for `tag:` URIs, e.g. `example.com`.
    pub tag: String,
    /// Author name attached to every entry.
    pub author_name: String,
    /// Maximum number of entries in the feed.
    pub num_entries: usize,
}

impl Default for AtomConfig {
    fn default() -> Self {
        Self {
            tag: "example.com".to_string(),
            author_name: "Folio".to_string(),
            num_entries: 20,
        }
    }
}

/// Home page settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HomeConfig {
    /// Number of most recent articles listed on the home page.
    pub num_articles: usize,
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self { num_articles: 10 }
    }
}

/// robots.txt settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RobotsConfig {
    /// User agent that stays allowed when drafts mode blocks everyone else.
    pub allow_agent: String,
}

impl Default for RobotsConfig {
    fn default() -> Self {
        Self {
            allow_agent: "Twitterbot".to_string(),
        }
    }
}

/// How short aliases (`a/<short_id>`) are emitted.
///
/// Static hosts generally cannot issue HTTP redirects for individual paths,
/// so every style here is a plain file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortLinkStyle {
    /// A minimal page with a click-through link to the canonical path.
    #[default]
    Stub,
    /// The stub page plus a `<meta http-equiv="refresh">` client-side hop.
    Refresh,
    /// No alias output at all.
    Off,
}

/// Short-alias output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShortLinksConfig {
    pub style: ShortLinkStyle,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel build workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, and at least one
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from the site root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the defaults.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    let merged = if config_path.exists() {
        let content = fs::read_to_string(&config_path)?;
        let overlay: toml::Value = toml::from_str(&content)?;
        merge_toml(stock_defaults_value(), overlay)
    } else {
        stock_defaults_value()
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Folio Configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.
#
# This file is a dependency of every page: editing it rebuilds the site.

# Site name, shown as the home page title.
title = "Folio"

# Appended to every page title and to the Atom feed title.
title_suffix = " — folio"

# Absolute URL the site is served from (no trailing slash).
absolute_url = "https://example.com"

# Versioned assets live under assets/<release>/. Bump to bust caches.
release = "1"

# Drafts mode. When on, robots.txt blocks every crawler except
# robots.allow_agent.
drafts = false

# ---------------------------------------------------------------------------
# Atom feed (articles.atom)
# ---------------------------------------------------------------------------
[atom]
# Authority used in tag: URIs for the feed and entry ids. Never change this
# once published or readers will see every entry again.
tag = "example.com"

# Author attached to every entry.
author_name = "Folio"

# Maximum number of entries, newest first.
num_entries = 20

# ---------------------------------------------------------------------------
# Home page
# ---------------------------------------------------------------------------
[home]
# Number of most recent articles listed on the home page.
num_articles = 10

# ---------------------------------------------------------------------------
# robots.txt
# ---------------------------------------------------------------------------
[robots]
# Crawler still allowed in drafts mode (for link previews).
allow_agent = "Twitterbot"

# ---------------------------------------------------------------------------
# Short links (a/<short_id>)
# ---------------------------------------------------------------------------
[short_links]
# stub    - a tiny page with a click-through link to the article
# refresh - the stub page plus a meta refresh to the article
# off     - don't emit short-link pages
style = "stub"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel build workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

// =============================================================================
// Site paths
// =============================================================================

/// Directory conventions for one site.
///
/// ```text
/// <source>/config.toml
/// <source>/content/articles/*.md
/// <source>/content/stylesheets/
/// <source>/content/images/
/// <source>/content/javascripts/
/// <source>/views/_*.html        partials
/// <source>/views/<view>.html    per-view fragments
/// <target>/...                  rendered site
/// <state>/...                   fingerprints and registry snapshot
/// ```
#[derive(Debug, Clone)]
pub struct SitePaths {
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl SitePaths {
    pub fn new(
        source_dir: impl Into<PathBuf>,
        target_dir: impl Into<PathBuf>,
        state_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            target_dir: target_dir.into(),
            state_dir: state_dir.into(),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.source_dir.join(CONFIG_FILENAME)
    }

    pub fn articles_dir(&self) -> PathBuf {
        self.source_dir.join("content/articles")
    }

    pub fn stylesheets_dir(&self) -> PathBuf {
        self.source_dir.join("content/stylesheets")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.source_dir.join("content/images")
    }

    pub fn javascripts_dir(&self) -> PathBuf {
        self.source_dir.join("content/javascripts")
    }

    pub fn views_dir(&self) -> PathBuf {
        self.source_dir.join("views")
    }

    /// Directory for assets whose URLs carry the release stamp.
    pub fn versioned_assets_dir(&self, release: &str) -> PathBuf {
        self.target_dir.join("assets").join(release)
    }

    /// Directory holding short-alias stub pages.
    pub fn short_links_dir(&self) -> PathBuf {
        self.target_dir.join("a")
    }
}
