//! # Folio
//!
//! A change-aware static blog builder. Markdown articles with TOML front
//! matter go in; per-article pages, a home page, an archive grouped by year
//! and an Atom feed come out. Rebuilding a site where nothing changed writes
//! nothing.
//!
//! # Architecture: Two Phases Over a Shared Registry
//!
//! A build is driven by the [`orchestrator`], which walks an explicit stage
//! machine:
//!
//! ```text
//! Setup          output tree, symlinks, universal sources, article list
//! Phase 1        one job per article: parse → render page → insert into registry
//!   barrier      every article job has finished
//! Phase 2        home, archive and feed over the complete, sorted registry
//!   barrier      persist fingerprints and the registry snapshot
//! ```
//!
//! Phase 2 only reads the registry, and it is never submitted while any
//! phase 1 job failed: aggregate pages are never built from a partial
//! registry. Every error of a failing phase is reported together.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`orchestrator`] | Stage machine, build context, build report, persisted state |
//! | [`scheduler`] | Rayon-backed bounded pool with per-phase queues and barriers |
//! | [`oracle`] | Change detection: SHA-256 fingerprints committed after good builds |
//! | [`parse`] | The article job: front matter, validation, Markdown, page and short link |
//! | [`derived`] | Home, archive and feed jobs, plus robots.txt |
//! | [`registry`] | Articles keyed by identifier, newest-first order, year groups |
//! | [`article`] | The `Article` record and front-matter validation |
//! | [`frontmatter`] | `+++`-delimited TOML front matter splitting and decoding |
//! | [`markdown`] | Markdown rendering behind a trait, pulldown-cmark by default |
//! | [`templates`] | Maud layouts with on-disk partials and view fragments |
//! | [`feed`] | Atom document model and XML encoding |
//! | [`files`] | Output tree primitives: directories, symlinks, listings, writes |
//! | [`config`] | `config.toml` loading, validation, stock defaults, site layout |
//! | [`naming`] | Identifier derivation from source filenames |
//! | [`error`] | Build error taxonomy |
//! | [`output`] | CLI output formatting |
//! | [`telemetry`] | Tracing subscriber setup |
//!
//! # Design Decisions
//!
//! ## Fingerprints Over Timestamps
//!
//! Staleness is decided by content hashes, not mtimes. Touching a file
//! without changing it rebuilds nothing, and a checkout that rewrites every
//! mtime does not force a full rebuild. Fingerprints are committed only
//! after a build succeeds, so a failed build is retried in full next time.
//!
//! ## Universal Sources
//!
//! Layout partials, stylesheets and `config.toml` feed every page, so a
//! change to any of them invalidates everything. Per-view fragments
//! (`views/article.html`, `views/index.html`, `views/archive.html`) only
//! invalidate their own view.
//!
//! ## Maud Layouts
//!
//! The page shell is a compile-time [Maud](https://maud.lambda.xyz/)
//! template. Site-specific HTML lives in optional partial files spliced in
//! verbatim, so a site can restyle without recompiling.

pub mod article;
pub mod config;
pub mod derived;
pub mod error;
pub mod feed;
pub mod files;
pub mod frontmatter;
pub mod markdown;
pub mod naming;
pub mod oracle;
pub mod orchestrator;
pub mod output;
pub mod parse;
pub mod registry;
pub mod scheduler;
pub mod telemetry;
pub mod templates;

#[cfg(test)]
pub(crate) mod test_helpers;
