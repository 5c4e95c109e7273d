//! Jobs for pages built from the whole registry, plus robots.txt.
//!
//! | Job | Output | Rebuilds when |
//! |-----|--------|---------------|
//! | [`render_home`] | `index.html` | registry changed, or universal sources / `views/index.html` changed |
//! | [`render_archive`] | `archive` | registry changed, or universal sources / `views/archive.html` changed |
//! | [`render_feed`] | `articles.atom` | registry changed, or `config.toml` changed |
//! | [`render_robots`] | `robots.txt` | first build of the state directory, or forced |
//!
//! The view jobs run after the parse barrier and only read the registry.
//! robots.txt has no dependency on articles and runs with the parse jobs.

use crate::article::Article;
use crate::config::SiteConfig;
use crate::error::BuildError;
use crate::feed::{ARTICLES_FEED, build_articles_feed};
use crate::files;
use crate::orchestrator::BuildContext;
use crate::registry::group_by_year;
use crate::templates::{Page, View};

pub const HOME_PAGE: &str = "index.html";
pub const ARCHIVE_PAGE: &str = "archive";
pub const ROBOTS_FILE: &str = "robots.txt";

/// Render the home page from newest-first `articles`.
pub fn render_home(
    ctx: &BuildContext<'_>,
    articles: &[Article],
    articles_changed: bool,
) -> Result<bool, BuildError> {
    let views_changed = ctx.oracle.changed_any(&ctx.view_dependencies(View::Home));
    if !articles_changed && !views_changed {
        return Ok(false);
    }
    ctx.renderer
        .render_file(&Page::Home(articles), &ctx.paths.target_dir.join(HOME_PAGE))?;
    Ok(true)
}

/// Render the year-grouped archive from newest-first `articles`.
pub fn render_archive(
    ctx: &BuildContext<'_>,
    articles: &[Article],
    articles_changed: bool,
) -> Result<bool, BuildError> {
    let views_changed = ctx.oracle.changed_any(&ctx.view_dependencies(View::Archive));
    if !articles_changed && !views_changed {
        return Ok(false);
    }
    let years = group_by_year(articles);
    ctx.renderer
        .render_file(&Page::Archive(&years), &ctx.paths.target_dir.join(ARCHIVE_PAGE))?;
    Ok(true)
}

/// Write the Atom feed. It has no template; besides the registry it only
/// reads site settings (title, author, base URL, entry cap).
pub fn render_feed(
    ctx: &BuildContext<'_>,
    articles: &[Article],
    articles_changed: bool,
) -> Result<bool, BuildError> {
    let config_changed = ctx.oracle.changed(&ctx.paths.config_file());
    if !articles_changed && !config_changed {
        return Ok(false);
    }
    let feed = build_articles_feed(articles, ctx.config);
    files::write_file(&ctx.paths.target_dir.join(ARTICLES_FEED), feed.to_xml())?;
    Ok(true)
}

/// Write robots.txt when `due`; the caller decides (first run or forced).
pub fn render_robots(ctx: &BuildContext<'_>, due: bool) -> Result<bool, BuildError> {
    if !due {
        return Ok(false);
    }
    files::write_file(&ctx.paths.target_dir.join(ROBOTS_FILE), robots_txt(ctx.config))?;
    Ok(true)
}

/// Empty (allow all) normally; in drafts mode only the configured agent is
/// allowed.
pub fn robots_txt(config: &SiteConfig) -> String {
    if config.drafts {
        format!(
            "User-agent: {}\nDisallow:\n\nUser-agent: *\nDisallow: /\n",
            config.robots.allow_agent
        )
    } else {
        String::new()
    }
}
