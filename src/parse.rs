//! The article job.
//!
//! One job per source file. A job first checks whether anything it depends
//! on changed (its own source, the universal sources, the article fragment)
//! and returns `Ok(false)` without touching anything if not, provided the
//! registry already holds the article. Otherwise it:
//!
//! 1. splits and decodes the TOML front matter,
//! 2. validates the required fields,
//! 3. derives the identifier from the filename,
//! 4. renders the Markdown body,
//! 5. writes `<target>/<identifier>` and, with a short id, `<target>/a/<short_id>`,
//! 6. inserts the article into the shared registry.
//!
//! Only the registry lookup and step 6 touch shared state, each for the
//! duration of a single call.

use crate::article::{Article, FrontMatter, FrontMatterProblem};
use crate::error::BuildError;
use crate::files;
use crate::frontmatter::{self, FrontmatterError};
use crate::markdown::MarkdownRenderer;
use crate::naming;
use crate::orchestrator::BuildContext;
use crate::registry::ArticleRegistry;
use crate::templates::{Page, View, short_link_page};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Rebuild the article at `source` if it is stale.
pub fn render_article(
    ctx: &BuildContext<'_>,
    source: &Path,
    registry: &Mutex<ArticleRegistry>,
) -> Result<bool, BuildError> {
    let source_changed = ctx.oracle.changed(source);
    let views_changed = ctx.oracle.changed_any(&ctx.view_dependencies(View::Article));
    if !source_changed && !views_changed && is_registered(source, registry) {
        return Ok(false);
    }

    let article = parse_article(source, ctx.markdown)?;

    let output = ctx.paths.target_dir.join(&article.identifier);
    ctx.renderer.render_file(&Page::Article(&article), &output)?;

    if let Some(short_id) = &article.short_id
        && let Some(page) = short_link_page(&article.identifier, ctx.config.short_links.style)
    {
        files::write_file(&ctx.paths.short_links_dir().join(short_id), page)?;
    }

    tracing::debug!(identifier = %article.identifier, "article rendered");
    registry
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert_or_replace(article);
    Ok(true)
}

/// Whether the article built from `source` is already in the registry.
/// An unchanged source without an entry still has to be parsed.
fn is_registered(source: &Path, registry: &Mutex<ArticleRegistry>) -> bool {
    naming::extract_identifier(source).is_some_and(|identifier| {
        registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&identifier)
            .is_some()
    })
}

/// Read, validate and render one source into an [`Article`] without
/// writing anything.
pub fn parse_article(source: &Path, markdown: &dyn MarkdownRenderer) -> Result<Article, BuildError> {
    let (front, body): (FrontMatter, String) =
        frontmatter::parse_file(source).map_err(|e| match e {
            FrontmatterError::Io(e) => BuildError::io(source, e),
            other => BuildError::Parse {
                path: source.to_path_buf(),
                message: other.to_string(),
            },
        })?;

    front.validate().map_err(|problem| problem_to_error(source, problem))?;

    let identifier = naming::extract_identifier(source)
        .filter(|id| naming::is_url_safe(id) && !naming::is_reserved(id))
        .ok_or_else(|| BuildError::Validation {
            path: source.to_path_buf(),
            field: "identifier",
        })?;

    let content = markdown
        .render(&body)
        .map_err(|e| BuildError::render(&identifier, e))?;

    front
        .into_article(identifier, content)
        .map_err(|problem| problem_to_error(source, problem))
}

fn problem_to_error(source: &Path, problem: FrontMatterProblem) -> BuildError {
    match problem {
        FrontMatterProblem::Missing(field) => BuildError::Validation {
            path: source.to_path_buf(),
            field,
        },
        FrontMatterProblem::Invalid { field, reason } => BuildError::Parse {
            path: source.to_path_buf(),
            message: format!("invalid `{field}`: {reason}"),
        },
    }
}
