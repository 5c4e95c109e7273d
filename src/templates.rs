//! HTML rendering.
//!
//! Page layouts are compiled [maud](https://maud.lambda.xyz/) templates. Site
//! authors customize them through raw HTML files in `views/`:
//!
//! | File | Spliced into | Dependency of |
//! |------|--------------|---------------|
//! | `_head.html` | `<head>` of every page | every page (universal) |
//! | `_header.html` | top of `<body>`, replacing the default header | every page (universal) |
//! | `_footer.html` | bottom of `<body>` | every page (universal) |
//! | `article.html` | after the article body | article pages |
//! | `index.html` | above the home page list | home page |
//! | `archive.html` | above the archive listing | archive page |
//!
//! All of them are optional. A file that exists but cannot be read fails
//! the render of the page that needed it.
//!
//! ## Generated Pages
//!
//! - **Article** (`/<identifier>`): title, date, location, rendered body
//! - **Home** (`/index.html`): the newest articles with plain-text excerpts
//! - **Archive** (`/archive`): every article, grouped by year
//! - **Short link** (`/a/<short_id>`): a bare click-through page

use crate::article::Article;
use crate::config::{ShortLinkStyle, SiteConfig, SitePaths};
use crate::error::BuildError;
use crate::files;
use crate::registry::YearGroup;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::io;
use std::path::{Path, PathBuf};

/// Characters of plain text shown per home page excerpt.
const EXCERPT_CHARS: usize = 280;

/// Partials spliced into every page.
pub const PARTIALS: [&str; 3] = ["_head.html", "_header.html", "_footer.html"];

/// A page kind with its own layout and optional fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Article,
    Home,
    Archive,
}

impl View {
    pub fn fragment_name(self) -> &'static str {
        match self {
            View::Article => "article.html",
            View::Home => "index.html",
            View::Archive => "archive.html",
        }
    }
}

/// The data one page renders.
#[derive(Debug, Clone, Copy)]
pub enum Page<'a> {
    Article(&'a Article),
    Home(&'a [Article]),
    Archive(&'a [YearGroup<'a>]),
}

impl Page<'_> {
    pub fn view(&self) -> View {
        match self {
            Page::Article(_) => View::Article,
            Page::Home(_) => View::Home,
            Page::Archive(_) => View::Archive,
        }
    }
}

/// Renders pages for one site.
#[derive(Debug, Clone)]
pub struct Renderer<'a> {
    config: &'a SiteConfig,
    views_dir: PathBuf,
    stylesheets: Vec<String>,
}

#[derive(Default)]
struct Partials {
    head: Option<String>,
    header: Option<String>,
    footer: Option<String>,
}

impl<'a> Renderer<'a> {
    /// `stylesheets` are file names inside `content/stylesheets`, linked
    /// from every page in order.
    pub fn new(config: &'a SiteConfig, paths: &SitePaths, stylesheets: Vec<String>) -> Self {
        Self {
            config,
            views_dir: paths.views_dir(),
            stylesheets,
        }
    }

    /// On-disk template dependency of `view`.
    pub fn fragment_path(&self, view: View) -> PathBuf {
        self.views_dir.join(view.fragment_name())
    }

    /// Render `page` and write it to `output`.
    pub fn render_file(&self, page: &Page<'_>, output: &Path) -> Result<(), BuildError> {
        let target = output.display().to_string();
        let markup = self.render(page, &target)?;
        files::write_file(output, markup.into_string())
    }

    /// Render `page` to markup. `target` names the page in errors.
    pub fn render(&self, page: &Page<'_>, target: &str) -> Result<Markup, BuildError> {
        let partials = self.load_partials(target)?;
        let fragment = self.read_view_file(&self.fragment_path(page.view()), target)?;
        let fragment = fragment.map(PreEscaped);

        let markup = match page {
            Page::Article(article) => self.base_document(
                Some(&article.title),
                "article",
                &partials,
                render_article(article, fragment),
            ),
            Page::Home(articles) => {
                let shown = &articles[..articles.len().min(self.config.home.num_articles)];
                self.base_document(None, "home", &partials, render_home(shown, fragment))
            }
            Page::Archive(years) => self.base_document(
                Some("Archive"),
                "archive",
                &partials,
                render_archive(years, fragment),
            ),
        };
        Ok(markup)
    }

    fn load_partials(&self, target: &str) -> Result<Partials, BuildError> {
        let [head, header, footer] = PARTIALS;
        Ok(Partials {
            head: self.read_view_file(&self.views_dir.join(head), target)?,
            header: self.read_view_file(&self.views_dir.join(header), target)?,
            footer: self.read_view_file(&self.views_dir.join(footer), target)?,
        })
    }

    fn read_view_file(&self, path: &Path, target: &str) -> Result<Option<String>, BuildError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BuildError::render(
                target,
                format!("cannot read view file {}: {e}", path.display()),
            )),
        }
    }

    // ========================================================================
    // HTML Components
    // ========================================================================

    /// Renders the base HTML document structure
    fn base_document(
        &self,
        title: Option<&str>,
        body_class: &str,
        partials: &Partials,
        content: Markup,
    ) -> Markup {
        let title = title.unwrap_or(&self.config.title);
        let release = &self.config.release;
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="UTF-8";
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                    title { (title) (self.config.title_suffix) }
                    @for sheet in &self.stylesheets {
                        link rel="stylesheet" type="text/css"
                            href={ "/assets/" (release) "/stylesheets/" (sheet) };
                    }
                    link rel="alternate" type="application/atom+xml"
                        title={ "Articles" (self.config.title_suffix) } href="/articles.atom";
                    @if let Some(head) = &partials.head {
                        (PreEscaped(head))
                    }
                }
                body class=(body_class) {
                    @match &partials.header {
                        Some(header) => { (PreEscaped(header)) }
                        None => { (self.site_header()) }
                    }
                    main { (content) }
                    @if let Some(footer) = &partials.footer {
                        (PreEscaped(footer))
                    }
                }
            }
        }
    }

    fn site_header(&self) -> Markup {
        html! {
            header.site-header {
                a.site-title href="/" { (self.config.title) }
                nav.site-nav {
                    a href="/archive" { "Archive" }
                    " "
                    a href="/articles.atom" { "Feed" }
                }
            }
        }
    }
}

// ============================================================================
// Page bodies
// ============================================================================

fn article_meta(article: &Article) -> Markup {
    html! {
        p.meta {
            time datetime=(article.published_at.to_rfc3339()) { (article.published_date()) }
            @if let Some(location) = &article.location {
                " · " span.location { (location) }
            }
        }
    }
}

fn render_article(article: &Article, fragment: Option<PreEscaped<String>>) -> Markup {
    html! {
        article {
            h1 { (article.title) }
            (article_meta(article))
            div.content { (PreEscaped(&article.content)) }
        }
        @if let Some(fragment) = fragment {
            (fragment)
        }
    }
}

fn render_home(articles: &[Article], fragment: Option<PreEscaped<String>>) -> Markup {
    html! {
        @if let Some(fragment) = fragment {
            (fragment)
        }
        ul.articles {
            @for article in articles {
                li {
                    h2 { a href={ "/" (article.identifier) } { (article.title) } }
                    (article_meta(article))
                    p.excerpt { (excerpt(&article.content, EXCERPT_CHARS)) }
                }
            }
        }
        p.more { a href="/archive" { "All articles" } }
    }
}

fn render_archive(years: &[YearGroup<'_>], fragment: Option<PreEscaped<String>>) -> Markup {
    html! {
        h1 { "Archive" }
        @if let Some(fragment) = fragment {
            (fragment)
        }
        @for year in years {
            section.year {
                h2 { (year.year) }
                ul {
                    @for article in &year.articles {
                        li {
                            a href={ "/" (article.identifier) } { (article.title) }
                            " "
                            span.date { (article.published_date()) }
                        }
                    }
                }
            }
        }
    }
}

/// Page written to `a/<short_id>`, or `None` when short links are off.
pub fn short_link_page(identifier: &str, style: ShortLinkStyle) -> Option<String> {
    let link = html! {
        "please click through to: "
        strong { a href={ "/" (identifier) } { "/" (identifier) } }
    };
    let page = match style {
        ShortLinkStyle::Off => return None,
        ShortLinkStyle::Stub => html! {
            (DOCTYPE) html { (link) }
        },
        ShortLinkStyle::Refresh => html! {
            (DOCTYPE)
            html {
                head { meta http-equiv="refresh" content={ "0; url=/" (identifier) }; }
                (link)
            }
        },
    };
    Some(page.into_string())
}

// ============================================================================
// Text helpers
// ============================================================================

/// Strip HTML tags from a string (simple angle-bracket stripping).
fn strip_html_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                result.push(' ');
            }
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}

/// Plain-text excerpt of rendered HTML, at most `max` characters plus `...`.
pub fn excerpt(html: &str, max: usize) -> String {
    let text = strip_html_tags(html)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text,
    }
}
