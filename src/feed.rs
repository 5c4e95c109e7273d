//! Atom syndication.
//!
//! The feed is assembled as a small document model and encoded to XML by
//! hand; Atom needs only a handful of elements and every text node goes
//! through [`xml_escape`].
//!
//! ```text
//! feed   id       tag:<atom.tag>,2009:/articles
//!        link     rel=self       <absolute_url>/articles.atom
//!        link     rel=alternate  <absolute_url>
//!        updated  newest entry's publish time (omitted when empty)
//! entry  id       tag:<atom.tag>,<YYYY-MM-DD>:/<identifier>
//!        link     <absolute_url>/<identifier>
//! ```
//!
//! Articles are not tracked for edits, so an entry's `updated` equals its
//! `published`.

use crate::article::Article;
use crate::config::SiteConfig;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write;

/// Output filename of the articles feed.
pub const ARTICLES_FEED: &str = "articles.atom";

#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    pub id: String,
    pub title: String,
    pub updated: Option<DateTime<Utc>>,
    pub links: Vec<Link>,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub rel: Option<&'static str>,
    pub mime_type: Option<&'static str>,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: String,
    pub title: String,
    pub published: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub link: Link,
    /// HTML body, emitted as escaped `type="html"` content.
    pub content: String,
    pub author_name: String,
    pub author_uri: String,
}

/// Build the articles feed from a newest-first article list, keeping at
/// most `atom.num_entries` entries.
pub fn build_articles_feed(articles: &[Article], config: &SiteConfig) -> Feed {
    let base = config.base_url();
    let tag = &config.atom.tag;

    let entries = articles
        .iter()
        .take(config.atom.num_entries)
        .map(|article| Entry {
            id: format!("tag:{tag},{}:/{}", article.published_date(), article.identifier),
            title: article.title.clone(),
            published: article.published_at,
            updated: article.published_at,
            link: Link {
                rel: None,
                mime_type: None,
                href: format!("{base}/{}", article.identifier),
            },
            content: article.content.clone(),
            author_name: config.atom.author_name.clone(),
            author_uri: base.to_string(),
        })
        .collect();

    Feed {
        id: format!("tag:{tag},2009:/articles"),
        title: format!("Articles{}", config.title_suffix),
        updated: articles.first().map(|a| a.published_at),
        links: vec![
            Link {
                rel: Some("self"),
                mime_type: Some("application/atom+xml"),
                href: format!("{base}/{ARTICLES_FEED}"),
            },
            Link {
                rel: Some("alternate"),
                mime_type: Some("text/html"),
                href: base.to_string(),
            },
        ],
        entries,
    }
}

impl Feed {
    /// Encode as an Atom 1.0 document.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str("<feed xmlns=\"http://www.w3.org/2005/Atom\">\n");
        let _ = writeln!(out, "  <title>{}</title>", xml_escape(&self.title));
        let _ = writeln!(out, "  <id>{}</id>", xml_escape(&self.id));
        if let Some(updated) = self.updated {
            let _ = writeln!(out, "  <updated>{}</updated>", timestamp(updated));
        }
        for link in &self.links {
            let _ = writeln!(out, "  {}", link.to_xml());
        }
        for entry in &self.entries {
            out.push_str("  <entry>\n");
            let _ = writeln!(out, "    <title>{}</title>", xml_escape(&entry.title));
            let _ = writeln!(
                out,
                "    <content type=\"html\">{}</content>",
                xml_escape(&entry.content)
            );
            let _ = writeln!(out, "    <published>{}</published>", timestamp(entry.published));
            let _ = writeln!(out, "    <updated>{}</updated>", timestamp(entry.updated));
            let _ = writeln!(out, "    {}", entry.link.to_xml());
            let _ = writeln!(out, "    <id>{}</id>", xml_escape(&entry.id));
            out.push_str("    <author>\n");
            let _ = writeln!(out, "      <name>{}</name>", xml_escape(&entry.author_name));
            let _ = writeln!(out, "      <uri>{}</uri>", xml_escape(&entry.author_uri));
            out.push_str("    </author>\n");
            out.push_str("  </entry>\n");
        }
        out.push_str("</feed>\n");
        out
    }
}

impl Link {
    fn to_xml(&self) -> String {
        let mut out = String::from("<link");
        if let Some(rel) = self.rel {
            let _ = write!(out, " rel=\"{rel}\"");
        }
        if let Some(mime_type) = self.mime_type {
            let _ = write!(out, " type=\"{mime_type}\"");
        }
        let _ = write!(out, " href=\"{}\"/>", xml_escape(&self.href));
        out
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
