//! The article registry.
//!
//! An ordered collection of [`Article`]s keyed by identifier, plus the
//! "changed since last render" flag the derived views test for staleness.
//!
//! # Guard discipline
//!
//! The orchestrator keeps the registry behind one `Mutex` for the whole
//! parse phase. Parse jobs take the lock only around
//! [`ArticleRegistry::insert_or_replace`], which also raises the changed
//! flag; parsing and rendering happen outside it. Once the phase barrier
//! has returned, the orchestrator reaches the registry through
//! `Mutex::get_mut`, so derived views read it without locking.
//!
//! # Lifecycle
//!
//! The registry outlives a single build: unchanged articles stay visible to
//! the home page, archive and feed without being reparsed. Between process
//! runs it is snapshotted to JSON in the state directory.

use crate::article::Article;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;

/// Name of the registry snapshot within the state directory.
const SNAPSHOT_FILENAME: &str = "articles.json";

/// Snapshot format version. Bump to discard old snapshots.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ArticleRegistry {
    articles: Vec<Article>,
    /// Raised by every insert or removal, cleared after the derived views
    /// rendered successfully.
    #[serde(skip)]
    changed: bool,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    #[serde(flatten)]
    registry: ArticleRegistry,
}

impl ArticleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `article`, or overwrite the entry with the same identifier in
    /// place so it keeps its position. Marks the registry changed.
    pub fn insert_or_replace(&mut self, article: Article) {
        self.changed = true;
        match self
            .articles
            .iter_mut()
            .find(|a| a.identifier == article.identifier)
        {
            Some(existing) => *existing = article,
            None => self.articles.push(article),
        }
    }

    /// Drop every article whose identifier is not in `live`. Returns the
    /// removed identifiers.
    pub fn retain_identifiers(&mut self, live: &HashSet<String>) -> Vec<String> {
        let mut removed = Vec::new();
        self.articles.retain(|a| {
            let keep = live.contains(&a.identifier);
            if !keep {
                removed.push(a.identifier.clone());
            }
            keep
        });
        if !removed.is_empty() {
            self.changed = true;
        }
        removed
    }

    /// Stable sort, most recently published first.
    pub fn sort_descending_by_publish_date(&mut self) {
        self.articles
            .sort_by(|a, b| b.published_at.cmp(&a.published_at));
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn get(&self, identifier: &str) -> Option<&Article> {
        self.articles.iter().find(|a| a.identifier == identifier)
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Short ids claimed by more than one article, each with the claiming
    /// identifiers in registry order. Sorted by short id.
    pub fn short_id_conflicts(&self) -> Vec<(&str, Vec<&str>)> {
        let mut claims: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for article in &self.articles {
            if let Some(short_id) = &article.short_id {
                claims
                    .entry(short_id.as_str())
                    .or_default()
                    .push(article.identifier.as_str());
            }
        }
        claims
            .into_iter()
            .filter(|(_, identifiers)| identifiers.len() > 1)
            .collect()
    }

    /// Whether the registry changed since the derived views last rendered.
    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn clear_changed(&mut self) {
        self.changed = false;
    }

    /// Load the snapshot from the state directory. `None` when it is
    /// missing, corrupt or from another snapshot version.
    pub fn load(state_dir: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(state_dir.join(SNAPSHOT_FILENAME)).ok()?;
        serde_json::from_str::<Snapshot>(&content)
            .ok()
            .filter(|s| s.version == SNAPSHOT_VERSION)
            .map(|s| s.registry)
    }

    /// Save the snapshot to the state directory.
    pub fn save(&self, state_dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(state_dir)?;
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            registry: self.clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(state_dir.join(SNAPSHOT_FILENAME), json)
    }
}

/// Articles published in one calendar year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearGroup<'a> {
    pub year: i32,
    pub articles: Vec<&'a Article>,
}

/// Partition articles into runs of the same publication year.
///
/// Groups and the articles inside them keep the input order, so a
/// newest-first registry yields newest-first years.
pub fn group_by_year(articles: &[Article]) -> Vec<YearGroup<'_>> {
    let mut years: Vec<YearGroup<'_>> = Vec::new();
    for article in articles {
        match years.last_mut() {
            Some(group) if group.year == article.year() => group.articles.push(article),
            _ => years.push(YearGroup {
                year: article.year(),
                articles: vec![article],
            }),
        }
    }
    years
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::article;
    use tempfile::TempDir;

    fn ids(registry: &ArticleRegistry) -> Vec<&str> {
        registry
            .articles()
            .iter()
            .map(|a| a.identifier.as_str())
            .collect()
    }

    #[test]
    fn insert_appends_new_identifiers() {
        let mut registry = ArticleRegistry::new();
        registry.insert_or_replace(article("a", "2020-01-01"));
        registry.insert_or_replace(article("b", "2021-01-01"));
        assert_eq!(ids(&registry), vec!["a", "b"]);
        assert!(registry.changed());
    }

    #[test]
    fn replace_keeps_position() {
        let mut registry = ArticleRegistry::new();
        registry.insert_or_replace(article("a", "2020-01-01"));
        registry.insert_or_replace(article("b", "2021-01-01"));
        registry.insert_or_replace(article("c", "2022-01-01"));

        let mut updated = article("b", "2021-01-01");
        updated.title = "B, revised".into();
        registry.insert_or_replace(updated);

        assert_eq!(ids(&registry), vec!["a", "b", "c"]);
        assert_eq!(registry.get("b").unwrap().title, "B, revised");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn sort_puts_newest_first() {
        let mut registry = ArticleRegistry::new();
        registry.insert_or_replace(article("old", "2010-05-01"));
        registry.insert_or_replace(article("new", "2022-01-01"));
        registry.insert_or_replace(article("mid", "2015-03-03"));
        registry.sort_descending_by_publish_date();

        assert_eq!(ids(&registry), vec!["new", "mid", "old"]);
        for pair in registry.articles().windows(2) {
            assert!(pair[0].published_at >= pair[1].published_at);
        }
    }

    #[test]
    fn sort_is_stable_for_equal_dates() {
        let mut registry = ArticleRegistry::new();
        registry.insert_or_replace(article("first", "2020-01-01"));
        registry.insert_or_replace(article("second", "2020-01-01"));
        registry.insert_or_replace(article("newest", "2021-01-01"));
        registry.sort_descending_by_publish_date();

        assert_eq!(ids(&registry), vec!["newest", "first", "second"]);
    }

    #[test]
    fn retain_drops_vanished_articles() {
        let mut registry = ArticleRegistry::new();
        registry.insert_or_replace(article("a", "2020-01-01"));
        registry.insert_or_replace(article("b", "2020-01-02"));
        registry.clear_changed();

        let live: HashSet<String> = ["a".to_string()].into_iter().collect();
        let removed = registry.retain_identifiers(&live);

        assert_eq!(removed, vec!["b"]);
        assert_eq!(ids(&registry), vec!["a"]);
        assert!(registry.changed());
    }

    #[test]
    fn retain_without_removals_leaves_flag_alone() {
        let mut registry = ArticleRegistry::new();
        registry.insert_or_replace(article("a", "2020-01-01"));
        registry.clear_changed();

        let live: HashSet<String> = ["a".to_string()].into_iter().collect();
        assert!(registry.retain_identifiers(&live).is_empty());
        assert!(!registry.changed());
    }

    #[test]
    fn group_by_year_preserves_order() {
        let mut registry = ArticleRegistry::new();
        for (id, date) in [
            ("d", "2021-06-01"),
            ("c", "2021-01-01"),
            ("b", "2019-12-31"),
            ("a", "2019-01-01"),
            ("z", "2011-01-01"),
        ] {
            registry.insert_or_replace(article(id, date));
        }
        registry.sort_descending_by_publish_date();

        let years = group_by_year(registry.articles());
        let shape: Vec<(i32, Vec<&str>)> = years
            .iter()
            .map(|g| {
                (
                    g.year,
                    g.articles.iter().map(|a| a.identifier.as_str()).collect(),
                )
            })
            .collect();
        assert_eq!(
            shape,
            vec![
                (2021, vec!["d", "c"]),
                (2019, vec!["b", "a"]),
                (2011, vec!["z"]),
            ]
        );

        let total: usize = years.iter().map(|g| g.articles.len()).sum();
        assert_eq!(total, registry.len());
    }

    #[test]
    fn group_by_year_empty() {
        assert!(group_by_year(&[]).is_empty());
    }

    #[test]
    fn snapshot_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let mut registry = ArticleRegistry::new();
        registry.insert_or_replace(article("a", "2020-01-01"));
        registry.save(tmp.path()).unwrap();

        let loaded = ArticleRegistry::load(tmp.path()).unwrap();
        assert_eq!(loaded.articles(), registry.articles());
        assert!(!loaded.changed());
    }

    #[test]
    fn load_corrupt_snapshot_returns_none() {
        let tmp = TempDir::new().unwrap();
        assert!(ArticleRegistry::load(tmp.path()).is_none());
        std::fs::write(tmp.path().join(SNAPSHOT_FILENAME), "not json").unwrap();
        assert!(ArticleRegistry::load(tmp.path()).is_none());
    }

    #[test]
    fn load_wrong_version_returns_none() {
        let tmp = TempDir::new().unwrap();
        let json = format!(
            r#"{{"version": {}, "articles": []}}"#,
            SNAPSHOT_VERSION + 1
        );
        std::fs::write(tmp.path().join(SNAPSHOT_FILENAME), json).unwrap();
        assert!(ArticleRegistry::load(tmp.path()).is_none());
    }

    #[test]
    fn shared_short_id_is_a_conflict() {
        let mut registry = ArticleRegistry::new();
        let mut a = article("a", "2020-01-01");
        a.short_id = Some("xy".into());
        let mut b = article("b", "2020-01-02");
        b.short_id = Some("xy".into());
        let mut c = article("c", "2020-01-03");
        c.short_id = Some("zz".into());
        for entry in [a, b, c, article("d", "2020-01-04")] {
            registry.insert_or_replace(entry);
        }

        assert_eq!(registry.short_id_conflicts(), vec![("xy", vec!["a", "b"])]);
    }

    #[test]
    fn distinct_short_ids_do_not_conflict() {
        let mut registry = ArticleRegistry::new();
        let mut a = article("a", "2020-01-01");
        a.short_id = Some("xy".into());
        registry.insert_or_replace(a);
        registry.insert_or_replace(article("b", "2020-01-02"));
        assert!(registry.short_id_conflicts().is_empty());
    }
}
