//! The article record and its front matter.
//!
//! [`FrontMatter`] is what an author writes; [`Article`] is what the rest of
//! the build works with. Conversion validates the required fields and turns
//! the TOML datetime into a UTC timestamp.
//!
//! ```toml
//! title = "Hello"                  # required, non-empty
//! published_at = 2020-01-01        # required; date, local or offset datetime
//! location = "Berlin"              # optional
//! short_id = "xy"                  # optional, emits a/<short_id>
//! ```
//!
//! `tiny_slug` is accepted as an alias for `short_id`.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use toml::value::{Datetime, Offset};

/// One parsed content unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Unique key derived from the source filename; also the URL path.
    pub identifier: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Secondary short alias served from `a/<short_id>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
    /// Rendered HTML body.
    pub content: String,
}

impl Article {
    /// Calendar year of publication, used for archive grouping.
    pub fn year(&self) -> i32 {
        use chrono::Datelike;
        self.published_at.year()
    }

    /// Publication date as `YYYY-MM-DD`.
    pub fn published_date(&self) -> String {
        self.published_at.format("%Y-%m-%d").to_string()
    }
}

/// Raw front matter as decoded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub published_at: Option<Datetime>,
    pub location: Option<String>,
    #[serde(alias = "tiny_slug")]
    pub short_id: Option<String>,
}

/// Why front matter could not become an [`Article`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontMatterProblem {
    /// A required field is absent or empty.
    Missing(&'static str),
    /// A field is present but unusable.
    Invalid { field: &'static str, reason: String },
}

impl FrontMatter {
    /// Check required fields and build the article.
    ///
    /// `content` is the already-rendered HTML body.
    pub fn into_article(
        self,
        identifier: String,
        content: String,
    ) -> Result<Article, FrontMatterProblem> {
        let (title, published_at) = self.validate()?;
        Ok(Article {
            identifier,
            title,
            published_at,
            location: self.location.filter(|l| !l.trim().is_empty()),
            short_id: self.short_id.filter(|s| !s.trim().is_empty()),
            content,
        })
    }

    /// Required-field validation without consuming the record.
    pub fn validate(&self) -> Result<(String, DateTime<Utc>), FrontMatterProblem> {
        let title = match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => return Err(FrontMatterProblem::Missing("title")),
        };
        let published_at = match &self.published_at {
            Some(dt) => to_utc(dt).map_err(|reason| FrontMatterProblem::Invalid {
                field: "published_at",
                reason,
            })?,
            None => return Err(FrontMatterProblem::Missing("published_at")),
        };
        if let Some(short_id) = &self.short_id
            && !short_id.trim().is_empty()
            && !crate::naming::is_url_safe(short_id)
        {
            return Err(FrontMatterProblem::Invalid {
                field: "short_id",
                reason: format!("'{short_id}' is not URL-safe"),
            });
        }
        Ok((title, published_at))
    }
}

/// Convert a TOML datetime to UTC.
///
/// A bare date means midnight; a datetime without an offset is read as UTC.
pub fn to_utc(dt: &Datetime) -> Result<DateTime<Utc>, String> {
    let date = dt.date.ok_or_else(|| "a date is required".to_string())?;
    let date = NaiveDate::from_ymd_opt(date.year.into(), date.month.into(), date.day.into())
        .ok_or_else(|| format!("{dt} is not a valid date"))?;

    let time = match dt.time {
        Some(t) => {
            NaiveTime::from_hms_nano_opt(t.hour.into(), t.minute.into(), t.second.into(), t.nanosecond)
                .ok_or_else(|| format!("{dt} is not a valid time"))?
        }
        None => NaiveTime::default(),
    };

    let offset_seconds = match dt.offset {
        Some(Offset::Custom { minutes }) => i32::from(minutes) * 60,
        Some(Offset::Z) | None => 0,
    };
    let offset =
        FixedOffset::east_opt(offset_seconds).ok_or_else(|| format!("{dt} has an invalid offset"))?;

    date.and_time(time)
        .and_local_timezone(offset)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| format!("{dt} is ambiguous"))
}
