//! TOML front matter.
//!
//! Article sources open with a TOML block fenced by `+++` lines, followed by
//! the Markdown body:
//!
//! ```text
//! +++
//! title = "Hello"
//! published_at = 2020-01-01T00:00:00Z
//! +++
//!
//! # Hi
//! ```
//!
//! [`parse`] decodes the block into any serde type the caller picks and hands
//! back the body untouched.

use serde::de::DeserializeOwned;
use std::path::Path;
use thiserror::Error;

const DELIMITER: &str = "+++";

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no front matter: file must start with a `+++` line")]
    Missing,
    #[error("front matter is not closed by a `+++` line")]
    Unterminated,
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Split a source into its front matter block and body.
pub fn split(content: &str) -> Result<(&str, &str), FrontmatterError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.split_inclusive('\n');

    let first = lines.next().ok_or(FrontmatterError::Missing)?;
    if first.trim_end() != DELIMITER {
        return Err(FrontmatterError::Missing);
    }

    let start = first.len();
    let mut offset = start;
    for line in lines {
        if line.trim_end() == DELIMITER {
            return Ok((&content[start..offset], &content[offset + line.len()..]));
        }
        offset += line.len();
    }
    Err(FrontmatterError::Unterminated)
}

/// Decode the front matter of `content` into `T`, returning it with the body.
pub fn parse<T: DeserializeOwned>(content: &str) -> Result<(T, String), FrontmatterError> {
    let (front, body) = split(content)?;
    let data: T = toml::from_str(front)?;
    Ok((data, body.to_string()))
}

/// Read `path` and decode its front matter.
pub fn parse_file<T: DeserializeOwned>(path: &Path) -> Result<(T, String), FrontmatterError> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}
