//! Build error taxonomy.
//!
//! Every job in a build phase returns [`BuildError`] on failure. The scheduler
//! wraps each one in a [`JobError`] naming the job, and the orchestrator
//! surfaces all of them together as a [`BuildFailure`] so a single build
//! reports every broken source instead of only the first.
//!
//! | Variant | Raised by | Fatal for the run? |
//! |---------|-----------|--------------------|
//! | `Parse` | malformed front matter | no, reported at the barrier |
//! | `Validation` | missing required field, unusable identifier, shared short id | no, reported at the barrier |
//! | `Render` | Markdown or template rendering | no, reported at the barrier |
//! | `Io` | reading a source or writing an output file | no, reported at the barrier |
//! | `Setup` | output directories and symlinks | yes, no job is submitted |

use crate::orchestrator::Stage;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("failed to parse front matter in {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("missing or invalid field `{field}` in {path}")]
    Validation { path: PathBuf, field: &'static str },
    #[error("failed to render {target}: {message}")]
    Render { target: String, message: String },
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("setup failed at '{path}': {source}")]
    Setup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn render(target: impl fmt::Display, message: impl fmt::Display) -> Self {
        BuildError::Render {
            target: target.to_string(),
            message: message.to_string(),
        }
    }

    /// Short label for the taxonomy bucket, used in CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            BuildError::Parse { .. } => "parse",
            BuildError::Validation { .. } => "validation",
            BuildError::Render { .. } => "render",
            BuildError::Io { .. } => "io",
            BuildError::Setup { .. } => "setup",
        }
    }
}

/// A [`BuildError`] attributed to the named job that produced it.
#[derive(Error, Debug)]
#[error("{job}: {error}")]
pub struct JobError {
    pub job: String,
    #[source]
    pub error: BuildError,
}

/// A build that ended in [`Stage::Failed`].
///
/// Carries every error collected at the failing barrier (or the single
/// setup error) along with the stage trace, so callers can tell which
/// phases ran.
#[derive(Debug)]
pub struct BuildFailure {
    pub trace: Vec<Stage>,
    pub errors: Vec<JobError>,
}

impl BuildFailure {
    /// Whether the failure happened before any job was submitted.
    pub fn is_setup_failure(&self) -> bool {
        !self.trace.contains(&Stage::Phase1Submit)
    }
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "build failed with {} error(s)", self.errors.len())?;
        for err in &self.errors {
            write!(f, "\n  {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BuildFailure {}
