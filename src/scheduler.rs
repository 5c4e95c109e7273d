//! Bounded parallel job execution with phase barriers.
//!
//! A [`Scheduler`] owns a rayon thread pool of fixed width. Work is grouped
//! into phases: [`Scheduler::phase`] opens a queue, [`Phase::submit`] adds
//! named jobs to it, and [`Phase::barrier`] runs every queued job on the pool
//! and blocks until all of them finished.
//!
//! ```text
//! let mut phase = scheduler.phase("parse");
//! phase.submit("article: a.md", || ...);
//! phase.submit("article: b.md", || ...);
//! let outcome = phase.barrier();          // blocks; jobs ran in parallel
//! ```
//!
//! Jobs return `Ok(true)` when they produced output, `Ok(false)` when their
//! staleness check let them skip, or a [`BuildError`]. A failing job never
//! stops its siblings: the barrier collects every error, in submission order.
//!
//! Because `barrier` consumes the phase, no job of a later phase can exist
//! until the earlier barrier has returned. Jobs may borrow state for the
//! lifetime of their phase, so build state needs no reference counting.

use crate::error::{BuildError, JobError};
use rayon::prelude::*;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// A unit of work queued in a [`Phase`].
pub type Job<'a> = Box<dyn FnOnce() -> Result<bool, BuildError> + Send + 'a>;

/// Fixed-width worker pool.
pub struct Scheduler {
    pool: rayon::ThreadPool,
}

impl Scheduler {
    /// Start a pool with `threads` workers (at least one).
    pub fn new(threads: usize) -> Result<Self, SchedulerError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("folio-worker-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Open a new, empty phase.
    pub fn phase<'a>(&'a self, name: &'static str) -> Phase<'a> {
        Phase {
            scheduler: self,
            name,
            jobs: Vec::new(),
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("threads", &self.threads())
            .finish()
    }
}

/// Jobs queued since the last barrier.
pub struct Phase<'a> {
    scheduler: &'a Scheduler,
    name: &'static str,
    jobs: Vec<(String, Job<'a>)>,
}

impl<'a> Phase<'a> {
    /// Queue a named job. Nothing runs until [`Phase::barrier`].
    pub fn submit<F>(&mut self, name: impl Into<String>, job: F)
    where
        F: FnOnce() -> Result<bool, BuildError> + Send + 'a,
    {
        self.jobs.push((name.into(), Box::new(job)));
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Run every queued job in parallel and wait for all of them.
    pub fn barrier(self) -> PhaseOutcome {
        let Phase {
            scheduler,
            name,
            jobs,
        } = self;
        let submitted = jobs.len();
        let started = Instant::now();

        let results: Vec<(String, Result<bool, BuildError>, Duration)> =
            scheduler.pool.install(|| {
                jobs.into_par_iter()
                    .map(|(job_name, job)| {
                        let job_started = Instant::now();
                        let result = job();
                        (job_name, result, job_started.elapsed())
                    })
                    .collect()
            });

        let mut outcome = PhaseOutcome::default();
        for (job_name, result, elapsed) in results {
            match result {
                Ok(true) => {
                    tracing::debug!(phase = name, job = %job_name, ?elapsed, "job finished");
                    outcome.executed += 1;
                }
                Ok(false) => {
                    tracing::trace!(phase = name, job = %job_name, "job skipped");
                    outcome.skipped += 1;
                }
                Err(error) => {
                    tracing::debug!(phase = name, job = %job_name, ?elapsed, %error, "job failed");
                    outcome.errors.push(JobError {
                        job: job_name,
                        error,
                    });
                }
            }
        }
        tracing::debug!(
            phase = name,
            submitted,
            executed = outcome.executed,
            skipped = outcome.skipped,
            failed = outcome.errors.len(),
            elapsed = ?started.elapsed(),
            "barrier reached"
        );
        outcome
    }
}

/// What happened to the jobs of one phase.
#[derive(Debug, Default)]
pub struct PhaseOutcome {
    /// Jobs that did work.
    pub executed: usize,
    /// Jobs whose inputs were unchanged.
    pub skipped: usize,
    /// Every failure, in submission order.
    pub errors: Vec<JobError>,
}

impl PhaseOutcome {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}
