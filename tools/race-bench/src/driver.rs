// Copyright 2026 Race Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Benchmark driver timing each primitive under identical contention
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests below, end-to-end runs in `tests/race_trials.rs`
//!
//! INVARIANTS:
//! - Trials run strictly one after another in `Primitive::ALL` order
//! - The start instant is taken before the first worker is spawned
//! - Elapsed time is read only after every worker has been joined
//! - The first failing trial aborts the run; earlier reports stay written

use std::cell::Cell;
use std::io::Write;
use std::thread;
use std::time::Instant;

use crate::config::RaceConfig;
use crate::error::{Error, Result};
use crate::primitive::{Gates, Primitive};
use crate::report::{start_line, ReportFormat, TrialReport};
use crate::track::{Completion, CriticalProbe, RaceTrack};
use crate::work::{RandomWork, WorkSource};
use crate::worker::{run_worker, Lane};

/// Lifecycle of a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    Idle,
    Spawning,
    Running,
    Joined,
    Reported,
}

/// Work source factory used when none is supplied.
pub type DefaultWork = fn(&RaceConfig, usize) -> RandomWork;

/// Runs trials and writes their reports.
///
/// `F` builds each worker's [`WorkSource`] on the worker's own thread.
pub struct RaceDriver<F = DefaultWork> {
    config: RaceConfig,
    format: ReportFormat,
    work: F,
    track: RaceTrack,
    probe: CriticalProbe,
    completion: Completion,
    phase: Cell<TrialPhase>,
}

impl RaceDriver<DefaultWork> {
    /// Driver with seeded random work per worker.
    pub fn new(config: RaceConfig) -> Result<Self> {
        Self::with_work(config, RandomWork::for_worker as DefaultWork)
    }
}

impl<F, W> RaceDriver<F>
where
    F: Fn(&RaceConfig, usize) -> W + Sync,
    W: WorkSource,
{
    /// Driver whose workers take their delays from `work`.
    pub fn with_work(config: RaceConfig, work: F) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            track: RaceTrack::new(config.race_length),
            probe: CriticalProbe::new(),
            completion: Completion::new(),
            phase: Cell::new(TrialPhase::Idle),
            format: ReportFormat::Text,
            config,
            work,
        })
    }

    pub fn format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn phase(&self) -> TrialPhase {
        self.phase.get()
    }

    /// Runs every primitive in the fixed order.
    pub fn run_all<O: Write>(&mut self, out: &mut O) -> Result<Vec<TrialReport>> {
        self.run_selected(&Primitive::ALL, out)
    }

    /// Runs `primitives` in the given order, stopping at the first failure.
    pub fn run_selected<O: Write>(
        &mut self,
        primitives: &[Primitive],
        out: &mut O,
    ) -> Result<Vec<TrialReport>> {
        let mut reports = Vec::with_capacity(primitives.len());
        for &primitive in primitives {
            reports.push(self.run_trial(primitive, out)?);
        }
        Ok(reports)
    }

    /// Spawns the workers for `primitive`, waits for all of them and reports.
    pub fn run_trial<O: Write>(&mut self, primitive: Primitive, out: &mut O) -> Result<TrialReport> {
        let threads = self.config.num_threads;
        log::info!("{primitive}: starting trial with {threads} workers");

        self.enter(TrialPhase::Spawning, primitive);
        if self.format == ReportFormat::Text {
            writeln!(out, "{}", start_line(primitive))?;
            out.flush()?;
        }
        self.track.reset();
        self.probe.reset();
        self.completion.reset();
        let gates = Gates::new(threads);

        let start = Instant::now();
        let joined = self.spawn_and_join(primitive, &gates);
        let elapsed = start.elapsed();
        if let Err(err) = joined {
            log::warn!("{primitive}: trial aborted: {err}");
            self.enter(TrialPhase::Idle, primitive);
            return Err(err);
        }
        self.enter(TrialPhase::Joined, primitive);

        let completed = self.completion.count();
        if completed != threads {
            log::warn!("{primitive}: {completed} of {threads} workers signalled completion");
            self.enter(TrialPhase::Idle, primitive);
            return Err(Error::IncompleteTrial { primitive, expected: threads, completed });
        }

        let report = TrialReport {
            primitive,
            track: self.track.snapshot(),
            elapsed,
            completed,
            peak_occupancy: self.probe.peak(),
        };
        report.write_to(out, self.format)?;
        out.flush()?;
        self.enter(TrialPhase::Reported, primitive);
        log::info!("{primitive}: finished in {elapsed:?}");

        self.enter(TrialPhase::Idle, primitive);
        Ok(report)
    }

    fn spawn_and_join(&self, primitive: Primitive, gates: &Gates) -> Result<()> {
        let lane = Lane {
            track: &self.track,
            gates,
            probe: &self.probe,
            completion: &self.completion,
        };
        let (config, work) = (&self.config, &self.work);

        thread::scope(|scope| -> Result<()> {
            let mut handles = Vec::with_capacity(config.num_threads);
            for id in 0..config.num_threads {
                let handle = thread::Builder::new()
                    .name(format!("racer-{id}"))
                    .spawn_scoped(scope, move || {
                        let mut source = work(config, id);
                        run_worker(id, primitive, lane, &mut source)
                    })?;
                handles.push(handle);
            }
            self.enter(TrialPhase::Running, primitive);

            // A panic outranks the errors it caused in the other workers,
            // e.g. a broken barrier.
            let mut first_err = None;
            for (id, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        first_err.get_or_insert(err);
                    }
                    Err(_) => {
                        log::error!("{primitive}: worker {id} panicked");
                        if !matches!(first_err, Some(Error::WorkerPanicked { .. })) {
                            first_err = Some(Error::WorkerPanicked { primitive, worker: id });
                        }
                    }
                }
            }
            first_err.map_or(Ok(()), Err)
        })
    }

    fn enter(&self, phase: TrialPhase, primitive: Primitive) {
        log::debug!("{primitive}: {:?} -> {phase:?}", self.phase.get());
        self.phase.set(phase);
    }
}
