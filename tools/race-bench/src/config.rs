// Copyright 2026 Race Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Trial parameters shared by every primitive in a run.

use std::time::Duration;

use crate::error::{Error, Result};

/// Number of workers contending in each trial.
pub const DEFAULT_THREADS: usize = 5;
/// Number of cells on the race track.
pub const DEFAULT_RACE_LENGTH: usize = 50;
/// Simulated work is drawn from `0..DEFAULT_MAX_DELAY_UNITS` units.
pub const DEFAULT_MAX_DELAY_UNITS: u32 = 10;
/// Length of one simulated work unit.
pub const DEFAULT_DELAY_UNIT: Duration = Duration::from_millis(1);

/// Parameters applied identically to every trial of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceConfig {
    /// Workers spawned per trial.
    pub num_threads: usize,
    /// Track cells; also the number of laps each worker runs.
    pub race_length: usize,
    /// Duration of one delay unit.
    pub delay_unit: Duration,
    /// Exclusive upper bound on delay units per lap.
    pub max_delay_units: u32,
    /// Base seed for worker delay sequences; `None` seeds from the clock.
    pub seed: Option<u64>,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            num_threads: DEFAULT_THREADS,
            race_length: DEFAULT_RACE_LENGTH,
            delay_unit: DEFAULT_DELAY_UNIT,
            max_delay_units: DEFAULT_MAX_DELAY_UNITS,
            seed: None,
        }
    }
}

impl RaceConfig {
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn with_race_length(mut self, race_length: usize) -> Self {
        self.race_length = race_length;
        self
    }

    pub fn with_delay_unit(mut self, delay_unit: Duration) -> Self {
        self.delay_unit = delay_unit;
        self
    }

    pub fn with_max_delay_units(mut self, max_delay_units: u32) -> Self {
        self.max_delay_units = max_delay_units;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Rejects parameters that would make a trial meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(Error::InvalidConfig("num_threads must be at least 1"));
        }
        if self.race_length == 0 {
            return Err(Error::InvalidConfig("race_length must be at least 1"));
        }
        if self.max_delay_units == 0 {
            return Err(Error::InvalidConfig("max_delay_units must be at least 1"));
        }
        Ok(())
    }

    /// Seed for the worker with identity `worker`.
    ///
    /// Without a configured seed the clock supplies one, so two runs differ.
    pub fn worker_seed(&self, worker: usize) -> u64 {
        let base = self.seed.unwrap_or_else(clock_seed);
        base ^ worker as u64
    }
}

fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0)
}
