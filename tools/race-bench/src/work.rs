// Copyright 2026 Race Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Simulated work performed by workers between or inside critical sections.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::RaceConfig;

/// Supplies the length of each lap's simulated work.
pub trait WorkSource: Send {
    fn next_delay(&mut self) -> Duration;
}

/// Uniform `0..max_units` units of `unit` each, from a seeded generator.
#[derive(Debug)]
pub struct RandomWork {
    rng: StdRng,
    unit: Duration,
    max_units: u32,
}

impl RandomWork {
    pub fn new(seed: u64, unit: Duration, max_units: u32) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), unit, max_units: max_units.max(1) }
    }

    /// Generator for `worker`, seeded once for the worker's whole run.
    pub fn for_worker(config: &RaceConfig, worker: usize) -> Self {
        Self::new(config.worker_seed(worker), config.delay_unit, config.max_delay_units)
    }
}

impl WorkSource for RandomWork {
    fn next_delay(&mut self) -> Duration {
        self.unit * self.rng.gen_range(0..self.max_units)
    }
}

/// The same delay every lap; used where timing must not vary.
#[derive(Debug, Clone, Copy)]
pub struct FixedWork(pub Duration);

impl WorkSource for FixedWork {
    fn next_delay(&mut self) -> Duration {
        self.0
    }
}

/// How a worker waits out its simulated work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayMode {
    /// Blocking sleep; the thread leaves the CPU.
    Sleep,
    /// Busy loop on the clock; the thread keeps the CPU.
    Spin,
}

impl DelayMode {
    pub fn pause(self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        match self {
            DelayMode::Sleep => std::thread::sleep(duration),
            DelayMode::Spin => spin_wait(duration),
        }
    }
}

/// Actively waits until `duration` has passed.
pub fn spin_wait(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_work_stays_in_bounds() {
        let mut work = RandomWork::new(7, Duration::from_micros(3), 10);
        for _ in 0..1_000 {
            let delay = work.next_delay();
            assert!(delay < Duration::from_micros(30));
            assert_eq!(delay.as_micros() % 3, 0);
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = RandomWork::new(99, Duration::from_millis(1), 10);
        let mut b = RandomWork::new(99, Duration::from_millis(1), 10);
        let first: Vec<_> = (0..32).map(|_| a.next_delay()).collect();
        let second: Vec<_> = (0..32).map(|_| b.next_delay()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn fixed_work_repeats() {
        let mut work = FixedWork(Duration::from_micros(5));
        assert_eq!(work.next_delay(), Duration::from_micros(5));
        assert_eq!(work.next_delay(), Duration::from_micros(5));
    }

    #[test]
    fn spin_wait_waits_at_least_duration() {
        let start = Instant::now();
        spin_wait(Duration::from_millis(2));
        assert!(start.elapsed() >= Duration::from_millis(2));
    }
}
