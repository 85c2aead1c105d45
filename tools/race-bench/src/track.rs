// Copyright 2026 Race Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared race state: the track itself plus the instrumentation that lets a
//! trial check its own exclusion and completion guarantees.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Marker for a cell nobody has written during the current trial.
pub const UNWRITTEN: usize = usize::MAX;

/// Fixed-length sequence of cells holding the id of the last writer.
///
/// Cells are atomics so that the track can be lent to every worker; the
/// primitive under test is still what keeps writes from overlapping, and
/// [`CriticalProbe`] checks that it does.
#[derive(Debug)]
pub struct RaceTrack {
    cells: Box<[AtomicUsize]>,
}

impl RaceTrack {
    /// Creates a track of `len` unwritten cells.
    pub fn new(len: usize) -> Self {
        Self { cells: (0..len).map(|_| AtomicUsize::new(UNWRITTEN)).collect() }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Writes `worker` into cell `lap`.
    ///
    /// # Panics
    ///
    /// Panics if `lap` is past the end of the track.
    pub fn stamp(&self, lap: usize, worker: usize) {
        self.cells[lap].store(worker, Ordering::Relaxed);
    }

    /// Marks every cell unwritten.
    pub fn reset(&self) {
        for cell in self.cells.iter() {
            cell.store(UNWRITTEN, Ordering::Relaxed);
        }
    }

    /// Copies the current cell values.
    pub fn snapshot(&self) -> Vec<usize> {
        self.cells.iter().map(|cell| cell.load(Ordering::Relaxed)).collect()
    }
}

/// Occupancy counter wrapped around each critical section.
///
/// `enter` and `leave` bracket the track write; the peak must stay at one
/// for any primitive that actually provides mutual exclusion.
#[derive(Debug, Default)]
pub struct CriticalProbe {
    inside: AtomicUsize,
    peak: AtomicUsize,
}

impl CriticalProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) {
        let now = self.inside.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    pub fn leave(&self) {
        self.inside.fetch_sub(1, Ordering::SeqCst);
    }

    /// Highest number of workers observed inside at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.inside.store(0, Ordering::SeqCst);
        self.peak.store(0, Ordering::SeqCst);
    }
}

/// Counts workers that returned normally from their routine.
#[derive(Debug, Default)]
pub struct Completion {
    done: AtomicUsize,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one finished worker.
    pub fn signal(&self) {
        self.done.fetch_add(1, Ordering::AcqRel);
    }

    pub fn count(&self) -> usize {
        self.done.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.done.store(0, Ordering::Release);
    }
}
