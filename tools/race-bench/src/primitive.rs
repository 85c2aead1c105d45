// Copyright 2026 Race Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Synchronization primitives raced against each other
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests below, trial tests in `tests/race_trials.rs`
//!
//! INVARIANTS:
//! - Every primitive admits at most one worker to the track write at a time
//! - `Primitive::ALL` fixes the order trials run in

use std::fmt;

use parking_lot::{Condvar, Mutex};
use race_sync::RawSpinLock;
use serde::Serialize;

use crate::error::{Error, Result};

/// Primitive under test for one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
pub enum Primitive {
    Mutex,
    Semaphore,
    SemaphoreSlim,
    Barrier,
    SpinLock,
    SpinWait,
    Monitor,
}

impl Primitive {
    /// Every primitive, in the order a full run visits them.
    pub const ALL: [Primitive; 7] = [
        Primitive::Mutex,
        Primitive::Semaphore,
        Primitive::SemaphoreSlim,
        Primitive::Barrier,
        Primitive::SpinLock,
        Primitive::SpinWait,
        Primitive::Monitor,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Primitive::Mutex => "Mutex",
            Primitive::Semaphore => "Semaphore",
            Primitive::SemaphoreSlim => "SemaphoreSlim",
            Primitive::Barrier => "Barrier",
            Primitive::SpinLock => "SpinLock",
            Primitive::SpinWait => "SpinWait",
            Primitive::Monitor => "Monitor",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Counting semaphore built from a mutex-protected permit count and a
/// condition variable.
#[derive(Debug)]
pub struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self { permits: Mutex::new(permits), available: Condvar::new() }
    }

    /// Blocks until a permit is free and takes it.
    ///
    /// The permit goes back when the returned guard is dropped.
    pub fn wait(&self) -> SemaphorePermit<'_> {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
        SemaphorePermit { sema: self }
    }

    /// Returns one permit and wakes a waiter.
    pub fn signal(&self) {
        *self.permits.lock() += 1;
        self.available.notify_one();
    }

    pub fn available(&self) -> usize {
        *self.permits.lock()
    }
}

/// RAII permit of a [`Semaphore`].
#[derive(Debug)]
pub struct SemaphorePermit<'a> {
    sema: &'a Semaphore,
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.sema.signal();
    }
}

/// Semaphore whose permit count can never exceed its initial capacity.
///
/// Permits are returned explicitly; an unmatched release is reported
/// instead of silently growing the count.
#[derive(Debug)]
pub struct BoundedSemaphore {
    capacity: usize,
    permits: Mutex<usize>,
    available: Condvar,
}

impl BoundedSemaphore {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, permits: Mutex::new(capacity), available: Condvar::new() }
    }

    pub fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    pub fn release(&self) -> Result<()> {
        let mut permits = self.permits.lock();
        if *permits == self.capacity {
            return Err(Error::SemaphoreOverflow { capacity: self.capacity });
        }
        *permits += 1;
        drop(permits);
        self.available.notify_one();
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        *self.permits.lock()
    }
}

/// Reusable rendezvous for a fixed number of parties that can be broken.
///
/// Once broken, every current and future [`wait`](Self::wait) returns
/// [`Error::BarrierBroken`] instead of blocking, so one party leaving early
/// cannot strand the others.
#[derive(Debug)]
pub struct RaceBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

#[derive(Debug, Default)]
struct BarrierState {
    arrived: usize,
    generation: u64,
    broken: bool,
}

impl RaceBarrier {
    pub fn new(parties: usize) -> Self {
        Self { parties, state: Mutex::new(BarrierState::default()), released: Condvar::new() }
    }

    /// Blocks until all parties arrived; `Ok(true)` for exactly one party
    /// (the last to arrive) per generation.
    pub fn wait(&self) -> Result<bool> {
        let mut state = self.state.lock();
        if state.broken {
            return Err(Error::BarrierBroken { parties: self.parties });
        }
        state.arrived += 1;
        if state.arrived >= self.parties {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            drop(state);
            self.released.notify_all();
            return Ok(true);
        }
        let generation = state.generation;
        while state.generation == generation && !state.broken {
            self.released.wait(&mut state);
        }
        if state.generation == generation {
            return Err(Error::BarrierBroken { parties: self.parties });
        }
        Ok(false)
    }

    /// Wakes every waiter with an error and fails all later waits.
    pub fn break_barrier(&self) {
        self.state.lock().broken = true;
        self.released.notify_all();
    }

    pub fn is_broken(&self) -> bool {
        self.state.lock().broken
    }
}

/// Monitor pattern over a plain mutex: all access to `T` happens inside
/// [`enter`](Self::enter).
#[derive(Debug, Default)]
pub struct Monitor<T> {
    state: Mutex<T>,
}

impl<T> Monitor<T> {
    pub fn new(state: T) -> Self {
        Self { state: Mutex::new(state) }
    }

    /// Runs `section` with exclusive access to the monitor state.
    pub fn enter<R>(&self, section: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.state.lock();
        section(&mut guard)
    }
}

/// One instance of every primitive, shared by all workers of a trial.
#[derive(Debug)]
pub struct Gates {
    pub mutex: Mutex<()>,
    pub semaphore: Semaphore,
    pub semaphore_slim: BoundedSemaphore,
    pub barrier: RaceBarrier,
    pub spin: RawSpinLock,
    pub monitor: Monitor<()>,
}

impl Gates {
    /// Gates for `parties` workers; the barrier waits for all of them.
    pub fn new(parties: usize) -> Self {
        Self {
            mutex: Mutex::new(()),
            semaphore: Semaphore::new(1),
            semaphore_slim: BoundedSemaphore::new(1),
            barrier: RaceBarrier::new(parties),
            spin: RawSpinLock::new(),
            monitor: Monitor::new(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn labels_follow_run_order() {
        let labels: Vec<_> = Primitive::ALL.iter().map(|p| p.label()).collect();
        assert_eq!(
            labels,
            ["Mutex", "Semaphore", "SemaphoreSlim", "Barrier", "SpinLock", "SpinWait", "Monitor"]
        );
    }

    #[test]
    fn permit_returns_on_drop() {
        let sema = Semaphore::new(2);
        let first = sema.wait();
        let second = sema.wait();
        assert_eq!(sema.available(), 0);
        drop(first);
        assert_eq!(sema.available(), 1);
        drop(second);
        assert_eq!(sema.available(), 2);
    }

    #[test]
    fn single_permit_serializes_holders() {
        let sema = Semaphore::new(1);
        let inside = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let _permit = sema.wait();
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                });
            }
        });
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(sema.available(), 1);
    }

    #[test]
    fn bounded_release_past_capacity_fails() {
        let sema = BoundedSemaphore::new(1);
        assert!(matches!(sema.release(), Err(Error::SemaphoreOverflow { capacity: 1 })));
        sema.acquire();
        assert_eq!(sema.available(), 0);
        sema.release().expect("matched release");
        assert_eq!(sema.available(), sema.capacity());
    }

    #[test]
    fn barrier_elects_one_leader_per_generation() {
        let barrier = RaceBarrier::new(3);
        let leaders = AtomicUsize::new(0);
        thread::scope(|scope| {
            for _ in 0..3 {
                scope.spawn(|| {
                    for _ in 0..10 {
                        if barrier.wait().expect("intact barrier") {
                            leaders.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });
        assert_eq!(leaders.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn broken_barrier_releases_waiters() {
        let barrier = RaceBarrier::new(3);
        thread::scope(|scope| {
            let waiters: Vec<_> = (0..2).map(|_| scope.spawn(|| barrier.wait())).collect();
            while barrier.state.lock().arrived < 2 {
                thread::yield_now();
            }
            barrier.break_barrier();
            for waiter in waiters {
                let result = waiter.join().expect("waiter thread");
                assert!(matches!(result, Err(Error::BarrierBroken { parties: 3 })));
            }
        });
        assert!(barrier.is_broken());
        assert!(matches!(barrier.wait(), Err(Error::BarrierBroken { .. })));
    }

    #[test]
    fn monitor_section_sees_previous_writes() {
        let monitor = Monitor::new(Vec::new());
        thread::scope(|scope| {
            for id in 0..4 {
                let monitor = &monitor;
                scope.spawn(move || monitor.enter(|log| log.push(id)));
            }
        });
        let mut seen = monitor.enter(|log| log.clone());
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }
}
