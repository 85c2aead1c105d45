// Copyright 2026 Race Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! The lap loop every worker runs against the primitive under test.

use race_sync::RawSpinLock;

use crate::error::Result;
use crate::primitive::{BoundedSemaphore, Gates, Primitive, RaceBarrier};
use crate::track::{Completion, CriticalProbe, RaceTrack};
use crate::work::{DelayMode, WorkSource};

/// Shared state a worker borrows for the duration of one trial.
#[derive(Debug, Clone, Copy)]
pub struct Lane<'a> {
    pub track: &'a RaceTrack,
    pub gates: &'a Gates,
    pub probe: &'a CriticalProbe,
    pub completion: &'a Completion,
}

impl Lane<'_> {
    fn stamp(&self, lap: usize, worker: usize) {
        self.probe.enter();
        self.track.stamp(lap, worker);
        self.probe.leave();
    }
}

/// Holds the raw spin lock; dropping it releases the lock, also on unwind.
struct SpinHeld<'a>(&'a RawSpinLock);

impl<'a> SpinHeld<'a> {
    fn acquire(lock: &'a RawSpinLock) -> Self {
        lock.acquire();
        Self(lock)
    }
}

impl Drop for SpinHeld<'_> {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// One permit of a [`BoundedSemaphore`]. [`release`](Self::release) hands it
/// back and reports overflow; a permit dropped without it (unwind) is
/// returned on a best-effort basis.
struct SlimPermit<'a>(Option<&'a BoundedSemaphore>);

impl<'a> SlimPermit<'a> {
    fn acquire(sema: &'a BoundedSemaphore) -> Self {
        sema.acquire();
        Self(Some(sema))
    }

    fn release(mut self) -> Result<()> {
        self.0.take().map_or(Ok(()), BoundedSemaphore::release)
    }
}

impl Drop for SlimPermit<'_> {
    fn drop(&mut self) {
        if let Some(sema) = self.0.take() {
            if let Err(err) = sema.release() {
                log::warn!("dropping semaphore permit: {err}");
            }
        }
    }
}

/// Breaks the barrier if the worker leaves before its last lap.
struct BarrierExit<'a>(Option<&'a RaceBarrier>);

impl<'a> BarrierExit<'a> {
    fn arm(primitive: Primitive, barrier: &'a RaceBarrier) -> Self {
        Self((primitive == Primitive::Barrier).then_some(barrier))
    }

    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for BarrierExit<'_> {
    fn drop(&mut self) {
        if let Some(barrier) = self.0 {
            barrier.break_barrier();
        }
    }
}

/// Runs one lap per track cell for `worker`, then signals completion.
///
/// Completion is signalled only when every lap finished; an error or a panic
/// leaves the counter untouched. Every primitive is given back if the lap
/// unwinds, and a worker leaving the barrier trial early breaks the barrier.
pub fn run_worker<W: WorkSource>(
    worker: usize,
    primitive: Primitive,
    lane: Lane<'_>,
    work: &mut W,
) -> Result<()> {
    let gates = lane.gates;
    let exit = BarrierExit::arm(primitive, &gates.barrier);
    for lap in 0..lane.track.len() {
        match primitive {
            Primitive::Mutex => {
                let _guard = gates.mutex.lock();
                lane.stamp(lap, worker);
                DelayMode::Sleep.pause(work.next_delay());
            }
            Primitive::Semaphore => {
                let _permit = gates.semaphore.wait();
                lane.stamp(lap, worker);
                DelayMode::Sleep.pause(work.next_delay());
            }
            Primitive::SemaphoreSlim => {
                let permit = SlimPermit::acquire(&gates.semaphore_slim);
                lane.stamp(lap, worker);
                DelayMode::Sleep.pause(work.next_delay());
                permit.release()?;
            }
            Primitive::Barrier => {
                // One leader per generation writes; the next generation
                // cannot open until that leader arrives again.
                if gates.barrier.wait()? {
                    lane.stamp(lap, worker);
                }
                DelayMode::Sleep.pause(work.next_delay());
            }
            Primitive::SpinLock => {
                let _held = SpinHeld::acquire(&gates.spin);
                lane.stamp(lap, worker);
                DelayMode::Sleep.pause(work.next_delay());
            }
            Primitive::SpinWait => {
                let held = SpinHeld::acquire(&gates.spin);
                lane.stamp(lap, worker);
                drop(held);
                DelayMode::Spin.pause(work.next_delay());
            }
            Primitive::Monitor => {
                gates.monitor.enter(|_| lane.stamp(lap, worker));
                DelayMode::Sleep.pause(work.next_delay());
            }
        }
    }
    exit.disarm();
    log::debug!("worker {worker} finished {} laps with {primitive}", lane.track.len());
    lane.completion.signal();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::work::FixedWork;
    use std::panic::{self, AssertUnwindSafe};
    use std::time::Duration;

    /// Work source whose first lap blows up.
    struct Crash;

    impl WorkSource for Crash {
        fn next_delay(&mut self) -> Duration {
            panic!("work source crashed");
        }
    }

    fn lane_parts(len: usize) -> (RaceTrack, Gates, CriticalProbe, Completion) {
        (RaceTrack::new(len), Gates::new(1), CriticalProbe::new(), Completion::new())
    }

    #[test]
    fn lone_worker_fills_every_cell() {
        for primitive in Primitive::ALL {
            let (track, gates, probe, completion) = lane_parts(8);
            let lane = Lane { track: &track, gates: &gates, probe: &probe, completion: &completion };
            let mut work = FixedWork(Duration::ZERO);
            run_worker(3, primitive, lane, &mut work).expect("worker runs");
            assert_eq!(track.snapshot(), vec![3; 8], "{primitive}");
            assert_eq!(completion.count(), 1);
            assert_eq!(probe.peak(), 1);
        }
    }

    #[test]
    fn primitives_are_released_after_run() {
        let (track, gates, probe, completion) = lane_parts(4);
        let lane = Lane { track: &track, gates: &gates, probe: &probe, completion: &completion };
        let mut work = FixedWork(Duration::ZERO);
        for primitive in [Primitive::SpinLock, Primitive::SpinWait, Primitive::SemaphoreSlim] {
            run_worker(0, primitive, lane, &mut work).expect("worker runs");
        }
        assert!(!gates.spin.is_locked());
        assert_eq!(gates.semaphore_slim.available(), 1);
        assert_eq!(completion.count(), 3);
    }

    #[test]
    fn unwinding_lap_gives_primitives_back() {
        let (track, gates, probe, completion) = lane_parts(4);
        let lane = Lane { track: &track, gates: &gates, probe: &probe, completion: &completion };
        for primitive in [Primitive::SpinLock, Primitive::SemaphoreSlim, Primitive::Mutex, Primitive::Semaphore] {
            let crashed = panic::catch_unwind(AssertUnwindSafe(|| run_worker(0, primitive, lane, &mut Crash)));
            assert!(crashed.is_err(), "{primitive}");
        }
        assert!(!gates.spin.is_locked());
        assert_eq!(gates.semaphore_slim.available(), 1);
        assert_eq!(gates.semaphore.available(), 1);
        assert!(gates.mutex.try_lock().is_some());
        assert_eq!(completion.count(), 0);
    }

    #[test]
    fn unwinding_barrier_worker_breaks_barrier() {
        let (track, gates, probe, completion) = lane_parts(4);
        let lane = Lane { track: &track, gates: &gates, probe: &probe, completion: &completion };
        let crashed = panic::catch_unwind(AssertUnwindSafe(|| run_worker(0, Primitive::Barrier, lane, &mut Crash)));
        assert!(crashed.is_err());
        assert!(gates.barrier.is_broken());

        let err = run_worker(1, Primitive::Barrier, lane, &mut FixedWork(Duration::ZERO))
            .expect_err("broken barrier");
        assert!(matches!(err, Error::BarrierBroken { parties: 1 }));
    }
}
