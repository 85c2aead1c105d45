// Copyright 2026 Race Bench Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::primitive::Primitive;

/// Result alias for benchmark operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors produced while configuring or running race trials.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value is outside its accepted range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// A worker thread panicked; the trial is aborted.
    #[error("worker {worker} panicked during the {primitive} trial")]
    WorkerPanicked {
        /// Primitive under test when the panic happened.
        primitive: Primitive,
        /// Identity of the panicking worker.
        worker: usize,
    },
    /// Fewer workers signalled completion than were spawned.
    #[error("{primitive} trial finished with {completed}/{expected} workers complete")]
    IncompleteTrial {
        /// Primitive under test.
        primitive: Primitive,
        /// Number of workers spawned.
        expected: usize,
        /// Number of completion signals observed.
        completed: usize,
    },
    /// A bounded semaphore was released more often than it was acquired.
    #[error("semaphore released beyond its capacity of {capacity}")]
    SemaphoreOverflow {
        /// Maximum number of permits.
        capacity: usize,
    },
    /// A barrier party left early; the remaining parties cannot rendezvous.
    #[error("barrier of {parties} parties was broken by a departing worker")]
    BarrierBroken {
        /// Parties the barrier was built for.
        parties: usize,
    },
    /// Writing the report failed.
    #[error("report output failed: {0}")]
    Io(#[from] std::io::Error),
    /// Serializing a JSON report failed.
    #[error("report serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
