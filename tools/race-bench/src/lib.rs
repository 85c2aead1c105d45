// Copyright 2026 Race Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Contention benchmark racing synchronization primitives on a shared track
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests per module, integration tests in `tests/`
//!
//! Each trial spawns the same number of workers against one primitive. Every
//! worker runs one lap per track cell: take the primitive, write its id into
//! the cell, simulate some work, let go. The driver times the trial from
//! spawn to join and prints the final track.
//!
//! INVARIANTS:
//! - Track writes only happen inside the primitive under test
//! - Workers borrow shared state for one trial and keep nothing afterwards

#![forbid(unsafe_code)]

pub mod apartments;
pub mod config;
pub mod driver;
pub mod error;
pub mod primitive;
pub mod readers_writers;
pub mod report;
pub mod track;
pub mod work;
pub mod worker;

pub use config::RaceConfig;
pub use driver::{RaceDriver, TrialPhase};
pub use error::{Error, Result};
pub use primitive::Primitive;
pub use report::{ReportFormat, TrialReport};
pub use track::UNWRITTEN;
