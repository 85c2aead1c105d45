// Copyright 2026 Race Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-trial results and how they are printed.

use std::fmt;
use std::io::Write;
use std::time::Duration;

use serde::Serialize;

use crate::error::Result;
use crate::primitive::Primitive;

/// Output flavour for trial reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// Label, results and elapsed lines per trial.
    #[default]
    Text,
    /// One JSON object per trial, one per line.
    Json,
}

/// Outcome of one trial as seen by the driver after the join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialReport {
    pub primitive: Primitive,
    pub track: Vec<usize>,
    pub elapsed: Duration,
    pub completed: usize,
    /// Most workers ever seen inside the critical section at once.
    pub peak_occupancy: usize,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    primitive: Primitive,
    track: &'a [usize],
    elapsed_micros: u64,
    completed: usize,
    peak_occupancy: usize,
}

impl TrialReport {
    /// Space separated track values, one per cell.
    pub fn results_line(&self) -> String {
        let cells: Vec<String> = self.track.iter().map(ToString::to_string).collect();
        format!("Results with {}: {}", self.primitive, cells.join(" "))
    }

    pub fn to_json(&self) -> Result<String> {
        let json = JsonReport {
            primitive: self.primitive,
            track: &self.track,
            elapsed_micros: u64::try_from(self.elapsed.as_micros()).unwrap_or(u64::MAX),
            completed: self.completed,
            peak_occupancy: self.peak_occupancy,
        };
        Ok(serde_json::to_string(&json)?)
    }

    /// Writes everything after the start line in the requested format.
    pub fn write_to<W: Write>(&self, out: &mut W, format: ReportFormat) -> Result<()> {
        match format {
            ReportFormat::Text => write!(out, "{self}")?,
            ReportFormat::Json => writeln!(out, "{}", self.to_json()?)?,
        }
        Ok(())
    }
}

impl fmt::Display for TrialReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.results_line())?;
        writeln!(f, "Race finished in {:?}", self.elapsed)?;
        writeln!(f)
    }
}

/// Line printed before a trial's workers are spawned.
pub fn start_line(primitive: Primitive) -> String {
    format!("Race start with {primitive}!")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TrialReport {
        TrialReport {
            primitive: Primitive::SpinLock,
            track: vec![0, 4, 2],
            elapsed: Duration::from_millis(12),
            completed: 5,
            peak_occupancy: 1,
        }
    }

    #[test]
    fn text_report_has_results_and_elapsed() {
        let text = sample().to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Results with SpinLock: 0 4 2");
        assert_eq!(lines[1], "Race finished in 12ms");
        assert_eq!(lines[2], "");
    }

    #[test]
    fn json_report_fields() {
        let value: serde_json::Value =
            serde_json::from_str(&sample().to_json().expect("json")).expect("parse");
        assert_eq!(value["primitive"], "SpinLock");
        assert_eq!(value["track"], serde_json::json!([0, 4, 2]));
        assert_eq!(value["elapsed_micros"], 12_000);
        assert_eq!(value["completed"], 5);
    }

    #[test]
    fn start_line_names_primitive() {
        assert_eq!(start_line(Primitive::Monitor), "Race start with Monitor!");
    }
}
