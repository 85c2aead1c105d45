// Copyright 2026 Race Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Periodic readers and writers sharing one counter behind a reader/writer
//! lock. Every participant runs a fixed number of rounds.

use std::fmt;
use std::thread;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::error::{Error, Result};

/// Parameters for one demo run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RwConfig {
    pub readers: usize,
    pub writers: usize,
    pub read_interval: Duration,
    pub write_interval: Duration,
    pub rounds: usize,
}

impl Default for RwConfig {
    fn default() -> Self {
        Self {
            readers: 5,
            writers: 5,
            read_interval: Duration::from_millis(100),
            write_interval: Duration::from_millis(150),
            rounds: 3,
        }
    }
}

/// A single observation or update of the shared value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Read { reader: usize, value: u64 },
    Write { writer: usize, value: u64 },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Read { reader, value } => write!(f, "Reader {reader} is reading: {value}"),
            Event::Write { writer, value } => write!(f, "Writer {writer} is writing: {value}"),
        }
    }
}

/// Shared counter.
#[derive(Debug, Default)]
pub struct Resource {
    data: RwLock<u64>,
}

impl Resource {
    pub fn read(&self) -> u64 {
        self.read_with(|value| value)
    }

    /// Increments under the exclusive lock and returns the new value.
    pub fn bump(&self) -> u64 {
        self.bump_with(|value| value)
    }

    /// Runs `observe` on the value while the shared lock is held.
    pub fn read_with<R>(&self, observe: impl FnOnce(u64) -> R) -> R {
        observe(*self.data.read())
    }

    /// Increments, then runs `observe` on the new value while the exclusive
    /// lock is still held.
    pub fn bump_with<R>(&self, observe: impl FnOnce(u64) -> R) -> R {
        let mut data = self.data.write();
        *data += 1;
        observe(*data)
    }
}

/// Outcome of a run: events in the order they were logged plus the final
/// counter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RwOutcome {
    pub events: Vec<Event>,
    pub final_value: u64,
}

/// Runs all readers and writers to completion.
pub fn run(config: &RwConfig) -> Result<RwOutcome> {
    run_with(config, |_| {})
}

/// Like [`run`], handing every event to `on_event` as it happens, while the
/// lock it describes is still held.
pub fn run_with<F>(config: &RwConfig, on_event: F) -> Result<RwOutcome>
where
    F: Fn(&Event) + Sync,
{
    if config.readers + config.writers == 0 {
        return Err(Error::InvalidConfig("at least one reader or writer is required"));
    }
    let resource = Resource::default();
    let events = Mutex::new(Vec::with_capacity((config.readers + config.writers) * config.rounds));

    let record = |event: Event| {
        let mut events = events.lock();
        on_event(&event);
        events.push(event);
    };

    thread::scope(|scope| {
        let (resource, record) = (&resource, &record);
        for reader in 0..config.readers {
            scope.spawn(move || {
                for _ in 0..config.rounds {
                    thread::sleep(config.read_interval);
                    resource.read_with(|value| record(Event::Read { reader, value }));
                }
            });
        }
        for writer in 0..config.writers {
            scope.spawn(move || {
                for _ in 0..config.rounds {
                    thread::sleep(config.write_interval);
                    resource.bump_with(|value| record(Event::Write { writer, value }));
                }
            });
        }
    });

    log::debug!("readers/writers finished at {}", resource.read());
    Ok(RwOutcome { final_value: resource.read(), events: events.into_inner() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> RwConfig {
        RwConfig {
            readers: 3,
            writers: 4,
            read_interval: Duration::from_millis(1),
            write_interval: Duration::from_millis(2),
            rounds: 5,
        }
    }

    #[test]
    fn final_value_counts_every_write() {
        let outcome = run(&quick()).expect("run");
        assert_eq!(outcome.final_value, 20);
        assert_eq!(outcome.events.len(), 35);
    }

    #[test]
    fn writes_strictly_increase() {
        let outcome = run(&quick()).expect("run");
        let writes: Vec<u64> = outcome
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Write { value, .. } => Some(*value),
                Event::Read { .. } => None,
            })
            .collect();
        assert_eq!(writes, (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn reads_never_exceed_final() {
        let outcome = run(&quick()).expect("run");
        for event in &outcome.events {
            if let Event::Read { value, .. } = event {
                assert!(*value <= outcome.final_value);
            }
        }
    }

    #[test]
    fn events_reach_sink_as_they_happen() {
        let seen = Mutex::new(Vec::new());
        let outcome = run_with(&quick(), |event| seen.lock().push(*event)).expect("run");
        assert_eq!(seen.into_inner(), outcome.events);
    }

    #[test]
    fn write_event_precedes_later_reads() {
        let resource = Resource::default();
        let seen = Mutex::new(Vec::new());
        resource.bump_with(|value| seen.lock().push(Event::Write { writer: 0, value }));
        resource.read_with(|value| seen.lock().push(Event::Read { reader: 0, value }));
        assert_eq!(
            seen.into_inner(),
            [Event::Write { writer: 0, value: 1 }, Event::Read { reader: 0, value: 1 }]
        );
    }

    #[test]
    fn empty_cast_rejected() {
        let config = RwConfig { readers: 0, writers: 0, ..RwConfig::default() };
        assert!(matches!(run(&config), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn bump_and_display() {
        let resource = Resource::default();
        assert_eq!(resource.bump(), 1);
        assert_eq!(resource.read(), 1);
        assert_eq!(Event::Write { writer: 2, value: 1 }.to_string(), "Writer 2 is writing: 1");
    }
}
