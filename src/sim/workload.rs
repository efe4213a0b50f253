use rand::prelude::*;
use std::io::{self, Write};

use super::command::Command;
use crate::core::{JobSpec, Ticks};

/// Bernoulli arrival process: each tick a job arrives with `p_arrival`, and
/// is short with `p_short`.
#[derive(Debug, Clone)]
pub struct Workload {
    pub ticks: Ticks,
    pub p_arrival: f64,
    pub p_short: f64,
    pub short_ticks: Ticks,
    pub long_ticks: Ticks,
    pub memory: u64,
    pub devices: u64,
    pub dynamic: bool,
    pub seed: u64,
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            ticks: 100,
            p_arrival: 0.3,
            p_short: 0.3,
            short_ticks: 2,
            long_ticks: 12,
            memory: 100,
            devices: 4,
            dynamic: false,
            seed: 0,
        }
    }
}

impl Workload {
    /// A configure command, the arrivals, and a final display.
    pub fn commands(&self) -> Vec<Command> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut commands = vec![Command::Configure {
            time: 0,
            memory: self.memory,
            devices: self.devices,
            sched: if self.dynamic { 1 } else { 2 },
        }];

        let mut next_id = 1;
        for t in 0..self.ticks {
            if rng.random::<f64>() >= self.p_arrival {
                continue;
            }

            let burst = if rng.random::<f64>() < self.p_short {
                self.short_ticks
            } else {
                self.long_ticks
            };
            // Occasionally oversized so rejection paths get exercised
            let memory = rng.random_range(1..=self.memory.saturating_add(self.memory / 10 + 1));
            let devices = rng.random_range(0..=self.devices);
            let priority = rng.random_range(1..=2);

            commands.push(Command::Arrival {
                time: t,
                job: JobSpec {
                    id: next_id,
                    memory,
                    devices,
                    burst,
                    priority,
                },
            });
            next_id += 1;
        }

        commands.push(Command::Display { time: 999_999 });
        commands
    }
}

pub fn write_commands<W: Write>(mut out: W, commands: &[Command]) -> io::Result<()> {
    for command in commands {
        writeln!(out, "{command}")?;
    }
    out.flush()
}
