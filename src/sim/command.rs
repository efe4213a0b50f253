//! Command Source: one external command per line.
//!
//! ```text
//! C <time> M=<mem> S=<devices> SCHED=<1|2>
//! A <time> J=<id> M=<mem> S=<devices> R=<burst> P=<priority>
//! D <time>
//! ```
//!
//! Lines with an unknown leading token or no time are skipped. Missing or
//! unparsable numbers read as 0.

use rustc_hash::FxHashMap;
use std::{
    fmt,
    io::{self, BufRead},
};
use tracing::trace;

use crate::core::{JobSpec, Ticks};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Configure {
        time: Ticks,
        memory: u64,
        devices: u64,
        sched: u64,
    },
    Arrival {
        time: Ticks,
        job: JobSpec,
    },
    Display {
        time: Ticks,
    },
}

impl Command {
    pub fn time(&self) -> Ticks {
        match self {
            Self::Configure { time, .. } | Self::Arrival { time, .. } | Self::Display { time } => {
                *time
            }
        }
    }

    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let kind = line.chars().next()?;
        if !matches!(kind, 'C' | 'A' | 'D') {
            return None;
        }

        let mut tokens = line.split_whitespace();
        tokens.next();
        let time = parse_num(tokens.next()?);

        let fields: FxHashMap<&str, u64> = tokens
            .filter_map(|token| {
                let mut kv = token.split('=');
                match (kv.next(), kv.next(), kv.next()) {
                    (Some(key), Some(value), None) => Some((key, parse_num(value))),
                    _ => None,
                }
            })
            .collect();
        let field = |key: &str| fields.get(key).copied().unwrap_or(0);

        let command = match kind {
            'C' => Self::Configure {
                time,
                memory: field("M"),
                devices: field("S"),
                sched: field("SCHED"),
            },
            'A' => Self::Arrival {
                time,
                job: JobSpec {
                    id: field("J"),
                    memory: field("M"),
                    devices: field("S"),
                    burst: field("R"),
                    priority: u32::try_from(field("P")).unwrap_or(0),
                },
            },
            _ => Self::Display { time },
        };
        Some(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configure {
                time,
                memory,
                devices,
                sched,
            } => write!(f, "C {time} M={memory} S={devices} SCHED={sched}"),
            Self::Arrival { time, job } => write!(
                f,
                "A {time} J={} M={} S={} R={} P={}",
                job.id, job.memory, job.devices, job.burst, job.priority
            ),
            Self::Display { time } => write!(f, "D {time}"),
        }
    }
}

fn parse_num(s: &str) -> u64 {
    s.parse().unwrap_or(0)
}

/// Streams commands out of a reader, skipping lines that are not commands.
pub struct CommandReader<R> {
    reader: R,
    line: String,
    line_no: usize,
}

impl<R: BufRead> CommandReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for CommandReader<R> {
    type Item = io::Result<Command>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(err) => return Some(Err(err)),
            }
            self.line_no += 1;

            match Command::parse(&self.line) {
                Some(command) => return Some(Ok(command)),
                None if self.line.trim().is_empty() => {}
                None => trace!(line = self.line_no, text = self.line.trim(), "skipping input line"),
            }
        }
    }
}
