use std::{io, iter::Peekable};
use tracing::{debug, info, warn};

use super::{command::Command, report::ReportSink};
use crate::{
    config::SimConfig,
    core::{SchedCore, SchedCoreEvent, Ticks},
    error::Result,
    scheduler::SchedPolicy,
};

/// Event-time driver: merges the next external command with the engine's
/// next internal event and advances the clock to the earlier of the two.
/// On a tie the internal event runs first.
pub struct Sim<C, S>
where
    C: Iterator<Item = io::Result<Command>>,
    S: ReportSink,
{
    pub core: SchedCore,
    config: SimConfig,
    commands: Peekable<C>,
    sink: S,
}

impl<C, S> Sim<C, S>
where
    C: Iterator<Item = io::Result<Command>>,
    S: ReportSink,
{
    pub fn new(commands: impl IntoIterator<IntoIter = C>, sink: S, config: SimConfig) -> Self {
        Self {
            core: SchedCore::new(),
            config,
            commands: commands.into_iter().peekable(),
            sink,
        }
    }

    /// Process the next event time. Returns `None` once both event sources
    /// are exhausted.
    pub fn step(&mut self) -> Result<Option<Vec<SchedCoreEvent>>> {
        if let Some(Err(_)) = self.commands.peek() {
            if let Some(Err(err)) = self.commands.next() {
                return Err(err.into());
            }
        }

        let now = self.core.now();
        let external = self
            .commands
            .peek()
            .and_then(|c| c.as_ref().ok())
            .map(|c| c.time().max(now));
        let internal = self.core.next_internal();

        let Some(t) = external.into_iter().chain(internal).min() else {
            return Ok(None);
        };

        let mut events = Vec::new();
        if let Some(internal) = internal {
            if external.is_none_or(|external| internal <= external) {
                events.extend(self.core.handle_internal(internal));
            }
        }

        if external == Some(t) {
            if let Some(Ok(command)) = self.commands.next() {
                events.extend(self.apply(command, t)?);
            }
        }

        for event in &events {
            debug!(t, ?event);
        }
        Ok(Some(events))
    }

    /// Run to exhaustion and hand back the sink.
    pub fn run(mut self) -> Result<S> {
        while self.step()?.is_some() {}

        let now = self.core.now();
        info!(now, "simulation finished");
        self.sink.finish(now, &self.core.finished())?;
        Ok(self.sink)
    }

    fn apply(&mut self, command: Command, t: Ticks) -> Result<Vec<SchedCoreEvent>> {
        if command.time() < t {
            warn!(
                stamped = command.time(),
                now = t,
                "command out of order, applying at current time"
            );
        }

        let events = match command {
            Command::Configure {
                memory,
                devices,
                sched,
                ..
            } => {
                let policy = SchedPolicy::from_sched_field(sched, self.config.static_quantum);
                info!(t, memory, devices, ?policy, "reconfiguring");
                self.core.reconfigure(t, memory, devices, policy)
            }
            Command::Arrival { job, .. } => self.core.arrive(t, job),
            Command::Display { time } => {
                let is_final = time >= self.config.final_display_time;
                if is_final {
                    info!(t, "final display");
                }
                self.sink.snapshot(&self.core.snapshot(is_final))?;
                Vec::new()
            }
        };
        Ok(events)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::JobSpec, sim::report::RecordingSink};

    fn sim(commands: Vec<Command>) -> Sim<impl Iterator<Item = io::Result<Command>>, RecordingSink> {
        Sim::new(
            commands.into_iter().map(Ok),
            RecordingSink::default(),
            SimConfig::default(),
        )
    }

    fn arrival(time: Ticks, id: u64, memory: u64, burst: Ticks) -> Command {
        Command::Arrival {
            time,
            job: JobSpec {
                id,
                memory,
                devices: 0,
                burst,
                priority: 2,
            },
        }
    }

    fn configure(time: Ticks, memory: u64, sched: u64) -> Command {
        Command::Configure {
            time,
            memory,
            devices: 1,
            sched,
        }
    }

    #[test]
    fn clock_jumps_between_event_times() {
        let mut sim = sim(vec![
            configure(0, 100, 2),
            arrival(2, 1, 10, 5),
            Command::Display { time: 20 },
        ]);

        let mut times = Vec::new();
        while sim.step().unwrap().is_some() {
            times.push(sim.core.now());
        }
        // configure, arrival, completion at 7, display
        assert_eq!(times, vec![0, 2, 7, 20]);
    }

    #[test]
    fn internal_event_wins_ties() {
        // job 1 finishes at 10 and frees memory for job 2 arriving at 10
        let sink = sim(vec![
            configure(0, 100, 2),
            arrival(0, 1, 80, 10),
            arrival(10, 2, 50, 5),
            Command::Display { time: 10 },
        ])
        .run()
        .unwrap();

        let snap = &sink.snapshots[0];
        assert_eq!(snap.now, 10);
        assert!(snap.hold_fifo.is_empty());
        assert_eq!(snap.running.map(|e| e.job), Some(2));
        assert_eq!(snap.finished.len(), 1);
        assert_eq!(sink.finished_at, Some(15));
    }

    #[test]
    fn late_stamped_commands_never_rewind_the_clock() {
        let sink = sim(vec![
            configure(0, 100, 2),
            arrival(0, 1, 10, 5),
            Command::Display { time: 8 },
            arrival(3, 2, 10, 5),
        ])
        .run()
        .unwrap();

        assert_eq!(sink.final_rows.len(), 2);
        assert_eq!(sink.final_rows[1].arrival, 8);
        assert_eq!(sink.final_rows[1].completion, 13);
    }

    #[test]
    fn final_display_is_flagged_but_does_not_stop_work() {
        let sink = sim(vec![
            configure(0, 100, 2),
            arrival(0, 1, 10, 5),
            Command::Display { time: 3 },
            Command::Display { time: 999_999 },
        ])
        .run()
        .unwrap();

        assert!(!sink.snapshots[0].is_final);
        assert!(sink.snapshots[1].is_final);
        assert_eq!(sink.snapshots[1].finished.len(), 1);
        assert_eq!(sink.finished_at, Some(999_999));
    }

    #[test]
    fn sink_fills_one_step_at_a_time() {
        let config = SimConfig::default().with_static_quantum(3).unwrap();
        let commands = vec![
            configure(0, 100, 2),
            arrival(0, 1, 10, 5),
            Command::Display { time: 1 },
        ];
        let mut sim = Sim::new(commands.into_iter().map(Ok), RecordingSink::default(), config);
        assert_eq!(sim.config().static_quantum, 3);

        sim.step().unwrap();
        sim.step().unwrap();
        assert!(sim.sink().snapshots.is_empty());

        // the display at 1 comes before the slice end at 3
        sim.step().unwrap();
        assert_eq!(sim.sink().snapshots.len(), 1);
        assert_eq!(sim.core.next_internal(), Some(3));
        assert_eq!(sim.sink().finished_at, None);
    }

    #[test]
    fn read_errors_abort_the_run() {
        let commands = vec![
            Ok(configure(0, 100, 2)),
            Err(io::Error::other("disk gone")),
        ];
        let result = Sim::new(commands, RecordingSink::default(), SimConfig::default()).run();
        assert!(result.is_err());
    }
}
