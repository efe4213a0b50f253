use average::{Estimate, Mean};
use std::io::{self, Write};

use crate::{
    core::{FinishedRow, QueueEntry, Snapshot, Ticks},
    scheduler::SchedKind,
};

const RULE: &str = "--------------------------------------------------------";

pub trait ReportSink {
    fn snapshot(&mut self, snap: &Snapshot) -> io::Result<()>;

    /// Both event sources are exhausted.
    fn finish(&mut self, now: Ticks, finished: &[FinishedRow]) -> io::Result<()>;
}

/// Plain-text status report.
pub struct TextReport<W: Write> {
    out: W,
}

impl<W: Write> TextReport<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn queue(&mut self, title: &str, entries: &[QueueEntry]) -> io::Result<()> {
        writeln!(self.out, "Jobs in {title}")?;
        writeln!(self.out, "{RULE}")?;
        if entries.is_empty() {
            writeln!(self.out, "  EMPTY")?;
        }
        for entry in entries {
            writeln!(
                self.out,
                "Job ID {} , {:.2} Cycles left to completion.",
                entry.job, entry.remaining as f64
            )?;
        }
        writeln!(self.out)
    }
}

impl<W: Write> ReportSink for TextReport<W> {
    fn snapshot(&mut self, snap: &Snapshot) -> io::Result<()> {
        let banner = if snap.is_final {
            "Final System Status:"
        } else {
            "System Status:"
        };
        writeln!(self.out, "{RULE}")?;
        writeln!(self.out, "{banner}")?;
        writeln!(self.out, "{RULE}")?;
        writeln!(self.out, "          Time: {:.2}", snap.now as f64)?;
        writeln!(self.out, "  Total Memory: {}", snap.total_memory)?;
        writeln!(self.out, " Avail. Memory: {}", snap.avail_memory)?;
        writeln!(self.out, " Total Devices: {}", snap.total_devices)?;
        writeln!(self.out, "Avail. Devices: {}", snap.avail_devices)?;
        if snap.policy == SchedKind::Dynamic {
            writeln!(
                self.out,
                "  Ready SR/AR: {} / {}",
                snap.ready_stats.sum, snap.ready_stats.avg
            )?;
        }
        match snap.running {
            Some(entry) => writeln!(
                self.out,
                "   Running Job: {} ({:.2} cycles left)",
                entry.job, entry.remaining as f64
            )?,
            None => writeln!(self.out, "   Running Job: none")?,
        }
        writeln!(self.out)?;

        self.queue("Ready List", &snap.ready)?;
        self.queue("Long Job List", &snap.intake)?;
        self.queue("Hold List 1", &snap.hold_by_size)?;
        self.queue("Hold List 2", &snap.hold_fifo)?;

        writeln!(self.out, "Finished Jobs (detailed)")?;
        writeln!(self.out, "{RULE}")?;
        writeln!(
            self.out,
            "  Job    ArrivalTime    CompleteTime     TurnaroundTime    WaitingTime"
        )?;
        writeln!(self.out, "{RULE}{}", &RULE[..16])?;
        if snap.finished.is_empty() {
            writeln!(self.out, "  EMPTY")?;
        }
        for row in &snap.finished {
            writeln!(
                self.out,
                "  {:<6} {:<14.2} {:<16.2} {:<17.2} {:<13.2}",
                row.job,
                row.arrival as f64,
                row.completion as f64,
                row.turnaround as f64,
                row.waiting as f64
            )?;
        }
        writeln!(self.out, "Total Finished Jobs:             {}", snap.finished.len())?;
        writeln!(self.out)?;
        writeln!(self.out)
    }

    fn finish(&mut self, now: Ticks, finished: &[FinishedRow]) -> io::Result<()> {
        writeln!(self.out, "--- Simulation finished at time {:.2} ---", now as f64)?;
        if !finished.is_empty() {
            writeln!(
                self.out,
                "Average turnaround: {:.2}  Average waiting: {:.2}",
                avg(finished.iter().map(|r| r.turnaround as f64)),
                avg(finished.iter().map(|r| r.waiting as f64))
            )?;
        }
        self.out.flush()
    }
}

/// Collects every report, for tests and embedding.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub snapshots: Vec<Snapshot>,
    pub finished_at: Option<Ticks>,
    pub final_rows: Vec<FinishedRow>,
}

impl ReportSink for RecordingSink {
    fn snapshot(&mut self, snap: &Snapshot) -> io::Result<()> {
        self.snapshots.push(snap.clone());
        Ok(())
    }

    fn finish(&mut self, now: Ticks, finished: &[FinishedRow]) -> io::Result<()> {
        self.finished_at = Some(now);
        self.final_rows = finished.to_vec();
        Ok(())
    }
}

fn avg(iter: impl Iterator<Item = f64>) -> f64 {
    iter.collect::<Mean>().estimate()
}
