use super::{
    Devices, JobId, Memory, ProcId, Ticks,
    queues::QueueKind,
    state::{KernelCtx, ReadyStats},
};
use crate::scheduler::SchedKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry {
    pub job: JobId,
    pub remaining: Ticks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishedRow {
    pub job: JobId,
    pub arrival: Ticks,
    pub completion: Ticks,
    pub turnaround: Ticks,
    pub waiting: Ticks,
}

/// Read-only view of the engine handed to the report sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub now: Ticks,
    pub is_final: bool,
    pub policy: SchedKind,
    pub total_memory: Memory,
    pub avail_memory: Memory,
    pub total_devices: Devices,
    pub avail_devices: Devices,
    pub ready_stats: ReadyStats,
    pub running: Option<QueueEntry>,
    pub ready: Vec<QueueEntry>,
    pub intake: Vec<QueueEntry>,
    pub hold_by_size: Vec<QueueEntry>,
    pub hold_fifo: Vec<QueueEntry>,
    pub finished: Vec<FinishedRow>,
}

impl Snapshot {
    pub fn capture(ctx: &KernelCtx, policy: SchedKind, is_final: bool) -> Self {
        let entry = |id: ProcId| {
            let proc = ctx.proc(id);
            QueueEntry {
                job: proc.job_id,
                remaining: proc.remaining,
            }
        };
        let list = |kind: QueueKind| -> Vec<QueueEntry> {
            ctx.queues.list(kind).into_iter().map(entry).collect()
        };

        Self {
            now: ctx.now,
            is_final,
            policy,
            total_memory: ctx.resources.total_memory(),
            avail_memory: ctx.resources.avail_memory(),
            total_devices: ctx.resources.total_devices(),
            avail_devices: ctx.resources.avail_devices(),
            ready_stats: ctx.ready_stats,
            running: ctx.running.map(entry),
            ready: list(QueueKind::Ready),
            intake: list(QueueKind::Intake),
            hold_by_size: list(QueueKind::HoldBySize),
            hold_fifo: list(QueueKind::HoldFifo),
            finished: finished_rows(ctx),
        }
    }
}

pub fn finished_rows(ctx: &KernelCtx) -> Vec<FinishedRow> {
    ctx.finished
        .iter()
        .map(|&id| {
            let proc = ctx.proc(id);
            FinishedRow {
                job: proc.job_id,
                arrival: proc.arrival_time,
                completion: proc.completion_time.unwrap_or_default(),
                turnaround: proc.turnaround().unwrap_or_default(),
                waiting: proc.waiting().unwrap_or_default(),
            }
        })
        .collect()
}
