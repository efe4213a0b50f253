use slotmap::{SlotMap, new_key_type};

use super::{
    process::{HOLD_BY_SIZE_PRIORITY, JobSpec, ProcState, Process, Ticks},
    queues::{QueueKind, QueueSet},
    resources::{Devices, Memory, ResourceLedger},
};

new_key_type! {
    pub struct ProcId;
}

/// Where an accepted arrival was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Ready,
    HoldBySize,
    HoldFifo,
}

/// Dynamic round robin reporting counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReadyStats {
    pub sum: Ticks,
    pub avg: Ticks,
}

impl ReadyStats {
    /// Sums are widened while accumulating; the reported total saturates.
    pub fn new(sum: u128, avg: Ticks) -> Self {
        Self {
            sum: Ticks::try_from(sum).unwrap_or(Ticks::MAX),
            avg,
        }
    }
}

/// Sum and count of remaining bursts, widened so long bursts cannot overflow.
pub fn sum_remaining(remaining: impl IntoIterator<Item = Ticks>) -> (u128, u64) {
    remaining
        .into_iter()
        .fold((0, 0), |(sum, count), r| (sum + u128::from(r), count + 1))
}

/// `max(1, round-half-up(sum / count))`, computed without floating point.
pub fn rounded_avg(sum: u128, count: u64) -> Ticks {
    debug_assert!(count > 0, "Average over an empty set");
    let count = u128::from(count);
    let avg = (2 * sum + count) / (2 * count);
    Ticks::try_from(avg).unwrap_or(Ticks::MAX).max(1)
}

#[derive(Debug, Default)]
pub struct KernelCtx {
    pub now: Ticks,
    pub procs: SlotMap<ProcId, Process>,
    pub resources: ResourceLedger,
    pub queues: QueueSet,
    pub running: Option<ProcId>,
    // Append-only for the lifetime of one configuration
    pub finished: Vec<ProcId>,
    pub ready_stats: ReadyStats,
}

impl KernelCtx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every process and queue and install fresh capacity.
    pub fn reset(&mut self, memory: Memory, devices: Devices) {
        self.resources.configure(memory, devices);
        self.queues.clear();
        self.procs.clear();
        self.running = None;
        self.finished.clear();
        self.ready_stats = ReadyStats::default();
    }

    pub fn advance_to(&mut self, now: Ticks) {
        debug_assert!(
            now >= self.now,
            "Clock moving backwards from {} to {now}",
            self.now
        );
        self.now = self.now.max(now);
    }

    pub fn proc(&self, proc_id: ProcId) -> &Process {
        &self.procs[proc_id]
    }

    pub fn proc_mut(&mut self, proc_id: ProcId) -> &mut Process {
        &mut self.procs[proc_id]
    }

    /// Build the record for an arrival. Jobs that could never fit are
    /// returned as `Err` in state `Rejected` and never enter the arena.
    pub fn submit(&mut self, spec: JobSpec) -> Result<ProcId, Process> {
        let mut proc = Process::from_spec(spec, self.now);
        if self.resources.exceeds_capacity(&proc) {
            proc.state = ProcState::Rejected;
            return Err(proc);
        }

        let proc_id = self.procs.insert(proc);
        self.queues.push_intake(proc_id);
        Ok(proc_id)
    }

    /// Move the intake head to Ready (allocating) or to a hold queue.
    pub fn route_intake(&mut self) -> Option<(ProcId, Route)> {
        let proc_id = self.queues.pop(QueueKind::Intake)?;
        let proc = &self.procs[proc_id];

        let route = if self.resources.is_available(proc) {
            self.make_ready(proc_id);
            Route::Ready
        } else if proc.priority == HOLD_BY_SIZE_PRIORITY {
            let memory = proc.memory;
            self.proc_mut(proc_id).state = ProcState::Hold1;
            self.queues.push_hold_by_size(proc_id, memory);
            Route::HoldBySize
        } else {
            self.proc_mut(proc_id).state = ProcState::Hold2;
            self.queues.push_hold_fifo(proc_id);
            Route::HoldFifo
        };

        Some((proc_id, route))
    }

    /// Head of a hold queue, only if it fits in what is free right now.
    pub fn hold_head_if_admissible(&self, kind: QueueKind) -> Option<ProcId> {
        debug_assert!(matches!(kind, QueueKind::HoldBySize | QueueKind::HoldFifo));
        let head = self.queues.head(kind)?;
        self.resources
            .is_available(&self.procs[head])
            .then_some(head)
    }

    /// Pop the head of `kind` into Ready, allocating its footprint.
    pub fn admit_hold_head(&mut self, kind: QueueKind) -> Option<ProcId> {
        self.hold_head_if_admissible(kind)?;
        let proc_id = self.queues.pop(kind)?;
        self.make_ready(proc_id);
        Some(proc_id)
    }

    fn make_ready(&mut self, proc_id: ProcId) {
        let proc = &mut self.procs[proc_id];
        self.resources.allocate(proc);
        proc.state = ProcState::Ready;
        self.queues.push_ready(proc_id);
    }

    pub fn ready_pop(&mut self) -> Option<ProcId> {
        self.queues.pop(QueueKind::Ready)
    }

    pub fn requeue_ready(&mut self, proc_id: ProcId) {
        debug_assert_eq!(self.proc(proc_id).state, ProcState::Ready);
        self.queues.push_ready(proc_id);
    }

    pub fn ready_remaining(&self) -> impl Iterator<Item = Ticks> + '_ {
        self.queues.ready().map(|id| self.procs[id].remaining)
    }

    pub fn set_running(&mut self, proc_id: ProcId) {
        debug_assert!(self.running.is_none(), "CPU already running a process");
        debug_assert!(
            self.queues.location(proc_id).is_none(),
            "Running process {proc_id:?} must not be enqueued"
        );
        self.running = Some(proc_id);
    }

    pub fn clear_running(&mut self) -> Option<ProcId> {
        self.running.take()
    }

    pub fn mark_finished(&mut self, proc_id: ProcId, now: Ticks) {
        let proc = &mut self.procs[proc_id];
        proc.complete_at(now);
        self.resources.release(proc);
        self.finished.push(proc_id);
    }

    /// Resources currently held: everything in Ready plus the running process.
    pub fn allocated(&self) -> (Memory, Devices) {
        self.queues
            .ready()
            .chain(self.running)
            .map(|id| &self.procs[id])
            .fold((0, 0), |(mem, dev), p| (mem + p.memory, dev + p.devices))
    }
}
