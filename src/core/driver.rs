use super::{
    event::SchedCoreEvent,
    observer::Observer,
    process::{JobSpec, ProcState, Ticks},
    queues::QueueKind,
    resources::{Devices, Memory},
    snapshot::{FinishedRow, Snapshot, finished_rows},
    state::{KernelCtx, ProcId, ReadyStats, Route, rounded_avg, sum_remaining},
};
use crate::scheduler::{SchedKind, SchedPolicy, Scheduler};

/// The scheduling engine: owns the kernel state and the active policy and
/// reacts to one event at a time.
pub struct SchedCore {
    pub ctx: KernelCtx,
    scheduler: Box<dyn Scheduler>,
    // Slice end of the running process; `None` when the CPU is idle
    next_internal: Option<Ticks>,
    observer: Observer,
    events: Vec<SchedCoreEvent>,
}

impl Default for SchedCore {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedCore {
    /// An unconfigured core: zero capacity, default static policy.
    pub fn new() -> Self {
        Self {
            ctx: KernelCtx::new(),
            scheduler: SchedPolicy::default().build(),
            next_internal: None,
            observer: Observer::new(),
            events: Vec::new(),
        }
    }

    pub fn reconfigure(
        &mut self,
        now: Ticks,
        memory: Memory,
        devices: Devices,
        policy: SchedPolicy,
    ) -> Vec<SchedCoreEvent> {
        self.ctx.advance_to(now);

        let discarded = self.ctx.procs.len() - self.ctx.finished.len();
        self.ctx.reset(memory, devices);
        self.scheduler = policy.build();
        self.next_internal = None;

        self.events.push(SchedCoreEvent::Reconfigured {
            memory,
            devices,
            policy: policy.kind(),
            discarded,
        });
        self.finish_step()
    }

    pub fn arrive(&mut self, now: Ticks, spec: JobSpec) -> Vec<SchedCoreEvent> {
        self.ctx.advance_to(now);

        match self.ctx.submit(spec) {
            Err(rejected) => {
                self.events.push(SchedCoreEvent::Rejected {
                    job: rejected.job_id,
                });
            }
            Ok(_) => {
                while let Some((proc_id, route)) = self.ctx.route_intake() {
                    let to = match route {
                        Route::Ready => ProcState::Ready,
                        Route::HoldBySize => ProcState::Hold1,
                        Route::HoldFifo => ProcState::Hold2,
                    };
                    self.emit_state_change(proc_id, ProcState::New, to);
                    if route == Route::Ready {
                        self.refresh_ready_stats();
                    }
                }
            }
        }

        // Hold queues are not rechecked here; only slice boundaries free resources
        self.dispatch_if_idle();
        self.finish_step()
    }

    /// Slice boundary of the running process.
    pub fn handle_internal(&mut self, now: Ticks) -> Vec<SchedCoreEvent> {
        self.ctx.advance_to(now);

        let Some(proc_id) = self.ctx.running else {
            return self.finish_step();
        };

        let proc = self.ctx.proc(proc_id);
        debug_assert_eq!(
            proc.slice_end, self.next_internal,
            "Internal event time out of sync with running slice"
        );
        if proc.slice_end == Some(now) {
            let ran = proc.ran_until(now);
            if proc.remaining <= ran {
                self.complete_running(now);
            } else {
                self.preempt_running(now);
            }
        }

        self.admit_from_hold_queues();
        self.dispatch_if_idle();
        self.finish_step()
    }

    /// Pure read of the current state.
    pub fn snapshot(&self, is_final: bool) -> Snapshot {
        Snapshot::capture(&self.ctx, self.scheduler.kind(), is_final)
    }

    pub fn finished(&self) -> Vec<FinishedRow> {
        finished_rows(&self.ctx)
    }

    pub fn next_internal(&self) -> Option<Ticks> {
        self.next_internal
    }

    pub fn now(&self) -> Ticks {
        self.ctx.now
    }

    pub fn policy(&self) -> SchedKind {
        self.scheduler.kind()
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    fn is_dynamic(&self) -> bool {
        self.scheduler.kind() == SchedKind::Dynamic
    }

    fn dispatch_if_idle(&mut self) {
        if self.ctx.running.is_some() {
            return;
        }

        let Some(proc_id) = self.scheduler.select_next(&mut self.ctx) else {
            self.next_internal = None;
            self.events.push(SchedCoreEvent::CpuIdle);
            return;
        };

        let quantum = match self.scheduler.fixed_quantum() {
            Some(quantum) => quantum,
            None => self.dynamic_quantum(proc_id),
        };

        let now = self.ctx.now;
        self.ctx.set_running(proc_id);
        let slice_end = self.ctx.proc_mut(proc_id).start_slice(now, quantum);
        self.next_internal = Some(slice_end);

        self.emit_state_change(proc_id, ProcState::Ready, ProcState::Running);
        self.events.push(SchedCoreEvent::Dispatched {
            proc: proc_id,
            job: self.ctx.proc(proc_id).job_id,
            quantum,
            slice_end,
        });
    }

    // Average over the process about to run plus whatever is still Ready
    fn dynamic_quantum(&mut self, proc_id: ProcId) -> Ticks {
        let remaining = self.ctx.proc(proc_id).remaining;
        let (sum, count) =
            sum_remaining(std::iter::once(remaining).chain(self.ctx.ready_remaining()));

        let (quantum, avg) = if count == 1 {
            (remaining.max(1), remaining)
        } else {
            let avg = rounded_avg(sum, count);
            (avg, avg)
        };

        self.ctx.ready_stats = ReadyStats::new(sum, avg);
        quantum
    }

    fn refresh_ready_stats(&mut self) {
        if !self.is_dynamic() {
            self.ctx.ready_stats = ReadyStats::default();
            return;
        }

        let (sum, count) = sum_remaining(self.ctx.ready_remaining());
        let avg = if count == 0 { 0 } else { rounded_avg(sum, count) };
        self.ctx.ready_stats = ReadyStats::new(sum, avg);
    }

    fn complete_running(&mut self, now: Ticks) {
        let Some(proc_id) = self.ctx.clear_running() else {
            return;
        };
        self.ctx.mark_finished(proc_id, now);
        self.next_internal = None;

        self.emit_state_change(proc_id, ProcState::Running, ProcState::Finished);
        self.refresh_ready_stats();
    }

    // The preempted process keeps its memory/device reservation
    fn preempt_running(&mut self, now: Ticks) {
        let Some(proc_id) = self.ctx.clear_running() else {
            return;
        };
        self.ctx.proc_mut(proc_id).end_slice(now);
        self.ctx.requeue_ready(proc_id);
        self.next_internal = None;

        self.emit_state_change(proc_id, ProcState::Running, ProcState::Ready);
        self.refresh_ready_stats();
    }

    fn admit_from_hold_queues(&mut self) {
        loop {
            if let Some(proc_id) = self.ctx.admit_hold_head(QueueKind::HoldBySize) {
                self.emit_state_change(proc_id, ProcState::Hold1, ProcState::Ready);
                self.refresh_ready_stats();
                continue;
            }

            if let Some(proc_id) = self.ctx.admit_hold_head(QueueKind::HoldFifo) {
                self.emit_state_change(proc_id, ProcState::Hold2, ProcState::Ready);
                self.refresh_ready_stats();
                continue;
            }

            break;
        }
    }

    fn emit_state_change(&mut self, proc_id: ProcId, from: ProcState, to: ProcState) {
        self.events.push(SchedCoreEvent::ProcStateChange {
            proc: proc_id,
            job: self.ctx.proc(proc_id).job_id,
            from,
            to,
        });
    }

    fn finish_step(&mut self) -> Vec<SchedCoreEvent> {
        self.observer.observe(&self.ctx, self.next_internal);
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: u64, memory: Memory, devices: Devices, burst: Ticks, priority: u32) -> JobSpec {
        JobSpec {
            id,
            memory,
            devices,
            burst,
            priority,
        }
    }

    fn dispatches(events: &[SchedCoreEvent]) -> Vec<(u64, Ticks)> {
        events
            .iter()
            .filter_map(|e| match e {
                SchedCoreEvent::Dispatched { job, quantum, .. } => Some((*job, *quantum)),
                _ => None,
            })
            .collect()
    }

    fn run_internal(core: &mut SchedCore) -> Vec<SchedCoreEvent> {
        let now = core.next_internal().expect("no internal event pending");
        core.handle_internal(now)
    }

    #[test]
    fn static_job_shorter_than_quantum_runs_to_completion() {
        let mut core = SchedCore::new();
        core.reconfigure(0, 100, 1, SchedPolicy::Static { quantum: 17 });

        let events = core.arrive(0, job(1, 50, 0, 14, 2));
        assert_eq!(dispatches(&events), vec![(1, 17)]);
        assert_eq!(core.next_internal(), Some(14));

        run_internal(&mut core);
        assert_eq!(core.now(), 14);
        assert_eq!(core.next_internal(), None);
        assert_eq!(
            core.finished(),
            vec![FinishedRow {
                job: 1,
                arrival: 0,
                completion: 14,
                turnaround: 14,
                waiting: 0,
            }]
        );
        assert_eq!(core.ctx.resources.avail_memory(), 100);
    }

    #[test]
    fn static_quantum_preempts_and_rotates() {
        let mut core = SchedCore::new();
        core.reconfigure(0, 100, 2, SchedPolicy::Static { quantum: 4 });
        core.arrive(0, job(1, 10, 1, 6, 2));
        core.arrive(0, job(2, 10, 1, 3, 2));

        // job 1 runs 0..4 and keeps its reservation while preempted
        let events = run_internal(&mut core);
        assert!(events.contains(&SchedCoreEvent::ProcStateChange {
            proc: core.ctx.queues.list(QueueKind::Ready)[0],
            job: 1,
            from: ProcState::Running,
            to: ProcState::Ready,
        }));
        assert_eq!(dispatches(&events), vec![(2, 4)]);
        assert_eq!(core.ctx.resources.avail_memory(), 80);
        assert_eq!(core.ctx.resources.avail_devices(), 0);

        // job 2 finishes at 7, job 1 resumes with 2 left and finishes at 9
        run_internal(&mut core);
        run_internal(&mut core);
        let done: Vec<_> = core.finished().iter().map(|r| (r.job, r.completion)).collect();
        assert_eq!(done, vec![(2, 7), (1, 9)]);
        assert_eq!(core.finished()[1].waiting, 3);
    }

    #[test]
    fn dynamic_quantum_uses_running_and_ready_average() {
        let mut core = SchedCore::new();
        core.reconfigure(0, 100, 3, SchedPolicy::Dynamic);

        let events = core.arrive(0, job(1, 10, 0, 10, 2));
        assert_eq!(dispatches(&events), vec![(1, 10)]);
        core.arrive(0, job(2, 10, 0, 20, 2));
        core.arrive(0, job(3, 10, 0, 5, 2));
        assert_eq!(core.ctx.ready_stats, ReadyStats { sum: 25, avg: 13 });

        // (20 + 5) / 2 rounds half up to 13
        let events = run_internal(&mut core);
        assert_eq!(dispatches(&events), vec![(2, 13)]);
        assert_eq!(core.now(), 10);

        // job 2 preempted at 23 with 7 left; (5 + 7) / 2 = 6
        let events = run_internal(&mut core);
        assert_eq!(core.now(), 23);
        assert_eq!(dispatches(&events), vec![(3, 6)]);

        // job 3 completes at 28, job 2 alone gets its remaining 7
        let events = run_internal(&mut core);
        assert_eq!(dispatches(&events), vec![(2, 7)]);
        run_internal(&mut core);

        let done: Vec<_> = core.finished().iter().map(|r| (r.job, r.completion)).collect();
        assert_eq!(done, vec![(1, 10), (3, 28), (2, 35)]);
    }

    #[test]
    fn ready_stats_stay_zero_under_static_policy() {
        let mut core = SchedCore::new();
        core.reconfigure(0, 100, 3, SchedPolicy::Static { quantum: 17 });
        core.arrive(0, job(1, 10, 0, 10, 2));
        core.arrive(0, job(2, 10, 0, 20, 2));
        assert_eq!(core.ctx.ready_stats, ReadyStats::default());
    }

    #[test]
    fn ready_stats_track_dispatch_preemption_and_completion() {
        let mut core = SchedCore::new();
        core.reconfigure(0, 100, 3, SchedPolicy::Dynamic);
        let stats = |core: &SchedCore| core.ctx.ready_stats;

        // lone job: SR counts the dispatched process, AR is its quantum
        let events = core.arrive(0, job(1, 10, 0, 10, 2));
        assert_eq!(dispatches(&events), vec![(1, 10)]);
        assert_eq!(stats(&core), ReadyStats { sum: 10, avg: 10 });

        // arrivals behind a running job count Ready only
        core.arrive(0, job(2, 10, 0, 20, 2));
        assert_eq!(stats(&core), ReadyStats { sum: 20, avg: 20 });
        core.arrive(0, job(3, 10, 0, 5, 2));
        assert_eq!(stats(&core), ReadyStats { sum: 25, avg: 13 });

        let events = run_internal(&mut core);
        assert_eq!(dispatches(&events), vec![(2, 13)]);
        assert_eq!(stats(&core), ReadyStats { sum: 25, avg: 13 });

        // job 2 requeued with 7 left behind job 3
        let events = run_internal(&mut core);
        assert_eq!(dispatches(&events), vec![(3, 6)]);
        assert_eq!(stats(&core), ReadyStats { sum: 12, avg: 6 });

        let events = run_internal(&mut core);
        assert_eq!(dispatches(&events), vec![(2, 7)]);
        assert_eq!(stats(&core), ReadyStats { sum: 7, avg: 7 });

        let events = run_internal(&mut core);
        assert_eq!(events.last(), Some(&SchedCoreEvent::CpuIdle));
        assert_eq!(stats(&core), ReadyStats { sum: 0, avg: 0 });
    }

    #[test]
    fn long_bursts_saturate_at_the_end_of_time() {
        let half = Ticks::MAX / 2;
        let mut core = SchedCore::new();
        core.reconfigure(0, 100, 0, SchedPolicy::Dynamic);
        for id in 1..=4 {
            core.arrive(0, job(id, 10, 0, half, 2));
        }
        // three Ready bursts of half the range overflow the reported sum
        assert_eq!(core.ctx.ready_stats, ReadyStats { sum: Ticks::MAX, avg: half });

        while core.next_internal().is_some() {
            let events = run_internal(&mut core);
            assert!(dispatches(&events).iter().all(|&(_, q)| q == half));
        }

        let done: Vec<_> = core.finished().iter().map(|r| (r.job, r.completion)).collect();
        assert_eq!(
            done,
            vec![(1, half), (2, 2 * half), (3, Ticks::MAX), (4, Ticks::MAX)]
        );
        assert_eq!(core.ctx.resources.avail_memory(), 100);
    }

    #[test]
    fn rejected_arrival_leaves_no_trace() {
        let mut core = SchedCore::new();
        core.reconfigure(0, 100, 1, SchedPolicy::Dynamic);

        let events = core.arrive(0, job(9, 150, 0, 5, 2));
        assert_eq!(
            events,
            vec![SchedCoreEvent::Rejected { job: 9 }, SchedCoreEvent::CpuIdle]
        );
        assert!(core.ctx.procs.is_empty());
        assert_eq!(core.next_internal(), None);
    }

    #[test]
    fn blocked_arrivals_route_by_priority_class() {
        let mut core = SchedCore::new();
        core.reconfigure(0, 100, 1, SchedPolicy::Static { quantum: 17 });
        core.arrive(0, job(1, 90, 1, 30, 2));
        core.arrive(1, job(2, 40, 0, 5, 1));
        core.arrive(2, job(3, 20, 0, 5, 1));
        core.arrive(3, job(4, 20, 0, 5, 3));

        let snap = core.snapshot(false);
        let jobs = |entries: &[crate::core::QueueEntry]| -> Vec<u64> {
            entries.iter().map(|e| e.job).collect()
        };
        assert_eq!(jobs(&snap.hold_by_size), vec![3, 2]);
        assert_eq!(jobs(&snap.hold_fifo), vec![4]);
        assert_eq!(snap.running.map(|e| e.job), Some(1));
        assert!(snap.intake.is_empty());
    }

    #[test]
    fn hold_queues_drain_after_completion() {
        let mut core = SchedCore::new();
        core.reconfigure(0, 100, 1, SchedPolicy::Static { quantum: 17 });
        core.arrive(0, job(1, 90, 1, 10, 2));
        core.arrive(1, job(2, 40, 0, 5, 1));
        core.arrive(2, job(3, 30, 1, 5, 2));
        core.arrive(3, job(4, 20, 0, 5, 1));

        let events = run_internal(&mut core);
        let admitted: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SchedCoreEvent::ProcStateChange { job, from, to, .. }
                    if *to == ProcState::Ready =>
                {
                    Some((*job, *from))
                }
                _ => None,
            })
            .collect();
        // size queue first (smallest memory at the head), then the FIFO queue
        assert_eq!(
            admitted,
            vec![(4, ProcState::Hold1), (2, ProcState::Hold1), (3, ProcState::Hold2)]
        );
        assert_eq!(dispatches(&events), vec![(4, 17)]);
        assert_eq!(core.ctx.resources.avail_memory(), 10);
    }

    #[test]
    fn reconfigure_discards_everything() {
        let mut core = SchedCore::new();
        core.reconfigure(0, 100, 1, SchedPolicy::Static { quantum: 17 });
        core.arrive(0, job(1, 10, 0, 3, 2));
        run_internal(&mut core);
        core.arrive(4, job(2, 20, 1, 10, 2));
        core.arrive(4, job(3, 90, 0, 10, 2));

        let events = core.reconfigure(5, 50, 2, SchedPolicy::Dynamic);
        assert_eq!(
            events,
            vec![SchedCoreEvent::Reconfigured {
                memory: 50,
                devices: 2,
                policy: SchedKind::Dynamic,
                discarded: 2,
            }]
        );

        let snap = core.snapshot(false);
        assert_eq!(snap.now, 5);
        assert_eq!(snap.running, None);
        assert!(snap.ready.is_empty() && snap.hold_fifo.is_empty());
        assert!(snap.finished.is_empty());
        assert_eq!((snap.avail_memory, snap.avail_devices), (50, 2));
        assert_eq!(core.next_internal(), None);
        assert_eq!(core.policy(), SchedKind::Dynamic);
    }

    #[test]
    fn zero_burst_job_completes_at_its_arrival_instant() {
        let mut core = SchedCore::new();
        core.reconfigure(0, 10, 0, SchedPolicy::Dynamic);

        let events = core.arrive(3, job(1, 1, 0, 0, 2));
        assert_eq!(dispatches(&events), vec![(1, 1)]);
        assert_eq!(core.next_internal(), Some(3));

        run_internal(&mut core);
        assert_eq!(core.finished()[0].completion, 3);
        assert_eq!(core.finished()[0].turnaround, 0);
    }

    #[test]
    fn snapshot_is_a_pure_read() {
        let mut core = SchedCore::new();
        core.reconfigure(0, 100, 1, SchedPolicy::Dynamic);
        core.arrive(0, job(1, 50, 0, 10, 2));
        core.arrive(0, job(2, 60, 0, 10, 2));

        let first = core.snapshot(false);
        let second = core.snapshot(false);
        assert_eq!(first, second);
        assert_eq!(core.next_internal(), Some(10));
        // reconfigure and two arrivals; snapshots are not steps
        assert_eq!(core.observer().steps(), 3);
    }
}
