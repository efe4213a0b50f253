use super::{
    process::{ProcState, Ticks},
    queues::QueueKind,
    state::KernelCtx,
};

/// Debug-build consistency checks run after every engine step.
#[derive(Debug, Default)]
pub struct Observer {
    step: u64,
}

impl Observer {
    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn steps(&self) -> u64 {
        self.step
    }

    pub fn observe(&mut self, ctx: &KernelCtx, next_internal: Option<Ticks>) {
        self.step += 1;

        match ctx.running {
            Some(proc_id) => {
                let proc = ctx.proc(proc_id);
                debug_assert_eq!(
                    proc.state,
                    ProcState::Running,
                    "running slot holds job {} in state {:?}",
                    proc.job_id,
                    proc.state
                );
                debug_assert_eq!(
                    ctx.queues.location(proc_id),
                    None,
                    "Running job {} must not appear in any queue",
                    proc.job_id
                );
                debug_assert_eq!(
                    proc.slice_end, next_internal,
                    "Next internal event must be the running slice end"
                );
            }
            None => debug_assert_eq!(next_internal, None, "Idle CPU with a pending slice end"),
        }

        let mut enqueued = 0;
        for (proc_id, kind) in ctx.queues.memberships() {
            enqueued += 1;
            let proc = ctx.proc(proc_id);
            let expected = match kind {
                QueueKind::Intake => ProcState::New,
                QueueKind::HoldBySize => ProcState::Hold1,
                QueueKind::HoldFifo => ProcState::Hold2,
                QueueKind::Ready => ProcState::Ready,
            };
            debug_assert_eq!(
                proc.state, expected,
                "Job {} in {kind:?} has state {:?}",
                proc.job_id, proc.state
            );
        }
        let queued: usize = [
            QueueKind::Intake,
            QueueKind::HoldBySize,
            QueueKind::HoldFifo,
            QueueKind::Ready,
        ]
        .into_iter()
        .map(|kind| ctx.queues.len(kind))
        .sum();
        debug_assert_eq!(queued, enqueued, "Queue contents and membership disagree");

        for (_, proc) in &ctx.procs {
            debug_assert!(
                proc.remaining <= proc.burst,
                "Job {} has more work left than its burst",
                proc.job_id
            );
            debug_assert!(
                proc.remaining > 0 || proc.burst == 0 || proc.state == ProcState::Finished,
                "Job {} exhausted its burst without finishing",
                proc.job_id
            );
        }
        for &proc_id in &ctx.finished {
            debug_assert_eq!(ctx.proc(proc_id).state, ProcState::Finished);
        }

        let ledger = &ctx.resources;
        let (memory, devices) = ctx.allocated();
        debug_assert_eq!(
            ledger.avail_memory() + memory,
            ledger.total_memory(),
            "Memory not conserved at t={}",
            ctx.now
        );
        debug_assert_eq!(
            ledger.avail_devices() + devices,
            ledger.total_devices(),
            "Devices not conserved at t={}",
            ctx.now
        );
    }
}
