pub mod drr;
pub mod srr;

use crate::core::{
    Ticks,
    state::{KernelCtx, ProcId},
};
pub use drr::DynamicRoundRobin;
pub use srr::StaticRoundRobin;

/// Fixed quantum used when no other value is configured (10 + team number 7).
pub const SRR_QUANTUM_DFL: Ticks = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedKind {
    Static,
    Dynamic,
}

/// Policy selected by a reconfiguration command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedPolicy {
    Static { quantum: Ticks },
    Dynamic,
}

impl SchedPolicy {
    /// `SCHED=1` selects the dynamic policy; any other value is static.
    pub fn from_sched_field(sched: u64, static_quantum: Ticks) -> Self {
        match sched {
            1 => Self::Dynamic,
            _ => Self::Static {
                quantum: static_quantum,
            },
        }
    }

    pub fn kind(&self) -> SchedKind {
        match self {
            Self::Static { .. } => SchedKind::Static,
            Self::Dynamic => SchedKind::Dynamic,
        }
    }

    pub fn build(self) -> Box<dyn Scheduler> {
        match self {
            Self::Static { quantum } => Box::new(StaticRoundRobin::new(quantum)),
            Self::Dynamic => Box::new(DynamicRoundRobin),
        }
    }
}

impl Default for SchedPolicy {
    fn default() -> Self {
        Self::Static {
            quantum: SRR_QUANTUM_DFL,
        }
    }
}

pub trait Scheduler {
    fn kind(&self) -> SchedKind;

    /// Pick the next process to dispatch, removing it from Ready.
    fn select_next(&mut self, ctx: &mut KernelCtx) -> Option<ProcId> {
        ctx.ready_pop()
    }

    /// Quantum fixed by the policy, or `None` when the engine derives it
    /// from live queue state at dispatch time.
    fn fixed_quantum(&self) -> Option<Ticks>;
}
