use crate::{
    core::{Devices, JobId, Memory, ProcId, ProcState, Ticks},
    scheduler::SchedKind,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedCoreEvent {
    Reconfigured {
        memory: Memory,
        devices: Devices,
        policy: SchedKind,
        // In-flight processes dropped by the reset
        discarded: usize,
    },
    // Footprint exceeds total capacity; never enters the arena
    Rejected {
        job: JobId,
    },
    ProcStateChange {
        proc: ProcId,
        job: JobId,
        from: ProcState,
        to: ProcState,
    },
    Dispatched {
        proc: ProcId,
        job: JobId,
        quantum: Ticks,
        slice_end: Ticks,
    },
    // Ready list empty after dispatch attempt
    CpuIdle,
}
