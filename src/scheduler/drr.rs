use super::{SchedKind, Scheduler, Ticks};

/// Round robin whose quantum tracks the average remaining burst of the
/// runnable set. The quantum itself is computed by `SchedCore` at dispatch.
pub struct DynamicRoundRobin;

impl Scheduler for DynamicRoundRobin {
    fn kind(&self) -> SchedKind {
        SchedKind::Dynamic
    }

    fn fixed_quantum(&self) -> Option<Ticks> {
        None
    }
}
