use super::{SchedKind, Scheduler, Ticks};

/// Round robin with one quantum for the lifetime of a configuration.
pub struct StaticRoundRobin {
    quantum: Ticks,
}

impl StaticRoundRobin {
    pub fn new(quantum: Ticks) -> Self {
        assert!(quantum > 0, "Static round robin requires a non-zero quantum");
        Self { quantum }
    }
}

impl Scheduler for StaticRoundRobin {
    fn kind(&self) -> SchedKind {
        SchedKind::Static
    }

    fn fixed_quantum(&self) -> Option<Ticks> {
        Some(self.quantum)
    }
}
