use super::resources::{Devices, Memory};

pub type Ticks = u64;
pub type JobId = u64;
pub type Priority = u32;

/// Priority class routed to the size-ordered hold queue.
pub const HOLD_BY_SIZE_PRIORITY: Priority = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    New,
    Rejected,
    Hold1,
    Hold2,
    Ready,
    Running,
    Finished,
}

impl ProcState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Finished)
    }
}

/// Payload of an arrival command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSpec {
    pub id: JobId,
    pub memory: Memory,
    pub devices: Devices,
    pub burst: Ticks,
    pub priority: Priority,
}

#[derive(Debug, Clone)]
pub struct Process {
    pub job_id: JobId,
    pub arrival_time: Ticks,
    pub burst: Ticks,
    pub priority: Priority,
    pub memory: Memory,
    pub devices: Devices,

    pub remaining: Ticks,
    pub state: ProcState,
    pub slice_start: Option<Ticks>,
    pub slice_end: Option<Ticks>,
    // Cycles granted to the current slice
    pub granted: Ticks,
    pub completion_time: Option<Ticks>,
}

impl Process {
    pub fn from_spec(spec: JobSpec, arrival_time: Ticks) -> Self {
        Self {
            job_id: spec.id,
            arrival_time,
            burst: spec.burst,
            priority: spec.priority,
            memory: spec.memory,
            devices: spec.devices,
            remaining: spec.burst,
            state: ProcState::New,
            slice_start: None,
            slice_end: None,
            granted: 0,
            completion_time: None,
        }
    }

    /// Grant a slice of at most `quantum` cycles and return when it ends.
    pub fn start_slice(&mut self, now: Ticks, quantum: Ticks) -> Ticks {
        debug_assert!(quantum >= 1, "Job {} dispatched with zero quantum", self.job_id);
        debug_assert!(
            matches!(self.state, ProcState::Ready),
            "Job {} must be Ready before it runs, was {:?}",
            self.job_id,
            self.state
        );

        // The clock stops at Ticks::MAX, so a slice may end early in time
        let run = self.remaining.min(quantum);
        let end = now.saturating_add(run);
        self.slice_start = Some(now);
        self.slice_end = Some(end);
        self.granted = run;
        self.state = ProcState::Running;
        end
    }

    /// Close the current slice at `now`, charging the cycles that actually ran.
    pub fn end_slice(&mut self, now: Ticks) {
        let ran = self.ran_until(now);
        self.remaining = self.remaining.saturating_sub(ran);
        self.slice_start = None;
        self.slice_end = None;
        self.granted = 0;

        if self.remaining == 0 {
            self.state = ProcState::Finished;
            self.completion_time = Some(now);
        } else {
            self.state = ProcState::Ready;
        }
    }

    pub fn complete_at(&mut self, now: Ticks) {
        self.remaining = 0;
        self.state = ProcState::Finished;
        self.completion_time = Some(now);
        self.slice_start = None;
        self.slice_end = None;
        self.granted = 0;
    }

    /// Cycles this slice would consume if it ran until `now`. Reaching the
    /// slice end consumes the whole grant.
    pub fn ran_until(&self, now: Ticks) -> Ticks {
        match (self.slice_start, self.slice_end) {
            (Some(_), Some(end)) if now >= end => self.granted,
            (Some(start), _) => now.saturating_sub(start),
            _ => 0,
        }
    }

    pub fn turnaround(&self) -> Option<Ticks> {
        self.completion_time
            .map(|done| done.saturating_sub(self.arrival_time))
    }

    pub fn waiting(&self) -> Option<Ticks> {
        self.turnaround().map(|t| t.saturating_sub(self.burst))
    }
}
