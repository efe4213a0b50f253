pub mod driver;
pub mod event;
pub mod observer;
pub mod process;
pub mod queues;
pub mod resources;
pub mod snapshot;
pub mod state;

pub use driver::SchedCore;
pub use event::SchedCoreEvent;
pub use process::{JobId, JobSpec, Priority, ProcState, Process, Ticks};
pub use queues::{QueueKind, QueueSet};
pub use resources::{Devices, Memory, ResourceLedger};
pub use snapshot::{FinishedRow, QueueEntry, Snapshot};
pub use state::{KernelCtx, ProcId, ReadyStats, Route};
