pub mod config;
pub mod core;
pub mod error;
pub mod scheduler;
pub mod sim;

pub use config::SimConfig;
pub use crate::core::{SchedCore, SchedCoreEvent};
pub use error::SimError;
pub use scheduler::{SchedPolicy, Scheduler};
pub use sim::{Command, Sim};
