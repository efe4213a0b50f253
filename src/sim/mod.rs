pub mod command;
pub mod driver;
pub mod report;
pub mod workload;

pub use command::{Command, CommandReader};
pub use driver::Sim;
pub use report::{RecordingSink, ReportSink, TextReport};
pub use workload::Workload;
