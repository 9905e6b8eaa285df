pub mod engine;

pub use engine::driver::run;
pub use engine::outcome::{RunReport, WorkerError, WorkerOutcome};
pub use engine::worker::OPEN_CONNECTIONS;
