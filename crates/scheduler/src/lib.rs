//! Pack benchmark tasks into batch jobs that fit a per-job time budget, and write the scripts
//! that submit them.
//!
//! Tasks carry an estimated duration. The [Packer] places them, in order, into jobs created
//! by a [JobFactory]. Every job starts with the profile's setup task and closes once the next
//! task no longer fits. A [ScriptEmitter] then writes one script per job plus a master script
//! with the submission command for each of them.

pub mod config;
pub mod emit;
mod error;
mod job;
mod profile;
pub mod scale;
mod scheduler;
mod task;
#[cfg(test)]
mod test_util;

pub use emit::{EmittedSchedule, JobScript, ScriptEmitter, INTERPRETER_MARKER};
pub use error::{ConfigError, EmitError, ValidationError};
pub use job::{Job, JobFactory, OpenJob};
pub use profile::{CapacityProfile, DEFAULT_SUBMIT_TOOL};
pub use scale::{rescale, ScaleFactor};
pub use scheduler::{pack, Packer, Schedule, ScheduleSummary};
pub use task::{validate_all, TaskSpec};
