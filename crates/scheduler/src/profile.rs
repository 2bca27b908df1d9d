use error_stack::{Report, ResultExt};

use crate::{scale::ScaleFactor, TaskSpec, ValidationError};

/// The submission tool used when a profile doesn't name one.
pub const DEFAULT_SUBMIT_TOOL: &str = "sbatch";

/// Everything that distinguishes one kind of job submission from another: the time budget of a
/// single job, the flags handed to the submission tool, and the setup task that every job runs
/// first.
///
/// Profiles are plain data. Different queues or node types are different values of this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityProfile {
    submit_tool: String,
    total_capacity: i64,
    submission_flags: Vec<String>,
    setup_task: TaskSpec,
}

impl CapacityProfile {
    pub fn new(
        total_capacity: i64,
        submission_flags: Vec<String>,
        setup_task: TaskSpec,
    ) -> Result<Self, Report<ValidationError>> {
        if total_capacity <= 0 {
            return Err(Report::new(ValidationError::ZeroCapacity))
                .attach_printable_lazy(|| format!("Capacity {total_capacity}"));
        }

        Ok(CapacityProfile {
            submit_tool: DEFAULT_SUBMIT_TOOL.to_string(),
            total_capacity,
            submission_flags,
            setup_task,
        })
    }

    /// Use a submission tool other than [DEFAULT_SUBMIT_TOOL].
    pub fn with_submit_tool(mut self, submit_tool: impl Into<String>) -> Self {
        self.submit_tool = submit_tool.into();
        self
    }

    /// Replace the setup task, keeping the rest of the profile.
    pub fn with_setup_task(&self, setup_task: TaskSpec) -> Self {
        CapacityProfile {
            setup_task,
            ..self.clone()
        }
    }

    /// Scale the setup task's duration. The capacity itself is a property of the execution
    /// environment and is left alone.
    pub fn rescaled(&self, factor: ScaleFactor) -> Self {
        self.with_setup_task(self.setup_task.rescaled(factor))
    }

    pub fn submit_tool(&self) -> &str {
        &self.submit_tool
    }

    /// The time budget of a single job, in seconds.
    pub fn total_capacity(&self) -> i64 {
        self.total_capacity
    }

    pub fn submission_flags(&self) -> &[String] {
        &self.submission_flags
    }

    pub fn setup_task(&self) -> &TaskSpec {
        &self.setup_task
    }
}
