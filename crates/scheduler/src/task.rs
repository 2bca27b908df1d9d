use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};

use crate::{scale::ScaleFactor, ValidationError};

/// A single external command and an estimate of how long it will run, in seconds.
///
/// A `TaskSpec` can only be built through validation, so holding one means the command is
/// non-empty and the duration is not negative. Deserialization goes through the same checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTaskSpec")]
pub struct TaskSpec {
    command: Vec<String>,
    estimated_duration: i64,
}

#[derive(Deserialize)]
struct RawTaskSpec {
    command: Vec<String>,
    estimated_duration: i64,
}

impl TryFrom<RawTaskSpec> for TaskSpec {
    type Error = Report<ValidationError>;

    fn try_from(raw: RawTaskSpec) -> Result<Self, Self::Error> {
        TaskSpec::new(raw.command, raw.estimated_duration)
    }
}

impl TaskSpec {
    /// Create a task, failing if the command is empty or the duration is negative.
    pub fn new<S: Into<String>>(
        command: impl IntoIterator<Item = S>,
        estimated_duration: i64,
    ) -> Result<Self, Report<ValidationError>> {
        let command = command.into_iter().map(Into::into).collect::<Vec<String>>();
        if command.is_empty() {
            return Err(Report::new(ValidationError::EmptyCommand));
        }

        if estimated_duration < 0 {
            return Err(Report::new(ValidationError::NegativeDuration(
                estimated_duration,
            )))
            .attach_printable_lazy(|| format!("Command: {}", command.join(" ")));
        }

        Ok(TaskSpec {
            command,
            estimated_duration,
        })
    }

    /// A staging task that copies `from` to `to`. Copies are treated as free.
    pub fn copy_file(from: impl Into<String>, to: impl Into<String>) -> Self {
        TaskSpec {
            command: vec!["cp".to_string(), from.into(), to.into()],
            estimated_duration: 0,
        }
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// The estimated run time in seconds.
    pub fn estimated_duration(&self) -> i64 {
        self.estimated_duration
    }

    /// The command as a single line of a shell script.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }

    /// Return a copy of this task with its duration scaled by `factor`.
    pub fn rescaled(&self, factor: ScaleFactor) -> TaskSpec {
        TaskSpec {
            command: self.command.clone(),
            estimated_duration: factor.apply(self.estimated_duration),
        }
    }
}

/// Validate a whole task list at once. The first invalid entry aborts the list, identified by
/// its index.
pub fn validate_all<S: Into<String>, C: IntoIterator<Item = S>>(
    tasks: impl IntoIterator<Item = (C, i64)>,
) -> Result<Vec<TaskSpec>, Report<ValidationError>> {
    tasks
        .into_iter()
        .enumerate()
        .map(|(index, (command, duration))| {
            TaskSpec::new(command, duration).attach_printable_lazy(|| format!("Task index {index}"))
        })
        .collect()
}
