use std::{path::Path, sync::Arc};

use tracing::{event, Level};

use crate::{CapacityProfile, TaskSpec};

/// Creates jobs that all share one [CapacityProfile]. Every job it opens starts with the
/// profile's setup task already admitted.
#[derive(Debug, Clone)]
pub struct JobFactory {
    profile: Arc<CapacityProfile>,
}

impl JobFactory {
    pub fn new(profile: CapacityProfile) -> Self {
        JobFactory {
            profile: Arc::new(profile),
        }
    }

    pub fn profile(&self) -> &CapacityProfile {
        &self.profile
    }

    /// Open a fresh job, seeded with the setup task.
    pub fn open_job(&self) -> OpenJob {
        OpenJob::new(self.profile.clone())
    }
}

/// A job that is still accepting tasks. Call [OpenJob::seal] to turn it into an immutable
/// [Job].
#[derive(Debug)]
pub struct OpenJob {
    tasks: Vec<TaskSpec>,
    remaining_capacity: i64,
    profile: Arc<CapacityProfile>,
}

impl OpenJob {
    /// Create a new job. The profile's setup task is admitted before anything else.
    pub fn new(profile: Arc<CapacityProfile>) -> OpenJob {
        let mut job = OpenJob {
            tasks: Vec::new(),
            remaining_capacity: profile.total_capacity(),
            profile,
        };

        let setup = job.profile.setup_task().clone();
        job.admit(setup);
        job
    }

    /// Return true if the task fits in the remaining capacity.
    pub fn can_admit(&self, task: &TaskSpec) -> bool {
        self.remaining_capacity >= task.estimated_duration()
    }

    /// Add a task to the job. This does not check [OpenJob::can_admit], so the remaining
    /// capacity can go negative when a task is larger than the job's budget.
    pub fn admit(&mut self, task: TaskSpec) {
        self.remaining_capacity -= task.estimated_duration();
        self.tasks.push(task);
        if self.remaining_capacity < 0 {
            event!(
                Level::WARN,
                remaining_capacity = self.remaining_capacity,
                "job is oversubscribed"
            );
        }
    }

    pub fn remaining_capacity(&self) -> i64 {
        self.remaining_capacity
    }

    /// The number of tasks admitted so far, not counting the setup task.
    pub fn num_tasks(&self) -> usize {
        self.tasks.len() - 1
    }

    pub fn render(&self) -> Vec<String> {
        render_tasks(&self.tasks)
    }

    /// Close the job. A sealed job can't accept any more tasks.
    pub fn seal(self) -> Job {
        Job {
            tasks: self.tasks,
            remaining_capacity: self.remaining_capacity,
            profile: self.profile,
        }
    }
}

/// A sealed job in a [Schedule](crate::Schedule).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// The setup task followed by the admitted tasks, in admission order.
    tasks: Vec<TaskSpec>,
    remaining_capacity: i64,
    profile: Arc<CapacityProfile>,
}

impl Job {
    /// The tasks admitted by the packer, without the setup task.
    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks[1..]
    }

    /// Every task the job will run, starting with the setup task.
    pub fn all_tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }

    pub fn setup_task(&self) -> &TaskSpec {
        &self.tasks[0]
    }

    /// Unused capacity in seconds. This is negative when the job holds a task larger than its
    /// budget.
    pub fn remaining_capacity(&self) -> i64 {
        self.remaining_capacity
    }

    pub fn is_oversubscribed(&self) -> bool {
        self.remaining_capacity < 0
    }

    /// Total estimated run time of the job, including the setup task.
    pub fn estimated_duration(&self) -> i64 {
        self.tasks.iter().map(|t| t.estimated_duration()).sum()
    }

    pub fn profile(&self) -> &CapacityProfile {
        &self.profile
    }

    /// One command line per task, setup task first.
    pub fn render(&self) -> Vec<String> {
        render_tasks(&self.tasks)
    }

    /// The command that submits the script at `script_path` with this job's profile.
    pub fn submission_command(&self, script_path: impl AsRef<Path>) -> String {
        let mut parts = Vec::with_capacity(self.profile.submission_flags().len() + 2);
        parts.push(self.profile.submit_tool().to_string());
        parts.extend(self.profile.submission_flags().iter().cloned());
        parts.push(script_path.as_ref().to_string_lossy().into_owned());
        parts.join(" ")
    }
}

fn render_tasks(tasks: &[TaskSpec]) -> Vec<String> {
    tasks.iter().map(|task| task.command_line()).collect()
}
