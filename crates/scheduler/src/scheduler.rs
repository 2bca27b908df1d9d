//! Next-fit packing of tasks into jobs.
//!
//! Only the most recently opened job accepts tasks. When a task doesn't fit, that job is sealed
//! and a new one is opened, so jobs line up with sequential submission slots and a sealed job
//! is never revisited. Tasks are never reordered.

use std::fmt::Display;

use tracing::{event, instrument, Level};

use crate::{Job, JobFactory, OpenJob, TaskSpec};

/// Streams tasks into jobs. Push tasks in order with [Packer::push], then call
/// [Packer::finish] to seal the last job and get the [Schedule].
#[derive(Debug)]
pub struct Packer<'a> {
    factory: &'a JobFactory,
    current: OpenJob,
    sealed: Vec<Job>,
}

impl<'a> Packer<'a> {
    /// Start packing. This opens the first job right away, so even an empty task list produces
    /// one job.
    pub fn new(factory: &'a JobFactory) -> Self {
        let current = factory.open_job();
        event!(Level::DEBUG, job_index = 0, "opened job");
        Packer {
            factory,
            current,
            sealed: Vec::new(),
        }
    }

    /// Add the next task. If it doesn't fit into the current job, the current job is sealed and
    /// the task goes into a new one, even if it doesn't fit there either.
    ///
    /// A job that holds nothing but its setup task is never sealed, so a task larger than the
    /// whole budget lands in the job that is already open instead of leaving a setup-only job
    /// behind.
    pub fn push(&mut self, task: TaskSpec) {
        if self.current.num_tasks() > 0 && !self.current.can_admit(&task) {
            let full = std::mem::replace(&mut self.current, self.factory.open_job());
            seal_into(&mut self.sealed, full);
            event!(Level::DEBUG, job_index = self.sealed.len(), "opened job");
        }

        self.current.admit(task);
    }

    /// Seal the current job and return the finished schedule.
    pub fn finish(self) -> Schedule {
        let Packer {
            current,
            mut sealed,
            ..
        } = self;
        seal_into(&mut sealed, current);
        Schedule { jobs: sealed }
    }
}

fn seal_into(sealed: &mut Vec<Job>, job: OpenJob) {
    let job = job.seal();
    event!(
        Level::DEBUG,
        job_index = sealed.len(),
        num_tasks = job.tasks().len(),
        remaining_capacity = job.remaining_capacity(),
        "sealed job"
    );
    sealed.push(job);
}

/// Pack `tasks` into jobs from `factory`, in order.
#[instrument(level = "debug", skip_all, fields(capacity = factory.profile().total_capacity()))]
pub fn pack(tasks: impl IntoIterator<Item = TaskSpec>, factory: &JobFactory) -> Schedule {
    let mut packer = Packer::new(factory);
    for task in tasks {
        packer.push(task);
    }

    let schedule = packer.finish();
    event!(Level::DEBUG, summary = %schedule.summary(), "packed schedule");
    schedule
}

/// The sealed jobs produced by one packing pass. A schedule always holds at least one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    jobs: Vec<Job>,
}

impl Schedule {
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn into_jobs(self) -> Vec<Job> {
        self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Always false, since packing opens a job even for an empty task list.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Job> {
        self.jobs.iter()
    }

    /// The packed tasks in schedule order, excluding setup tasks. This is the same sequence
    /// that was passed to the packer.
    pub fn input_tasks(&self) -> impl Iterator<Item = &TaskSpec> {
        self.jobs.iter().flat_map(|job| job.tasks())
    }

    /// Indices of the jobs whose estimated duration exceeds their capacity.
    pub fn oversubscribed(&self) -> Vec<usize> {
        self.jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| job.is_oversubscribed())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn summary(&self) -> ScheduleSummary {
        ScheduleSummary {
            num_jobs: self.jobs.len(),
            num_tasks: self.jobs.iter().map(|job| job.tasks().len()).sum(),
            estimated_duration: self.jobs.iter().map(|job| job.estimated_duration()).sum(),
            num_oversubscribed: self.jobs.iter().filter(|job| job.is_oversubscribed()).count(),
        }
    }
}

impl<'a> IntoIterator for &'a Schedule {
    type Item = &'a Job;
    type IntoIter = std::slice::Iter<'a, Job>;

    fn into_iter(self) -> Self::IntoIter {
        self.jobs.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub num_jobs: usize,
    /// Packed tasks, not counting setup tasks.
    pub num_tasks: usize,
    /// Estimated seconds across all jobs, including setup tasks.
    pub estimated_duration: i64,
    pub num_oversubscribed: usize,
}

impl Display for ScheduleSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} tasks in {} jobs, {}s estimated",
            self.num_tasks, self.num_jobs, self.estimated_duration
        )?;

        if self.num_oversubscribed > 0 {
            write!(f, ", {} oversubscribed", self.num_oversubscribed)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
