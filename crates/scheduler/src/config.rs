//! Batch configuration files.
//!
//! A batch configuration describes one capacity profile and a list of benchmark inputs, each
//! with its own task list. Loading a configuration validates every task, so a configuration that
//! loads successfully can always be scheduled.

use std::{collections::HashSet, path::Path};

use error_stack::{Report, ResultExt};
use serde::Deserialize;
use tracing::{event, instrument, Level};

use crate::{
    pack,
    profile::DEFAULT_SUBMIT_TOOL,
    scale::{parse_size, ScaleFactor},
    CapacityProfile, ConfigError, JobFactory, Schedule, TaskSpec, ValidationError,
};

fn default_submit_tool() -> String {
    DEFAULT_SUBMIT_TOOL.to_string()
}

/// The submission settings for every job in the batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    #[serde(default = "default_submit_tool")]
    pub submit_tool: String,
    /// The partition to submit to.
    pub queue: String,
    /// A node feature constraint, if the queue has mixed node types.
    #[serde(default)]
    pub constraint: Option<String>,
    /// Memory to reserve, in whatever format the submission tool accepts.
    #[serde(default)]
    pub memory: Option<String>,
    /// Reserve the whole node for each job.
    #[serde(default)]
    pub exclusive: bool,
    /// Flags passed through to the submission tool after the generated ones.
    #[serde(default)]
    pub extra_flags: Vec<String>,
    /// The time budget of each job, in seconds.
    pub total_capacity: i64,
    pub setup_task: TaskSpec,
}

impl ProfileConfig {
    /// The flags for the submission tool, in the order constraint, queue, memory, exclusive,
    /// then any extra flags.
    pub fn submission_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if let Some(constraint) = &self.constraint {
            flags.push("-C".to_string());
            flags.push(constraint.clone());
        }

        flags.push("-p".to_string());
        flags.push(self.queue.clone());

        if let Some(memory) = &self.memory {
            flags.push(format!("--mem={memory}"));
        }

        if self.exclusive {
            flags.push("--exclusive".to_string());
        }

        flags.extend(self.extra_flags.iter().cloned());
        flags
    }

    pub fn to_profile(&self) -> Result<CapacityProfile, Report<ValidationError>> {
        Ok(CapacityProfile::new(
            self.total_capacity,
            self.submission_flags(),
            self.setup_task.clone(),
        )?
        .with_submit_tool(self.submit_tool.clone()))
    }
}

/// One benchmark input and the tasks to run against it.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    /// Used to name the job scripts for this input.
    pub name: String,
    /// The input size, such as `400Mi`. Takes precedence over `path`.
    #[serde(default)]
    pub size: Option<String>,
    /// The input file. Its length is used as the input size when `size` is not set.
    #[serde(default)]
    pub path: Option<std::path::PathBuf>,
    /// Replaces the profile's setup task for this input's jobs.
    #[serde(default)]
    pub setup_task: Option<TaskSpec>,
    pub tasks: Vec<TaskSpec>,
}

impl InputConfig {
    /// Determine the size of the input, if the configuration says anything about it.
    async fn observed_size(&self) -> Result<Option<u64>, Report<ConfigError>> {
        if let Some(size) = &self.size {
            return parse_size(size)
                .map(Some)
                .change_context(ConfigError::InputSize)
                .attach_printable_lazy(|| format!("Input {}", self.name));
        }

        if let Some(path) = &self.path {
            let metadata = tokio::fs::metadata(path)
                .await
                .change_context(ConfigError::InputSize)
                .attach_printable_lazy(|| path.display().to_string())?;
            return Ok(Some(metadata.len()));
        }

        Ok(None)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// The input size the task duration estimates were measured against. When this is not set,
    /// durations are used as given.
    #[serde(default)]
    pub reference_size: Option<String>,
    pub profile: ProfileConfig,
    pub inputs: Vec<InputConfig>,
}

impl BatchConfig {
    pub fn from_json(json: &str) -> Result<Self, Report<ConfigError>> {
        serde_json::from_str(json).change_context(ConfigError::Parse)
    }

    #[instrument(level = "debug")]
    pub async fn load(path: &Path) -> Result<Self, Report<ConfigError>> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .change_context(ConfigError::Read)
            .attach_printable_lazy(|| path.display().to_string())?;

        Self::from_json(&contents).attach_printable_lazy(|| path.display().to_string())
    }

    /// Resolve the configuration into one [InputPlan] per input. Every input is checked before
    /// any plan is returned, so an invalid input never leaves a partial set of plans.
    pub async fn plan(&self) -> Result<Vec<InputPlan>, Report<ConfigError>> {
        let profile = self
            .profile
            .to_profile()
            .change_context(ConfigError::Invalid)
            .attach_printable("Invalid profile")?;

        let reference_size = self
            .reference_size
            .as_deref()
            .map(parse_size)
            .transpose()
            .change_context(ConfigError::Invalid)
            .attach_printable("Invalid reference size")?;

        let mut seen = HashSet::new();
        let mut plans = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            check_input_name(&input.name)?;
            if !seen.insert(input.name.as_str()) {
                return Err(Report::new(ConfigError::Invalid))
                    .attach_printable_lazy(|| format!("Duplicate input name {}", input.name));
            }

            let observed_size = input.observed_size().await?;
            let scale = match (observed_size, reference_size) {
                (Some(observed), Some(reference)) => {
                    ScaleFactor::from_sizes(observed, reference)
                        .change_context(ConfigError::Invalid)
                        .attach_printable_lazy(|| format!("Input {}", input.name))?
                }
                _ => ScaleFactor::IDENTITY,
            };

            event!(Level::DEBUG, input = %input.name, scale = scale.value(), "planned input");
            plans.push(InputPlan::new(&profile, input, scale));
        }

        Ok(plans)
    }
}

fn check_input_name(name: &str) -> Result<(), Report<ConfigError>> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(Report::new(ConfigError::Invalid))
            .attach_printable_lazy(|| format!("Input name {name:?} can't be used in a file name"));
    }

    Ok(())
}

/// The rescaled tasks and job factory for a single input.
#[derive(Debug, Clone)]
pub struct InputPlan {
    pub name: String,
    pub scale: ScaleFactor,
    pub tasks: Vec<TaskSpec>,
    pub factory: JobFactory,
}

impl InputPlan {
    fn new(profile: &CapacityProfile, input: &InputConfig, scale: ScaleFactor) -> Self {
        let profile = match &input.setup_task {
            Some(setup) => profile.with_setup_task(setup.clone()),
            None => profile.clone(),
        };

        InputPlan {
            name: input.name.clone(),
            scale,
            tasks: input.tasks.iter().map(|t| t.rescaled(scale)).collect(),
            factory: JobFactory::new(profile.rescaled(scale)),
        }
    }

    pub fn schedule(&self) -> Schedule {
        pack(self.tasks.iter().cloned(), &self.factory)
    }
}
