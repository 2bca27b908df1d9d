//! Write job scripts and the master script that submits them.
//!
//! Every job in a [Schedule] becomes one script named after the input it came from and its
//! position in the schedule. The master script holds one submission command per job script.

use std::path::{Path, PathBuf};

use error_stack::{Report, ResultExt};
use futures::future::try_join_all;
use tracing::{event, instrument, Level};

use crate::{EmitError, Schedule};

/// The first line of every emitted script.
pub const INTERPRETER_MARKER: &str = "#!/bin/bash";

pub const DEFAULT_MASTER_SCRIPT: &str = "submit.sh";

/// Join lines into a script, starting with [INTERPRETER_MARKER].
pub fn render_script<S: AsRef<str>>(lines: impl IntoIterator<Item = S>) -> String {
    let mut script = String::from(INTERPRETER_MARKER);
    script.push('\n');
    for line in lines {
        script.push_str(line.as_ref());
        script.push('\n');
    }
    script
}

/// The file name for job `index` of `input_name`'s schedule.
pub fn job_script_name(input_name: &str, index: usize) -> String {
    format!("{input_name}-job{index:03}.sh")
}

/// A rendered job script and the command that submits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobScript {
    pub path: PathBuf,
    pub contents: String,
    pub submission_command: String,
}

/// The scripts written for one input's schedule, in job order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedSchedule {
    pub input_name: String,
    pub scripts: Vec<JobScript>,
}

impl EmittedSchedule {
    /// The submission command for each script, in the order they belong in the master script.
    pub fn submission_commands(&self) -> impl Iterator<Item = &str> {
        self.scripts.iter().map(|s| s.submission_command.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ScriptEmitter {
    output_dir: PathBuf,
    master_script: String,
}

impl ScriptEmitter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        ScriptEmitter {
            output_dir: output_dir.into(),
            master_script: DEFAULT_MASTER_SCRIPT.to_string(),
        }
    }

    /// Name the master script something other than [DEFAULT_MASTER_SCRIPT].
    pub fn with_master_script(mut self, name: impl Into<String>) -> Self {
        self.master_script = name.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn job_script_path(&self, input_name: &str, index: usize) -> PathBuf {
        self.output_dir.join(job_script_name(input_name, index))
    }

    pub fn master_script_path(&self) -> PathBuf {
        self.output_dir.join(&self.master_script)
    }

    /// Render the scripts for a schedule without writing anything.
    pub fn render_schedule(&self, input_name: &str, schedule: &Schedule) -> Vec<JobScript> {
        schedule
            .iter()
            .enumerate()
            .map(|(index, job)| {
                let path = self.job_script_path(input_name, index);
                JobScript {
                    contents: render_script(job.render()),
                    submission_command: job.submission_command(&path),
                    path,
                }
            })
            .collect()
    }

    /// Write one script per job in the schedule. The scripts are written concurrently. If any of
    /// them fails, the error is returned and scripts that were already written are left alone.
    #[instrument(level = "debug", skip(self, schedule), fields(output_dir = %self.output_dir.display()))]
    pub async fn emit_schedule(
        &self,
        input_name: &str,
        schedule: &Schedule,
    ) -> Result<EmittedSchedule, Report<EmitError>> {
        self.create_output_dir().await?;

        let scripts = self.render_schedule(input_name, schedule);
        let writes = scripts.iter().map(|script| async move {
            write_script(&script.path, &script.contents)
                .await
                .change_context(EmitError::WriteJobScript)
                .attach_printable_lazy(|| script.path.display().to_string())
        });
        try_join_all(writes).await?;

        event!(Level::INFO, %input_name, num_scripts = scripts.len(), "wrote job scripts");
        Ok(EmittedSchedule {
            input_name: input_name.to_string(),
            scripts,
        })
    }

    /// Write the master script, which runs each submission command in order.
    #[instrument(level = "debug", skip_all, fields(output_dir = %self.output_dir.display()))]
    pub async fn write_master<S: AsRef<str>>(
        &self,
        submission_commands: impl IntoIterator<Item = S>,
    ) -> Result<PathBuf, Report<EmitError>> {
        self.create_output_dir().await?;

        let path = self.master_script_path();
        write_script(&path, &render_script(submission_commands))
            .await
            .change_context(EmitError::WriteMasterScript)
            .attach_printable_lazy(|| path.display().to_string())?;

        event!(Level::INFO, path = %path.display(), "wrote master script");
        Ok(path)
    }

    async fn create_output_dir(&self) -> Result<(), Report<EmitError>> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .change_context(EmitError::CreateOutputDir)
            .attach_printable_lazy(|| self.output_dir.display().to_string())
    }
}

async fn write_script(path: &Path, contents: &str) -> std::io::Result<()> {
    tokio::fs::write(path, contents).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
    }

    Ok(())
}
