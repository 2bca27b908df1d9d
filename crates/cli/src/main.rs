//! Pack the benchmark tasks described by a batch configuration into jobs, and write one script
//! per job plus a master script that submits all of them.

use std::path::PathBuf;

use batchfit_scheduler::{
    config::BatchConfig,
    emit::{render_script, DEFAULT_MASTER_SCRIPT},
    Schedule, ScriptEmitter,
};
use clap::Parser;
use error_stack::{Report, ResultExt};
use thiserror::Error;
use tracing::{event, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[clap(version, about)]
pub struct Cli {
    /// The batch configuration file
    config: PathBuf,

    /// The directory to write scripts into
    #[clap(long, short, default_value = "jobs")]
    output: PathBuf,

    /// The file name of the master submission script
    #[clap(long, default_value = DEFAULT_MASTER_SCRIPT)]
    master: String,

    /// Print the scripts instead of writing them
    #[clap(long)]
    dry_run: bool,

    /// Log packing decisions. `RUST_LOG` overrides this.
    #[clap(long, short)]
    verbose: bool,
}

#[derive(Error, Debug)]
enum CliError {
    #[error("Failed to load the batch configuration")]
    Config,
    #[error("Failed to write scripts")]
    Emit,
}

#[tokio::main]
async fn main() -> Result<(), Report<CliError>> {
    let args = Cli::parse();
    configure_tracing(args.verbose);
    run(args).await
}

fn configure_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Cli) -> Result<(), Report<CliError>> {
    let config = BatchConfig::load(&args.config)
        .await
        .change_context(CliError::Config)?;
    let plans = config.plan().await.change_context(CliError::Config)?;

    // Everything is packed before anything is written.
    let schedules = plans
        .iter()
        .map(|plan| {
            let schedule = plan.schedule();
            log_schedule(&plan.name, plan.scale.value(), &schedule);
            (plan.name.as_str(), schedule)
        })
        .collect::<Vec<_>>();

    let emitter = ScriptEmitter::new(&args.output).with_master_script(args.master);
    if args.dry_run {
        print_scripts(&emitter, &schedules);
        return Ok(());
    }

    let mut submission_commands = Vec::new();
    for (name, schedule) in &schedules {
        let emitted = emitter
            .emit_schedule(name, schedule)
            .await
            .change_context(CliError::Emit)?;
        submission_commands.extend(emitted.submission_commands().map(str::to_string));
    }

    let master = emitter
        .write_master(&submission_commands)
        .await
        .change_context(CliError::Emit)?;
    println!("{}", master.display());

    Ok(())
}

fn log_schedule(name: &str, scale: f64, schedule: &Schedule) {
    event!(Level::INFO, input = %name, scale, summary = %schedule.summary(), "packed input");

    for index in schedule.oversubscribed() {
        let job = &schedule.jobs()[index];
        event!(
            Level::WARN,
            input = %name,
            job = index,
            remaining_capacity = job.remaining_capacity(),
            "job exceeds its time budget"
        );
    }
}

fn print_scripts(emitter: &ScriptEmitter, schedules: &[(&str, Schedule)]) {
    let mut submission_commands = Vec::new();
    for (name, schedule) in schedules {
        for script in emitter.render_schedule(name, schedule) {
            println!("==> {} <==", script.path.display());
            print!("{}", script.contents);
            println!();
            submission_commands.push(script.submission_command);
        }
    }

    println!("==> {} <==", emitter.master_script_path().display());
    print!("{}", render_script(&submission_commands));
}
