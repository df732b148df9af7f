use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::command::{run_controller, run_local, run_submit, run_worker};

#[derive(Parser)]
#[command(version, name = "loadfarm")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the controller server
    Controller,
    /// Start a worker that registers with the controller
    Worker,
    /// Run a job on a cluster inside this process
    Local {
        /// The JSON file that describes the task
        #[arg(long)]
        job: PathBuf,
        /// The number of workers, overriding the configuration
        #[arg(long)]
        workers: Option<usize>,
        /// The number of seconds to wait for the job to finish
        #[arg(long, default_value_t = 3600)]
        timeout_secs: u64,
    },
    /// Submit a job to a running controller
    Submit {
        /// The JSON file that describes the task
        #[arg(long)]
        job: PathBuf,
        /// The controller URL, e.g. `http://127.0.0.1:7070`
        #[arg(long)]
        controller: Option<String>,
        /// Wait for the job to finish
        #[arg(long)]
        wait: bool,
    },
}

pub fn main(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_from(args);

    match cli.command {
        Command::Controller => run_controller(),
        Command::Worker => run_worker(),
        Command::Local {
            job,
            workers,
            timeout_secs,
        } => run_local(&job, workers, Duration::from_secs(timeout_secs)),
        Command::Submit {
            job,
            controller,
            wait,
        } => run_submit(&job, controller, wait),
    }
}
