use std::path::Path;
use std::time::Duration;

use loadfarm_common::config::AppConfig;
use loadfarm_execution::controller::{ControllerClient, SubmitOutcome};
use loadfarm_execution::job::Job;
use loadfarm_telemetry::telemetry::{init_telemetry, ResourceOptions};

use crate::command::{build_runtime, read_task};

const JOB_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Submits a job to a running controller and optionally waits for it to finish.
pub(crate) fn run_submit(
    job: &Path,
    controller: Option<String>,
    wait: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_telemetry(ResourceOptions { kind: "submit" })?;
    let base_url = controller.unwrap_or_else(|| {
        let port = match config.controller.external_port {
            0 => config.controller.listen_port,
            port => port,
        };
        format!("http://{}:{port}", config.controller.external_host)
    });
    let client = ControllerClient::with_base_url(base_url);
    let job = Job::new(read_task(job)?);
    build_runtime()?.block_on(submit_job(&client, &job, wait))
}

async fn submit_job(
    client: &ControllerClient,
    job: &Job,
    wait: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let job_id = job.job_id;
    if let SubmitOutcome::Rejected(rejection) = client.submit_job(job).await? {
        return Err(format!("job {job_id} rejected: {rejection}").into());
    }
    println!("job {job_id} accepted");
    if !wait {
        return Ok(());
    }
    loop {
        let Some(status) = client.get_job(job_id).await? else {
            return Err(format!("job {job_id} is unknown to the controller").into());
        };
        if let Some(duration) = status.final_duration {
            println!(
                "job {job_id} completed {} quanta, total duration {duration:?}",
                status.compute_quanta_completed()
            );
            return Ok(());
        }
        tokio::time::sleep(JOB_POLL_INTERVAL).await;
    }
}
