use std::time::Duration;

use loadfarm_common::config::AppConfig;
use loadfarm_execution::controller::entrypoint::serve_controller;
use loadfarm_execution::controller::{
    ControllerClient, ControllerOptions, SubmitOutcome, SubmitRejection,
};
use loadfarm_execution::job::{Job, KeyGeneratorDescriptor, Task, ValueGeneratorDescriptor};
use loadfarm_execution::worker::{WorkerActor, WorkerEvent, WorkerOptions};
use loadfarm_server::actor::ActorSystem;
use tokio::net::TcpListener;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const MAX_POLLS: usize = 500;

#[tokio::test]
async fn test_job_over_http() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load()?;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let options = ControllerOptions::new(&config);
    let (stop_controller, stopped) = tokio::sync::oneshot::channel::<()>();
    let controller = tokio::spawn(async move {
        serve_controller(&options, listener, async {
            let _ = stopped.await;
        })
        .await
    });

    config.worker.controller_port = port;
    let mut system = ActorSystem::new();
    let worker = system.spawn::<WorkerActor>(WorkerOptions::try_new(&config)?);

    let client = ControllerClient::with_base_url(format!("http://127.0.0.1:{port}"));
    let job = Job::new(Task {
        key_generator: KeyGeneratorDescriptor::Random {
            size: 8,
            seed: None,
        },
        value_generator: ValueGeneratorDescriptor::Zero { size: 32 },
        column: "value".to_string(),
        num_quanta: 100,
        batch_size: 10,
        progress_report_interval: 20,
    });
    let job_id = job.job_id;

    // The job is rejected until the worker has registered with the controller.
    let mut polls = 0;
    loop {
        match client.submit_job(&job).await? {
            SubmitOutcome::Accepted(accepted) => {
                assert_eq!(accepted, job);
                break;
            }
            SubmitOutcome::Rejected(SubmitRejection::NoCapacity) if polls < MAX_POLLS => {
                polls += 1;
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            SubmitOutcome::Rejected(rejection) => return Err(rejection.to_string().into()),
        }
    }
    assert_eq!(
        client.submit_job(&job).await?,
        SubmitOutcome::Rejected(SubmitRejection::DuplicateJob)
    );

    let status = loop {
        match client.get_job(job_id).await? {
            Some(status) if status.final_duration.is_some() => break status,
            _ if polls >= MAX_POLLS => return Err("the job did not finish".into()),
            _ => {
                polls += 1;
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
    };
    assert_eq!(status.partitions.len(), 1);
    assert_eq!(status.compute_quanta_completed(), 100);
    assert_eq!(client.list_jobs().await?, vec![job_id]);

    let _ = worker.send(WorkerEvent::Shutdown).await;
    system.join().await;

    // The worker deregisters itself when it stops.
    let next = Job::new(job.task.clone());
    assert_eq!(
        client.submit_job(&next).await?,
        SubmitOutcome::Rejected(SubmitRejection::NoCapacity)
    );

    let _ = stop_controller.send(());
    controller.await??;
    Ok(())
}
