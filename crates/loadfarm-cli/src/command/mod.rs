mod controller;
mod local;
mod submit;
mod worker;

use std::path::Path;

pub(crate) use controller::run_controller;
pub(crate) use local::run_local;
use loadfarm_execution::job::Task;
pub(crate) use submit::run_submit;
pub(crate) use worker::run_worker;

fn read_task(path: &Path) -> Result<Task, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    let task: Task = serde_json::from_str(&content)?;
    task.validate()?;
    Ok(task)
}

fn build_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}
