use loadfarm_common::config::AppConfig;
use loadfarm_telemetry::telemetry::{init_telemetry, ResourceOptions};

use crate::command::build_runtime;

pub(crate) fn run_worker() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_telemetry(ResourceOptions { kind: "worker" })?;
    let runtime = build_runtime()?;
    runtime.block_on(loadfarm_execution::run_worker(&config))
}
