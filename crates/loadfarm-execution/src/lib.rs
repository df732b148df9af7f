pub mod controller;
pub mod error;
pub mod generator;
pub mod id;
pub mod job;
pub mod local;
pub mod report;
mod rpc;
pub mod store;
pub mod task_runner;
pub mod worker;

pub use controller::entrypoint::run_controller;
pub use worker::entrypoint::run_worker;
