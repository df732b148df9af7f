mod client;
mod control;
mod discovery;
pub mod entrypoint;
mod farmer;
mod options;
mod server;

pub use client::ControllerClient;
pub use control::{
    HttpWorkerControl, HttpWorkerControlFactory, WorkerControl, WorkerControlFactory,
};
pub use discovery::{WorkerDiscovery, WorkerRegistry};
pub use farmer::{JobFarmer, ReportCallbacks, SubmitOutcome, SubmitRejection};
pub use options::ControllerOptions;
pub use server::controller_routes;
