mod actor;
mod client;
pub mod entrypoint;
mod event;
mod lock;
mod metadata;
mod options;
mod server;

pub use actor::WorkerActor;
pub use client::WorkerClient;
pub(crate) use event::ask;
pub use event::WorkerEvent;
pub use lock::WorkerLock;
pub use metadata::WorkerMetadata;
pub use options::{WorkerOptions, WorkerServerOptions};
