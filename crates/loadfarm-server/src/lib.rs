pub mod actor;
mod backoff;
mod builder;

pub use backoff::Backoff;
pub use builder::ServerBuilder;
