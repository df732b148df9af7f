use serde::{Deserialize, Serialize};

use crate::id::WorkerId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerMetadata {
    pub worker_id: WorkerId,
    pub host: String,
    pub port: u16,
}

impl WorkerMetadata {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
