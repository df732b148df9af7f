use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ExecutionError;

macro_rules! define_id_type {
    ($name:ident, $value_type:ty) => {
        #[derive(
            Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($value_type);

        impl From<$value_type> for $name {
            fn from(id: $value_type) -> Self {
                Self(id)
            }
        }

        impl From<$name> for $value_type {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

macro_rules! impl_random_id_type {
    ($name:ident) => {
        impl $name {
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl FromStr for $name {
            type Err = ExecutionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self).map_err(|e| {
                    ExecutionError::InvalidArgument(format!(
                        "invalid {}: {s}: {e}",
                        stringify!($name)
                    ))
                })
            }
        }
    };
}

define_id_type!(JobId, Uuid);
define_id_type!(WorkerId, Uuid);
define_id_type!(ControllerId, Uuid);
define_id_type!(PartitionId, u32);

impl_random_id_type!(JobId);
impl_random_id_type!(WorkerId);
impl_random_id_type!(ControllerId);

/// A process-local counter for ordering the reports sent by one worker.
/// Clones share the same underlying counter.
#[derive(Debug, Clone, Default)]
pub struct SequenceCounter {
    next: Arc<AtomicU64>,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
