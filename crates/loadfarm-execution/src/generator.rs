//! Generators for the keys and values written by each quantum.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::id::{PartitionId, WorkerId};
use crate::job::{KeyGeneratorDescriptor, ValueGeneratorDescriptor};

pub trait KeyGenerator: Send {
    fn key(&mut self, quantum: u64) -> Vec<u8>;
}

pub trait ValueGenerator: Send {
    fn value(&mut self, quantum: u64) -> Vec<u8>;
}

/// Where the generated data is produced, so that keys are unique across a job.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorContext {
    pub worker_id: WorkerId,
    pub partition_id: PartitionId,
}

pub struct SequentialKeyGenerator {
    prefix: String,
}

impl SequentialKeyGenerator {
    pub fn new(context: GeneratorContext) -> Self {
        Self {
            prefix: format!("{}:{}", context.worker_id, context.partition_id),
        }
    }
}

impl KeyGenerator for SequentialKeyGenerator {
    fn key(&mut self, quantum: u64) -> Vec<u8> {
        format!("{}:{quantum:016}", self.prefix).into_bytes()
    }
}

pub struct RandomBytes {
    rng: ChaCha8Rng,
    size: usize,
}

impl RandomBytes {
    /// A fixed seed is offset by the partition so that partitions draw different streams.
    pub fn new(size: usize, seed: Option<u64>, context: GeneratorContext) -> Self {
        let rng = match seed {
            Some(seed) => {
                ChaCha8Rng::seed_from_u64(seed.wrapping_add(u64::from(u32::from(
                    context.partition_id,
                ))))
            }
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        Self { rng, size }
    }

    fn next_bytes(&mut self) -> Vec<u8> {
        let mut buf = vec![0; self.size];
        self.rng.fill_bytes(&mut buf);
        buf
    }
}

impl KeyGenerator for RandomBytes {
    fn key(&mut self, _quantum: u64) -> Vec<u8> {
        self.next_bytes()
    }
}

impl ValueGenerator for RandomBytes {
    fn value(&mut self, _quantum: u64) -> Vec<u8> {
        self.next_bytes()
    }
}

pub struct ZeroValueGenerator {
    size: usize,
}

impl ValueGenerator for ZeroValueGenerator {
    fn value(&mut self, _quantum: u64) -> Vec<u8> {
        vec![0; self.size]
    }
}

impl KeyGeneratorDescriptor {
    pub fn build(&self, context: GeneratorContext) -> Box<dyn KeyGenerator> {
        match self {
            KeyGeneratorDescriptor::Sequential => Box::new(SequentialKeyGenerator::new(context)),
            KeyGeneratorDescriptor::Random { size, seed } => {
                Box::new(RandomBytes::new(*size, *seed, context))
            }
        }
    }
}

impl ValueGeneratorDescriptor {
    pub fn build(&self, context: GeneratorContext) -> Box<dyn ValueGenerator> {
        match self {
            ValueGeneratorDescriptor::Zero { size } => Box::new(ZeroValueGenerator { size: *size }),
            ValueGeneratorDescriptor::Random { size, seed } => {
                Box::new(RandomBytes::new(*size, *seed, context))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn context(partition_id: u32) -> GeneratorContext {
        GeneratorContext {
            worker_id: WorkerId::random(),
            partition_id: PartitionId::from(partition_id),
        }
    }

    #[test]
    fn test_sequential_keys_are_unique_across_partitions() {
        let mut keys = HashSet::new();
        for partition_id in 0..3 {
            let mut generator = KeyGeneratorDescriptor::Sequential.build(context(partition_id));
            for quantum in 0..100 {
                assert!(keys.insert(generator.key(quantum)));
            }
        }
        assert_eq!(keys.len(), 300);
    }

    #[test]
    fn test_seeded_random_values_are_reproducible() {
        let descriptor = ValueGeneratorDescriptor::Random {
            size: 32,
            seed: Some(42),
        };
        let ctx = context(1);
        let mut first = descriptor.build(ctx);
        let mut second = descriptor.build(ctx);
        let a = first.value(0);
        assert_eq!(a.len(), 32);
        assert_eq!(a, second.value(0));
        assert_ne!(a, descriptor.build(context(2)).value(0));
    }

    #[test]
    fn test_zero_values() {
        let mut generator = ValueGeneratorDescriptor::Zero { size: 8 }.build(context(0));
        assert_eq!(generator.value(5), vec![0u8; 8]);
    }
}
