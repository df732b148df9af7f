use crate::id::ControllerId;

/// A single-slot lock that reserves a worker for one controller.
#[derive(Debug, Default)]
pub struct WorkerLock {
    owner: Option<ControllerId>,
}

impl WorkerLock {
    /// Returns whether `owner` holds the lock after the call.
    /// Acquiring a lock that the owner already holds succeeds.
    pub fn acquire(&mut self, owner: ControllerId) -> bool {
        match self.owner {
            None => {
                self.owner = Some(owner);
                true
            }
            Some(current) => current == owner,
        }
    }

    /// Returns whether the lock was released.
    /// Only the current owner can release the lock.
    pub fn release(&mut self, owner: ControllerId) -> bool {
        if self.owner == Some(owner) {
            self.owner = None;
            true
        } else {
            false
        }
    }

    pub fn owner(&self) -> Option<ControllerId> {
        self.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_refuses_second_owner() {
        let mut lock = WorkerLock::default();
        let first = ControllerId::random();
        let second = ControllerId::random();
        assert!(lock.acquire(first));
        assert!(lock.acquire(first));
        assert!(!lock.acquire(second));
        assert_eq!(lock.owner(), Some(first));
    }

    #[test]
    fn test_lock_ignores_foreign_release() {
        let mut lock = WorkerLock::default();
        let first = ControllerId::random();
        let second = ControllerId::random();
        assert!(!lock.release(first));
        assert!(lock.acquire(first));
        assert!(!lock.release(second));
        assert_eq!(lock.owner(), Some(first));
        assert!(lock.release(first));
        assert_eq!(lock.owner(), None);
        assert!(lock.acquire(second));
    }
}
