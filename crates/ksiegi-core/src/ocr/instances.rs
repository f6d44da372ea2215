//! Fixed set of interchangeable engine instances.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Each instance sits behind its own lock, so up to `len()` callers run
/// at the same time. Callers start at a rotating slot and take the first
/// free one; when all are busy they wait on their starting slot.
pub struct InstancePool<T> {
    slots: Vec<Mutex<T>>,
    next: AtomicUsize,
}

impl<T> InstancePool<T> {
    pub fn new(instances: Vec<T>) -> Self {
        Self {
            slots: instances.into_iter().map(Mutex::new).collect(),
            next: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Run `f` on one instance.
    ///
    /// Returns `None` when the pool is empty or the instance waited on was
    /// poisoned by a panic.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let n = self.slots.len();
        if n == 0 {
            return None;
        }

        let start = self.next.fetch_add(1, Ordering::Relaxed) % n;
        for i in 0..n {
            if let Ok(mut instance) = self.slots[(start + i) % n].try_lock() {
                return Some(f(&mut instance));
            }
        }

        let mut instance = self.slots[start].lock().ok()?;
        Some(f(&mut instance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_empty_pool() {
        let pool: InstancePool<u32> = InstancePool::new(Vec::new());
        assert!(pool.is_empty());
        assert_eq!(pool.with(|v| *v), None);
    }

    #[test]
    fn test_concurrent_callers_get_distinct_instances() {
        let pool = Arc::new(InstancePool::new(vec![0usize, 0]));
        // both threads hold an instance at the barrier; sharing one would deadlock
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    pool.with(|count| {
                        barrier.wait();
                        *count += 1;
                    })
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(()));
        }

        let mut counts: Vec<usize> = (0..2).map(|_| pool.with(|c| *c).unwrap()).collect();
        counts.sort_unstable();
        assert_eq!(counts, vec![1, 1]);
    }

    #[test]
    fn test_busy_pool_waits() {
        let pool = Arc::new(InstancePool::new(vec![0u32]));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || pool.with(|v| *v += 1))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(pool.with(|v| *v), Some(8));
    }
}
