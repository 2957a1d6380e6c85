/**
 * Shutdown barrier. Counts transmissions that have been accepted by
 * `Dispatcher::write` but not yet finished by a worker.
 *
 * Uses a `Mutex<usize>` + `Condvar` pair:
 * - `enter()` increments the count and hands back an `InFlight` token.
 * - Dropping the token decrements the count and wakes waiters at zero.
 * - `wait()` blocks until the count reaches zero.
 *
 * Because the decrement lives in `Drop`, it happens exactly once per token
 * on every path: normal completion, early return, a discarded queue entry,
 * or a panic unwinding through the worker.
 */
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub struct ShutdownBarrier {
    /// Number of live `InFlight` tokens.
    count: Mutex<usize>,

    /// Signalled whenever `count` drops to zero.
    drained: Condvar,
}

impl ShutdownBarrier {
    pub fn new() -> Self {
        Self {
            count: Mutex::new(0),
            drained: Condvar::new(),
        }
    }

    /**
     * Registers one more in-flight transmission.
     */
    pub fn enter(self: &Arc<Self>) -> InFlight {
        *self.lock() += 1;
        InFlight {
            barrier: Arc::clone(self),
        }
    }

    /// Current number of in-flight transmissions.
    pub fn in_flight(&self) -> usize {
        *self.lock()
    }

    /**
     * Blocks the calling thread until every token has been dropped.
     * No timeout.
     */
    pub fn wait(&self) {
        let guard = self.lock();
        let _drained = self
            .drained
            .wait_while(guard, |count| *count > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /**
     * Like `wait`, but gives up after `timeout`.
     *
     * # Returns
     * `true` if the barrier reached zero in time, `false` otherwise.
     */
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (count, _) = self
            .drained
            .wait_timeout_while(guard, timeout, |count| *count > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *count == 0
    }

    /*
     * A panic while holding the lock cannot leave the counter half-updated,
     * so a poisoned mutex is still safe to use.
     */
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn leave(&self) {
        let mut count = self.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
        }
    }
}

impl Default for ShutdownBarrier {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * RAII token for one in-flight transmission. Travels through the queue
 * together with the request it accounts for.
 */
pub struct InFlight {
    barrier: Arc<ShutdownBarrier>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.barrier.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_wait_returns_immediately_when_idle() {
        let barrier = Arc::new(ShutdownBarrier::new());
        barrier.wait();
        assert_eq!(barrier.in_flight(), 0);
    }

    #[test]
    fn test_token_drop_decrements_exactly_once() {
        let barrier = Arc::new(ShutdownBarrier::new());
        let first = barrier.enter();
        let second = barrier.enter();
        assert_eq!(barrier.in_flight(), 2);

        drop(first);
        assert_eq!(barrier.in_flight(), 1);
        assert!(!barrier.wait_timeout(Duration::from_millis(20)));

        drop(second);
        assert_eq!(barrier.in_flight(), 0);
        assert!(barrier.wait_timeout(Duration::from_millis(20)));
    }

    /**
     * Tokens released from many threads eventually wake the single waiter.
     */
    #[test]
    fn test_wait_blocks_until_all_threads_finish() {
        let barrier = Arc::new(ShutdownBarrier::new());

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let token = barrier.enter();
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(i % 5));
                    drop(token);
                })
            })
            .collect();

        barrier.wait();
        assert_eq!(barrier.in_flight(), 0);

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_token_is_released_on_panic() {
        let barrier = Arc::new(ShutdownBarrier::new());
        let token = barrier.enter();

        let result = thread::spawn(move || {
            let _token = token;
            panic!("worker blew up");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(barrier.in_flight(), 0);
    }
}
