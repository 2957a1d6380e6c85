/**
 * RAII guard that drains the dispatcher when it goes out of scope.
 *
 * ```ignore
 * fn main() {
 *     let dispatcher = seqlog_core::Dispatcher::new("http://localhost:5341", None).unwrap();
 *     let _guard = dispatcher.guard();
 *
 *     // ... application logic, records are written here ...
 *
 * }   // <-- _guard is dropped here, blocking until the queue is empty
 * ```
 *
 * The wait has no timeout of its own; each outstanding request is bounded
 * by the dispatcher's request timeout.
 */
use crate::dispatcher::Dispatcher;

pub struct DrainGuard {
    dispatcher: Dispatcher,
}

impl DrainGuard {
    pub(crate) fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /**
     * The dispatcher this guard drains. Useful to toggle fallback logs
     * after a facade `init` has returned only the guard.
     */
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        self.dispatcher.wait();
    }
}
