//! A one-shot result handed back to whoever submitted a command, fulfilled
//! by the command worker thread once that command finishes executing.

use crate::command::CommandOutcome;
use crate::error::Si4707Error;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

enum Slot {
    Pending,
    Ready(Result<CommandOutcome, Si4707Error>),
    Taken,
}

struct Shared {
    slot: Mutex<Slot>,
    condvar: Condvar,
}

/// The producer half: the command worker calls `fulfill` exactly once.
pub struct Promise {
    shared: Arc<Shared>,
}

/// The consumer half: returned to the caller of `do_command`. `get`
/// consumes the result — a second call reports `Si4707Error::Stopped`,
/// matching the one-shot nature of a submitted command.
pub struct Future {
    shared: Arc<Shared>,
}

/// Creates a linked promise/future pair for one in-flight command.
pub fn channel() -> (Promise, Future) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot::Pending),
        condvar: Condvar::new(),
    });
    (
        Promise {
            shared: shared.clone(),
        },
        Future { shared },
    )
}

impl Promise {
    pub fn fulfill(self, result: Result<CommandOutcome, Si4707Error>) {
        let mut slot = self.shared.slot.lock().unwrap();
        *slot = Slot::Ready(result);
        self.shared.condvar.notify_all();
    }
}

impl Future {
    /// Blocks until the command completes or `timeout` elapses.
    pub fn get(&self, timeout: Duration) -> Result<CommandOutcome, Si4707Error> {
        let slot = self.shared.slot.lock().unwrap();
        let (mut slot, result) = self
            .shared
            .condvar
            .wait_timeout_while(slot, timeout, |s| matches!(s, Slot::Pending))
            .unwrap();
        if result.timed_out() {
            return Err(Si4707Error::NotClearToSend(timeout));
        }
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(result) => result,
            Slot::Taken => Err(Si4707Error::Stopped),
            Slot::Pending => unreachable!("wait_timeout_while only returns once not pending"),
        }
    }

    pub fn is_ready(&self) -> bool {
        !matches!(*self.shared.slot.lock().unwrap(), Slot::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn get_blocks_until_fulfilled() {
        let (promise, future) = channel();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            promise.fulfill(Ok(CommandOutcome::Unit));
        });
        let result = future.get(Duration::from_secs(1));
        assert!(result.is_ok());
        handle.join().unwrap();
    }

    #[test]
    fn get_times_out_when_never_fulfilled() {
        let (_promise, future) = channel();
        let result = future.get(Duration::from_millis(10));
        assert!(result.is_err());
    }

    #[test]
    fn second_get_after_consumption_reports_stopped() {
        let (promise, future) = channel();
        promise.fulfill(Ok(CommandOutcome::Unit));
        assert!(future.get(Duration::from_secs(1)).is_ok());
        assert!(matches!(
            future.get(Duration::from_secs(1)),
            Err(Si4707Error::Stopped)
        ));
    }
}
