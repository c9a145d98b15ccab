//! Arbitrary user code run on the command-worker thread, between other
//! scheduled commands — the escape hatch the original driver calls
//! `Callback`.

pub struct Callback {
    f: Box<dyn FnOnce() + Send>,
}

impl Callback {
    pub fn new<F: FnOnce() + Send + 'static>(f: F) -> Self {
        Callback { f: Box::new(f) }
    }

    pub(super) fn call(self) {
        (self.f)()
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callback").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn callback_runs_exactly_once() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = ran.clone();
        let cb = Callback::new(move || ran2.store(true, Ordering::SeqCst));
        cb.call();
        assert!(ran.load(Ordering::SeqCst));
    }
}
