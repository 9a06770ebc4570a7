use std::sync::{Condvar, Mutex};

/// `(Mutex<T>, Condvar)` bundled together (spec.md §9 "Waitable state").
///
/// Destructors use this to block until in-flight firmware callbacks have
/// quiesced before releasing the state those callbacks touch.
pub struct WaitableState<T> {
    state: Mutex<T>,
    cv: Condvar,
}

impl<T: Clone> WaitableState<T> {
    pub fn new(initial: T) -> Self {
        WaitableState {
            state: Mutex::new(initial),
            cv: Condvar::new(),
        }
    }

    pub fn get(&self) -> T {
        self.state.lock().unwrap().clone()
    }

    pub fn set(&self, value: T) {
        *self.state.lock().unwrap() = value;
        self.cv.notify_all();
    }

    /// Blocks until `predicate` holds, then returns the matching value.
    pub fn wait_for<F: Fn(&T) -> bool>(&self, predicate: F) -> T {
        let guard = self.state.lock().unwrap();
        let guard = self.cv.wait_while(guard, |v| !predicate(v)).unwrap();
        guard.clone()
    }
}

impl WaitableState<bool> {
    /// The common destructor idiom: block until the flag drops back to
    /// `false`.
    pub fn wait_until_false(&self) {
        self.wait_for(|v| !*v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn wait_until_false_blocks_until_set() {
        let state = Arc::new(WaitableState::new(true));
        let waiter = state.clone();
        let handle = thread::spawn(move || waiter.wait_until_false());

        thread::sleep(Duration::from_millis(20));
        state.set(false);
        handle.join().unwrap();
    }
}
