use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Counting semaphore bounding the number of frames in flight.
///
/// `wait` blocks while the count is zero; `signal` may be called from any thread, typically a
/// command buffer completion handler.
#[derive(Debug)]
pub struct FrameSemaphore {
    count: Mutex<usize>,
    cv: Condvar,
}

impl FrameSemaphore {
    /// Semaphore with `permits` initial permits.
    pub fn new(permits: usize) -> Self {
        Self {
            count: Mutex::new(permits),
            cv: Condvar::new(),
        }
    }

    /// Take a permit, blocking until one is available.
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count == 0 {
            self.cv.wait(&mut count);
        }
        *count -= 1;
    }

    /// Take a permit, giving up after `timeout`. Returns `true` if a permit was taken.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut count = self.count.lock();
        while *count == 0 {
            if self.cv.wait_for(&mut count, timeout).timed_out() {
                if *count == 0 {
                    return false;
                }
                break;
            }
        }
        *count -= 1;
        true
    }

    /// Take a permit only if one is available right now.
    pub fn try_wait(&self) -> bool {
        let mut count = self.count.lock();
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    /// Return a permit and wake one waiter.
    pub fn signal(&self) {
        *self.count.lock() += 1;
        self.cv.notify_one();
    }

    /// Permits currently available.
    pub fn available(&self) -> usize {
        *self.count.lock()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/gpu/semaphore.rs"]
mod tests;
