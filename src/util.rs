use std::sync::atomic::{AtomicU64, Ordering};

use crate::evaluation::MATE_SCORE;

pub const MAX_DEPTH: i32 = 128;
pub const MAX_PLY: usize = MAX_DEPTH as usize;
pub const INFINITY: i32 = MATE_SCORE + 1;
pub const VALUE_NONE: i32 = INFINITY + 1;
pub const MEGABYTE: usize = 1024 * 1024;

/// A node counter shared between threads, which only touches the shared
/// atomic once every `granularity` increments.
#[derive(Debug, Clone, Copy)]
pub struct BatchedAtomicCounter<'a> {
    buffer: u64,
    global: &'a AtomicU64,
    local: u64,
    granularity: u64,
}

impl<'a> BatchedAtomicCounter<'a> {
    pub const DEFAULT_GRANULARITY: u64 = 1024;

    pub const fn new(global: &'a AtomicU64) -> Self {
        Self { buffer: 0, global, local: 0, granularity: Self::DEFAULT_GRANULARITY }
    }

    /// Flush after every `granularity` increments. Node-limited searches use 1,
    /// so that the global count is never more than a node behind per thread.
    pub fn set_granularity(&mut self, granularity: u64) {
        self.flush();
        self.granularity = granularity.max(1);
    }

    pub fn increment(&mut self) {
        self.buffer += 1;
        if self.buffer >= self.granularity {
            self.flush();
        }
    }

    fn flush(&mut self) {
        self.global.fetch_add(self.buffer, Ordering::Relaxed);
        self.local += self.buffer;
        self.buffer = 0;
    }

    pub fn get_global(&self) -> u64 {
        self.global.load(Ordering::Relaxed) + self.buffer
    }

    pub const fn get_local(&self) -> u64 {
        self.local + self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer = 0;
        self.global.store(0, Ordering::Relaxed);
        self.local = 0;
    }

    pub const fn just_ticked_over(&self) -> bool {
        self.buffer == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;

    use super::BatchedAtomicCounter;

    #[test]
    fn counter_batches_updates() {
        let global = AtomicU64::new(0);
        let mut counter = BatchedAtomicCounter::new(&global);
        for _ in 0..1023 {
            counter.increment();
        }
        assert_eq!(global.load(std::sync::atomic::Ordering::Relaxed), 0);
        assert_eq!(counter.get_local(), 1023);
        counter.increment();
        assert!(counter.just_ticked_over());
        assert_eq!(counter.get_global(), 1024);
    }

    #[test]
    fn unit_granularity_flushes_every_node() {
        let global = AtomicU64::new(0);
        let mut counter = BatchedAtomicCounter::new(&global);
        counter.increment();
        counter.set_granularity(1);
        assert_eq!(global.load(std::sync::atomic::Ordering::Relaxed), 1);
        counter.increment();
        assert_eq!(global.load(std::sync::atomic::Ordering::Relaxed), 2);
        assert!(counter.just_ticked_over());
    }
}
