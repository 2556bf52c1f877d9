//! Worker pool: package-based dynamic work-stealing over a shared atomic
//! cursor, with a hard barrier between pipeline stages.
//!
//! Grounded on the teacher crate's own `render_par` (per-row dispatch via
//! `thread::scope` + an `AtomicUsize` cursor) generalized from rows to
//! arbitrary-sized packages, matching the original's
//! `thread_context::next_package()` model: each thread repeatedly claims
//! the next unclaimed package of work until the cursor exhausts the range,
//! then the scope join acts as the barrier the next pipeline stage needs.
//!
//! Per this core's redesign note, there is no global thread-pool singleton:
//! a [`WorkerPool`] is an explicit, constructor-supplied value threaded
//! through the renderer, not a process-wide static.

use crossbeam_utils::thread as crossbeam_thread;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct WorkerPool {
    threads: usize,
}

impl WorkerPool {
    /// `threads = num_cpus::get()` is the natural default; tests and
    /// debug-mode callers that want determinism can pass `1` explicitly.
    pub fn new(threads: usize) -> Self {
        Self { threads: threads.max(1) }
    }

    pub fn with_available_parallelism() -> Self {
        Self::new(num_cpus::get())
    }

    pub fn thread_count(&self) -> usize {
        self.threads
    }

    /// Dispatch `count` units of work in packages of `package_size`,
    /// calling `work` with each package's `[start, end)` range. Blocks
    /// until every package has been processed, acting as the barrier
    /// between stages that rely on the previous stage being fully done
    /// (e.g. tile binning must finish before any tile is rasterized).
    pub fn dispatch<F>(&self, count: usize, package_size: usize, work: F)
    where
        F: Fn(std::ops::Range<usize>) + Send + Sync,
    {
        if count == 0 {
            return;
        }
        let package_size = package_size.max(1);
        let cursor = AtomicUsize::new(0);
        let needed_threads = self.threads.min((count + package_size - 1) / package_size).max(1);

        let work = &work;
        let cursor = &cursor;
        crossbeam_thread::scope(|scope| {
            for _ in 0..needed_threads {
                scope.spawn(move |_| loop {
                    let start = cursor.fetch_add(package_size, Ordering::Relaxed);
                    if start >= count {
                        break;
                    }
                    let end = (start + package_size).min(count);
                    work(start..end);
                });
            }
        })
        .expect("a worker thread panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn dispatch_covers_every_item_exactly_once() {
        let pool = WorkerPool::new(4);
        let seen = (0..100).map(|_| AtomicU64::new(0)).collect::<Vec<_>>();
        pool.dispatch(100, 8, |range| {
            for i in range {
                seen[i].fetch_add(1, Ordering::Relaxed);
            }
        });
        assert!(seen.iter().all(|c| c.load(Ordering::Relaxed) == 1));
    }

    #[test]
    fn dispatch_on_empty_range_does_nothing() {
        let pool = WorkerPool::new(4);
        let called = std::sync::atomic::AtomicBool::new(false);
        pool.dispatch(0, 8, |_| called.store(true, Ordering::Relaxed));
        assert!(!called.load(Ordering::Relaxed));
    }
}
