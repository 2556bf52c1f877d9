//! Bounded-FIFO asynchronous draw-call queue.
//!
//! Wraps a [`Renderer`] behind a dedicated worker thread and a bounded
//! `mpsc::sync_channel`: `submit` blocks only once the queue is full, letting
//! a caller stay several draw calls ahead of the rasterizer without an
//! unbounded backlog. `flush` round-trips a sentinel job through the queue
//! and waits for it, guaranteeing every previously submitted job has run.
//! Dropping the handle sends a shutdown sentinel and joins the thread rather
//! than leaking it.

use crate::renderer::Renderer;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce(&Renderer) + Send + 'static>;

enum Message {
    Job(Job),
    Flush(Arc<(Mutex<bool>, Condvar)>),
    Shutdown,
}

/// Submits draw calls to a dedicated rendering thread through a bounded
/// queue. `capacity` is the number of in-flight jobs `submit` will accept
/// before it starts blocking the caller.
pub struct AsyncRenderer {
    sender: SyncSender<Message>,
    worker: Option<JoinHandle<()>>,
}

impl AsyncRenderer {
    pub fn new(renderer: Renderer, capacity: usize) -> Self {
        let (sender, receiver): (SyncSender<Message>, Receiver<Message>) =
            sync_channel(capacity.max(1));

        let worker = std::thread::spawn(move || {
            for message in receiver {
                match message {
                    Message::Job(job) => job(&renderer),
                    Message::Flush(signal) => {
                        let (lock, cvar) = &*signal;
                        *lock.lock().unwrap() = true;
                        cvar.notify_all();
                    }
                    Message::Shutdown => break,
                }
            }
        });

        Self { sender, worker: Some(worker) }
    }

    /// Enqueue a job; blocks the caller only if the bounded queue is full.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce(&Renderer) + Send + 'static,
    {
        let _ = self.sender.send(Message::Job(Box::new(job)));
    }

    /// Block until every job submitted before this call has completed.
    pub fn flush(&self) {
        let signal = Arc::new((Mutex::new(false), Condvar::new()));
        if self.sender.send(Message::Flush(signal.clone())).is_err() {
            return;
        }
        let (lock, cvar) = &*signal;
        let mut done = lock.lock().unwrap();
        while !*done {
            done = cvar.wait(done).unwrap();
        }
    }
}

impl Drop for AsyncRenderer {
    fn drop(&mut self) {
        let _ = self.sender.send(Message::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::WorkerPool;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn flush_waits_for_all_prior_jobs() {
        let renderer = Renderer::new(WorkerPool::new(1));
        let async_renderer = AsyncRenderer::new(renderer, 4);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let counter = counter.clone();
            async_renderer.submit(move |_r| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        async_renderer.flush();
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }
}
