//! The Director
//!
//! Owns the scheduler's background thread. Producers hand commands to
//! [`Director::enqueue`] (or a [`CommandQueue`] clone from
//! [`Director::sender`]) from any thread.

use pit_events::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

use crate::queue::CommandQueue;
use crate::scheduler::{DirectorError, Scheduler};

struct Worker {
    stop: Arc<AtomicBool>,
    done: Receiver<usize>,
    handle: JoinHandle<()>,
}

pub struct Director {
    queue: CommandQueue,
    join_timeout: Duration,
    scheduler: Option<Scheduler>,
    worker: Option<Worker>,
}

impl Director {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            queue: scheduler.queue().clone(),
            join_timeout: scheduler.config().join_timeout,
            scheduler: Some(scheduler),
            worker: None,
        }
    }

    /// Queues a command for execution. Safe to call before `start`.
    pub fn enqueue(&self, command: Command) {
        self.queue.enqueue(command);
    }

    /// A producer handle onto the command queue.
    pub fn sender(&self) -> CommandQueue {
        self.queue.clone()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Spawns the scheduling loop. A director can only be started once.
    pub fn start(&mut self) -> Result<(), DirectorError> {
        let mut scheduler = self.scheduler.take().ok_or(DirectorError::AlreadyStarted)?;
        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = mpsc::channel();

        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("director".to_string())
            .spawn(move || {
                let dropped = scheduler.run(&flag);
                // The owner may have given up waiting.
                let _ = done_tx.send(dropped);
            })
            .map_err(DirectorError::Spawn)?;

        info!("Director started");
        self.worker = Some(Worker {
            stop,
            done: done_rx,
            handle,
        });
        Ok(())
    }

    /// Signals the loop to stop and waits up to the configured join timeout.
    ///
    /// The loop only checks the flag between commands, so an interaction in
    /// progress finishes first. Returns how many queued commands were
    /// dropped. On timeout the thread is left detached.
    pub fn stop(&mut self) -> Result<usize, DirectorError> {
        let Some(worker) = self.worker.take() else {
            return Ok(0);
        };
        worker.stop.store(true, Ordering::SeqCst);

        match worker.done.recv_timeout(self.join_timeout) {
            Ok(dropped) => {
                if worker.handle.join().is_err() {
                    warn!("Director thread panicked while exiting");
                }
                info!("Director stopped, {} commands dropped", dropped);
                Ok(dropped)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("Director did not stop within {:?}", self.join_timeout);
                Err(DirectorError::ShutdownTimeout(self.join_timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = worker.handle.join();
                Err(DirectorError::WorkerLost)
            }
        }
    }
}

impl Drop for Director {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(error) = self.stop() {
                warn!("Director shutdown on drop failed: {}", error);
            }
        }
    }
}
