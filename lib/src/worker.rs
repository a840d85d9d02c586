//! A single-writer worker thread owning the release queue. External
//! triggers are messages on a channel, so every guard check and state
//! transition happens on one thread and the check-then-act between the
//! running-task guard and task start cannot race within the process.

use crate::queue::ReleaseQueue;
use anyhow::{anyhow, Result};
use log::{debug, error};
use std::sync::mpsc::{channel, Sender};
use std::thread::JoinHandle;

struct Trigger;

/// Handle to a running release worker. Dropping the handle (or calling
/// [`WorkerHandle::join`]) shuts the worker down after it finishes any
/// release in progress.
pub struct WorkerHandle {
    sender: Sender<Trigger>,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    /// Notifies the worker that a task became ready. Returns as soon as the
    /// notification is queued; completion or failure is observable only via
    /// the task's persisted status. Triggers arriving while a drain is in
    /// progress coalesce harmlessly: the drain loop re-checks eligibility.
    pub fn trigger(&self) {
        if self.sender.send(Trigger).is_err() {
            error!("release worker is gone; trigger dropped");
        }
    }

    /// Shuts the worker down and waits for it to finish.
    pub fn join(self) -> Result<()> {
        drop(self.sender);
        self.handle
            .join()
            .map_err(|_| anyhow!("release worker panicked"))
    }
}

/// Spawns the worker thread that owns the queue.
pub fn spawn(mut queue: ReleaseQueue) -> Result<WorkerHandle> {
    let (sender, receiver) = channel::<Trigger>();
    let handle = std::thread::Builder::new()
        .name("graphpub-release".to_string())
        .spawn(move || {
            while receiver.recv().is_ok() {
                match queue.run_pending() {
                    Ok(executed) => debug!("drained {} release task(s)", executed),
                    Err(err) => error!("release drain aborted: {:#}", err),
                }
            }
        })?;
    Ok(WorkerHandle { sender, handle })
}
