//! Background persistence worker for the association subsystem.
//!
//! All store writes (flush, decrease, cleanup) happen on this thread so the
//! interactive input path never waits on the database. The worker drains its
//! channel in order; shutdown performs a final flush so no buffered pair is
//! lost at session teardown.

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

use super::{epoch_secs, Shared};

pub(crate) enum Job {
    Flush,
    Decrease(String, String),
    Cleanup,
    Shutdown,
}

pub(crate) fn spawn(shared: Arc<Shared>) -> std::io::Result<(mpsc::Sender<Job>, JoinHandle<()>)> {
    let (tx, rx) = mpsc::channel();
    let handle = thread::Builder::new()
        .name("boshiamy-assoc".into())
        .spawn(move || run(rx, shared))?;
    Ok((tx, handle))
}

fn run(rx: Receiver<Job>, shared: Arc<Shared>) {
    while let Ok(job) = rx.recv() {
        match job {
            Job::Flush => {
                shared.flush();
            }
            Job::Decrease(previous, current) => {
                if let Err(e) = shared
                    .store
                    .decrease(&previous, &current, shared.decay_step)
                {
                    warn!("association decrease failed: {e}");
                }
            }
            Job::Cleanup => {
                match shared
                    .store
                    .cleanup(epoch_secs(), shared.min_keep_frequency, shared.max_idle_secs)
                {
                    Ok(removed) => debug!(removed, "association cleanup finished"),
                    Err(e) => warn!("association cleanup failed: {e}"),
                }
            }
            Job::Shutdown => {
                shared.flush();
                break;
            }
        }
    }
}
