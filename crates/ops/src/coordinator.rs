//! Build dispatch
//!
//! Submissions arrive over a channel. A single dispatcher task spawns one
//! pipeline task per build into a `JoinSet`, optionally gated by a
//! semaphore, and drains the set on shutdown.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, Semaphore};
use tokio::task::{Id, JoinHandle, JoinSet};
use webforge_errors::{Error, SubmitError};
use webforge_events::EventEmitter;
use webforge_types::BuildId;

use crate::pipeline::{run_pipeline, BuildJob};
use crate::OpsCtx;

/// Accepts jobs and runs each in its own task
#[derive(Debug)]
pub struct Coordinator {
    sender: Mutex<Option<mpsc::UnboundedSender<BuildJob>>>,
    dispatcher: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Coordinator {
    /// Start the dispatcher on the current runtime
    #[must_use]
    pub fn start(ctx: Arc<OpsCtx>) -> Self {
        let limit = match ctx.config.pipeline.max_concurrent_builds {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };
        let (sender, receiver) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(dispatch(ctx, receiver, limit));
        Self {
            sender: Mutex::new(Some(sender)),
            dispatcher: tokio::sync::Mutex::new(Some(dispatcher)),
        }
    }

    /// Queue a job
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::ShuttingDown` once [`Coordinator::shutdown`] has
    /// been called.
    pub fn enqueue(&self, job: BuildJob) -> Result<(), Error> {
        let guard = self
            .sender
            .lock()
            .map_err(|_| Error::internal("coordinator sender lock poisoned"))?;
        match guard.as_ref() {
            Some(sender) => sender
                .send(job)
                .map_err(|_| SubmitError::ShuttingDown.into()),
            None => Err(SubmitError::ShuttingDown.into()),
        }
    }

    /// Whether new jobs are still accepted
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.sender
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Stop accepting jobs and wait for every running pipeline to finish
    pub async fn shutdown(&self) {
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }
        let handle = self.dispatcher.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn dispatch(
    ctx: Arc<OpsCtx>,
    mut receiver: mpsc::UnboundedReceiver<BuildJob>,
    limit: Option<Arc<Semaphore>>,
) {
    let mut tasks = JoinSet::new();
    let mut running: HashMap<Id, BuildId> = HashMap::new();

    loop {
        tokio::select! {
            job = receiver.recv() => {
                let Some(job) = job else { break };
                let id = job.id;
                let task_ctx = Arc::clone(&ctx);
                let permits = limit.clone();
                let handle = tasks.spawn(async move {
                    let _permit = match permits {
                        Some(semaphore) => semaphore.acquire_owned().await.ok(),
                        None => None,
                    };
                    // The outcome is already on the status record
                    let _ = run_pipeline(&task_ctx, job).await;
                });
                running.insert(handle.id(), id);
            }
            Some(joined) = tasks.join_next_with_id(), if !tasks.is_empty() => {
                reap(&ctx, &mut running, joined);
            }
        }
    }

    while let Some(joined) = tasks.join_next_with_id().await {
        reap(&ctx, &mut running, joined);
    }
}

/// A pipeline task that panicked never wrote its terminal record
fn reap(
    ctx: &OpsCtx,
    running: &mut HashMap<Id, BuildId>,
    joined: Result<(Id, ()), tokio::task::JoinError>,
) {
    match joined {
        Ok((task, ())) => {
            running.remove(&task);
        }
        Err(error) => {
            if let Some(id) = running.remove(&error.id()) {
                let message = format!("build task aborted: {error}");
                if ctx.tracker.fail(&id, message.as_str()).is_err() {
                    ctx.emit_debug(format!("build {id} already terminal when its task aborted"));
                }
                ctx.emit_error(message);
            }
        }
    }
}
