//! Resident build service.
//!
//! Owns the compiler for the lifetime of a development server. Rebuild
//! requests are queued on a channel and handled by one task: a rebuild runs to
//! completion on the blocking pool before the next starts, and requests that
//! arrive meanwhile are coalesced into a single follow-up rebuild.
//!
//! The current snapshot lives in a `watch` channel as an `Arc<ArtifactSet>`,
//! so readers always see either the previous or the next complete build.
//! Outcomes fan out to subscribers over a `broadcast` channel.

use crate::artifacts::ArtifactSet;
use crate::bundler::Compiler;
use crate::error::CompileError;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Capacity of the notification channel. Slow subscribers skip events.
const EVENT_CAPACITY: usize = 16;

/// Live-reload notification, serialized as the WebSocket message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RebuildEvent {
    /// Sent once to every new subscriber.
    Connected,
    /// A rebuild succeeded; `chunks` lists the chunks whose content changed.
    Built {
        hash: String,
        chunks: Vec<String>,
        valid: bool,
    },
    /// A rebuild failed; the previous snapshot keeps serving.
    Failed {
        chunks: Vec<String>,
        valid: bool,
        errors: Vec<String>,
    },
}

impl RebuildEvent {
    #[must_use]
    pub fn built(hash: impl Into<String>, chunks: Vec<String>) -> Self {
        Self::Built {
            hash: hash.into(),
            chunks,
            valid: true,
        }
    }

    #[must_use]
    pub fn failed(errors: Vec<String>) -> Self {
        Self::Failed {
            chunks: Vec::new(),
            valid: false,
            errors,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Built { .. })
    }

    /// JSON text of the event.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Produces complete snapshots. Implemented by [`Compiler`].
pub trait SnapshotBuilder: Send + Sync + 'static {
    /// Build a snapshot. `changed` lists the files that triggered the build
    /// (empty for the initial build).
    fn build(&self, changed: &[PathBuf]) -> Result<ArtifactSet, CompileError>;
}

impl SnapshotBuilder for Compiler {
    fn build(&self, changed: &[PathBuf]) -> Result<ArtifactSet, CompileError> {
        if !changed.is_empty() {
            tracing::debug!(files = changed.len(), "rebuilding after change");
        }
        self.compile()
    }
}

type RebuildCallback = Box<dyn Fn(&RebuildEvent, &ArtifactSet) + Send + Sync>;

struct RebuildRequest {
    changed: Vec<PathBuf>,
    done: Option<oneshot::Sender<RebuildEvent>>,
}

/// State shared between the service handle and its rebuild task.
struct Shared {
    events: broadcast::Sender<RebuildEvent>,
    last_event: RwLock<Option<RebuildEvent>>,
    callbacks: Mutex<Vec<RebuildCallback>>,
}

impl Shared {
    /// Record `event` and notify callbacks and subscribers. `snapshot` is the
    /// one now being served.
    fn publish(&self, event: &RebuildEvent, snapshot: &ArtifactSet) {
        *self.last_event.write().unwrap_or_else(PoisonError::into_inner) = Some(event.clone());
        for callback in self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            callback(event, snapshot);
        }
        // No subscribers is fine.
        let _ = self.events.send(event.clone());
    }
}

/// Handle to the resident compiler.
pub struct BuildService {
    snapshot: watch::Receiver<Arc<ArtifactSet>>,
    requests: mpsc::UnboundedSender<RebuildRequest>,
    shared: Arc<Shared>,
}

impl BuildService {
    /// Run the initial build and start the rebuild task.
    ///
    /// Fails only when the initial build hits a fatal configuration error.
    /// Any other initial failure starts the service with an empty snapshot
    /// and records the failure as the latest event.
    pub async fn start<B: SnapshotBuilder>(builder: B) -> Result<Self, CompileError> {
        let builder = Arc::new(builder);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            events,
            last_event: RwLock::new(None),
            callbacks: Mutex::new(Vec::new()),
        });

        let (initial, event) = match run_build(&builder, Vec::new()).await {
            Ok(artifacts) => {
                let event = RebuildEvent::built(artifacts.hash.clone(), chunk_names(&artifacts));
                (artifacts, event)
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                tracing::error!(error = %err.describe(), "initial build failed");
                (ArtifactSet::empty(), RebuildEvent::failed(vec![err.describe()]))
            }
        };
        shared.publish(&event, &initial);

        let (snapshot_tx, snapshot) = watch::channel(Arc::new(initial));
        let (requests, rx) = mpsc::unbounded_channel();
        tokio::spawn(rebuild_loop(builder, rx, snapshot_tx, Arc::clone(&shared)));

        Ok(Self {
            snapshot,
            requests,
            shared,
        })
    }

    /// The latest complete snapshot.
    #[must_use]
    pub fn current_snapshot(&self) -> Arc<ArtifactSet> {
        Arc::clone(&self.snapshot.borrow())
    }

    /// Subscribe to rebuild notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RebuildEvent> {
        self.shared.events.subscribe()
    }

    /// Outcome of the most recent build.
    #[must_use]
    pub fn last_event(&self) -> Option<RebuildEvent> {
        self.shared
            .last_event
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register a callback invoked after every rebuild with its event and the
    /// snapshot then being served. Runs on the rebuild task, before
    /// [`rebuild_now`](Self::rebuild_now) callers are woken.
    pub fn on_rebuild<F>(&self, callback: F)
    where
        F: Fn(&RebuildEvent, &ArtifactSet) + Send + Sync + 'static,
    {
        self.shared
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(callback));
    }

    /// Queue a rebuild for `changed` without waiting for it.
    pub fn request_rebuild(&self, changed: Vec<PathBuf>) {
        let request = RebuildRequest {
            changed,
            done: None,
        };
        if self.requests.send(request).is_err() {
            tracing::warn!("rebuild task has stopped");
        }
    }

    /// Queue a rebuild and wait for the build that covers it.
    pub async fn rebuild_now(&self, changed: Vec<PathBuf>) -> RebuildEvent {
        let (done, rx) = oneshot::channel();
        let request = RebuildRequest {
            changed,
            done: Some(done),
        };
        if self.requests.send(request).is_err() {
            return RebuildEvent::failed(vec!["rebuild task has stopped".to_string()]);
        }
        rx.await
            .unwrap_or_else(|_| RebuildEvent::failed(vec!["rebuild task has stopped".to_string()]))
    }
}

async fn run_build<B: SnapshotBuilder>(
    builder: &Arc<B>,
    changed: Vec<PathBuf>,
) -> Result<ArtifactSet, CompileError> {
    let builder = Arc::clone(builder);
    tokio::task::spawn_blocking(move || builder.build(&changed))
        .await
        .unwrap_or_else(|e| {
            Err(CompileError::transform(
                crate::codes::TRANSFORM_PLUGIN_FAILED,
                format!("build task panicked: {e}"),
            ))
        })
}

async fn rebuild_loop<B: SnapshotBuilder>(
    builder: Arc<B>,
    mut rx: mpsc::UnboundedReceiver<RebuildRequest>,
    snapshot: watch::Sender<Arc<ArtifactSet>>,
    shared: Arc<Shared>,
) {
    while let Some(first) = rx.recv().await {
        let mut changed = first.changed;
        let mut waiters: Vec<oneshot::Sender<RebuildEvent>> = first.done.into_iter().collect();
        while let Ok(more) = rx.try_recv() {
            changed.extend(more.changed);
            waiters.extend(more.done);
        }
        changed.sort();
        changed.dedup();

        let event = match run_build(&builder, changed).await {
            Ok(artifacts) => {
                let previous = Arc::clone(&snapshot.borrow());
                let chunks = artifacts.changed_chunks(&previous);
                let event = RebuildEvent::built(artifacts.hash.clone(), chunks);
                snapshot.send_replace(Arc::new(artifacts));
                event
            }
            Err(err) => {
                tracing::warn!(error = %err.describe(), "rebuild failed, keeping previous snapshot");
                RebuildEvent::failed(vec![err.describe()])
            }
        };

        let current = Arc::clone(&snapshot.borrow());
        shared.publish(&event, &current);
        for waiter in waiters {
            let _ = waiter.send(event.clone());
        }
    }
}

fn chunk_names(artifacts: &ArtifactSet) -> Vec<String> {
    artifacts.chunks.iter().map(|c| c.name.clone()).collect()
}
