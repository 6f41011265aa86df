//! Asynchronous asset loader
//!
//! Fetch and validation run on a small worker pool; results travel back
//! over a single-consumer completion queue that the scene's update loop
//! drains via [`AssetLoader::pump`]. Completion callbacks therefore always
//! run on the update thread and may mutate the scene graph, register
//! animation timelines, and bind renderer resources without locking.
//!
//! A request resolves exactly once. The loader performs no retries; the
//! callback decides what a failure means for the scene.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::animation::AnimationScheduler;
use crate::assets::{validate, AssetError, AssetKind, AssetSource, LoadedAsset};
use crate::render::Renderer;
use crate::scene::{EnvironmentSlots, SceneGraph};

/// Identifier of an in-flight asset request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

/// Cancellation token for an in-flight request
///
/// Cancellation is idempotent and safe from any thread. It only
/// suppresses the completion callback; fetch work already running is not
/// interrupted. Cancelling after the callback ran is a no-op.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress the request's callback
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether this token has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Mutable scene state handed to completion callbacks
///
/// Everything a callback may touch lives here, so callback bodies stay
/// inside the single-writer discipline of the update loop.
pub struct LoadContext<'a> {
    /// The scene's node hierarchy
    pub graph: &'a mut SceneGraph,

    /// Timeline scheduler for registering animations on loaded content
    pub animations: &'a mut AnimationScheduler,

    /// Rendering backend for binding loaded resources
    pub renderer: &'a mut dyn Renderer,

    /// Scene environment (skybox + indirect light) slots
    pub environment: &'a mut EnvironmentSlots,
}

/// Completion callback invoked on the update thread, exactly once
pub type CompletionFn = Box<dyn FnOnce(&mut LoadContext<'_>, Result<LoadedAsset, AssetError>)>;

struct Job {
    ticket: LoadTicket,
    kind: AssetKind,
    path: String,
}

struct Completion {
    ticket: LoadTicket,
    result: Result<Vec<u8>, AssetError>,
}

struct Pending {
    kind: AssetKind,
    path: String,
    token: CancelToken,
    callback: CompletionFn,
}

/// Asynchronous, cancellable asset loader
///
/// Owns its worker pool. Dropping the loader cancels every pending
/// request and joins the workers, so callbacks can never fire into a
/// torn-down scene.
pub struct AssetLoader {
    jobs: Option<Sender<Job>>,
    completions: Receiver<Completion>,
    pending: HashMap<LoadTicket, Pending>,
    workers: Vec<JoinHandle<()>>,
    next_ticket: u64,
}

impl AssetLoader {
    /// Create a loader fetching from `source` with `threads` workers
    ///
    /// At least one worker is always spawned.
    pub fn new(source: Arc<dyn AssetSource>, threads: usize) -> Self {
        let (job_tx, job_rx) = channel::<Job>();
        let (completion_tx, completion_rx) = channel::<Completion>();
        let job_rx = Arc::new(Mutex::new(job_rx));

        let workers = (0..threads.max(1))
            .map(|_| {
                let job_rx = Arc::clone(&job_rx);
                let completion_tx = completion_tx.clone();
                let source = Arc::clone(&source);
                std::thread::spawn(move || {
                    loop {
                        // Hold the lock only while dequeuing, not while fetching
                        let job = match job_rx.lock().unwrap().recv() {
                            Ok(job) => job,
                            Err(_) => break,
                        };
                        let result = source.read(&job.path).and_then(|bytes| {
                            validate(job.kind, &job.path, &bytes)?;
                            Ok(bytes)
                        });
                        if completion_tx
                            .send(Completion {
                                ticket: job.ticket,
                                result,
                            })
                            .is_err()
                        {
                            break;
                        }
                    }
                })
            })
            .collect();

        Self {
            jobs: Some(job_tx),
            completions: completion_rx,
            pending: HashMap::new(),
            workers,
            next_ticket: 0,
        }
    }

    /// Request an asset; never blocks the calling thread
    ///
    /// The callback fires from a later [`Self::pump`] call with either the
    /// loaded asset or an [`AssetError`], unless the returned token is
    /// cancelled first.
    pub fn request(
        &mut self,
        path: impl Into<String>,
        kind: AssetKind,
        on_complete: CompletionFn,
    ) -> (LoadTicket, CancelToken) {
        let path = path.into();
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        let token = CancelToken::new();

        log::debug!("requesting {kind:?} '{path}' as {ticket:?}");
        self.pending.insert(
            ticket,
            Pending {
                kind,
                path: path.clone(),
                token: token.clone(),
                callback: on_complete,
            },
        );

        // The job channel only closes in Drop, so a failed send means the
        // worker pool died; the request can never resolve.
        if let Some(jobs) = &self.jobs {
            if jobs.send(Job { ticket, kind, path }).is_err() {
                log::error!("asset worker pool unavailable, {ticket:?} will not resolve");
            }
        }

        (ticket, token)
    }

    /// Deliver finished loads to their callbacks; returns how many ran
    ///
    /// Must be called from the scene's update thread. Cancelled requests
    /// are drained without invoking their callbacks.
    pub fn pump(&mut self, ctx: &mut LoadContext<'_>) -> usize {
        let mut delivered = 0;
        while let Ok(completion) = self.completions.try_recv() {
            let Some(pending) = self.pending.remove(&completion.ticket) else {
                continue;
            };
            if pending.token.is_cancelled() {
                log::debug!("dropping cancelled load '{}'", pending.path);
                continue;
            }
            let result = completion.result.map(|bytes| LoadedAsset {
                kind: pending.kind,
                path: pending.path,
                bytes: Arc::new(bytes),
            });
            (pending.callback)(ctx, result);
            delivered += 1;
        }
        delivered
    }

    /// Number of requests not yet drained (including cancelled ones)
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Cancel every pending request
    pub fn cancel_all(&self) {
        for pending in self.pending.values() {
            pending.token.cancel();
        }
    }
}

impl Drop for AssetLoader {
    fn drop(&mut self) {
        self.cancel_all();
        // Closing the job channel lets idle workers exit their recv loop
        self.jobs.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemorySource;
    use crate::render::RecordingRenderer;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct Harness {
        graph: SceneGraph,
        animations: AnimationScheduler,
        renderer: RecordingRenderer,
        environment: EnvironmentSlots,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                graph: SceneGraph::new(),
                animations: AnimationScheduler::new(),
                renderer: RecordingRenderer::new(),
                environment: EnvironmentSlots::new(),
            }
        }

        fn pump_until_idle(&mut self, loader: &mut AssetLoader) -> usize {
            let mut delivered = 0;
            for _ in 0..1000 {
                let mut ctx = LoadContext {
                    graph: &mut self.graph,
                    animations: &mut self.animations,
                    renderer: &mut self.renderer,
                    environment: &mut self.environment,
                };
                delivered += loader.pump(&mut ctx);
                if loader.in_flight() == 0 {
                    return delivered;
                }
                std::thread::sleep(Duration::from_millis(1));
            }
            panic!("loader never went idle");
        }
    }

    fn demo_source() -> Arc<MemorySource> {
        let mut source = MemorySource::new();
        source.insert("materials/metallic.filamat", vec![0xF1; 8]);
        source.insert("models/cockroach.glb", b"glTF\x02\x00\x00\x00rest".to_vec());
        source.insert("models/bogus.glb", b"not a model".to_vec());
        Arc::new(source)
    }

    #[test]
    fn test_load_delivers_asset_on_pump() {
        let mut loader = AssetLoader::new(demo_source(), 2);
        let mut harness = Harness::new();

        let loaded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&loaded);
        loader.request(
            "materials/metallic.filamat",
            AssetKind::Material,
            Box::new(move |_, result| {
                sink.lock().unwrap().push(result.unwrap().path);
            }),
        );

        assert_eq!(harness.pump_until_idle(&mut loader), 1);
        assert_eq!(*loaded.lock().unwrap(), vec!["materials/metallic.filamat"]);
    }

    #[test]
    fn test_missing_asset_resolves_with_not_found() {
        let mut loader = AssetLoader::new(demo_source(), 1);
        let mut harness = Harness::new();

        let saw_not_found = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&saw_not_found);
        loader.request(
            "models/ghost.glb",
            AssetKind::Model,
            Box::new(move |_, result| {
                flag.store(
                    matches!(result, Err(AssetError::NotFound(_))),
                    Ordering::Release,
                );
            }),
        );

        harness.pump_until_idle(&mut loader);
        assert!(saw_not_found.load(Ordering::Acquire));
    }

    #[test]
    fn test_wrong_magic_resolves_with_decode_error() {
        let mut loader = AssetLoader::new(demo_source(), 1);
        let mut harness = Harness::new();

        let saw_decode = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&saw_decode);
        loader.request(
            "models/bogus.glb",
            AssetKind::Model,
            Box::new(move |_, result| {
                flag.store(
                    matches!(result, Err(AssetError::Decode(_))),
                    Ordering::Release,
                );
            }),
        );

        harness.pump_until_idle(&mut loader);
        assert!(saw_decode.load(Ordering::Acquire));
    }

    #[test]
    fn test_cancelled_request_never_invokes_callback() {
        let mut loader = AssetLoader::new(demo_source(), 1);
        let mut harness = Harness::new();

        let invoked = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invoked);
        let (_, token) = loader.request(
            "models/cockroach.glb",
            AssetKind::Model,
            Box::new(move |_, _| {
                counter.fetch_add(1, Ordering::AcqRel);
            }),
        );

        token.cancel();
        token.cancel(); // idempotent

        let delivered = harness.pump_until_idle(&mut loader);
        assert_eq!(delivered, 0);
        assert_eq!(invoked.load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_cancel_after_delivery_is_noop() {
        let mut loader = AssetLoader::new(demo_source(), 1);
        let mut harness = Harness::new();

        let invoked = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invoked);
        let (_, token) = loader.request(
            "materials/metallic.filamat",
            AssetKind::Material,
            Box::new(move |_, _| {
                counter.fetch_add(1, Ordering::AcqRel);
            }),
        );

        harness.pump_until_idle(&mut loader);
        token.cancel();
        assert_eq!(invoked.load(Ordering::Acquire), 1);
    }

    #[test]
    fn test_drop_with_pending_requests_joins_cleanly() {
        let mut loader = AssetLoader::new(demo_source(), 2);
        for _ in 0..8 {
            loader.request(
                "models/cockroach.glb",
                AssetKind::Model,
                Box::new(|_, _| panic!("callback after teardown")),
            );
        }
        drop(loader); // must neither hang nor run callbacks
    }
}
