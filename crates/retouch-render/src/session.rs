//! Render session: a latest-request-wins worker thread.
//!
//! The caller owns a [`RenderSession`] and talks to a worker thread over two
//! channels: requests go out as [`SessionMsg`], results come back as
//! [`SessionEvent`]. Every render request bumps a [`Generation`] counter and
//! cancels the token of the render before it, so a burst of slider moves
//! only ever finishes the newest one. Events from older generations are
//! dropped on the caller side.
//!
//! Per source image the worker computes the segmentation mask (on the first
//! render that needs it) and the auto-enhance analysis (on the first
//! [`RenderSession::analyze`]) once and reuses them.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use retouch_core::Raster;
//! use retouch_render::{Adjustments, RenderConfig, RenderRequest, RenderSession};
//! use retouch_render::segmentation::NoSegmentation;
//!
//! let mut session = RenderSession::spawn(RenderConfig::default(), NoSegmentation);
//! session.set_source(Raster::filled(32, 32, [200, 100, 50, 255]));
//! let generation = session.request(Adjustments { tint: 0.2, ..Default::default() }, RenderRequest::full());
//! let image = session.wait_for(generation, Duration::from_secs(10)).unwrap();
//! assert_eq!(image.dimensions(), (32, 32));
//! ```

use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use retouch_core::{CancelToken, Mask, Raster};
use retouch_ops::{AutoParams, BackgroundMode};
#[allow(unused_imports)]
use tracing::{debug, trace, warn};

use crate::adjustments::Adjustments;
use crate::config::RenderConfig;
use crate::pipeline::{Pipeline, RenderRequest};
use crate::segmentation::SegmentationProvider;

/// Render request counter; larger is newer.
pub type Generation = u64;

/// Messages from the caller to the worker.
#[derive(Debug)]
pub enum SessionMsg {
    /// Replace the source image and drop cached mask and analysis.
    SetSource(Raster),
    /// Render the current source.
    Render {
        /// Request generation.
        generation: Generation,
        /// Edit state to render.
        adjustments: Box<Adjustments>,
        /// Resolution and crop handling.
        request: RenderRequest,
        /// Token cancelled when a newer request arrives.
        cancel: CancelToken,
    },
    /// Run (or reuse) the auto-enhance analysis.
    Analyze,
    /// Stop the worker.
    Close,
}

/// Events from the worker to the caller.
#[derive(Debug)]
pub enum SessionEvent {
    /// A new source was accepted.
    SourceReady {
        /// Source width.
        width: u32,
        /// Source height.
        height: u32,
    },
    /// Render progress as a fraction of the pipeline's stage weights.
    Progress {
        /// Request generation.
        generation: Generation,
        /// Cumulative finished weight.
        fraction: f32,
    },
    /// A render finished.
    Rendered {
        /// Request generation.
        generation: Generation,
        /// Output raster.
        image: Raster,
    },
    /// A render was cancelled before finishing.
    Cancelled {
        /// Request generation.
        generation: Generation,
    },
    /// Auto-enhance suggestion for the current source.
    Analysis(AutoParams),
    /// A request could not be served (for example, no source set yet).
    Error(String),
}

impl SessionEvent {
    fn generation(&self) -> Option<Generation> {
        match self {
            SessionEvent::Progress { generation, .. }
            | SessionEvent::Rendered { generation, .. }
            | SessionEvent::Cancelled { generation } => Some(*generation),
            _ => None,
        }
    }
}

/// Caller-side handle of a render worker.
pub struct RenderSession {
    tx: Sender<SessionMsg>,
    rx: Receiver<SessionEvent>,
    worker: Option<JoinHandle<()>>,
    generation: Generation,
    inflight: CancelToken,
}

impl std::fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("generation", &self.generation)
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl RenderSession {
    /// Starts a worker thread rendering with `config` and `segmentation`.
    pub fn spawn(config: RenderConfig, segmentation: impl SegmentationProvider + 'static) -> Self {
        let (tx_to_worker, rx_in_worker) = channel();
        let (tx_to_caller, rx_from_worker) = channel();
        let segmentation: Box<dyn SegmentationProvider> = Box::new(segmentation);

        let worker = thread::Builder::new()
            .name("retouch-session".into())
            .spawn(move || {
                SessionHandler::new(rx_in_worker, tx_to_caller, Pipeline::new(config), segmentation).run();
            });
        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "failed to spawn render worker");
                None
            }
        };

        Self {
            tx: tx_to_worker,
            rx: rx_from_worker,
            worker,
            generation: 0,
            inflight: CancelToken::new(),
        }
    }

    fn send(&self, msg: SessionMsg) {
        if self.tx.send(msg).is_err() {
            warn!("render worker is gone");
        }
    }

    /// Replaces the source image.
    pub fn set_source(&mut self, source: Raster) {
        self.inflight.cancel();
        self.send(SessionMsg::SetSource(source));
    }

    /// Queues a render and cancels any render still running.
    ///
    /// Returns the generation of the new request.
    pub fn request(&mut self, adjustments: Adjustments, request: RenderRequest) -> Generation {
        self.inflight.cancel();
        self.inflight = CancelToken::new();
        self.generation += 1;
        trace!(generation = self.generation, "render requested");
        self.send(SessionMsg::Render {
            generation: self.generation,
            adjustments: Box::new(adjustments),
            request,
            cancel: self.inflight.clone(),
        });
        self.generation
    }

    /// Asks for the auto-enhance analysis of the current source.
    pub fn analyze(&self) {
        self.send(SessionMsg::Analyze);
    }

    /// Generation of the newest request.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Next pending event that is not stale, without blocking.
    pub fn poll(&self) -> Option<SessionEvent> {
        while let Ok(event) = self.rx.try_recv() {
            if self.is_current(&event) {
                return Some(event);
            }
        }
        None
    }

    /// Waits up to `timeout` for the next event that is not stale.
    pub fn next_event(&self, timeout: Duration) -> Option<SessionEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(left) {
                Ok(event) if self.is_current(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Blocks until render `generation` finishes.
    ///
    /// Returns `None` on timeout, cancellation, or if a newer request
    /// superseded it.
    pub fn wait_for(&self, generation: Generation, timeout: Duration) -> Option<Raster> {
        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.next_event(left)? {
                SessionEvent::Rendered { generation: g, image } if g == generation => return Some(image),
                SessionEvent::Cancelled { generation: g } if g == generation => return None,
                _ if self.generation > generation => return None,
                _ => {}
            }
        }
    }

    /// Blocks until the analysis arrives.
    pub fn wait_for_analysis(&self, timeout: Duration) -> Option<AutoParams> {
        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            if let SessionEvent::Analysis(params) = self.next_event(left)? {
                return Some(params);
            }
        }
    }

    fn is_current(&self, event: &SessionEvent) -> bool {
        event.generation().is_none_or(|g| g >= self.generation)
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        self.inflight.cancel();
        let _ = self.tx.send(SessionMsg::Close);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Worker side: owns the source, caches and pipeline.
struct SessionHandler {
    rx: Receiver<SessionMsg>,
    tx: Sender<SessionEvent>,
    pipeline: Pipeline,
    segmentation: Box<dyn SegmentationProvider>,
    source: Option<Raster>,
    // outer None = not computed yet
    mask: Option<Option<Mask>>,
    analysis: Option<AutoParams>,
}

struct PendingRender {
    generation: Generation,
    adjustments: Box<Adjustments>,
    request: RenderRequest,
    cancel: CancelToken,
}

impl SessionHandler {
    fn new(
        rx: Receiver<SessionMsg>,
        tx: Sender<SessionEvent>,
        pipeline: Pipeline,
        segmentation: Box<dyn SegmentationProvider>,
    ) -> Self {
        Self {
            rx,
            tx,
            pipeline,
            segmentation,
            source: None,
            mask: None,
            analysis: None,
        }
    }

    fn run(mut self) {
        while let Ok(msg) = self.rx.recv() {
            let pending = match msg {
                SessionMsg::Close => break,
                SessionMsg::Render { generation, adjustments, request, cancel } => {
                    PendingRender { generation, adjustments, request, cancel }
                }
                other => {
                    self.handle(other);
                    continue;
                }
            };
            // coalesce: only the newest queued render runs
            let mut latest = pending;
            let mut closing = false;
            while let Ok(msg) = self.rx.try_recv() {
                match msg {
                    SessionMsg::Render { generation, adjustments, request, cancel } => {
                        self.send(SessionEvent::Cancelled { generation: latest.generation });
                        latest = PendingRender { generation, adjustments, request, cancel };
                    }
                    SessionMsg::Close => {
                        closing = true;
                        break;
                    }
                    other => self.handle(other),
                }
            }
            if closing {
                break;
            }
            self.render(latest);
        }
        debug!("render session worker stopped");
    }

    fn send(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    fn handle(&mut self, msg: SessionMsg) {
        match msg {
            SessionMsg::SetSource(source) => {
                let (width, height) = source.dimensions();
                debug!(width, height, "session source set");
                self.source = Some(source);
                self.mask = None;
                self.analysis = None;
                self.send(SessionEvent::SourceReady { width, height });
            }
            SessionMsg::Analyze => match &self.source {
                Some(source) => {
                    let params = *self.analysis.get_or_insert_with(|| self.pipeline.analyze(source));
                    self.send(SessionEvent::Analysis(params));
                }
                None => self.send(SessionEvent::Error("no source image".into())),
            },
            SessionMsg::Render { .. } | SessionMsg::Close => {}
        }
    }

    fn render(&mut self, job: PendingRender) {
        let Some(source) = self.source.clone() else {
            self.send(SessionEvent::Error("no source image".into()));
            return;
        };
        if job.cancel.is_cancelled() {
            self.send(SessionEvent::Cancelled { generation: job.generation });
            return;
        }

        if job.adjustments.background_mode != BackgroundMode::None && self.mask.is_none() {
            let mask = self.segmentation.segment(&source);
            if mask.is_none() {
                warn!("segmentation unavailable for this source");
            }
            self.mask = Some(mask);
        }
        let mask = self.mask.as_ref().and_then(|m| m.as_ref());

        let generation = job.generation;
        let tx = &self.tx;
        let progress = |fraction: f32| {
            let _ = tx.send(SessionEvent::Progress { generation, fraction });
        };
        let result = self
            .pipeline
            .render(&source, &job.adjustments, mask, &job.request, &job.cancel, &progress);
        match result {
            Ok(image) => self.send(SessionEvent::Rendered { generation, image }),
            Err(_) => {
                debug!(generation, "render cancelled");
                self.send(SessionEvent::Cancelled { generation });
            }
        }
    }
}
