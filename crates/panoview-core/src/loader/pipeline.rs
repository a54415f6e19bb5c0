use std::cell::Cell;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::ViewerConfig;
use crate::consts::{DEFAULT_TILE_SIZE, READY_POLL_INTERVAL};
use crate::context::GraphicsContext;
use crate::error::{PanoviewError, Result};
use crate::raster::DecodedImage;
use crate::texture::TiledTexture;

use super::decode::{Decoder, LoadSource};
use super::events::{LoadEvent, LoadEventKind, LoadStage, LoadedImage};
use super::metadata::resolve_metadata;
use super::request::{LatestRequest, RequestToken};

/// Called after every event is queued, e.g. to request a repaint.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
pub struct LoaderOptions {
    pub tile_size: u32,
    pub poll_interval: Duration,
    pub waker: Option<Waker>,
}

impl LoaderOptions {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            tile_size: config.textures.tile_size,
            poll_interval: config.loader.ready_poll_interval(),
            waker: None,
        }
    }

    pub fn with_waker(mut self, waker: impl Fn() + Send + Sync + 'static) -> Self {
        self.waker = Some(Arc::new(waker));
        self
    }
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            poll_interval: READY_POLL_INTERVAL,
            waker: None,
        }
    }
}

enum LoaderCommand {
    Load { token: RequestToken, source: LoadSource },
    Shutdown,
}

/// Render-thread handle to the loader thread.
///
/// Only the most recent request can produce events that reach the caller:
/// a new request or [`ImageLoader::cancel`] silently abandons the previous
/// one at its next stage boundary or readiness poll.
pub struct ImageLoader {
    commands: mpsc::Sender<LoaderCommand>,
    events: mpsc::Receiver<LoadEvent>,
    latest: Arc<LatestRequest>,
    worker: Option<JoinHandle<()>>,
}

impl ImageLoader {
    /// Start the loader thread with a context shared from `primary`.
    pub fn spawn(primary: &GraphicsContext, decoder: Arc<dyn Decoder>, options: LoaderOptions) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<LoaderCommand>();
        let (event_tx, event_rx) = mpsc::channel::<LoadEvent>();
        let latest = Arc::new(LatestRequest::new());

        let worker = Worker {
            context: primary.share("loader"),
            decoder,
            options,
            latest: Arc::clone(&latest),
            events: event_tx,
        };
        let handle = thread::Builder::new()
            .name("panoview-loader".into())
            .spawn(move || worker.run(cmd_rx))?;

        Ok(Self {
            commands: cmd_tx,
            events: event_rx,
            latest,
            worker: Some(handle),
        })
    }

    pub fn open_file(&self, path: impl Into<PathBuf>) -> RequestToken {
        self.request(LoadSource::File(path.into()))
    }

    pub fn open_bytes(&self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> RequestToken {
        self.request(LoadSource::Memory {
            name: name.into(),
            bytes: bytes.into(),
        })
    }

    /// Queue a load, superseding whatever is in flight.
    pub fn request(&self, source: LoadSource) -> RequestToken {
        let token = self.latest.issue();
        tracing::debug!("request {token}: {}", source.name());
        if self
            .commands
            .send(LoaderCommand::Load { token, source })
            .is_err()
        {
            tracing::warn!("loader thread has stopped; request {token} dropped");
        }
        token
    }

    /// Abandon the in-flight request without starting another.
    pub fn cancel(&self) {
        self.latest.invalidate();
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.is_current(token)
    }

    /// False once the loader thread has exited.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Next event of the current request, if one is queued. Events left
    /// behind by superseded requests are discarded.
    pub fn try_next_event(&self) -> Option<LoadEvent> {
        while let Ok(event) = self.events.try_recv() {
            if self.latest.is_current(event.request) {
                return Some(event);
            }
            tracing::trace!("dropping stale event of request {}", event.request);
        }
        None
    }

    /// Like [`ImageLoader::try_next_event`] but waits up to `timeout`.
    pub fn next_event_timeout(&self, timeout: Duration) -> Option<LoadEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let event = self.events.recv_timeout(remaining).ok()?;
            if self.latest.is_current(event.request) {
                return Some(event);
            }
            tracing::trace!("dropping stale event of request {}", event.request);
        }
    }

    /// Stop the loader thread and wait for it. Blocks while a decode is
    /// still running.
    pub fn shutdown(mut self) {
        self.stop();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::error!("loader thread panicked");
            }
        }
    }

    fn stop(&self) {
        self.latest.invalidate();
        let _ = self.commands.send(LoaderCommand::Shutdown);
    }
}

impl Drop for ImageLoader {
    fn drop(&mut self) {
        // The thread is left to finish on its own; it checks the token.
        self.stop();
    }
}

/// Why a request ended without a ready image.
enum Abort {
    Superseded(LoadStage),
    Failed(PanoviewError),
}

impl From<PanoviewError> for Abort {
    fn from(e: PanoviewError) -> Self {
        Abort::Failed(e)
    }
}

struct Worker {
    context: GraphicsContext,
    decoder: Arc<dyn Decoder>,
    options: LoaderOptions,
    latest: Arc<LatestRequest>,
    events: mpsc::Sender<LoadEvent>,
}

/// Per-request bookkeeping.
struct Job<'a> {
    worker: &'a Worker,
    token: RequestToken,
    percent: Cell<u8>,
}

impl Job<'_> {
    fn check(&self, stage: LoadStage) -> std::result::Result<(), Abort> {
        if self.worker.latest.is_current(self.token) {
            Ok(())
        } else {
            Err(Abort::Superseded(stage))
        }
    }

    fn enter(&self, stage: LoadStage) -> std::result::Result<(), Abort> {
        self.check(stage)?;
        tracing::debug!("request {}: {stage}", self.token);
        self.progress(stage, stage.base_percent());
        Ok(())
    }

    fn progress(&self, stage: LoadStage, percent: u8) {
        let percent = percent.min(100);
        if percent > self.percent.get() {
            self.percent.set(percent);
            self.worker
                .send(self.token, LoadEventKind::Progress { stage, percent });
        }
    }
}

impl Worker {
    fn run(self, commands: mpsc::Receiver<LoaderCommand>) {
        while let Ok(command) = commands.recv() {
            match command {
                LoaderCommand::Load { token, source } => self.handle(token, &source),
                LoaderCommand::Shutdown => break,
            }
        }
        tracing::debug!("loader thread exiting");
    }

    fn send(&self, token: RequestToken, kind: LoadEventKind) {
        let _ = self.events.send(LoadEvent { request: token, kind });
        if let Some(waker) = &self.options.waker {
            waker();
        }
    }

    fn handle(&self, token: RequestToken, source: &LoadSource) {
        let job = Job {
            worker: self,
            token,
            percent: Cell::new(0),
        };
        let started = Instant::now();
        match self.load(&job, source) {
            Ok(loaded) => {
                tracing::info!(
                    "loaded {} ({}x{}, {} tiles) in {:.2?}",
                    loaded.metadata.source_name,
                    loaded.metadata.width,
                    loaded.metadata.height,
                    loaded.texture.len(),
                    started.elapsed()
                );
                self.send(token, LoadEventKind::Ready(Box::new(loaded)));
            }
            Err(Abort::Superseded(stage)) => {
                tracing::debug!("request {token} superseded during {stage}");
            }
            Err(Abort::Failed(e)) => {
                tracing::warn!("loading {} failed: {e}", source.name());
                if self.latest.is_current(token) {
                    self.send(token, LoadEventKind::Failed { reason: e.to_string() });
                }
            }
        }
    }

    fn load(&self, job: &Job<'_>, source: &LoadSource) -> std::result::Result<LoadedImage, Abort> {
        job.enter(LoadStage::Requested)?;

        job.enter(LoadStage::Decoding)?;
        let image = self.decoder.decode(source)?;

        job.enter(LoadStage::MetadataRead)?;
        let metadata = resolve_metadata(&source.name(), &image);
        self.send(
            job.token,
            LoadEventKind::SizeKnown {
                width: metadata.width,
                height: metadata.height,
                is_360: metadata.is_360,
            },
        );

        job.enter(LoadStage::TextureBuilding)?;
        let image = self.conform(image)?;
        let mut texture = {
            let current = self.context.make_current()?;
            TiledTexture::plan(&image, self.options.tile_size, current.backend().max_texture_dimension())?
        };
        let total = texture.len();
        let building = LoadStage::TextureBuilding;
        let span = LoadStage::Uploading.base_percent() - building.base_percent();
        for i in 0..total {
            if let Err(abort) = job.check(building) {
                tracing::debug!("discarding {i} of {total} uploaded tiles");
                return Err(abort);
            }
            {
                let current = self.context.make_current()?;
                texture.tiles_mut()[i].upload(&current, &image)?;
            }
            let done = ((i + 1) * usize::from(span) / total) as u8;
            job.progress(building, building.base_percent() + done);
        }
        drop(image);

        job.enter(LoadStage::Uploading)?;
        loop {
            job.check(LoadStage::Uploading)?;
            let ready = {
                let _current = self.context.make_current()?;
                texture.ready_count()
            };
            if ready == total {
                break;
            }
            let done = (ready * 14 / total) as u8;
            job.progress(LoadStage::Uploading, LoadStage::Uploading.base_percent() + done);
            thread::sleep(self.options.poll_interval);
        }

        job.enter(LoadStage::Ready)?;
        Ok(LoadedImage { texture, metadata })
    }

    /// Convert pixels the backend cannot take: RGB gains alpha, deep
    /// samples drop to 8 bits.
    fn conform(&self, image: DecodedImage) -> Result<DecodedImage> {
        let backend = self.context.backend();
        if backend.supports(image.layout()) {
            return Ok(image);
        }
        let original = image.layout();
        let image = image.into_rgba();
        if backend.supports(image.layout()) {
            return Ok(image);
        }
        let image = image.into_depth_u8();
        if backend.supports(image.layout()) {
            tracing::debug!("converted {original} to {} for {}", image.layout(), backend.name());
            return Ok(image);
        }
        Err(PanoviewError::UnsupportedLayout(original.to_string()))
    }
}
