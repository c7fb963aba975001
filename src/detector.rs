//! Process-wide detector: the loaded model(s), the concurrency gate and the request pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use crate::common::{DetectionSet, InferenceDevice, ModelConfig, OutputMode, SpotError, SpotImage, SpotResult};
use crate::detection_processing::postprocess;
use crate::detection_runners::{infer, load_with, Predictor};
use crate::rendering::{to_json, Artifact, OverlayRenderer};

const SLOT_POLL_INTERVAL: Duration = Duration::from_millis(20);

static GLOBAL: OnceLock<Arc<SpotDetector>> = OnceLock::new();
static INIT_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Shared cancellation flag for one request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cancels the token if dropped before [`CancelOnDrop::disarm`], e.g. when an
/// async caller abandons the request.
struct CancelOnDrop {
    token: CancelToken,
    armed: bool,
}

impl CancelOnDrop {
    fn new(token: CancelToken) -> Self {
        Self { token, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.token.cancel();
        }
    }
}

/// Loaded models behind a bounded gate.
///
/// Each slot holds its own model instance. Accelerators get one slot, so forward
/// passes on the device are serialized; a CPU deployment may hold several.
pub struct SpotDetector {
    config: ModelConfig,
    device: InferenceDevice,
    slots: Vec<Mutex<Box<dyn Predictor>>>,
    free_tx: Sender<usize>,
    free_rx: Receiver<usize>,
    renderer: OverlayRenderer,
}

/// Returns its slot to the pool on drop.
struct SlotGuard<'a> {
    index: usize,
    free_tx: &'a Sender<usize>,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        // capacity equals the slot count, so this never blocks
        let _ = self.free_tx.send(self.index);
    }
}

impl SpotDetector {
    /// Loads the model once per slot. Any failure here must stop startup.
    pub fn init(config: ModelConfig) -> SpotResult<Self> {
        config.validate()?;
        log::info!("Initializing detector\n{}", config.summary());

        let now = Instant::now();
        let first = load_with(&config)?;
        let workers = if first.device().is_accelerator() { 1 } else { config.cpu_workers };

        let mut predictors = Vec::with_capacity(workers);
        predictors.push(first);
        for _ in 1..workers {
            predictors.push(load_with(&config)?);
        }
        log::info!("Loaded {} model slot(s) in {:.2?}", predictors.len(), now.elapsed());

        Self::with_predictors(config, predictors)
    }

    /// Builds a detector around already constructed predictors, one slot each.
    pub fn with_predictors(config: ModelConfig, predictors: Vec<Box<dyn Predictor>>) -> SpotResult<Self> {
        config.validate()?;
        if predictors.is_empty() {
            return Err(SpotError::Config("at least one predictor is required".to_string()));
        }

        let device = predictors[0].device();
        let (free_tx, free_rx) = bounded(predictors.len());
        for i in 0..predictors.len() {
            free_tx
                .send(i)
                .map_err(|err| SpotError::Config(format!("cannot seed model slots: {err}")))?;
        }
        let renderer = OverlayRenderer::new(config.font_path.as_deref());

        log::info!(
            "Detector ready | Device: {} | Slots: {} | Classes: {} | Threshold: {}",
            device,
            predictors.len(),
            config.vocabulary.len(),
            config.conf_threshold,
        );

        Ok(Self {
            config,
            device,
            slots: predictors.into_iter().map(Mutex::new).collect(),
            free_tx,
            free_rx,
            renderer,
        })
    }

    /// The process-wide detector, once [`init_global`] has succeeded.
    pub fn global() -> Option<Arc<SpotDetector>> {
        global()
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn device(&self) -> InferenceDevice {
        self.device
    }

    pub fn workers(&self) -> usize {
        self.slots.len()
    }

    pub fn renderer(&self) -> &OverlayRenderer {
        &self.renderer
    }

    /// Decodes, detects and renders one upload.
    pub fn process_image(&self, image_bytes: &[u8], mode: OutputMode) -> SpotResult<Artifact> {
        self.process_image_with_cancel(image_bytes, mode, &CancelToken::new())
    }

    pub fn process_image_with_cancel(
        &self,
        image_bytes: &[u8],
        mode: OutputMode,
        cancel: &CancelToken,
    ) -> SpotResult<Artifact> {
        if cancel.is_cancelled() {
            return Err(SpotError::Cancelled);
        }
        let image = SpotImage::decode(image_bytes)?;
        let detections = self.detect_with_cancel(&image, cancel)?;
        self.render(&image, &detections, mode)
    }

    /// Runs [`SpotDetector::process_image_with_cancel`] on the blocking pool.
    ///
    /// Dropping the returned future cancels the request: if it has not reached a
    /// model slot it never will, otherwise its result is discarded.
    pub async fn process_image_async(
        self: Arc<Self>,
        image_bytes: Vec<u8>,
        mode: OutputMode,
        cancel: CancelToken,
    ) -> SpotResult<Artifact> {
        let on_drop = CancelOnDrop::new(cancel.clone());
        let joined = tokio::task::spawn_blocking(move || self.process_image_with_cancel(&image_bytes, mode, &cancel))
            .await;
        on_drop.disarm();
        joined.map_err(|err| SpotError::inference(format!("detection task failed: {err}")))?
    }

    pub fn detect(&self, image: &SpotImage) -> SpotResult<DetectionSet> {
        self.detect_with_cancel(image, &CancelToken::new())
    }

    pub fn detect_with_cancel(&self, image: &SpotImage, cancel: &CancelToken) -> SpotResult<DetectionSet> {
        let raw = {
            let slot = self.acquire(cancel)?;
            let mut model = self.slots[slot.index].lock();
            infer(&mut **model, image, self.config.conf_threshold)?
        };

        if cancel.is_cancelled() {
            log::debug!("Request cancelled during inference; discarding {} candidate(s)", raw.len());
            return Err(SpotError::Cancelled);
        }

        postprocess(&raw, &self.config.vocabulary).inspect_err(|err| {
            log::error!("{err}; the checkpoint and vocabulary are out of sync");
        })
    }

    pub fn render(&self, image: &SpotImage, detections: &DetectionSet, mode: OutputMode) -> SpotResult<Artifact> {
        match mode {
            OutputMode::Json => Ok(Artifact::Json(to_json(detections))),
            OutputMode::Overlay => Ok(Artifact::Png(self.renderer.render_overlay(&image.image, detections)?)),
        }
    }

    /// Waits for a free slot, giving up as soon as the request is cancelled.
    fn acquire(&self, cancel: &CancelToken) -> SpotResult<SlotGuard<'_>> {
        loop {
            if cancel.is_cancelled() {
                return Err(SpotError::Cancelled);
            }
            match self.free_rx.recv_timeout(SLOT_POLL_INTERVAL) {
                Ok(index) => {
                    let guard = SlotGuard { index, free_tx: &self.free_tx };
                    if cancel.is_cancelled() {
                        return Err(SpotError::Cancelled);
                    }
                    return Ok(guard);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SpotError::Inference("model slot pool is closed".to_string()));
                }
            }
        }
    }
}

impl Drop for SpotDetector {
    fn drop(&mut self) {
        log::debug!("Releasing {} model slot(s) on {}", self.slots.len(), self.device);
    }
}

/// Initializes the process-wide detector once; later calls return the same handle.
///
/// Concurrent first calls load the model only once.
pub fn init_global(config: ModelConfig) -> SpotResult<Arc<SpotDetector>> {
    if let Some(detector) = GLOBAL.get() {
        return Ok(detector.clone());
    }
    let _guard = INIT_LOCK.lock();
    if let Some(detector) = GLOBAL.get() {
        return Ok(detector.clone());
    }
    let detector = Arc::new(SpotDetector::init(config)?);
    let _ = GLOBAL.set(detector.clone());
    Ok(detector)
}

/// Installs an already built detector as the process-wide one, unless one exists.
pub fn install_global(detector: SpotDetector) -> Arc<SpotDetector> {
    let _guard = INIT_LOCK.lock();
    GLOBAL.get_or_init(|| Arc::new(detector)).clone()
}

pub fn global() -> Option<Arc<SpotDetector>> {
    GLOBAL.get().cloned()
}
