use crate::config::Config;
use crate::device_display::impl_fake::DeviceDisplayFake;
use crate::error::{Error, Result};
use crate::frame_source::impl_fake::{FrameSourceFakeStats, FrameSourceProviderFake};
use crate::frame_source::interface::{Frame, FrameSource, FrameSourceProvider};
use crate::image_classifier::interface::{ClassifierLoader, ImageClassifier};
use crate::image_classifier::snapshot::{ClassLabel, Snapshot};
use crate::library::logger::impl_fake::LoggerFake;
use crate::live_loop::main::LiveClassificationLoop;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub fn labels() -> Vec<ClassLabel> {
    vec!["cat".to_string(), "dog".to_string(), "none".to_string()]
}

/// Returns queued results first, then `steady` forever. Tracks how many
/// inference calls overlap.
pub struct ScriptedClassifier {
    labels: Vec<ClassLabel>,
    script: Mutex<VecDeque<Result<Vec<f32>>>>,
    steady: Vec<f32>,
    pub infer_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new(steady: Vec<f32>, script: Vec<Result<Vec<f32>>>) -> Self {
        Self {
            labels: labels(),
            script: Mutex::new(script.into_iter().collect()),
            steady,
            infer_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

impl ImageClassifier for ScriptedClassifier {
    fn class_labels(&self) -> &[ClassLabel] {
        &self.labels
    }

    fn infer(&self, _frame: &Frame) -> Result<Snapshot> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.infer_calls.fetch_add(1, Ordering::SeqCst);

        std::thread::sleep(Duration::from_millis(2));
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.steady.clone()));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Snapshot::from_probabilities(&self.labels, &next?)
    }
}

pub struct ScriptedLoader {
    pub classifier: Arc<ScriptedClassifier>,
    pub fail: AtomicBool,
    pub delay: Duration,
    pub load_calls: AtomicUsize,
}

impl ClassifierLoader for ScriptedLoader {
    fn load(&self, _model_ref: &str, _metadata_ref: &str) -> Result<Arc<dyn ImageClassifier>> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::ModelLoad("metadata.json not found".to_string()));
        }
        Ok(self.classifier.clone())
    }
}

/// Delays every `open` so a test can act while the loop is Starting.
pub struct SlowProvider {
    pub inner: FrameSourceProviderFake,
    pub delay: Duration,
}

impl FrameSourceProvider for SlowProvider {
    fn open(&self, width: u32, height: u32, mirror: bool) -> Result<Box<dyn FrameSource>> {
        std::thread::sleep(self.delay);
        self.inner.open(width, height, mirror)
    }
}

pub struct FixtureOptions {
    pub provider: FrameSourceProviderFake,
    pub open_delay: Duration,
    pub load_delay: Duration,
    pub load_fails: bool,
    pub script: Vec<Result<Vec<f32>>>,
}

impl Default for FixtureOptions {
    fn default() -> Self {
        Self {
            provider: FrameSourceProviderFake::new(Arc::new(LoggerFake::new())),
            open_delay: Duration::ZERO,
            load_delay: Duration::ZERO,
            load_fails: false,
            script: vec![],
        }
    }
}

#[allow(dead_code)]
pub struct Fixture {
    pub config: Config,
    pub logger: LoggerFake,
    pub loader: Arc<ScriptedLoader>,
    pub classifier: Arc<ScriptedClassifier>,
    pub frame_source_stats: Arc<FrameSourceFakeStats>,
    pub device_display: Arc<DeviceDisplayFake>,
    pub live_loop: LiveClassificationLoop,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_options(FixtureOptions::default())
    }

    pub fn with_options(options: FixtureOptions) -> Self {
        let config = Config {
            tick_rate: Duration::from_millis(1),
            ..Config::default()
        };
        let logger = LoggerFake::new();
        let classifier = Arc::new(ScriptedClassifier::new(
            vec![0.10, 0.85, 0.05],
            options.script,
        ));
        let loader = Arc::new(ScriptedLoader {
            classifier: classifier.clone(),
            fail: AtomicBool::new(options.load_fails),
            delay: options.load_delay,
            load_calls: AtomicUsize::new(0),
        });
        let frame_source_stats = options.provider.stats();
        let provider = Arc::new(SlowProvider {
            inner: options.provider,
            delay: options.open_delay,
        });
        let device_display = Arc::new(DeviceDisplayFake::new(Arc::new(logger.clone())));

        let live_loop = LiveClassificationLoop::new(
            config.clone(),
            Arc::new(logger.clone()),
            loader.clone(),
            provider,
            device_display.clone(),
        );

        Self {
            config,
            logger,
            loader,
            classifier,
            frame_source_stats,
            device_display,
            live_loop,
        }
    }
}

/// Polls `condition` until it holds or five seconds pass.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
