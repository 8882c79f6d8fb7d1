use crate::config::Config;
use crate::error::{Error, Result};
use crate::frame_source::interface::{FrameSource, FrameSourceProvider};
use crate::image_classifier::interface::{ClassifierLoader, ImageClassifier};
use crate::image_classifier::snapshot::Snapshot;
use crate::library::logger::interface::Logger;
use crate::live_loop::core::{Effect, Event};
use crate::live_loop::main::Request;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError, TryLockError};

/// Runs the effects that block on a collaborator. Each one reports back to
/// the event loop with exactly one `Event`.
#[derive(Clone)]
pub struct RunEffect {
    config: Config,
    logger: Arc<dyn Logger + Send + Sync>,
    classifier_loader: Arc<dyn ClassifierLoader>,
    frame_source_provider: Arc<dyn FrameSourceProvider>,
    classifier: Arc<Mutex<Option<Arc<dyn ImageClassifier>>>>,
    frame_source: Arc<Mutex<Option<Box<dyn FrameSource>>>>,
    latest_run: Arc<AtomicU64>,
    request_sender: Sender<Request>,
}

impl RunEffect {
    pub fn new(
        config: Config,
        logger: Arc<dyn Logger + Send + Sync>,
        classifier_loader: Arc<dyn ClassifierLoader>,
        frame_source_provider: Arc<dyn FrameSourceProvider>,
        request_sender: Sender<Request>,
    ) -> Self {
        Self {
            config,
            logger,
            classifier_loader,
            frame_source_provider,
            classifier: Arc::new(Mutex::new(None)),
            frame_source: Arc::new(Mutex::new(None)),
            latest_run: Arc::new(AtomicU64::new(0)),
            request_sender,
        }
    }

    fn send(&self, event: Event) {
        // the event loop is gone only after shutdown
        let _ = self.request_sender.send(Request::Event(event));
    }

    pub fn run_effect(&self, effect: Effect) {
        match effect {
            Effect::LoadModel => {
                let loaded = self
                    .classifier_loader
                    .load(&self.config.model_path, &self.config.metadata_path)
                    .and_then(|classifier| {
                        let class_count = classifier.class_count();
                        if class_count == 0 {
                            return Err(Error::ModelLoad("model reports no classes".to_string()));
                        }
                        *self.classifier.lock().unwrap_or_else(PoisonError::into_inner) =
                            Some(classifier);
                        Ok(class_count)
                    });
                self.send(Event::ModelLoadDone(loaded));
            }
            Effect::OpenFrameSource => {
                let opened = self
                    .frame_source_provider
                    .open(
                        self.config.frame_width,
                        self.config.frame_height,
                        self.config.mirror,
                    )
                    .map(|source| {
                        *self.frame_source.lock().unwrap_or_else(PoisonError::into_inner) =
                            Some(source);
                    });
                let delivered = self
                    .request_sender
                    .send(Request::Event(Event::FrameSourceOpenDone(opened)));
                if delivered.is_err() {
                    // nobody is left to close it later
                    self.close_frame_source();
                }
            }
            Effect::StartTicker { run_id } => {
                self.latest_run.fetch_max(run_id, Ordering::SeqCst);
                loop {
                    std::thread::sleep(self.config.tick_rate);
                    if !self.ticker_is_current(run_id) {
                        break;
                    }
                    let sent = self
                        .request_sender
                        .send(Request::Event(Event::Tick { run_id }));
                    if sent.is_err() {
                        break;
                    }
                }
            }
            Effect::RunCycle => {
                let result = self.run_cycle();
                self.send(Event::CycleDone(result));
            }
            Effect::CloseFrameSource => {
                self.close_frame_source();
                self.send(Event::FrameSourceCloseDone);
            }
            effect => {
                let _ = self.logger.error(&format!(
                    "Effect {} is not a blocking effect",
                    effect.to_display_string()
                ));
            }
        }
    }

    /// A ticker lives as long as its run: no newer run has started and the
    /// frame source is still held. A cycle holding the slot counts as held.
    fn ticker_is_current(&self, run_id: u64) -> bool {
        if self.latest_run.load(Ordering::SeqCst) != run_id {
            return false;
        }
        match self.frame_source.try_lock() {
            Ok(slot) => slot.is_some(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().is_some(),
            Err(TryLockError::WouldBlock) => true,
        }
    }

    /// refresh -> current frame -> infer, in that order.
    fn run_cycle(&self) -> Result<Snapshot> {
        let frame = {
            let mut slot = self
                .frame_source
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let source = slot
                .as_mut()
                .ok_or_else(|| Error::FrameSource("frame source is not open".to_string()))?;
            source.refresh()?;
            source.current_frame()?
        };

        let classifier = self
            .classifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| Error::Inference("no model loaded".to_string()))?;

        let snapshot = classifier.infer(&frame)?;
        if snapshot.len() != classifier.class_count() {
            return Err(Error::Inference(format!(
                "model returned {} records for {} classes",
                snapshot.len(),
                classifier.class_count()
            )));
        }
        Ok(snapshot)
    }

    /// Closes and drops the open frame source, if any.
    pub fn close_frame_source(&self) {
        let source = self
            .frame_source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut source) = source {
            source.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_source::impl_fake::FrameSourceProviderFake;
    use crate::image_classifier::impl_fake::ClassifierLoaderFake;
    use crate::library::logger::impl_fake::LoggerFake;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    fn run_effect(request_sender: Sender<Request>) -> RunEffect {
        let logger: Arc<dyn Logger + Send + Sync> = Arc::new(LoggerFake::new());
        RunEffect::new(
            Config {
                tick_rate: Duration::from_millis(1),
                ..Config::default()
            },
            logger.clone(),
            Arc::new(ClassifierLoaderFake::new(
                vec!["cat".to_string(), "dog".to_string()],
                logger.clone(),
            )),
            Arc::new(FrameSourceProviderFake::new(logger)),
            request_sender,
        )
    }

    fn next_tick(requests: &std::sync::mpsc::Receiver<Request>) -> Option<u64> {
        loop {
            match requests.recv_timeout(Duration::from_secs(5)).ok()? {
                Request::Event(Event::Tick { run_id }) => return Some(run_id),
                _ => continue,
            }
        }
    }

    #[test]
    fn test_one_ticker_per_run_ends_when_frame_source_closes() {
        let (sender, requests) = channel();
        let run_effect = run_effect(sender);

        run_effect.run_effect(Effect::OpenFrameSource);
        let ticker = {
            let run_effect = run_effect.clone();
            std::thread::spawn(move || run_effect.run_effect(Effect::StartTicker { run_id: 1 }))
        };

        assert_eq!(next_tick(&requests), Some(1));
        assert_eq!(next_tick(&requests), Some(1));

        run_effect.close_frame_source();

        ticker.join().unwrap();
    }

    #[test]
    fn test_newer_run_retires_old_ticker() {
        let (sender, requests) = channel();
        let run_effect = run_effect(sender);

        run_effect.run_effect(Effect::OpenFrameSource);
        let old_ticker = {
            let run_effect = run_effect.clone();
            std::thread::spawn(move || run_effect.run_effect(Effect::StartTicker { run_id: 1 }))
        };
        assert_eq!(next_tick(&requests), Some(1));

        let new_ticker = {
            let run_effect = run_effect.clone();
            std::thread::spawn(move || run_effect.run_effect(Effect::StartTicker { run_id: 2 }))
        };
        old_ticker.join().unwrap();

        let mut tick = next_tick(&requests);
        while tick == Some(1) {
            tick = next_tick(&requests);
        }
        assert_eq!(tick, Some(2));
        run_effect.close_frame_source();
        new_ticker.join().unwrap();
    }
}
