use crate::config::Config;
use crate::device_display::interface::DeviceDisplay;
use crate::error::{Error, Result};
use crate::frame_source::interface::FrameSourceProvider;
use crate::image_classifier::interface::ClassifierLoader;
use crate::image_classifier::snapshot::Snapshot;
use crate::library::logger::interface::Logger;
use crate::live_loop::core::{init, transition, Effect, Event, LoopState, Model};
use crate::live_loop::render::Render;
use crate::live_loop::run_effect::RunEffect;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

pub enum Request {
    Start(Sender<Result<()>>),
    Stop(Sender<()>),
    Event(Event),
    Shutdown,
}

/// Handle to a running capture -> infer -> publish loop.
///
/// All state changes happen on one event thread; this handle only sends
/// requests to it and reads what it last stored.
pub struct LiveClassificationLoop {
    request_sender: Sender<Request>,
    model: Arc<Mutex<Model>>,
    latest_snapshot: Arc<Mutex<Option<Arc<Snapshot>>>>,
    diagnostics: Arc<Mutex<Vec<Sender<Error>>>>,
    event_thread: Option<JoinHandle<()>>,
}

impl LiveClassificationLoop {
    pub fn new(
        config: Config,
        logger: Arc<dyn Logger + Send + Sync>,
        classifier_loader: Arc<dyn ClassifierLoader>,
        frame_source_provider: Arc<dyn FrameSourceProvider>,
        device_display: Arc<dyn DeviceDisplay + Send + Sync>,
    ) -> Self {
        let (request_sender, request_receiver) = channel();
        let logger = logger.with_namespace("live_loop");
        let (initial_model, initial_effects) = init();

        let model = Arc::new(Mutex::new(initial_model.clone()));
        let latest_snapshot = Arc::new(Mutex::new(None));
        let diagnostics = Arc::new(Mutex::new(Vec::new()));

        let render = Render::new(device_display, config.detection_threshold);
        let run_effect = RunEffect::new(
            config,
            logger.clone(),
            classifier_loader,
            frame_source_provider,
            request_sender.clone(),
        );

        // cycles never overlap, so one long-lived worker runs all of them
        let (cycle_worker, cycle_receiver) = channel::<Effect>();
        let cycle_run_effect = run_effect.clone();
        std::thread::spawn(move || {
            for effect in cycle_receiver.iter() {
                cycle_run_effect.run_effect(effect);
            }
        });

        let event_loop = EventLoop {
            model: Arc::clone(&model),
            latest_snapshot: Arc::clone(&latest_snapshot),
            diagnostics: Arc::clone(&diagnostics),
            render,
            run_effect,
            cycle_worker,
            logger,
            pending_starts: Vec::new(),
            pending_stops: Vec::new(),
        };

        let event_thread = std::thread::spawn(move || {
            event_loop.run(initial_model, initial_effects, request_receiver)
        });

        Self {
            request_sender,
            model,
            latest_snapshot,
            diagnostics,
            event_thread: Some(event_thread),
        }
    }

    /// Asks the loop to start without waiting. The receiver yields the outcome
    /// once Starting resolves, or the error that sent it back to Idle. A loop
    /// that is already Running or Stopping answers `Ok(())` right away.
    pub fn request_start(&self) -> Result<Receiver<Result<()>>> {
        let (reply_sender, reply_receiver) = channel();
        self.request_sender
            .send(Request::Start(reply_sender))
            .map_err(|_| Error::LoopClosed)?;
        Ok(reply_receiver)
    }

    /// Blocks until Starting resolves. `Ok(())` means the loop got through
    /// Starting, or was already Running or Stopping; it does not promise the
    /// loop is Running now, since a concurrent `stop()` may have won.
    pub fn start(&self) -> Result<()> {
        self.request_start()?.recv().map_err(|_| Error::LoopClosed)?
    }

    /// Asks the loop to stop without waiting. The receiver fires once it is Idle.
    pub fn request_stop(&self) -> Result<Receiver<()>> {
        let (reply_sender, reply_receiver) = channel();
        self.request_sender
            .send(Request::Stop(reply_sender))
            .map_err(|_| Error::LoopClosed)?;
        Ok(reply_receiver)
    }

    /// Blocks until the loop is Idle and the frame source is closed.
    pub fn stop(&self) -> Result<()> {
        self.request_stop()?.recv().map_err(|_| Error::LoopClosed)
    }

    /// The UI toggle: start when Idle, stop when Running, otherwise nothing.
    pub fn toggle(&self) -> Result<()> {
        match self.state() {
            LoopState::Idle => self.request_start().map(|_| ()),
            LoopState::Running => self.request_stop().map(|_| ()),
            LoopState::Starting | LoopState::Stopping => Ok(()),
        }
    }

    pub fn state(&self) -> LoopState {
        self.model().loop_state()
    }

    pub fn model(&self) -> Model {
        self.model
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn latest_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.latest_snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Per-cycle errors that the loop recovered from or stopped on.
    pub fn diagnostics(&self) -> Receiver<Error> {
        let (sender, receiver) = channel();
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
        receiver
    }
}

impl Drop for LiveClassificationLoop {
    fn drop(&mut self) {
        let _ = self.request_sender.send(Request::Shutdown);
        if let Some(handle) = self.event_thread.take() {
            let _ = handle.join();
        }
    }
}

struct EventLoop {
    model: Arc<Mutex<Model>>,
    latest_snapshot: Arc<Mutex<Option<Arc<Snapshot>>>>,
    diagnostics: Arc<Mutex<Vec<Sender<Error>>>>,
    render: Render,
    run_effect: RunEffect,
    cycle_worker: Sender<Effect>,
    logger: Arc<dyn Logger + Send + Sync>,
    pending_starts: Vec<Sender<Result<()>>>,
    pending_stops: Vec<Sender<()>>,
}

impl EventLoop {
    fn run(
        mut self,
        initial_model: Model,
        initial_effects: Vec<Effect>,
        request_receiver: Receiver<Request>,
    ) {
        let mut current_model = initial_model;
        self.publish_model(&current_model);
        self.execute_effects(initial_effects);

        for request in request_receiver.iter() {
            let event = match request {
                Request::Start(reply) => {
                    self.pending_starts.push(reply);
                    Event::StartRequested
                }
                Request::Stop(reply) => {
                    self.pending_stops.push(reply);
                    Event::StopRequested
                }
                Request::Event(event) => event,
                Request::Shutdown => break,
            };

            let log_event = !event.is_routine();
            if log_event {
                let _ = self.logger.info(&format!(
                    "\nold model:\n\t{:?}\n\nevent:\n\t{:?}",
                    current_model.state, event
                ));
            }

            let (new_model, effects) = transition(current_model, event);

            if log_event {
                let _ = self.logger.info(&format!(
                    "\nnew model:\n\t{:?}\n\neffects:\n\t{:?}",
                    new_model.state,
                    effects
                        .iter()
                        .map(|effect| effect.to_display_string())
                        .collect::<Vec<_>>()
                ));
            }

            current_model = new_model;
            self.publish_model(&current_model);
            self.execute_effects(effects);
            self.render(&current_model);
        }

        // workers that finish from here on see a closed channel and clean up
        // after themselves; anything they delivered before is closed below
        drop(request_receiver);
        self.shutdown(&current_model);
    }

    fn publish_model(&self, model: &Model) {
        *self.model.lock().unwrap_or_else(PoisonError::into_inner) = model.clone();
    }

    fn render(&self, model: &Model) {
        let latest = self
            .latest_snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Err(e) = self.render.render(model, latest.as_deref()) {
            let _ = self.logger.error(&format!("Render failed: {}", e));
        }
    }

    /// Bookkeeping effects run inline; anything that blocks gets a thread.
    fn execute_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Publish(snapshot) => {
                    *self
                        .latest_snapshot
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
                }
                Effect::ReportDiagnostic(error) => self.report(error),
                Effect::ResolveStart(result) => {
                    for reply in self.pending_starts.drain(..) {
                        let _ = reply.send(result.clone());
                    }
                }
                Effect::ResolveStop => {
                    for reply in self.pending_stops.drain(..) {
                        let _ = reply.send(());
                    }
                }
                effect @ Effect::RunCycle => {
                    if self.cycle_worker.send(effect).is_err() {
                        let _ = self.logger.error("Cycle worker is gone");
                    }
                }
                effect => {
                    let run_effect = self.run_effect.clone();
                    std::thread::spawn(move || run_effect.run_effect(effect));
                }
            }
        }
    }

    fn report(&self, error: Error) {
        let _ = self
            .logger
            .error(&format!("Cycle failed ({}): {}", error.error_code(), error));
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|subscriber| subscriber.send(error.clone()).is_ok());
    }

    fn shutdown(&mut self, model: &Model) {
        if model.holds_frame_source() {
            let _ = self.logger.info("Shutting down, closing frame source");
        }
        // an open can complete after the last event was read
        self.run_effect.close_frame_source();
        for reply in self.pending_starts.drain(..) {
            let _ = reply.send(Err(Error::LoopClosed));
        }
        // dropping the remaining stop replies wakes their waiters with LoopClosed
        self.pending_stops.clear();
    }
}
