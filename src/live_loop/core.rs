use crate::error::{Error, Result};
use crate::image_classifier::snapshot::Snapshot;
use std::sync::Arc;

/// Coarse lifecycle reported to callers and displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Starting,
    Running,
    Stopping,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelStatus {
    NotLoaded,
    Loading,
    Loaded { class_count: usize },
    Failed(Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartingPhase {
    LoadingModel,
    OpeningFrameSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    WaitingForTick,
    InFlight,
}

#[derive(Debug, Clone, PartialEq)]
pub enum State {
    Idle,
    Starting {
        phase: StartingPhase,
        stop_requested: bool,
    },
    Running {
        cycle: Cycle,
    },
    Stopping {
        cycle_in_flight: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub state: State,
    pub model_status: ModelStatus,
    /// Bumped each time the frame source opens; ticks from older runs are dropped.
    pub run_id: u64,
    pub snapshots_published: u64,
    pub cycle_errors: u64,
    pub last_error: Option<Error>,
}

impl Model {
    pub fn loop_state(&self) -> LoopState {
        match self.state {
            State::Idle => LoopState::Idle,
            State::Starting { .. } => LoopState::Starting,
            State::Running { .. } => LoopState::Running,
            State::Stopping { .. } => LoopState::Stopping,
        }
    }

    /// Whether a frame source is (or is about to be) held open.
    pub fn holds_frame_source(&self) -> bool {
        matches!(self.state, State::Running { .. } | State::Stopping { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StartRequested,
    StopRequested,
    ModelLoadDone(Result<usize>),
    FrameSourceOpenDone(Result<()>),
    Tick { run_id: u64 },
    CycleDone(Result<Snapshot>),
    FrameSourceCloseDone,
}

impl Event {
    /// Events that happen every frame while running.
    pub fn is_routine(&self) -> bool {
        matches!(self, Event::Tick { .. } | Event::CycleDone(Ok(_)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LoadModel,
    OpenFrameSource,
    /// One ticker per run; it ends once the run's frame source is closed.
    StartTicker { run_id: u64 },
    RunCycle,
    Publish(Arc<Snapshot>),
    ReportDiagnostic(Error),
    CloseFrameSource,
    ResolveStart(Result<()>),
    ResolveStop,
}

impl Effect {
    pub fn to_display_string(&self) -> String {
        match self {
            Effect::Publish(snapshot) => format!(
                "Publish(top: {}, classes: {})",
                snapshot.top_record().class_name,
                snapshot.len()
            ),
            effect => format!("{:?}", effect),
        }
    }
}

/// Idle with the model load already under way.
pub fn init() -> (Model, Vec<Effect>) {
    (
        Model {
            state: State::Idle,
            model_status: ModelStatus::Loading,
            run_id: 0,
            snapshots_published: 0,
            cycle_errors: 0,
            last_error: None,
        },
        vec![Effect::LoadModel],
    )
}

fn stop_resolution(stop_requested: bool) -> Vec<Effect> {
    if stop_requested {
        vec![Effect::ResolveStop]
    } else {
        vec![]
    }
}

pub fn transition(model: Model, event: Event) -> (Model, Vec<Effect>) {
    match (model.state.clone(), event) {
        // Start / stop requests
        (State::Idle, Event::StartRequested) => match model.model_status {
            ModelStatus::Loaded { .. } => (
                Model {
                    state: State::Starting {
                        phase: StartingPhase::OpeningFrameSource,
                        stop_requested: false,
                    },
                    last_error: None,
                    ..model
                },
                vec![Effect::OpenFrameSource],
            ),
            ModelStatus::Loading => (
                Model {
                    state: State::Starting {
                        phase: StartingPhase::LoadingModel,
                        stop_requested: false,
                    },
                    last_error: None,
                    ..model
                },
                vec![],
            ),
            ModelStatus::NotLoaded | ModelStatus::Failed(_) => (
                Model {
                    state: State::Starting {
                        phase: StartingPhase::LoadingModel,
                        stop_requested: false,
                    },
                    model_status: ModelStatus::Loading,
                    last_error: None,
                    ..model
                },
                vec![Effect::LoadModel],
            ),
        },
        // Already Starting: the caller joins the pending start.
        (State::Starting { .. }, Event::StartRequested) => (model, vec![]),
        (State::Running { .. } | State::Stopping { .. }, Event::StartRequested) => {
            (model, vec![Effect::ResolveStart(Ok(()))])
        }

        (State::Idle, Event::StopRequested) => (model, vec![Effect::ResolveStop]),
        (State::Starting { phase, .. }, Event::StopRequested) => (
            Model {
                state: State::Starting {
                    phase,
                    stop_requested: true,
                },
                ..model
            },
            vec![],
        ),
        (
            State::Running {
                cycle: Cycle::WaitingForTick,
            },
            Event::StopRequested,
        ) => (
            Model {
                state: State::Stopping {
                    cycle_in_flight: false,
                },
                ..model
            },
            vec![Effect::CloseFrameSource],
        ),
        (
            State::Running {
                cycle: Cycle::InFlight,
            },
            Event::StopRequested,
        ) => (
            Model {
                state: State::Stopping {
                    cycle_in_flight: true,
                },
                ..model
            },
            vec![],
        ),
        (State::Stopping { .. }, Event::StopRequested) => (model, vec![]),

        // Model loading
        (
            State::Starting {
                phase: StartingPhase::LoadingModel,
                stop_requested,
            },
            Event::ModelLoadDone(result),
        ) => match result {
            Ok(class_count) if stop_requested => {
                let mut effects = vec![Effect::ResolveStart(Ok(()))];
                effects.extend(stop_resolution(true));
                (
                    Model {
                        state: State::Idle,
                        model_status: ModelStatus::Loaded { class_count },
                        ..model
                    },
                    effects,
                )
            }
            Ok(class_count) => (
                Model {
                    state: State::Starting {
                        phase: StartingPhase::OpeningFrameSource,
                        stop_requested,
                    },
                    model_status: ModelStatus::Loaded { class_count },
                    ..model
                },
                vec![Effect::OpenFrameSource],
            ),
            Err(error) => {
                let mut effects = vec![Effect::ResolveStart(Err(error.clone()))];
                effects.extend(stop_resolution(stop_requested));
                (
                    Model {
                        state: State::Idle,
                        model_status: ModelStatus::Failed(error.clone()),
                        last_error: Some(error),
                        ..model
                    },
                    effects,
                )
            }
        },
        // Background load finishing while no start is waiting on it
        (_, Event::ModelLoadDone(result)) => {
            let (model_status, last_error) = match result {
                Ok(class_count) => (ModelStatus::Loaded { class_count }, model.last_error.clone()),
                Err(error) => (ModelStatus::Failed(error.clone()), Some(error)),
            };
            (
                Model {
                    model_status,
                    last_error,
                    ..model
                },
                vec![],
            )
        }

        // Opening the frame source
        (
            State::Starting {
                phase: StartingPhase::OpeningFrameSource,
                stop_requested,
            },
            Event::FrameSourceOpenDone(result),
        ) => match result {
            Ok(()) if stop_requested => (
                Model {
                    state: State::Stopping {
                        cycle_in_flight: false,
                    },
                    run_id: model.run_id + 1,
                    ..model
                },
                vec![Effect::ResolveStart(Ok(())), Effect::CloseFrameSource],
            ),
            Ok(()) => {
                let run_id = model.run_id + 1;
                (
                    Model {
                        state: State::Running {
                            cycle: Cycle::WaitingForTick,
                        },
                        run_id,
                        ..model
                    },
                    vec![
                        Effect::ResolveStart(Ok(())),
                        Effect::StartTicker { run_id },
                    ],
                )
            }
            Err(error) => {
                let mut effects = vec![Effect::ResolveStart(Err(error.clone()))];
                effects.extend(stop_resolution(stop_requested));
                (
                    Model {
                        state: State::Idle,
                        last_error: Some(error),
                        ..model
                    },
                    effects,
                )
            }
        },

        // The capture -> infer -> publish cycle
        (
            State::Running {
                cycle: Cycle::WaitingForTick,
            },
            Event::Tick { run_id },
        ) if run_id == model.run_id => (
            Model {
                state: State::Running {
                    cycle: Cycle::InFlight,
                },
                ..model
            },
            vec![Effect::RunCycle],
        ),
        (
            State::Running {
                cycle: Cycle::InFlight,
            },
            Event::CycleDone(result),
        ) => match result {
            Ok(snapshot) => (
                Model {
                    state: State::Running {
                        cycle: Cycle::WaitingForTick,
                    },
                    snapshots_published: model.snapshots_published + 1,
                    ..model
                },
                vec![Effect::Publish(Arc::new(snapshot))],
            ),
            // The device is gone, shut down as if stop() was called.
            Err(error @ Error::FrameSource(_)) => (
                Model {
                    state: State::Stopping {
                        cycle_in_flight: false,
                    },
                    cycle_errors: model.cycle_errors + 1,
                    last_error: Some(error.clone()),
                    ..model
                },
                vec![Effect::ReportDiagnostic(error), Effect::CloseFrameSource],
            ),
            Err(error) => (
                Model {
                    state: State::Running {
                        cycle: Cycle::WaitingForTick,
                    },
                    cycle_errors: model.cycle_errors + 1,
                    ..model
                },
                vec![Effect::ReportDiagnostic(error)],
            ),
        },

        // Stopping
        (
            State::Stopping {
                cycle_in_flight: true,
            },
            Event::CycleDone(result),
        ) => {
            let stopping = State::Stopping {
                cycle_in_flight: false,
            };
            match result {
                Ok(snapshot) => (
                    Model {
                        state: stopping,
                        snapshots_published: model.snapshots_published + 1,
                        ..model
                    },
                    vec![Effect::Publish(Arc::new(snapshot)), Effect::CloseFrameSource],
                ),
                Err(error) => (
                    Model {
                        state: stopping,
                        cycle_errors: model.cycle_errors + 1,
                        ..model
                    },
                    vec![Effect::ReportDiagnostic(error), Effect::CloseFrameSource],
                ),
            }
        }
        (
            State::Stopping {
                cycle_in_flight: false,
            },
            Event::FrameSourceCloseDone,
        ) => (
            Model {
                state: State::Idle,
                ..model
            },
            vec![Effect::ResolveStop],
        ),

        // Stale ticks and anything else that does not apply
        _ => (model, vec![]),
    }
}
