use crate::device_display::interface::DeviceDisplay;
use crate::live_loop::core::LoopState;
use crate::live_loop::main::LiveClassificationLoop;
use crate::presentation::{DetectionStatus, DisplayView};
use eframe::egui;
use std::error::Error;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

struct PredictionWindow {
    view: Arc<Mutex<DisplayView>>,
    live_loop: Arc<LiveClassificationLoop>,
    toggle_error: Option<String>,
}

impl eframe::App for PredictionWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let view = self
            .view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(10.0);

                let toggle = egui::Button::new(
                    egui::RichText::new(view.toggle_label())
                        .size(20.0)
                        .strong()
                        .color(egui::Color32::WHITE),
                )
                .fill(egui::Color32::from_rgb(34, 197, 94))
                .min_size(egui::vec2(120.0, 48.0));

                let enabled = matches!(view.loop_state, LoopState::Idle | LoopState::Running);
                if ui.add_enabled(enabled, toggle).clicked() {
                    self.toggle_error = self.live_loop.toggle().err().map(|e| e.to_string());
                }

                // fatal start errors leave the toggle on "Start" with the reason below it
                let start_error = match view.loop_state {
                    LoopState::Idle => self.live_loop.model().last_error.map(|e| e.to_string()),
                    _ => None,
                };
                if let Some(error) = self.toggle_error.as_ref().or(start_error.as_ref()) {
                    ui.colored_label(egui::Color32::from_rgb(220, 38, 38), error);
                }

                ui.add_space(10.0);

                if let Some(top) = &view.top_class {
                    ui.heading(top);
                }
            });

            ui.add_space(10.0);

            for row in &view.rows {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(format!("{}: {:.2}%", row.class_name, row.percent))
                            .monospace(),
                    );
                    let color = match row.status {
                        DetectionStatus::Detected => egui::Color32::from_rgb(22, 163, 74),
                        DetectionStatus::NotDetected => egui::Color32::GRAY,
                    };
                    ui.colored_label(color, row.status.as_str());
                });
                ui.add(egui::ProgressBar::new((row.percent / 100.0) as f32));
            }
        });

        ctx.request_repaint_after(Duration::from_millis(33));
    }
}

/// Holds the latest view for the egui window to pick up on its next repaint.
pub struct DeviceDisplayGui {
    view: Arc<Mutex<DisplayView>>,
}

impl DeviceDisplayGui {
    pub fn new() -> Self {
        Self {
            view: Arc::new(Mutex::new(DisplayView::new(LoopState::Idle, None, 0.0))),
        }
    }

    /// Opens the window on the calling thread and blocks until it is closed.
    pub fn run(
        &self,
        live_loop: Arc<LiveClassificationLoop>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([420.0, 360.0])
                .with_resizable(true),
            ..Default::default()
        };

        let window = PredictionWindow {
            view: Arc::clone(&self.view),
            live_loop,
            toggle_error: None,
        };

        eframe::run_native(
            "Live Classifier",
            options,
            Box::new(|_cc| Box::new(window)),
        )
        .map_err(|e| e.to_string())?;

        Ok(())
    }
}

impl DeviceDisplay for DeviceDisplayGui {
    fn render(&self, view: &DisplayView) -> Result<(), Box<dyn Error + Send + Sync>> {
        *self.view.lock().unwrap_or_else(PoisonError::into_inner) = view.clone();
        Ok(())
    }
}
