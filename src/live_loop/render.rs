use crate::device_display::interface::DeviceDisplay;
use crate::image_classifier::snapshot::Snapshot;
use crate::live_loop::core::Model;
use crate::presentation::DisplayView;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone)]
pub struct Render {
    device_display: Arc<dyn DeviceDisplay + Send + Sync>,
    threshold: f32,
    last_view: Arc<Mutex<Option<DisplayView>>>,
}

impl Render {
    pub fn new(device_display: Arc<dyn DeviceDisplay + Send + Sync>, threshold: f32) -> Self {
        Self {
            device_display,
            threshold,
            last_view: Arc::new(Mutex::new(None)),
        }
    }

    /// Pushes the view to the display unless it is identical to the last one.
    pub fn render(
        &self,
        model: &Model,
        latest: Option<&Snapshot>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let view = DisplayView::new(model.loop_state(), latest, self.threshold);

        let mut last_view = self.last_view.lock().unwrap_or_else(PoisonError::into_inner);
        if last_view.as_ref() == Some(&view) {
            return Ok(());
        }

        self.device_display.render(&view)?;
        *last_view = Some(view);
        Ok(())
    }
}
