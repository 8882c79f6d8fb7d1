use crate::device_display::interface::DeviceDisplay;
use crate::library::logger::interface::Logger;
use crate::presentation::DisplayView;
use std::error::Error;
use std::sync::{Arc, Mutex, PoisonError};

/// Records every rendered view.
pub struct DeviceDisplayFake {
    views: Mutex<Vec<DisplayView>>,
    logger: Arc<dyn Logger + Send + Sync>,
}

impl DeviceDisplayFake {
    pub fn new(logger: Arc<dyn Logger + Send + Sync>) -> Self {
        Self {
            views: Mutex::new(Vec::new()),
            logger: logger.with_namespace("display").with_namespace("fake"),
        }
    }

    pub fn views(&self) -> Vec<DisplayView> {
        self.views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DeviceDisplay for DeviceDisplayFake {
    fn render(&self, view: &DisplayView) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.logger.info(&format!(
            "DeviceDisplayFake::render({:?}, {} rows)",
            view.loop_state,
            view.rows.len()
        ))?;
        self.views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(view.clone());
        Ok(())
    }
}
