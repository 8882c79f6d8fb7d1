use crate::presentation::DisplayView;
use std::error::Error;

/// Where predictions end up. Implementations only draw; they never drive the loop.
pub trait DeviceDisplay: Send + Sync {
    fn render(&self, view: &DisplayView) -> Result<(), Box<dyn Error + Send + Sync>>;
}
