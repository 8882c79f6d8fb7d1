use chrono::{Offset, Utc};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub model_path: String,
    pub metadata_path: String,
    pub frame_image_path: String,
    pub frame_width: u32,
    pub frame_height: u32,
    pub mirror: bool,
    pub detection_threshold: f32,
    pub tick_rate: Duration,
    pub logger_timezone: chrono::FixedOffset,
    /// Draw to stdout instead of opening a window.
    pub headless: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: "model.onnx".to_string(),
            metadata_path: "metadata.json".to_string(),
            frame_image_path: "frame.png".to_string(),
            frame_width: 640,
            frame_height: 480,
            mirror: true,
            detection_threshold: 0.80,
            // roughly one animation frame
            tick_rate: Duration::from_millis(16),
            logger_timezone: Utc.fix(),
            headless: false,
        }
    }
}
