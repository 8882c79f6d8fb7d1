pub mod config;
pub mod device_display;
pub mod error;
pub mod frame_source;
pub mod image_classifier;
pub mod library;
pub mod live_loop;
pub mod presentation;

pub use config::Config;
pub use error::{Error, Result};
pub use live_loop::main::LiveClassificationLoop;
