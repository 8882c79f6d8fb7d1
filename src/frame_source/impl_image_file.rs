use crate::error::{Error, Result};
use crate::frame_source::interface::{Frame, FrameSource, FrameSourceProvider};
use crate::library::logger::interface::Logger;
use image::imageops;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Treats an image file as a camera. Whatever process writes the file is the
/// device; the file is re-read whenever its modification time changes.
pub struct FrameSourceImageFile {
    path: PathBuf,
    width: u32,
    height: u32,
    mirror: bool,
    modified: Option<SystemTime>,
    frame: Option<Frame>,
    closed: bool,
    logger: Arc<dyn Logger + Send + Sync>,
}

impl FrameSourceImageFile {
    fn load(&self) -> std::result::Result<Frame, String> {
        let image = image::open(&self.path).map_err(|e| e.to_string())?;
        let resized = image.resize_exact(self.width, self.height, imageops::FilterType::Triangle);
        if self.mirror {
            Ok(resized.fliph())
        } else {
            Ok(resized)
        }
    }

    fn modified_time(path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }
}

impl FrameSource for FrameSourceImageFile {
    fn refresh(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::FrameSource("frame source is closed".to_string()));
        }

        let modified = Self::modified_time(&self.path);
        if self.frame.is_some() && modified.is_some() && modified == self.modified {
            return Ok(());
        }

        let frame = match self.load() {
            Ok(frame) => frame,
            Err(e) if !self.path.exists() => {
                return Err(Error::FrameSource(format!(
                    "lost {}: {}",
                    self.path.display(),
                    e
                )));
            }
            // a writer is midway through replacing the file; retry next refresh
            Err(e) if self.frame.is_some() => {
                let _ = self.logger.error(&format!(
                    "Keeping previous frame, {} is unreadable: {}",
                    self.path.display(),
                    e
                ));
                return Ok(());
            }
            Err(e) => {
                return Err(Error::Inference(format!(
                    "unreadable {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };
        self.frame = Some(frame);
        self.modified = modified;
        Ok(())
    }

    fn current_frame(&self) -> Result<Frame> {
        self.frame
            .clone()
            .ok_or_else(|| Error::Inference("no frame captured yet".to_string()))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.frame = None;
            let _ = self.logger.info(&format!("Closed {}", self.path.display()));
        }
    }
}

pub struct FrameSourceProviderImageFile {
    path: PathBuf,
    logger: Arc<dyn Logger + Send + Sync>,
}

impl FrameSourceProviderImageFile {
    pub fn new(path: impl Into<PathBuf>, logger: Arc<dyn Logger + Send + Sync>) -> Self {
        Self {
            path: path.into(),
            logger: logger.with_namespace("frame_source").with_namespace("image_file"),
        }
    }
}

impl FrameSourceProvider for FrameSourceProviderImageFile {
    fn open(&self, width: u32, height: u32, mirror: bool) -> Result<Box<dyn FrameSource>> {
        if width == 0 || height == 0 {
            return Err(Error::DeviceUnavailable(format!(
                "invalid frame size {}x{}",
                width, height
            )));
        }

        let mut source = FrameSourceImageFile {
            path: self.path.clone(),
            width,
            height,
            mirror,
            modified: None,
            frame: None,
            closed: false,
            logger: self.logger.clone(),
        };

        // the first frame doubles as the access check
        source.refresh().map_err(|e| {
            Error::DeviceUnavailable(format!("cannot open {}: {}", self.path.display(), e))
        })?;

        let _ = self.logger.info(&format!(
            "Opened {} ({}x{}, mirror: {})",
            self.path.display(),
            width,
            height,
            mirror
        ));
        Ok(Box::new(source))
    }
}
