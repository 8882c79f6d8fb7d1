use crate::error::{Error, Result};
use crate::frame_source::interface::{Frame, FrameSource, FrameSourceProvider};
use crate::library::logger::interface::Logger;
use image::{ImageBuffer, Rgb};
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Call counters shared between a provider and every source it opens.
#[derive(Debug, Default)]
pub struct FrameSourceFakeStats {
    pub open_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub close_calls: AtomicUsize,
    pub is_open: AtomicBool,
}

impl FrameSourceFakeStats {
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.is_open.load(Ordering::SeqCst)
    }
}

pub struct FrameSourceFake {
    width: u32,
    height: u32,
    frame: Option<Frame>,
    stats: Arc<FrameSourceFakeStats>,
    fail_refresh_after: Option<usize>,
    logger: Arc<dyn Logger + Send + Sync>,
}

impl FrameSource for FrameSourceFake {
    fn refresh(&mut self) -> Result<()> {
        let calls = self.stats.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(limit) = self.fail_refresh_after {
            if calls > limit {
                return Err(Error::FrameSource("fake camera disconnected".to_string()));
            }
        }

        let mut rng = rand::rng();
        let shade: u8 = rng.random();
        let img = ImageBuffer::from_pixel(self.width, self.height, Rgb([shade, shade, shade]));
        self.frame = Some(Frame::ImageRgb8(img));
        Ok(())
    }

    fn current_frame(&self) -> Result<Frame> {
        self.frame
            .clone()
            .ok_or_else(|| Error::Inference("no frame captured yet".to_string()))
    }

    fn close(&mut self) {
        self.stats.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.stats.is_open.swap(false, Ordering::SeqCst) {
            let _ = self.logger.info("Camera closed");
        }
        self.frame = None;
    }
}

pub struct FrameSourceProviderFake {
    stats: Arc<FrameSourceFakeStats>,
    deny_access: bool,
    fail_refresh_after: Option<usize>,
    logger: Arc<dyn Logger + Send + Sync>,
}

impl FrameSourceProviderFake {
    pub fn new(logger: Arc<dyn Logger + Send + Sync>) -> Self {
        Self {
            stats: Arc::new(FrameSourceFakeStats::default()),
            deny_access: false,
            fail_refresh_after: None,
            logger: logger.with_namespace("frame_source").with_namespace("fake"),
        }
    }

    /// Every `open` is rejected, as if permission was denied.
    pub fn denying_access(mut self) -> Self {
        self.deny_access = true;
        self
    }

    /// Sources report a lost device once `refresh` has succeeded `count` times.
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_refresh_after = Some(count);
        self
    }

    pub fn stats(&self) -> Arc<FrameSourceFakeStats> {
        Arc::clone(&self.stats)
    }
}

impl FrameSourceProvider for FrameSourceProviderFake {
    fn open(&self, width: u32, height: u32, mirror: bool) -> Result<Box<dyn FrameSource>> {
        self.stats.open_calls.fetch_add(1, Ordering::SeqCst);
        if self.deny_access {
            let _ = self.logger.error("Camera access denied");
            return Err(Error::DeviceUnavailable("permission denied".to_string()));
        }

        let _ = self.logger.info(&format!(
            "Camera opened ({}x{}, mirror: {})",
            width, height, mirror
        ));
        self.stats.is_open.store(true, Ordering::SeqCst);

        Ok(Box::new(FrameSourceFake {
            width,
            height,
            frame: None,
            stats: Arc::clone(&self.stats),
            fail_refresh_after: self.fail_refresh_after,
            logger: self.logger.clone(),
        }))
    }
}
